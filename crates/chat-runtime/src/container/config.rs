//! # Server Configuration
//!
//! Defaults for every component plus `MC_*` environment overrides. Values
//! that would break an invariant are rejected at start-up.

use mc_03_command_interpreter::{EconomyConfig, EconomyConfigError};
use mc_04_dispatcher::{DispatcherConfig, OverflowPolicy};
use mc_05_session_controller::SessionConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Where the ledger lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Single snapshot file under the data directory.
    #[default]
    File,
    /// Nothing survives a restart.
    Memory,
    /// RocksDB database under the data directory (requires `rocksdb` feature).
    RocksDb,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "memory" => Ok(StorageBackend::Memory),
            "rocksdb" => Ok(StorageBackend::RocksDb),
            other => Err(ConfigError::Invalid {
                key: "MC_STORAGE_BACKEND",
                reason: format!("unknown backend '{}'", other),
            }),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Data directory for the ledger.
    pub data_dir: PathBuf,
    /// Legacy JSON ledger imported once at start-up.
    pub legacy_json: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: PathBuf::from("./data"),
            legacy_json: None,
        }
    }
}

impl StorageConfig {
    pub fn ledger_file(&self) -> PathBuf {
        self.data_dir.join("ledger.bin")
    }

    pub fn rocksdb_dir(&self) -> PathBuf {
        self.data_dir.join("ledger-rocksdb")
    }
}

/// Complete server configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// WebSocket and HTTP listen address.
    pub bind_addr: SocketAddr,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub economy: EconomyConfig,
    pub dispatcher: DispatcherConfig,
    /// Names provisioned with admin rights at start-up.
    pub admins: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 7878)),
            storage: StorageConfig::default(),
            session: SessionConfig::default(),
            economy: EconomyConfig::default(),
            dispatcher: DispatcherConfig::default(),
            admins: Vec::new(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("invalid economy settings: {0}")]
    Economy(#[from] EconomyConfigError),

    #[error("storage backend 'rocksdb' requires building with the `rocksdb` feature")]
    RocksDbUnavailable,
}

impl ChatConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`.
    ///
    /// # Variables
    ///
    /// - `MC_BIND_ADDR`, `MC_DATA_DIR`, `MC_STORAGE_BACKEND`, `MC_LEGACY_JSON`
    /// - `MC_ADMINS`: comma-separated admin names
    /// - `MC_OUTBOX_CAPACITY`, `MC_OVERFLOW_POLICY`
    /// - `MC_MAX_MESSAGE_CHARS`, `MC_MAX_NEWLINES`, `MC_MAX_NAME_CHARS`
    /// - `MC_REWARD_PER_MESSAGE`, `MC_TICKET_PRICE`, `MC_ROLL_WIN_REWARD`,
    ///   `MC_ROLL_LOSS_PENALTY`, `MC_LEADERBOARD_SIZE`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = parsed(&lookup, "MC_BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(dir) = lookup("MC_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = lookup("MC_STORAGE_BACKEND") {
            config.storage.backend = backend.parse()?;
        }
        config.storage.legacy_json = lookup("MC_LEGACY_JSON")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        if let Some(admins) = lookup("MC_ADMINS") {
            config.admins = admins
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(v) = parsed(&lookup, "MC_OUTBOX_CAPACITY")? {
            config.dispatcher.outbox_capacity = v;
        }
        if let Some(policy) = lookup("MC_OVERFLOW_POLICY") {
            config.dispatcher.overflow_policy =
                policy
                    .parse::<OverflowPolicy>()
                    .map_err(|reason| ConfigError::Invalid {
                        key: "MC_OVERFLOW_POLICY",
                        reason,
                    })?;
        }

        if let Some(v) = parsed(&lookup, "MC_MAX_MESSAGE_CHARS")? {
            config.session.max_message_chars = v;
        }
        if let Some(v) = parsed(&lookup, "MC_MAX_NEWLINES")? {
            config.session.max_newlines = v;
        }
        if let Some(v) = parsed(&lookup, "MC_MAX_NAME_CHARS")? {
            config.session.max_name_chars = v;
        }

        if let Some(v) = parsed(&lookup, "MC_REWARD_PER_MESSAGE")? {
            config.economy.reward_per_message = v;
        }
        if let Some(v) = parsed(&lookup, "MC_TICKET_PRICE")? {
            config.economy.rename_ticket_price = v;
        }
        if let Some(v) = parsed(&lookup, "MC_ROLL_WIN_REWARD")? {
            config.economy.roll_win_reward = v;
        }
        if let Some(v) = parsed(&lookup, "MC_ROLL_LOSS_PENALTY")? {
            config.economy.roll_loss_penalty = v;
        }
        if let Some(v) = parsed(&lookup, "MC_LEADERBOARD_SIZE")? {
            config.economy.leaderboard_size = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.economy.validate()?;

        if self.dispatcher.outbox_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "MC_OUTBOX_CAPACITY",
                reason: "must be > 0".into(),
            });
        }
        if self.session.max_message_chars == 0 {
            return Err(ConfigError::Invalid {
                key: "MC_MAX_MESSAGE_CHARS",
                reason: "must be > 0".into(),
            });
        }
        if self.session.max_name_chars == 0 {
            return Err(ConfigError::Invalid {
                key: "MC_MAX_NAME_CHARS",
                reason: "must be > 0".into(),
            });
        }
        if self.storage.backend == StorageBackend::RocksDb && !cfg!(feature = "rocksdb") {
            return Err(ConfigError::RocksDbUnavailable);
        }
        Ok(())
    }
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            })
        })
        .transpose()
}
