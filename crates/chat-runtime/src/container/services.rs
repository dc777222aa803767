//! # Chat Container
//!
//! Holds every component instance with shared ownership.

use std::sync::Arc;

use mc_01_ledger_store::{
    import_legacy_json, FileBackedKVStore, InMemoryKVStore, KvLedgerStore, LedgerError,
    LedgerStore,
};
use mc_02_identity_registry::IdentityRegistry;
use mc_03_command_interpreter::RandomDice;
use mc_04_dispatcher::InMemoryDispatcher;
use mc_05_session_controller::{SessionController, SessionDependencies, SessionWorker};
use shared_types::RecordUpdate;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::container::config::{ChatConfig, StorageBackend};

/// Ledger behind a trait object so the backend is chosen at start-up.
pub type SharedLedger = Arc<dyn LedgerStore>;

/// Session controller with production collaborators.
pub type ChatController = SessionController<SharedLedger, InMemoryDispatcher, RandomDice>;

/// Session worker with production collaborators.
pub type ChatWorker = SessionWorker<SharedLedger, InMemoryDispatcher, RandomDice>;

/// Every component of a running server.
pub struct ChatContainer {
    pub config: ChatConfig,
    pub ledger: SharedLedger,
    pub registry: Arc<IdentityRegistry>,
    pub dispatcher: Arc<InMemoryDispatcher>,
    pub controller: Arc<ChatController>,
}

impl ChatContainer {
    /// Open storage and build all components.
    pub fn new(config: ChatConfig) -> Result<Self, LedgerError> {
        let ledger = open_ledger(&config)?;

        if let Some(path) = &config.storage.legacy_json {
            let imported = import_legacy_json(ledger.as_ref(), path)?;
            info!(path = %path.display(), imported, "Legacy ledger imported");
        }
        provision_admins(ledger.as_ref(), &config.admins)?;

        Ok(Self::with_ledger(config, ledger))
    }

    /// Build components around an already-open ledger.
    pub fn with_ledger(config: ChatConfig, ledger: SharedLedger) -> Self {
        let registry = Arc::new(IdentityRegistry::new());
        let dispatcher = Arc::new(InMemoryDispatcher::with_config(config.dispatcher.clone()));

        let controller = Arc::new(SessionController::new(
            SessionDependencies {
                ledger: Arc::new(Arc::clone(&ledger)),
                registry: Arc::clone(&registry),
                dispatcher: Arc::clone(&dispatcher),
                dice: RandomDice,
            },
            config.session.clone(),
            config.economy.clone(),
        ));

        Self {
            config,
            ledger,
            registry,
            dispatcher,
            controller,
        }
    }

    /// Worker that spawns one task per connection.
    pub fn worker(&self, shutdown: watch::Receiver<bool>) -> ChatWorker {
        SessionWorker::new(Arc::clone(&self.controller), shutdown)
    }
}

fn open_ledger(config: &ChatConfig) -> Result<SharedLedger, LedgerError> {
    let storage = &config.storage;
    match storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory ledger, balances will not survive a restart");
            Ok(Arc::new(KvLedgerStore::open(InMemoryKVStore::new())?))
        }
        StorageBackend::File => {
            std::fs::create_dir_all(&storage.data_dir)
                .map_err(|e| LedgerError::Storage(e.to_string()))?;
            let path = storage.ledger_file();
            info!(path = %path.display(), "Opening file ledger");
            Ok(Arc::new(KvLedgerStore::open(FileBackedKVStore::open(&path)?)?))
        }
        #[cfg(feature = "rocksdb")]
        StorageBackend::RocksDb => {
            use mc_01_ledger_store::RocksDbStore;

            std::fs::create_dir_all(&storage.data_dir)
                .map_err(|e| LedgerError::Storage(e.to_string()))?;
            let path = storage.rocksdb_dir();
            info!(path = %path.display(), "Opening RocksDB ledger");
            Ok(Arc::new(KvLedgerStore::open(RocksDbStore::open_default(&path)?)?))
        }
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::RocksDb => Err(LedgerError::Storage(
            "built without the rocksdb feature".to_string(),
        )),
    }
}

/// Mark every configured name as admin, creating records as needed.
pub fn provision_admins<L>(ledger: &L, admins: &[String]) -> Result<(), LedgerError>
where
    L: LedgerStore + ?Sized,
{
    for name in admins {
        let record = ledger.upsert(name, RecordUpdate::none().with_admin(true))?;
        info!(name = %record.name, balance = record.balance, "Admin provisioned");
    }
    Ok(())
}
