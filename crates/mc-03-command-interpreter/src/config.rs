//! Economy configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Economy settings the server refuses to start with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EconomyConfigError {
    #[error("{field} must be >= 0")]
    Negative { field: &'static str },

    #[error("rename_ticket_price must be > 0")]
    FreeTicket,

    #[error("leaderboard_size must be > 0")]
    EmptyLeaderboard,
}

/// Tunable economy constants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Points credited per plain chat message (admins excluded).
    pub reward_per_message: i64,
    /// Price of the rename ticket.
    pub rename_ticket_price: i64,
    /// Credit when the caller's die beats the house.
    pub roll_win_reward: i64,
    /// Maximum debit when the house wins; never drives the balance below zero.
    pub roll_loss_penalty: i64,
    /// Rows shown by the ranking command.
    pub leaderboard_size: usize,
    /// Repetitions of `flood_unit` in the stress-echo payload.
    pub flood_repeats: usize,
    pub flood_unit: String,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            reward_per_message: 1,
            rename_ticket_price: 1000,
            roll_win_reward: 500,
            roll_loss_penalty: 300,
            leaderboard_size: 10,
            flood_repeats: 50,
            flood_unit: "[:[^].[-]:]~[:[Rust].[6₩]:]".to_string(),
        }
    }
}

impl EconomyConfig {
    /// Reject values that would break the economy's invariants.
    pub fn validate(&self) -> Result<(), EconomyConfigError> {
        let non_negative = [
            ("reward_per_message", self.reward_per_message),
            ("roll_win_reward", self.roll_win_reward),
            ("roll_loss_penalty", self.roll_loss_penalty),
        ];
        if let Some((field, _)) = non_negative.into_iter().find(|(_, v)| *v < 0) {
            return Err(EconomyConfigError::Negative { field });
        }
        if self.rename_ticket_price <= 0 {
            return Err(EconomyConfigError::FreeTicket);
        }
        if self.leaderboard_size == 0 {
            return Err(EconomyConfigError::EmptyLeaderboard);
        }
        Ok(())
    }

    /// The fixed stress-echo payload.
    pub fn flood_payload(&self) -> String {
        self.flood_unit.repeat(self.flood_repeats)
    }
}
