//! # mc-03-command-interpreter
//!
//! Turns a `!`-prefixed chat line into ledger mutations and replies.
//!
//! ## Flow
//!
//! ```text
//!   "!buy rename-ticket"
//!        │ parse_command
//!        ▼
//!   ParsedCommand { kind: Purchase, args }
//!        │ CommandInterpreter::execute(caller, ledger)
//!        ▼
//!   CommandOutcome { deliveries: [Reply(..)], effect: None }
//! ```
//!
//! Lines whose first token is not in the command table are not commands;
//! `parse_command` returns `None` and the caller treats them as chat.
//!
//! The interpreter touches only the ledger. A rename is returned as
//! `Effect::Rename` for the session controller to carry out across the
//! ledger and the identity registry.

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use config::{EconomyConfig, EconomyConfigError};
pub use domain::command::{parse_command, CommandKind, ParsedCommand, RENAME_TICKET};
pub use domain::errors::CommandError;
pub use domain::hand::Hand;
pub use domain::outcome::{CommandOutcome, Delivery, Effect};
pub use ports::outbound::{DiceSource, RandomDice, ScriptedDice};
pub use service::CommandInterpreter;
