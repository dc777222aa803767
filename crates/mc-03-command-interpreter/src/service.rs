//! # Command Execution
//!
//! Every precondition that depends on ledger state is evaluated inside a
//! `LedgerStore::update_existing` check, so it holds at the moment the
//! mutation lands.

use mc_01_ledger_store::{LedgerError, LedgerStore};
use shared_types::{IdentityRecord, OutboundEvent, RecordUpdate};
use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt::Write as _;
use tracing::{debug, info};

use crate::config::EconomyConfig;
use crate::domain::command::{CommandKind, ParsedCommand, RENAME_TICKET};
use crate::domain::errors::CommandError;
use crate::domain::hand::Hand;
use crate::domain::outcome::{CommandOutcome, Effect};
use crate::ports::outbound::DiceSource;

/// Executes parsed commands against a ledger.
pub struct CommandInterpreter<D: DiceSource> {
    config: EconomyConfig,
    dice: D,
}

impl<D: DiceSource> CommandInterpreter<D> {
    pub fn new(config: EconomyConfig, dice: D) -> Self {
        Self { config, dice }
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Run `command` on behalf of `caller`.
    ///
    /// Errors carry the text to reply with; no mutation has happened when an
    /// error is returned.
    pub fn execute<L>(
        &self,
        caller: &str,
        command: &ParsedCommand,
        ledger: &L,
    ) -> Result<CommandOutcome, CommandError>
    where
        L: LedgerStore + ?Sized,
    {
        debug!(caller, command = command.kind.name(), "Executing command");

        match command.kind {
            CommandKind::Balance => self.balance(caller, ledger),
            CommandKind::Shop => Ok(self.shop()),
            CommandKind::Purchase => self.purchase(caller, command, ledger),
            CommandKind::Rename => self.rename(caller, command, ledger),
            CommandKind::Deposit => self.deposit(caller, command, ledger),
            CommandKind::Withdraw => self.withdraw(caller, command, ledger),
            CommandKind::Leaderboard => self.leaderboard(ledger),
            CommandKind::Grant => self.grant(caller, command, ledger),
            CommandKind::StressEcho => Ok(CommandOutcome::reply(self.config.flood_payload())),
            CommandKind::Analytics => self.analytics(ledger),
            CommandKind::Minigame => self.minigame(caller, ledger),
            CommandKind::Wager => self.wager(caller, command, ledger),
            CommandKind::Help => Ok(Self::help()),
        }
    }

    fn caller_record<L: LedgerStore + ?Sized>(
        caller: &str,
        ledger: &L,
    ) -> Result<IdentityRecord, CommandError> {
        Ok(ledger.upsert(caller, RecordUpdate::none())?)
    }

    fn balance<L: LedgerStore + ?Sized>(
        &self,
        caller: &str,
        ledger: &L,
    ) -> Result<CommandOutcome, CommandError> {
        let record = Self::caller_record(caller, ledger)?;
        let inventory = if record.has_ticket {
            RENAME_TICKET
        } else {
            "empty"
        };
        let mut text = format!("{}: {} points", record.name, record.balance);
        if record.bank != 0 {
            let _ = write!(text, " | bank: {}", record.bank);
        }
        let _ = write!(text, " | inventory: {}", inventory);
        Ok(CommandOutcome::reply(text))
    }

    /// Optional amount argument: digits only, `None` when absent.
    fn optional_amount(command: &ParsedCommand) -> Result<Option<i64>, CommandError> {
        let malformed = || CommandError::Malformed {
            usage: command.kind.usage(),
        };
        match command.args.as_slice() {
            [] => Ok(None),
            [amount] => parse_amount(amount).map(Some).ok_or_else(malformed),
            _ => Err(malformed()),
        }
    }

    fn deposit<L: LedgerStore + ?Sized>(
        &self,
        caller: &str,
        command: &ParsedCommand,
        ledger: &L,
    ) -> Result<CommandOutcome, CommandError> {
        let requested = Self::optional_amount(command)?;
        Self::caller_record(caller, ledger)?;

        let moved = Cell::new(0);
        let record = ledger.update_existing(caller, &|record| {
            let amount = requested.unwrap_or_else(|| record.balance.max(0));
            if record.balance < amount {
                return Err(LedgerError::InsufficientFunds {
                    required: amount,
                    available: record.balance,
                });
            }
            moved.set(amount);
            Ok(RecordUpdate::bank_transfer(amount))
        })?;

        info!(caller, amount = moved.get(), bank = record.bank, "Points deposited");
        Ok(CommandOutcome::reply(format!(
            "deposited {} points (points {}, bank {})",
            moved.get(),
            record.balance,
            record.bank
        )))
    }

    fn withdraw<L: LedgerStore + ?Sized>(
        &self,
        caller: &str,
        command: &ParsedCommand,
        ledger: &L,
    ) -> Result<CommandOutcome, CommandError> {
        let requested = Self::optional_amount(command)?;
        Self::caller_record(caller, ledger)?;

        let moved = Cell::new(0);
        let record = ledger
            .update_existing(caller, &|record| {
                let amount = requested.unwrap_or_else(|| record.bank.max(0));
                if record.bank < amount {
                    return Err(LedgerError::InsufficientFunds {
                        required: amount,
                        available: record.bank,
                    });
                }
                moved.set(amount);
                Ok(RecordUpdate::bank_transfer(-amount))
            })
            .map_err(|e| match e {
                LedgerError::InsufficientFunds {
                    required,
                    available,
                } => CommandError::InsufficientSavings {
                    required,
                    available,
                },
                other => other.into(),
            })?;

        info!(caller, amount = moved.get(), bank = record.bank, "Savings withdrawn");
        Ok(CommandOutcome::reply(format!(
            "withdrew {} points (points {}, bank {})",
            moved.get(),
            record.balance,
            record.bank
        )))
    }

    fn shop(&self) -> CommandOutcome {
        CommandOutcome::reply(format!(
            "shop\n- {}: {} points (change your display name once)\nbuy with: {}",
            RENAME_TICKET,
            self.config.rename_ticket_price,
            CommandKind::Purchase.usage()
        ))
    }

    fn purchase<L: LedgerStore + ?Sized>(
        &self,
        caller: &str,
        command: &ParsedCommand,
        ledger: &L,
    ) -> Result<CommandOutcome, CommandError> {
        if command.rest.is_empty() {
            return Err(CommandError::Malformed {
                usage: CommandKind::Purchase.usage(),
            });
        }
        if command.rest != RENAME_TICKET {
            return Err(CommandError::UnknownItem(command.rest.clone()));
        }

        let price = self.config.rename_ticket_price;
        let record = ledger.update_existing(caller, &|record| {
            if record.has_ticket {
                return Err(LedgerError::AlreadyOwned);
            }
            if record.balance < price {
                return Err(LedgerError::InsufficientFunds {
                    required: price,
                    available: record.balance,
                });
            }
            Ok(RecordUpdate::debit(price).with_ticket(true))
        })?;

        info!(caller, item = RENAME_TICKET, price, "Item purchased");
        Ok(CommandOutcome::reply(format!(
            "bought {} for {} points, balance now {}",
            RENAME_TICKET, price, record.balance
        )))
    }

    fn rename<L: LedgerStore + ?Sized>(
        &self,
        caller: &str,
        command: &ParsedCommand,
        ledger: &L,
    ) -> Result<CommandOutcome, CommandError> {
        let record = Self::caller_record(caller, ledger)?;
        if !record.has_ticket {
            return Err(CommandError::NoTicket);
        }

        let new_name = command.rest.as_str();
        if new_name.is_empty() {
            return Err(CommandError::Malformed {
                usage: CommandKind::Rename.usage(),
            });
        }
        if new_name == caller || ledger.get(new_name)?.is_some() {
            return Err(CommandError::NameTaken(new_name.to_string()));
        }

        Ok(CommandOutcome::effect(Effect::Rename {
            new_name: new_name.to_string(),
        }))
    }

    fn leaderboard<L: LedgerStore + ?Sized>(
        &self,
        ledger: &L,
    ) -> Result<CommandOutcome, CommandError> {
        let top = ledger.top_n(self.config.leaderboard_size)?;
        if top.is_empty() {
            return Ok(CommandOutcome::reply("no identities recorded yet"));
        }

        let mut text = format!("ranking (top {})", self.config.leaderboard_size);
        for (rank, record) in top.iter().enumerate() {
            let _ = write!(text, "\n{}. {} - {} points", rank + 1, record.name, record.balance);
        }
        Ok(CommandOutcome::reply(text))
    }

    fn grant<L: LedgerStore + ?Sized>(
        &self,
        caller: &str,
        command: &ParsedCommand,
        ledger: &L,
    ) -> Result<CommandOutcome, CommandError> {
        let admin = Self::caller_record(caller, ledger)?;
        if !admin.is_admin {
            return Err(CommandError::Unauthorized {
                command: CommandKind::Grant.token(),
            });
        }

        let malformed = || CommandError::Malformed {
            usage: CommandKind::Grant.usage(),
        };
        let [target, amount] = command.args.as_slice() else {
            return Err(malformed());
        };
        let amount = parse_amount(amount).ok_or_else(malformed)?;

        let record = ledger.update_existing(target, &|_| Ok(RecordUpdate::credit(amount)))?;

        info!(admin = caller, target = %target, amount, balance = record.balance, "Points granted");
        Ok(CommandOutcome::broadcast(OutboundEvent::status(format!(
            "{} granted {} points to {} (balance now {})",
            caller, amount, record.name, record.balance
        ))))
    }

    fn analytics<L: LedgerStore + ?Sized>(
        &self,
        ledger: &L,
    ) -> Result<CommandOutcome, CommandError> {
        let all = ledger.all()?;
        if all.is_empty() {
            return Ok(CommandOutcome::reply("no identities recorded yet"));
        }

        let count = all.len();
        let total: i128 = all.values().map(|r| i128::from(r.balance)).sum();
        let mean = total / count as i128;
        Ok(CommandOutcome::reply(format!(
            "users: {} | total points: {} | mean points: {}",
            count, total, mean
        )))
    }

    fn minigame<L: LedgerStore + ?Sized>(
        &self,
        caller: &str,
        ledger: &L,
    ) -> Result<CommandOutcome, CommandError> {
        let player = self.dice.roll_d6();
        let house = self.dice.roll_d6();
        let reward = self.config.roll_win_reward;
        let penalty = self.config.roll_loss_penalty;

        let (verdict, record) = match player.cmp(&house) {
            std::cmp::Ordering::Greater => (
                format!("you win {} points", reward),
                ledger.update_existing(caller, &|_| Ok(RecordUpdate::credit(reward)))?,
            ),
            std::cmp::Ordering::Less => {
                let record = ledger.update_existing(caller, &|record| {
                    let loss = penalty.min(record.balance.max(0));
                    Ok(RecordUpdate::debit(loss))
                })?;
                ("the house wins".to_string(), record)
            }
            std::cmp::Ordering::Equal => ("tie, nothing changes".to_string(), Self::caller_record(caller, ledger)?),
        };

        debug!(caller, player, house, balance = record.balance, "Dice rolled");
        Ok(CommandOutcome::reply(format!(
            "you rolled {}, the house rolled {}: {} (balance {})",
            player, house, verdict, record.balance
        )))
    }

    /// Rock-paper-scissors for a stake. The caller must be able to cover the
    /// stake whatever the outcome.
    fn wager<L: LedgerStore + ?Sized>(
        &self,
        caller: &str,
        command: &ParsedCommand,
        ledger: &L,
    ) -> Result<CommandOutcome, CommandError> {
        let malformed = || CommandError::Malformed {
            usage: CommandKind::Wager.usage(),
        };
        let [pick, stake] = command.args.as_slice() else {
            return Err(malformed());
        };
        let pick: Hand = pick.parse().map_err(|_| malformed())?;
        let stake = parse_amount(stake)
            .filter(|stake| *stake > 0)
            .ok_or_else(malformed)?;
        Self::caller_record(caller, ledger)?;

        let house = self.dice.throw_hand();
        let result = pick.versus(house);
        let delta = match result {
            Ordering::Greater => stake,
            Ordering::Less => -stake,
            Ordering::Equal => 0,
        };
        let record = ledger.update_existing(caller, &|record| {
            if record.balance < stake {
                return Err(LedgerError::InsufficientFunds {
                    required: stake,
                    available: record.balance,
                });
            }
            Ok(RecordUpdate::credit(delta))
        })?;

        let verdict = match result {
            Ordering::Greater => format!("you win {} points", stake),
            Ordering::Less => format!("you lose {} points", stake),
            Ordering::Equal => "tie, nothing changes".to_string(),
        };
        debug!(caller, %pick, %house, stake, balance = record.balance, "Wager settled");
        Ok(CommandOutcome::reply(format!(
            "you threw {}, the house threw {}: {} (balance {})",
            pick, house, verdict, record.balance
        )))
    }

    fn help() -> CommandOutcome {
        let mut text = String::from("commands");
        for kind in CommandKind::ALL {
            let _ = write!(text, "\n{} - {}", kind.usage(), kind.summary());
        }
        CommandOutcome::reply(text)
    }
}

/// Non-negative integer literal made of ASCII digits only.
fn parse_amount(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}
