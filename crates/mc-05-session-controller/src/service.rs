//! # Session Controller Service

use dashmap::DashMap;
use mc_01_ledger_store::{LedgerError, LedgerStore};
use mc_02_identity_registry::{ClaimOutcome, IdentityRegistry, RegistryError};
use mc_03_command_interpreter::{
    parse_command, CommandError, CommandInterpreter, CommandOutcome, Delivery, DiceSource,
    EconomyConfig, Effect,
};
use mc_04_dispatcher::{Dispatcher, Outbox};
use parking_lot::Mutex;
use shared_types::{ConnectionId, InboundEvent, OutboundEvent, RecordUpdate};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::domain::errors::SessionError;
use crate::domain::policy::MessagePolicy;
use crate::domain::state::SessionState;

/// Collaborators injected into the controller.
pub struct SessionDependencies<L, D, R> {
    pub ledger: Arc<L>,
    pub registry: Arc<IdentityRegistry>,
    pub dispatcher: Arc<D>,
    pub dice: R,
}

/// Drives every connection through its lifecycle.
pub struct SessionController<L, D, R>
where
    L: LedgerStore,
    D: Dispatcher,
    R: DiceSource,
{
    ledger: Arc<L>,
    registry: Arc<IdentityRegistry>,
    dispatcher: Arc<D>,
    interpreter: CommandInterpreter<R>,
    policy: MessagePolicy,
    config: SessionConfig,
    sessions: DashMap<ConnectionId, SessionState>,
    /// Global ordering lock for renames.
    rename_lock: Mutex<()>,
}

impl<L, D, R> SessionController<L, D, R>
where
    L: LedgerStore,
    D: Dispatcher,
    R: DiceSource,
{
    pub fn new(
        deps: SessionDependencies<L, D, R>,
        config: SessionConfig,
        economy: EconomyConfig,
    ) -> Self {
        let policy = MessagePolicy {
            max_chars: config.max_message_chars,
            max_newlines: config.max_newlines,
            max_name_chars: config.max_name_chars,
        };
        Self {
            ledger: deps.ledger,
            registry: deps.registry,
            dispatcher: deps.dispatcher,
            interpreter: CommandInterpreter::new(economy, deps.dice),
            policy,
            config,
            sessions: DashMap::new(),
            rename_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn registry(&self) -> &Arc<IdentityRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<D> {
        &self.dispatcher
    }

    /// Current state of `conn`. Unknown connections report `Closed`.
    pub fn state(&self, conn: &ConnectionId) -> SessionState {
        self.sessions
            .get(conn)
            .map(|s| s.value().clone())
            .unwrap_or(SessionState::Closed)
    }

    /// Number of connections that have not closed.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Open a connection: register its outbox and enter `Unidentified`.
    pub fn connect(&self, conn: ConnectionId) -> Outbox {
        let outbox = self.dispatcher.register(conn);
        self.on_connect(conn);
        outbox
    }

    /// Process one inbound event for `conn`.
    ///
    /// Callers must not run two `handle` calls for the same connection
    /// concurrently; `SessionWorker` guarantees this.
    pub fn handle(&self, conn: ConnectionId, event: InboundEvent) -> Result<(), SessionError> {
        debug!(connection_id = %conn, event = event.label(), "Inbound event");

        match event {
            InboundEvent::Connect => {
                self.on_connect(conn);
                Ok(())
            }
            InboundEvent::Disconnect => {
                self.on_disconnect(conn);
                Ok(())
            }
            InboundEvent::ClaimName { name } => {
                self.ensure_open(&conn)?;
                self.on_claim(conn, name.trim());
                Ok(())
            }
            InboundEvent::Message { text } => {
                let state = self.ensure_open(&conn)?;
                match state {
                    SessionState::Active { name } => {
                        self.on_message(conn, &name, &text);
                    }
                    _ => {
                        self.dispatcher.reply_to(
                            &conn,
                            OutboundEvent::result("set a display name before chatting"),
                        );
                    }
                }
                Ok(())
            }
        }
    }

    fn ensure_open(&self, conn: &ConnectionId) -> Result<SessionState, SessionError> {
        match self.state(conn) {
            SessionState::Closed => Err(SessionError::Closed(*conn)),
            open => Ok(open),
        }
    }

    fn on_connect(&self, conn: ConnectionId) {
        self.sessions
            .entry(conn)
            .or_insert(SessionState::Unidentified);
        info!(connection_id = %conn, "Connection opened");
    }

    fn on_disconnect(&self, conn: ConnectionId) {
        if self.sessions.remove(&conn).is_none() {
            debug!(connection_id = %conn, "Disconnect for closed connection ignored");
            return;
        }
        self.dispatcher.unregister(&conn);

        if let Some(name) = self.registry.release(&conn) {
            let online = self.registry.active_count();
            self.dispatcher.broadcast(
                OutboundEvent::status(format!("{} left ({} online)", name, online)),
                None,
            );
            info!(connection_id = %conn, name = %name, online, "Identity departed");
        } else {
            info!(connection_id = %conn, "Connection closed before claiming a name");
        }
    }

    fn on_claim(&self, conn: ConnectionId, name: &str) {
        if let Err(violation) = self.policy.check_name(name) {
            self.dispatcher.reply_to(
                &conn,
                OutboundEvent::ClaimRejected {
                    reason: violation.to_string(),
                },
            );
            return;
        }

        let previous = match self.registry.claim(conn, name) {
            Ok(ClaimOutcome::Claimed { previous }) => previous,
            Ok(ClaimOutcome::AlreadyClaimedBySelf) => {
                self.dispatcher.reply_to(
                    &conn,
                    OutboundEvent::ClaimAccepted {
                        name: name.to_string(),
                    },
                );
                return;
            }
            Err(RegistryError::NameTaken(_)) | Err(RegistryError::NotBound) => {
                debug!(connection_id = %conn, name, "Claim rejected, name in use");
                self.dispatcher.reply_to(
                    &conn,
                    OutboundEvent::ClaimRejected {
                        reason: format!("the name '{}' is already in use", name),
                    },
                );
                return;
            }
        };

        if let Err(e) = self.ledger.upsert(name, RecordUpdate::none()) {
            error!(connection_id = %conn, name, error = %e, "Ledger unavailable during claim");
            self.registry.release(&conn);
            if let Some(prev) = &previous {
                if self.registry.claim(conn, prev).is_err() {
                    warn!(connection_id = %conn, name = %prev, "Previous name lost after failed claim");
                }
            }
            self.dispatcher.reply_to(
                &conn,
                OutboundEvent::ClaimRejected {
                    reason: CommandError::from(e).to_string(),
                },
            );
            return;
        }

        self.sessions.insert(
            conn,
            SessionState::Active {
                name: name.to_string(),
            },
        );
        self.dispatcher.reply_to(
            &conn,
            OutboundEvent::ClaimAccepted {
                name: name.to_string(),
            },
        );

        if let Some(prev) = &previous {
            self.dispatcher.broadcast(
                OutboundEvent::status(format!("{} left", prev)),
                Some(&conn),
            );
        }
        let online = self.registry.active_count();
        self.dispatcher.broadcast(
            OutboundEvent::status(format!("{} joined ({} online)", name, online)),
            Some(&conn),
        );
        info!(connection_id = %conn, name, online, "Identity claimed");
    }

    /// Limits apply to the raw text; the trimmed text is what gets parsed and
    /// broadcast.
    fn on_message(&self, conn: ConnectionId, name: &str, raw: &str) {
        let text = raw.trim();
        if text.is_empty() {
            return;
        }
        if let Err(violation) = self.policy.check_message(raw) {
            debug!(connection_id = %conn, name, reason = %violation, "Message rejected");
            self.dispatcher
                .reply_to(&conn, OutboundEvent::result(violation.to_string()));
            return;
        }

        match parse_command(text) {
            Some(command) => {
                match self.interpreter.execute(name, &command, self.ledger.as_ref()) {
                    Ok(outcome) => self.apply_outcome(conn, name, outcome),
                    Err(e) => self.reply_error(conn, command.kind.name(), e),
                }
            }
            None => self.on_plain_message(conn, name, text),
        }
    }

    fn on_plain_message(&self, conn: ConnectionId, name: &str, text: &str) {
        self.dispatcher
            .broadcast(OutboundEvent::chat(name, text), None);

        let reward = self.interpreter.config().reward_per_message;
        let credited = self.ledger.update_existing(name, &|record| {
            Ok(if record.is_admin {
                RecordUpdate::none()
            } else {
                RecordUpdate::credit(reward)
            })
        });
        let credited = match credited {
            Err(LedgerError::NotFound(_)) => self.ledger.upsert(name, RecordUpdate::credit(reward)),
            other => other,
        };
        if let Err(e) = credited {
            self.reply_error(conn, "chat", CommandError::from(e));
        }
    }

    fn apply_outcome(&self, conn: ConnectionId, name: &str, outcome: CommandOutcome) {
        for delivery in outcome.deliveries {
            match delivery {
                Delivery::Reply(event) => {
                    self.dispatcher.reply_to(&conn, event);
                }
                Delivery::Broadcast {
                    event,
                    exclude_caller,
                } => {
                    let exclude = exclude_caller.then_some(&conn);
                    self.dispatcher.broadcast(event, exclude);
                }
            }
        }

        if let Some(Effect::Rename { new_name }) = outcome.effect {
            if let Err(e) = self.rename(conn, name, &new_name) {
                self.reply_error(conn, "rename", e);
            }
        }
    }

    /// Reserve → ledger rename → registry rebind, under the ordering lock.
    fn rename(&self, conn: ConnectionId, old: &str, new: &str) -> Result<(), CommandError> {
        if let Err(violation) = self.policy.check_name(new) {
            return Err(CommandError::NameTaken(format!("{} ({})", new, violation)));
        }

        {
            let _ordering = self.rename_lock.lock();

            self.registry.reserve(conn, new).map_err(|e| match e {
                RegistryError::NameTaken(n) => CommandError::NameTaken(n),
                RegistryError::NotBound => CommandError::Internal("rename without binding".into()),
            })?;

            let has_ticket = match self.ledger.get(old) {
                Ok(Some(record)) => record.has_ticket,
                Ok(None) => false,
                Err(e) => {
                    self.registry.cancel_reservation(&conn);
                    return Err(e.into());
                }
            };
            if !has_ticket {
                self.registry.cancel_reservation(&conn);
                return Err(CommandError::NoTicket);
            }

            if let Err(e) = self
                .ledger
                .rename(old, new, RecordUpdate::none().with_ticket(false))
            {
                self.registry.cancel_reservation(&conn);
                return Err(e.into());
            }

            if let Err(e) = self.registry.rebind(conn, new) {
                error!(connection_id = %conn, old, new, error = %e, "Rebind failed after ledger rename");
                if let Err(undo) = self
                    .ledger
                    .rename(new, old, RecordUpdate::none().with_ticket(true))
                {
                    error!(old, new, error = %undo, "Could not undo ledger rename");
                }
                self.registry.cancel_reservation(&conn);
                return Err(CommandError::Internal(e.to_string()));
            }

            self.sessions.insert(
                conn,
                SessionState::Active {
                    name: new.to_string(),
                },
            );
        }

        info!(connection_id = %conn, old, new, "Identity renamed");
        self.dispatcher.reply_to(
            &conn,
            OutboundEvent::IdentityChanged {
                old: old.to_string(),
                new: new.to_string(),
            },
        );
        self.dispatcher.reply_to(
            &conn,
            OutboundEvent::result(format!("you are now known as {}", new)),
        );
        self.dispatcher.broadcast(
            OutboundEvent::status(format!("{} is now known as {}", old, new)),
            Some(&conn),
        );
        Ok(())
    }

    fn reply_error(&self, conn: ConnectionId, command: &str, err: CommandError) {
        match &err {
            CommandError::Internal(detail) => {
                error!(connection_id = %conn, command, detail = %detail, "Command failed internally");
            }
            other => {
                debug!(connection_id = %conn, command, reason = %other, "Command rejected");
            }
        }
        self.dispatcher
            .reply_to(&conn, OutboundEvent::result(err.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_01_ledger_store::{InMemoryKVStore, InMemoryLedger};
    use mc_03_command_interpreter::ScriptedDice;
    use mc_04_dispatcher::InMemoryDispatcher;

    type Controller = SessionController<InMemoryLedger, InMemoryDispatcher, ScriptedDice>;

    fn controller() -> Controller {
        SessionController::new(
            SessionDependencies {
                ledger: Arc::new(InMemoryLedger::open(InMemoryKVStore::new()).unwrap()),
                registry: Arc::new(IdentityRegistry::new()),
                dispatcher: Arc::new(InMemoryDispatcher::new()),
                dice: ScriptedDice::default(),
            },
            SessionConfig::default(),
            EconomyConfig::default(),
        )
    }

    fn texts(outbox: &mut Outbox) -> Vec<OutboundEvent> {
        outbox.drain().into_iter().map(|e| (*e).clone()).collect()
    }

    fn claim(c: &Controller, name: &str) -> (ConnectionId, Outbox) {
        let conn = ConnectionId::new();
        let mut outbox = c.connect(conn);
        c.handle(conn, InboundEvent::ClaimName { name: name.into() })
            .unwrap();
        outbox.drain();
        (conn, outbox)
    }

    fn say(c: &Controller, conn: ConnectionId, text: &str) {
        c.handle(conn, InboundEvent::Message { text: text.into() })
            .unwrap();
    }

    #[test]
    fn test_connect_starts_unidentified() {
        let c = controller();
        let conn = ConnectionId::new();
        let _outbox = c.connect(conn);

        assert_eq!(c.state(&conn), SessionState::Unidentified);
    }

    #[test]
    fn test_message_before_claim_is_not_processed() {
        let c = controller();
        let conn = ConnectionId::new();
        let mut outbox = c.connect(conn);

        say(&c, conn, "hello");

        assert_eq!(
            texts(&mut outbox),
            vec![OutboundEvent::result("set a display name before chatting")]
        );
        assert!(c.ledger().all().unwrap().is_empty());
    }

    #[test]
    fn test_claim_creates_record_and_announces() {
        let c = controller();
        let conn = ConnectionId::new();
        let mut outbox = c.connect(conn);

        c.handle(conn, InboundEvent::ClaimName { name: " ada ".into() })
            .unwrap();

        assert_eq!(
            texts(&mut outbox),
            vec![OutboundEvent::ClaimAccepted { name: "ada".into() }]
        );
        assert_eq!(c.state(&conn), SessionState::Active { name: "ada".into() });
        assert!(c.ledger().get("ada").unwrap().is_some());
    }

    #[test]
    fn test_join_notice_goes_to_other_connections_only() {
        let c = controller();
        let (_ada, mut ada_out) = claim(&c, "ada");
        let conn = ConnectionId::new();
        let mut bob_out = c.connect(conn);

        c.handle(conn, InboundEvent::ClaimName { name: "bob".into() })
            .unwrap();

        assert_eq!(
            texts(&mut bob_out),
            vec![OutboundEvent::ClaimAccepted { name: "bob".into() }]
        );
        assert_eq!(
            texts(&mut ada_out),
            vec![OutboundEvent::status("bob joined (2 online)")]
        );
    }

    #[test]
    fn test_claim_of_live_name_is_rejected() {
        let c = controller();
        let _ada = claim(&c, "ada");
        let conn = ConnectionId::new();
        let mut outbox = c.connect(conn);

        c.handle(conn, InboundEvent::ClaimName { name: "ada".into() })
            .unwrap();

        assert!(matches!(
            texts(&mut outbox).as_slice(),
            [OutboundEvent::ClaimRejected { .. }]
        ));
        assert_eq!(c.state(&conn), SessionState::Unidentified);
    }

    #[test]
    fn test_reclaim_with_new_name_announces_departure() {
        let c = controller();
        let (ada, _ada_out) = claim(&c, "ada");
        let (_bob, mut bob_out) = claim(&c, "bob");

        c.handle(ada, InboundEvent::ClaimName { name: "eve".into() })
            .unwrap();

        assert_eq!(
            texts(&mut bob_out),
            vec![
                OutboundEvent::status("ada left"),
                OutboundEvent::status("eve joined (2 online)"),
            ]
        );
        assert!(!c.registry().is_claimed("ada"));
    }

    #[test]
    fn test_plain_message_broadcasts_and_rewards() {
        let c = controller();
        let (ada, mut ada_out) = claim(&c, "ada");
        let (_bob, mut bob_out) = claim(&c, "bob");
        ada_out.drain();

        say(&c, ada, "hello world");

        let expected = vec![OutboundEvent::chat("ada", "hello world")];
        assert_eq!(texts(&mut ada_out), expected);
        assert_eq!(texts(&mut bob_out), expected);
        assert_eq!(c.ledger().get("ada").unwrap().unwrap().balance, 1);
    }

    #[test]
    fn test_admin_is_not_rewarded() {
        let c = controller();
        c.ledger()
            .upsert("root", RecordUpdate::none().with_admin(true))
            .unwrap();
        let (root, _out) = claim(&c, "root");

        say(&c, root, "announcement");

        assert_eq!(c.ledger().get("root").unwrap().unwrap().balance, 0);
    }

    #[test]
    fn test_policy_violation_is_private_and_unrewarded() {
        let c = controller();
        let (ada, mut ada_out) = claim(&c, "ada");
        let (_bob, mut bob_out) = claim(&c, "bob");
        ada_out.drain();

        say(&c, ada, &"x".repeat(501));
        say(&c, ada, &"line\n".repeat(12));

        let events = texts(&mut ada_out);
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| matches!(e, OutboundEvent::CommandResult { .. })));
        assert!(texts(&mut bob_out).is_empty());
        assert_eq!(c.ledger().get("ada").unwrap().unwrap().balance, 0);
    }

    #[test]
    fn test_length_limit_counts_untrimmed_text() {
        let c = controller();
        let (ada, mut ada_out) = claim(&c, "ada");

        say(&c, ada, &format!("{}   ", "x".repeat(500)));
        say(&c, ada, &format!("{}{}", "x".repeat(10), "\n".repeat(11)));

        let events = texts(&mut ada_out);
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| matches!(e, OutboundEvent::CommandResult { .. })));
        assert_eq!(c.ledger().get("ada").unwrap().unwrap().balance, 0);
    }

    #[test]
    fn test_broadcast_text_is_trimmed() {
        let c = controller();
        let (ada, mut ada_out) = claim(&c, "ada");

        say(&c, ada, "  hello  \n");

        assert_eq!(
            texts(&mut ada_out),
            vec![OutboundEvent::chat("ada", "hello")]
        );
    }

    #[test]
    fn test_blank_message_is_ignored() {
        let c = controller();
        let (ada, mut ada_out) = claim(&c, "ada");

        say(&c, ada, "   ");

        assert!(texts(&mut ada_out).is_empty());
    }

    #[test]
    fn test_unknown_bang_token_is_plain_chat() {
        let c = controller();
        let (ada, mut ada_out) = claim(&c, "ada");

        say(&c, ada, "!dance");

        assert_eq!(
            texts(&mut ada_out),
            vec![OutboundEvent::chat("ada", "!dance")]
        );
        assert_eq!(c.ledger().get("ada").unwrap().unwrap().balance, 1);
    }

    #[test]
    fn test_command_reply_is_private() {
        let c = controller();
        let (ada, mut ada_out) = claim(&c, "ada");
        let (_bob, mut bob_out) = claim(&c, "bob");
        ada_out.drain();

        say(&c, ada, "!balance");

        assert_eq!(
            texts(&mut ada_out),
            vec![OutboundEvent::result("ada: 0 points | inventory: empty")]
        );
        assert!(texts(&mut bob_out).is_empty());
    }

    #[test]
    fn test_rename_flow() {
        let c = controller();
        c.ledger()
            .upsert("ada", RecordUpdate::credit(1200))
            .unwrap();
        let (ada, mut ada_out) = claim(&c, "ada");
        let (_bob, mut bob_out) = claim(&c, "bob");
        ada_out.drain();

        say(&c, ada, "!buy rename-ticket");
        ada_out.drain();
        say(&c, ada, "!rename lovelace");

        assert_eq!(
            texts(&mut ada_out),
            vec![
                OutboundEvent::IdentityChanged {
                    old: "ada".into(),
                    new: "lovelace".into()
                },
                OutboundEvent::result("you are now known as lovelace"),
            ]
        );
        assert_eq!(
            texts(&mut bob_out),
            vec![OutboundEvent::status("ada is now known as lovelace")]
        );

        let record = c.ledger().get("lovelace").unwrap().unwrap();
        assert_eq!(record.balance, 200);
        assert!(!record.has_ticket);
        assert!(c.ledger().get("ada").unwrap().is_none());
        assert_eq!(c.registry().name_of(&ada).as_deref(), Some("lovelace"));
        assert!(!c.registry().is_claimed("ada"));
        assert_eq!(
            c.state(&ada),
            SessionState::Active {
                name: "lovelace".into()
            }
        );
    }

    #[test]
    fn test_rename_to_live_name_keeps_ticket() {
        let c = controller();
        c.ledger()
            .upsert("ada", RecordUpdate::none().with_ticket(true))
            .unwrap();
        let (ada, mut ada_out) = claim(&c, "ada");
        let _bob = claim(&c, "bob");
        ada_out.drain();

        say(&c, ada, "!rename bob");

        assert_eq!(
            texts(&mut ada_out),
            vec![OutboundEvent::result("the name 'bob' is already in use")]
        );
        assert!(c.ledger().get("ada").unwrap().unwrap().has_ticket);
        assert_eq!(c.registry().name_of(&ada).as_deref(), Some("ada"));
    }

    #[test]
    fn test_grant_is_broadcast_to_everyone() {
        let c = controller();
        c.ledger()
            .upsert("root", RecordUpdate::none().with_admin(true))
            .unwrap();
        let (root, mut root_out) = claim(&c, "root");
        let (_bob, mut bob_out) = claim(&c, "bob");
        root_out.drain();

        say(&c, root, "!grant bob 40");

        let expected = vec![OutboundEvent::status(
            "root granted 40 points to bob (balance now 40)",
        )];
        assert_eq!(texts(&mut root_out), expected);
        assert_eq!(texts(&mut bob_out), expected);
    }

    #[test]
    fn test_disconnect_releases_name_and_closes() {
        let c = controller();
        let (ada, _ada_out) = claim(&c, "ada");
        let (_bob, mut bob_out) = claim(&c, "bob");

        c.handle(ada, InboundEvent::Disconnect).unwrap();

        assert_eq!(c.state(&ada), SessionState::Closed);
        assert!(!c.registry().is_claimed("ada"));
        assert_eq!(
            texts(&mut bob_out),
            vec![OutboundEvent::status("ada left (1 online)")]
        );
        assert_eq!(
            c.handle(ada, InboundEvent::Message { text: "hi".into() }),
            Err(SessionError::Closed(ada))
        );
        // Second disconnect is a no-op.
        c.handle(ada, InboundEvent::Disconnect).unwrap();
        assert!(texts(&mut bob_out).is_empty());
    }

    #[test]
    fn test_record_survives_disconnect() {
        let c = controller();
        let (ada, _out) = claim(&c, "ada");
        say(&c, ada, "one");
        say(&c, ada, "two");
        c.handle(ada, InboundEvent::Disconnect).unwrap();

        let (_again, _out) = claim(&c, "ada");

        assert_eq!(c.ledger().get("ada").unwrap().unwrap().balance, 2);
    }
}
