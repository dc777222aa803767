//! Shared test world: one controller with scripted dice and helpers to drive
//! connections through it.

use std::sync::Arc;

use mc_01_ledger_store::{InMemoryKVStore, InMemoryLedger, LedgerStore};
use mc_02_identity_registry::IdentityRegistry;
use mc_03_command_interpreter::{EconomyConfig, ScriptedDice};
use mc_04_dispatcher::{InMemoryDispatcher, Outbox};
use mc_05_session_controller::{SessionConfig, SessionController, SessionDependencies};
use shared_types::{ConnectionId, InboundEvent, OutboundEvent, RecordUpdate};

pub type TestController<L> = SessionController<L, InMemoryDispatcher, Arc<ScriptedDice>>;

/// A connected client: its id and the events delivered to it.
pub struct Client {
    pub conn: ConnectionId,
    outbox: Outbox,
}

impl Client {
    /// Everything delivered since the last call.
    pub fn events(&mut self) -> Vec<OutboundEvent> {
        self.outbox.drain().into_iter().map(|e| (*e).clone()).collect()
    }

    /// Text of every delivered event that carries one.
    pub fn texts(&mut self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                OutboundEvent::ChatMessage { text, .. }
                | OutboundEvent::StatusNotice { text }
                | OutboundEvent::CommandResult { text } => Some(text),
                OutboundEvent::ClaimRejected { reason } => Some(reason),
                _ => None,
            })
            .collect()
    }

    /// Last `CommandResult` text delivered since the previous drain.
    pub fn last_result(&mut self) -> Option<String> {
        self.events().into_iter().rev().find_map(|event| match event {
            OutboundEvent::CommandResult { text } => Some(text),
            _ => None,
        })
    }
}

pub struct World<L: LedgerStore> {
    pub controller: Arc<TestController<L>>,
    pub dice: Arc<ScriptedDice>,
}

impl World<InMemoryLedger> {
    pub fn in_memory() -> Self {
        let ledger = InMemoryLedger::open(InMemoryKVStore::new()).expect("in-memory ledger");
        Self::with_ledger(Arc::new(ledger))
    }
}

impl<L: LedgerStore> World<L> {
    pub fn with_ledger(ledger: Arc<L>) -> Self {
        let dice = Arc::new(ScriptedDice::default());
        let controller = SessionController::new(
            SessionDependencies {
                ledger,
                registry: Arc::new(IdentityRegistry::new()),
                dispatcher: Arc::new(InMemoryDispatcher::new()),
                dice: Arc::clone(&dice),
            },
            SessionConfig::default(),
            EconomyConfig::default(),
        );
        Self {
            controller: Arc::new(controller),
            dice,
        }
    }

    pub fn ledger(&self) -> &Arc<L> {
        self.controller.ledger()
    }

    pub fn registry(&self) -> &Arc<IdentityRegistry> {
        self.controller.registry()
    }

    /// Open a connection in the `Unidentified` state.
    pub fn connect(&self) -> Client {
        let conn = ConnectionId::new();
        let outbox = self.controller.connect(conn);
        Client { conn, outbox }
    }

    /// Connect and claim `name`, discarding the events that produced.
    pub fn join(&self, name: &str) -> Client {
        let mut client = self.connect();
        self.claim(&client, name);
        client.events();
        client
    }

    pub fn claim(&self, client: &Client, name: &str) {
        self.controller
            .handle(client.conn, InboundEvent::ClaimName { name: name.into() })
            .expect("claim on open connection");
    }

    pub fn say(&self, client: &Client, text: &str) {
        self.controller
            .handle(client.conn, InboundEvent::Message { text: text.into() })
            .expect("message on open connection");
    }

    pub fn disconnect(&self, client: Client) {
        self.controller
            .handle(client.conn, InboundEvent::Disconnect)
            .expect("disconnect never fails");
    }

    /// Create or update a record outside of any session.
    pub fn seed(&self, name: &str, update: RecordUpdate) {
        self.ledger().upsert(name, update).expect("seed record");
    }

    pub fn balance(&self, name: &str) -> Option<i64> {
        self.ledger()
            .get(name)
            .expect("ledger readable")
            .map(|r| r.balance)
    }
}
