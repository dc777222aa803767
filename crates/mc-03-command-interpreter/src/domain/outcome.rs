//! What a command produces.

use shared_types::OutboundEvent;

/// Where one outbound event goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Only to the caller's connection.
    Reply(OutboundEvent),
    /// To every live connection, optionally skipping the caller.
    Broadcast {
        event: OutboundEvent,
        exclude_caller: bool,
    },
}

/// Follow-up work that spans more than the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Move the caller's identity to `new_name` in the ledger and registry.
    Rename { new_name: String },
}

/// Result of executing one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    pub deliveries: Vec<Delivery>,
    pub effect: Option<Effect>,
}

impl CommandOutcome {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            deliveries: vec![Delivery::Reply(OutboundEvent::result(text))],
            effect: None,
        }
    }

    pub fn broadcast(event: OutboundEvent) -> Self {
        Self {
            deliveries: vec![Delivery::Broadcast {
                event,
                exclude_caller: false,
            }],
            effect: None,
        }
    }

    pub fn effect(effect: Effect) -> Self {
        Self {
            deliveries: Vec::new(),
            effect: Some(effect),
        }
    }
}
