/// Lifecycle of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no display name yet.
    Unidentified,
    /// Holds `name` in the identity registry.
    Active { name: String },
    /// Terminal. No further events are accepted or emitted.
    Closed,
}

impl SessionState {
    pub fn name(&self) -> Option<&str> {
        match self {
            SessionState::Active { name } => Some(name),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Unidentified => "unidentified",
            SessionState::Active { .. } => "active",
            SessionState::Closed => "closed",
        }
    }
}
