//! Session configuration.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum characters in one chat line (after trimming).
    pub max_message_chars: usize,
    /// Maximum line breaks in one chat line.
    pub max_newlines: usize,
    /// Maximum characters in a display name.
    pub max_name_chars: usize,
    /// Pending inbound events per connection before the transport backs off.
    pub inbox_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_message_chars: 500,
            max_newlines: 10,
            max_name_chars: 32,
            inbox_capacity: 64,
        }
    }
}
