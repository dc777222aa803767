//! Chat line policy.

use shared_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("message too long: {length} characters (max {max})")]
    TooLong { length: usize, max: usize },

    #[error("too many line breaks: {count} (max {max})")]
    TooManyLineBreaks { count: usize, max: usize },

    #[error("display name must not be empty")]
    EmptyName,

    #[error("display name too long: {length} characters (max {max})")]
    NameTooLong { length: usize, max: usize },

    #[error("display name must not contain control characters")]
    NameHasControlChars,
}

impl Classify for PolicyViolation {
    fn kind(&self) -> ErrorKind {
        ErrorKind::PolicyViolation
    }
}

/// Limits applied to chat lines and display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagePolicy {
    pub max_chars: usize,
    pub max_newlines: usize,
    pub max_name_chars: usize,
}

impl MessagePolicy {
    pub fn check_message(&self, text: &str) -> Result<(), PolicyViolation> {
        let length = text.chars().count();
        if length > self.max_chars {
            return Err(PolicyViolation::TooLong {
                length,
                max: self.max_chars,
            });
        }
        let count = text.matches('\n').count();
        if count > self.max_newlines {
            return Err(PolicyViolation::TooManyLineBreaks {
                count,
                max: self.max_newlines,
            });
        }
        Ok(())
    }

    pub fn check_name(&self, name: &str) -> Result<(), PolicyViolation> {
        if name.is_empty() {
            return Err(PolicyViolation::EmptyName);
        }
        let length = name.chars().count();
        if length > self.max_name_chars {
            return Err(PolicyViolation::NameTooLong {
                length,
                max: self.max_name_chars,
            });
        }
        if name.chars().any(char::is_control) {
            return Err(PolicyViolation::NameHasControlChars);
        }
        Ok(())
    }
}
