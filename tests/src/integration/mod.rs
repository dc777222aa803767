//! Cross-component integration tests.

pub mod fixtures;

mod concurrency;
mod session_flows;
