//! # Multiverse Chat Test Suite
//!
//! Cross-component tests that wire real ledgers, registries, dispatchers and
//! session controllers together.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── fixtures.rs       # Test world: controller + connected clients
//! │   ├── session_flows.rs  # End-to-end chat scenarios
//! │   └── concurrency.rs    # Races between connections
//! └── benches/
//!     └── chat_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mc-tests
//! cargo test -p mc-tests integration::concurrency
//! cargo bench -p mc-tests
//! ```

pub mod integration;
