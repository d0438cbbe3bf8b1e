//! Test utilities
//!
//! In-memory port implementations and test fixtures for unit testing.
//! Router tests in `integration_tests` build the full `AppState` on top of
//! the in-memory store.

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
