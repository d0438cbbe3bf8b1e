//! Adapters layer
//!
//! Implementations of port traits for external systems.

pub mod clock;
pub mod postgres;

pub use clock::SystemClock;
pub use postgres::{
    run_migrations, PostgresMenuRepository, PostgresOrderRepository, PostgresSessionRepository,
    PostgresTokenRepository, PostgresUserRepository,
};
