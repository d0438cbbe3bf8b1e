//! PostgreSQL adapters
//!
//! Implementations of repository traits using SeaORM and PostgreSQL.

pub mod menu_repo;
pub mod order_repo;
pub mod session_repo;
pub mod token_repo;
pub mod user_repo;


use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, SqlErr};

use crate::error::DomainError;

pub use menu_repo::PostgresMenuRepository;
pub use order_repo::PostgresOrderRepository;
pub use session_repo::PostgresSessionRepository;
pub use token_repo::PostgresTokenRepository;
pub use user_repo::PostgresUserRepository;

/// Schema applied at startup; every statement is idempotent
const INITIAL_SCHEMA: &str = include_str!("../../../migrations/001_initial.sql");

/// Map a SeaORM error onto the domain, keeping constraint violations distinguishable
pub(crate) fn db_err(e: DbErr) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => DomainError::AlreadyExists(msg),
        Some(SqlErr::ForeignKeyConstraintViolation(msg)) => DomainError::Conflict(msg),
        _ => DomainError::Database(e.to_string()),
    }
}

/// Create tables and indexes if they are missing
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DomainError> {
    db.execute_unprepared(INITIAL_SCHEMA)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?;
    Ok(())
}
