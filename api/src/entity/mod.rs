//! SeaORM entities
//!
//! One module per table in `migrations/001_initial.sql`. These are persistence
//! models only; the adapters convert them into domain entities.

pub mod menu_items;
pub mod order_items;
pub mod orders;
pub mod sessions;
pub mod shift_allocations;
pub mod token_distributions;
pub mod users;
