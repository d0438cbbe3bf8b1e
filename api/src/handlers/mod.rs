//! HTTP handlers
//!
//! Axum request handlers for the API endpoints.

pub mod auth;
pub mod dashboard;
pub mod menu;
pub mod orders;
pub mod tokens;
pub mod users;

pub use auth::{csrf, login, logout, profile, update_password};
pub use dashboard::{recent_orders, revenue, stats};
pub use menu::{
    available_menu, create_menu_item, delete_menu_item, get_menu_item, list_menu,
    update_menu_item,
};
pub use orders::{
    delete_order, get_order, list_orders, my_orders, place_order, update_order_status,
};
pub use tokens::{
    assign, create_allocation, create_distribution, delete_allocation, delete_distribution,
    get_allocation, get_distribution, list_allocations, list_distributions, refresh, summary,
    update_allocation, update_distribution,
};
pub use users::{create_user, delete_user, get_user, list_users, update_user};
