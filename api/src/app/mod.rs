//! Application layer
//!
//! Contains use cases and service orchestration.
//! Services coordinate between domain entities and repository ports.

pub mod auth_service;
pub mod dashboard_service;
pub mod menu_service;
pub mod order_service;
pub mod token_service;
pub mod user_service;

pub use auth_service::{generate_token, AuthService};
pub use dashboard_service::{
    DashboardService, DashboardStats, RecentOrder, RevenuePeriod, RevenuePoint,
};
pub use menu_service::MenuService;
pub use order_service::OrderService;
pub use token_service::{HolderTokens, ShiftSummary, TokenPolicy, TokenService};
pub use user_service::{NewAccount, UserService};
