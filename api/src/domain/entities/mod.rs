//! Domain entities
//!
//! Pure domain models representing core business concepts.
//! These are separate from the SeaORM entities in the `entity` module.

pub mod menu_item;
pub mod order;
pub mod session;
pub mod token;
pub mod user;

pub use menu_item::{MenuItem, MenuItemId, MenuItemUpdate, NewMenuItem};
pub use order::{
    price_lines, NewOrder, Order, OrderFilter, OrderId, OrderItem, OrderLine, OrderOwner,
    OrderStatus,
};
pub use session::{NewSession, Session};
pub use token::{
    effective_balance, month_start, parse_month, DistributionFilter, NewShiftAllocation,
    NewTokenDistribution, ShiftAllocation, ShiftAllocationId, ShiftTokenLimits,
    TokenDistribution, TokenDistributionId,
};
pub use user::{
    validate_employee_code, validate_username, NewUser, Role, Shift, User, UserFilter, UserId,
    UserUpdate,
};
