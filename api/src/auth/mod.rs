//! Authentication
//!
//! Cookie or bearer sessions, CSRF double-submit and role guards.

pub mod cookies;
pub mod session;

pub use session::{
    require_admin, require_employee, require_guest, require_staff_or_admin, session_middleware,
    SessionToken,
};
