//! Test fixtures
//!
//! Factory functions for creating test data with sensible defaults.
//! Each fixture function creates a valid entity that can be customized.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::domain::entities::{
    MenuItem, MenuItemId, NewMenuItem, NewUser, Role, Shift, User, UserId,
};

/// Shorthand for a calendar date; panics on an invalid date
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// A UTC instant on the given day and hour
pub fn datetime(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid test datetime")
}

/// Create a test user with default values; the id is assigned on insert
pub fn test_user(username: &str, role: Role) -> User {
    User {
        id: UserId(0),
        username: username.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        first_name: "Test".to_string(),
        last_name: username.to_string(),
        email: format!("{}@canteen.test", username),
        role,
        work_shift: Shift::Day,
        employee_code: None,
        token_balance: 0,
        token_period: date(2026, 1, 1),
        is_active: true,
        created_at: datetime(2026, 1, 1, 8),
    }
}

/// Create a test user on a shift holding `tokens` for the month of `period`
pub fn test_user_with_tokens(
    username: &str,
    role: Role,
    shift: Shift,
    tokens: i32,
    period: NaiveDate,
) -> User {
    User {
        work_shift: shift,
        token_balance: tokens,
        token_period: period,
        ..test_user(username, role)
    }
}

/// Create registration data for a user
pub fn test_new_user(username: &str, role: Role, shift: Shift) -> NewUser {
    NewUser {
        username: username.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        first_name: "New".to_string(),
        last_name: username.to_string(),
        email: String::new(),
        role,
        work_shift: shift,
        employee_code: None,
        token_period: date(2026, 1, 1),
    }
}

/// Create an available menu item with a fixed id
pub fn test_menu_item(id: i64, name: &str, price: i32) -> MenuItem {
    MenuItem {
        id: MenuItemId(id),
        name: name.to_string(),
        description: format!("{} from the test kitchen", name),
        price,
        is_available: true,
        created_at: datetime(2026, 1, 1, 8),
    }
}

pub fn test_new_menu_item(name: &str, price: i32) -> NewMenuItem {
    NewMenuItem {
        name: name.to_string(),
        description: String::new(),
        price,
        is_available: true,
    }
}
