//! User domain entity
//!
//! A canteen user. Employees and guests hold a monthly token balance; admins
//! and staff run the canteen and never spend tokens.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::token::effective_balance;
use crate::error::DomainError;

/// Unique identifier for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Employee,
    Guest,
}

impl Role {
    /// Roles that order food and hold a token balance
    pub const TOKEN_HOLDERS: [Role; 2] = [Role::Employee, Role::Guest];

    pub fn uses_tokens(&self) -> bool {
        matches!(self, Role::Employee | Role::Guest)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Staff => write!(f, "staff"),
            Role::Employee => write!(f, "employee"),
            Role::Guest => write!(f, "guest"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "employee" => Ok(Role::Employee),
            "guest" => Ok(Role::Guest),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Work shift used to bucket token allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    Day,
    Mid,
    Night,
}

impl Shift {
    pub const ALL: [Shift; 3] = [Shift::Day, Shift::Mid, Shift::Night];
}

impl std::fmt::Display for Shift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shift::Day => write!(f, "day"),
            Shift::Mid => write!(f, "mid"),
            Shift::Night => write!(f, "night"),
        }
    }
}

impl std::str::FromStr for Shift {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(Shift::Day),
            "mid" => Ok(Shift::Mid),
            "night" => Ok(Shift::Night),
            _ => Err(format!("Unknown shift: {}", s)),
        }
    }
}

/// A registered canteen user
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub work_shift: Shift,
    /// External employee number, unique when present
    pub employee_code: Option<String>,
    /// Stored balance; only meaningful inside `token_period`
    pub token_balance: i32,
    pub token_period: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Spendable tokens as of `today`.
    ///
    /// A balance stamped with an earlier month has lapsed and reads as zero.
    /// Admin and staff never hold tokens.
    pub fn current_tokens(&self, today: NaiveDate) -> i32 {
        if !self.role.uses_tokens() {
            return 0;
        }
        effective_balance(self.token_balance, self.token_period, today)
    }

    /// Tokens as reported by the API: `None` for roles that don't use tokens
    pub fn reported_tokens(&self, today: NaiveDate) -> Option<i32> {
        self.role
            .uses_tokens()
            .then(|| self.current_tokens(today))
    }
}

/// Data needed to create a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub work_shift: Shift,
    pub employee_code: Option<String>,
    pub token_period: NaiveDate,
}

/// Partial update of a user's profile fields
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub work_shift: Option<Shift>,
    /// `Some(None)` clears the code
    pub employee_code: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Which users a listing or allocation applies to
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Empty means every role
    pub roles: Vec<Role>,
    pub shift: Option<Shift>,
}

impl UserFilter {
    pub fn roles(roles: &[Role]) -> Self {
        Self {
            roles: roles.to_vec(),
            shift: None,
        }
    }

    pub fn with_shift(mut self, shift: Shift) -> Self {
        self.shift = Some(shift);
        self
    }

    pub fn matches(&self, user: &User) -> bool {
        (self.roles.is_empty() || self.roles.contains(&user.role))
            && self.shift.map_or(true, |s| s == user.work_shift)
    }
}

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\w.@+-]{1,150}$").expect("valid username regex"))
}

/// Usernames are 1-150 letters, digits and `@.+-_`
pub fn validate_username(username: &str) -> Result<(), DomainError> {
    if username_pattern().is_match(username) {
        Ok(())
    } else {
        Err(DomainError::Validation(
            "Username may contain only letters, digits and @/./+/-/_ (max 150 characters)"
                .to_string(),
        ))
    }
}

/// Employee codes are at most 20 characters
pub fn validate_employee_code(code: &str) -> Result<(), DomainError> {
    if code.is_empty() || code.chars().count() > 20 {
        return Err(DomainError::Validation(
            "Employee code must be between 1 and 20 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{date, test_user};

    #[test]
    fn role_from_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("STAFF".parse::<Role>().unwrap(), Role::Staff);
        assert_eq!("Guest".parse::<Role>().unwrap(), Role::Guest);
        assert!("chef".parse::<Role>().is_err());
    }

    #[test]
    fn role_display_round_trips() {
        for role in [Role::Admin, Role::Staff, Role::Employee, Role::Guest] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn only_employees_and_guests_use_tokens() {
        assert!(Role::Employee.uses_tokens());
        assert!(Role::Guest.uses_tokens());
        assert!(!Role::Admin.uses_tokens());
        assert!(!Role::Staff.uses_tokens());
    }

    #[test]
    fn shift_from_str() {
        assert_eq!("night".parse::<Shift>().unwrap(), Shift::Night);
        assert!("evening".parse::<Shift>().is_err());
    }

    #[test]
    fn current_tokens_within_period() {
        let mut user = test_user("alice", Role::Employee);
        user.token_balance = 40;
        user.token_period = date(2026, 3, 1);

        assert_eq!(user.current_tokens(date(2026, 3, 17)), 40);
    }

    #[test]
    fn current_tokens_lapse_in_new_month() {
        let mut user = test_user("alice", Role::Employee);
        user.token_balance = 40;
        user.token_period = date(2026, 2, 1);

        assert_eq!(user.current_tokens(date(2026, 3, 1)), 0);
    }

    #[test]
    fn staff_report_no_tokens() {
        let mut user = test_user("bob", Role::Staff);
        user.token_balance = 99;

        assert_eq!(user.current_tokens(user.token_period), 0);
        assert_eq!(user.reported_tokens(user.token_period), None);
    }

    #[test]
    fn full_name_trims_missing_parts() {
        let mut user = test_user("carol", Role::Guest);
        user.first_name = "Carol".into();
        user.last_name = String::new();

        assert_eq!(user.full_name(), "Carol");
    }

    #[test]
    fn filter_matches_role_and_shift() {
        let mut user = test_user("dave", Role::Employee);
        user.work_shift = Shift::Night;

        assert!(UserFilter::default().matches(&user));
        assert!(UserFilter::roles(&Role::TOKEN_HOLDERS).matches(&user));
        assert!(UserFilter::roles(&[Role::Employee])
            .with_shift(Shift::Night)
            .matches(&user));
        assert!(!UserFilter::roles(&[Role::Employee])
            .with_shift(Shift::Day)
            .matches(&user));
        assert!(!UserFilter::roles(&[Role::Staff]).matches(&user));
    }

    #[test]
    fn username_validation() {
        assert!(validate_username("jane.doe+canteen@corp").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }
}
