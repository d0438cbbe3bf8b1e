//! Token bookkeeping
//!
//! Balances live on the user row as `(token_balance, token_period)`.
//! Shift allocations and per-user distributions are the allocation history.
//! Every month value here is normalized to the first day of its month.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::user::{Shift, UserId};

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

/// Balance spendable on `today` given the stored pair.
///
/// A balance belongs to exactly one month; once that month is over it lapses.
pub fn effective_balance(balance: i32, period: NaiveDate, today: NaiveDate) -> i32 {
    if month_start(period) == month_start(today) {
        balance.max(0)
    } else {
        0
    }
}

/// Parse `YYYY-MM` or `YYYY-MM-DD` into the first day of that month
pub fn parse_month(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let full = if value.len() == 7 {
        format!("{}-01", value)
    } else {
        value.to_string()
    };
    NaiveDate::parse_from_str(&full, "%Y-%m-%d")
        .ok()
        .map(month_start)
}

/// Per-shift monthly token limits used by the bulk assign operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftTokenLimits {
    pub day: i32,
    pub mid: i32,
    pub night: i32,
}

impl ShiftTokenLimits {
    pub fn for_shift(&self, shift: Shift) -> i32 {
        match shift {
            Shift::Day => self.day,
            Shift::Mid => self.mid,
            Shift::Night => self.night,
        }
    }
}

impl Default for ShiftTokenLimits {
    fn default() -> Self {
        Self {
            day: 50,
            mid: 75,
            night: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShiftAllocationId(pub i64);

/// Tokens granted to every employee of a shift for one month
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftAllocation {
    pub id: ShiftAllocationId,
    pub shift: Shift,
    pub tokens_per_user: i32,
    pub allocation_month: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShiftAllocation {
    pub shift: Shift,
    pub tokens_per_user: i32,
    pub allocation_month: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenDistributionId(pub i64);

/// Ledger row: what one user was allocated for one month
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDistribution {
    pub id: TokenDistributionId,
    pub user_id: UserId,
    pub username: String,
    pub tokens_allocated: i32,
    pub allocation_month: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTokenDistribution {
    pub user_id: UserId,
    pub tokens_allocated: i32,
    pub allocation_month: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct DistributionFilter {
    pub user_id: Option<UserId>,
    pub month: Option<NaiveDate>,
}
