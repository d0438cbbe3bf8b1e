//! Clock port
//!
//! Token periods, the assign window and dashboard ranges all depend on
//! "today", so services read time through this trait.

use chrono::{DateTime, NaiveDate, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day in UTC
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
