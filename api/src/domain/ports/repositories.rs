//! Repository port traits
//!
//! These traits define the interface for data persistence.
//! Implementations are provided by adapters (e.g., PostgreSQL).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::entities::{
    DistributionFilter, MenuItem, MenuItemId, MenuItemUpdate, NewMenuItem, NewOrder, NewSession,
    NewShiftAllocation, NewTokenDistribution, NewUser, Order, OrderFilter, OrderId, OrderStatus,
    Role, Session, Shift, ShiftAllocation, ShiftAllocationId, TokenDistribution,
    TokenDistributionId, User, UserFilter, UserId, UserUpdate,
};
use crate::error::DomainError;

/// Repository for User entities
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError>;

    /// Find a user by username (exact match)
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;

    /// List users matching the filter, ordered by shift then username
    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, DomainError>;

    /// Create a new user
    async fn create(&self, user: &NewUser) -> Result<User, DomainError>;

    /// Update profile fields
    async fn update(&self, id: UserId, update: &UserUpdate) -> Result<User, DomainError>;

    /// Replace the stored password hash
    async fn set_password_hash(&self, id: UserId, hash: &str) -> Result<(), DomainError>;

    /// Delete a user; returns false if it did not exist
    async fn delete(&self, id: UserId) -> Result<bool, DomainError>;

    /// Count users, optionally only those created before a point in time
    async fn count(&self, created_before: Option<DateTime<Utc>>) -> Result<u64, DomainError>;

    /// Head count grouped by role and shift
    async fn count_by_role_and_shift(&self) -> Result<Vec<(Role, Shift, u64)>, DomainError>;
}

/// Repository for login sessions
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &NewSession) -> Result<Session, DomainError>;

    /// Find a session that has not expired at `now`
    async fn find_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, DomainError>;

    async fn delete(&self, token_hash: &str) -> Result<(), DomainError>;

    /// Remove every session of a user (password change, deactivation)
    async fn delete_for_user(&self, user_id: UserId) -> Result<u64, DomainError>;

    /// Remove sessions that expired before `now`
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, DomainError>;
}

/// Repository for MenuItem entities
#[async_trait]
pub trait MenuRepository: Send + Sync {
    /// List menu items, newest last; optionally only those available to order
    async fn list(&self, available_only: bool) -> Result<Vec<MenuItem>, DomainError>;

    async fn find_by_id(&self, id: MenuItemId) -> Result<Option<MenuItem>, DomainError>;

    /// Fetch several items at once; unknown IDs are simply absent
    async fn find_many(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>, DomainError>;

    async fn create(&self, item: &NewMenuItem) -> Result<MenuItem, DomainError>;

    /// Returns None if the item does not exist
    async fn update(
        &self,
        id: MenuItemId,
        update: &MenuItemUpdate,
    ) -> Result<Option<MenuItem>, DomainError>;

    /// Delete an item; fails with `Conflict` if orders reference it
    async fn delete(&self, id: MenuItemId) -> Result<bool, DomainError>;

    /// Count items, optionally only those created at or after a point in time
    async fn count(&self, created_since: Option<DateTime<Utc>>) -> Result<u64, DomainError>;
}

/// Repository for Order entities
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Place an order and deduct its total from the user's balance atomically.
    ///
    /// Fails with `InsufficientTokens` (and changes nothing) if the user's
    /// effective balance on `order.today` is below `order.total_tokens`.
    async fn place(&self, order: &NewOrder) -> Result<Order, DomainError>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, DomainError>;

    /// List orders, newest first
    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError>;

    /// Move an order from `from` to `to`.
    ///
    /// Returns None if the order is missing or no longer in `from`.
    async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>, DomainError>;

    async fn delete(&self, id: OrderId) -> Result<bool, DomainError>;

    /// Count orders in a status, optionally only those created on a given day
    async fn count_by_status(
        &self,
        status: OrderStatus,
        created_on: Option<NaiveDate>,
    ) -> Result<u64, DomainError>;

    /// Token totals of completed orders per day in `[from, to]`; days without orders are absent
    async fn completed_totals_by_day(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, i64)>, DomainError>;
}

/// Repository for token balances and allocation history
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Set the balance of every matching user to `tokens` for `month` and
    /// record a distribution row for each. Returns the number of users updated.
    async fn allocate(
        &self,
        filter: &UserFilter,
        tokens: i32,
        month: NaiveDate,
    ) -> Result<u64, DomainError>;

    /// Zero every balance and stamp `month`. Returns the number of users updated.
    async fn reset_all(&self, month: NaiveDate) -> Result<u64, DomainError>;

    // Shift allocations

    async fn list_shift_allocations(&self) -> Result<Vec<ShiftAllocation>, DomainError>;

    async fn find_shift_allocation(
        &self,
        id: ShiftAllocationId,
    ) -> Result<Option<ShiftAllocation>, DomainError>;

    /// Insert an allocation and apply it to the shift's employees in one transaction
    async fn create_shift_allocation(
        &self,
        allocation: &NewShiftAllocation,
    ) -> Result<(ShiftAllocation, u64), DomainError>;

    /// Replace an allocation and re-apply it; None if it does not exist
    async fn update_shift_allocation(
        &self,
        id: ShiftAllocationId,
        allocation: &NewShiftAllocation,
    ) -> Result<Option<(ShiftAllocation, u64)>, DomainError>;

    async fn delete_shift_allocation(&self, id: ShiftAllocationId) -> Result<bool, DomainError>;

    // Per-user distributions

    async fn list_distributions(
        &self,
        filter: &DistributionFilter,
    ) -> Result<Vec<TokenDistribution>, DomainError>;

    async fn find_distribution(
        &self,
        id: TokenDistributionId,
    ) -> Result<Option<TokenDistribution>, DomainError>;

    /// Upsert the (user, month) row and sync the user's balance to it
    async fn assign_distribution(
        &self,
        distribution: &NewTokenDistribution,
    ) -> Result<TokenDistribution, DomainError>;

    /// Rewrite a row by ID and sync the user's balance; None if it does not exist
    async fn update_distribution(
        &self,
        id: TokenDistributionId,
        distribution: &NewTokenDistribution,
    ) -> Result<Option<TokenDistribution>, DomainError>;

    async fn delete_distribution(&self, id: TokenDistributionId) -> Result<bool, DomainError>;
}
