//! Mock implementations of port traits
//!
//! `InMemoryStore` keeps every table behind one lock and implements all
//! repository ports, so an order placement sees the same balances the token
//! operations write. Constraint behavior mirrors the PostgreSQL schema.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::domain::entities::{
    effective_balance, month_start, DistributionFilter, MenuItem, MenuItemId, MenuItemUpdate,
    NewMenuItem, NewOrder, NewSession, NewShiftAllocation, NewTokenDistribution, NewUser, Order,
    OrderFilter, OrderId, OrderItem, OrderOwner, OrderStatus, Role, Session, Shift,
    ShiftAllocation, ShiftAllocationId, TokenDistribution, TokenDistributionId, User, UserFilter,
    UserId, UserUpdate,
};
use crate::domain::entities::order::PricedLine;
use crate::domain::ports::{
    Clock, MenuRepository, OrderRepository, SessionRepository, TokenRepository, UserRepository,
};
use crate::error::DomainError;

// ============================================================================
// In-Memory Store
// ============================================================================

#[derive(Debug, Clone)]
struct StoredOrder {
    id: i64,
    user_id: UserId,
    status: OrderStatus,
    total_tokens: i32,
    lines: Vec<(i64, PricedLine)>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredDistribution {
    id: i64,
    user_id: UserId,
    tokens_allocated: i32,
    allocation_month: NaiveDate,
}

#[derive(Default)]
struct StoreData {
    last_id: i64,
    users: BTreeMap<i64, User>,
    sessions: HashMap<String, Session>,
    menu: BTreeMap<i64, MenuItem>,
    orders: BTreeMap<i64, StoredOrder>,
    shift_allocations: BTreeMap<i64, ShiftAllocation>,
    distributions: BTreeMap<i64, StoredDistribution>,
}

impl StoreData {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn hydrate(&self, order: &StoredOrder) -> Order {
        let owner = self
            .users
            .get(&order.user_id.0)
            .map(|u| OrderOwner {
                username: u.username.clone(),
                first_name: u.first_name.clone(),
                last_name: u.last_name.clone(),
                employee_code: u.employee_code.clone(),
            })
            .unwrap_or_else(|| OrderOwner {
                username: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                employee_code: None,
            });

        let items = order
            .lines
            .iter()
            .filter_map(|(id, line)| {
                self.menu.get(&line.menu_item_id.0).map(|m| OrderItem {
                    id: *id,
                    menu_item: m.clone(),
                    quantity: line.quantity,
                    tokens_per_item: line.tokens_per_item,
                })
            })
            .collect();

        Order {
            id: OrderId(order.id),
            user_id: order.user_id,
            owner,
            status: order.status,
            total_tokens: order.total_tokens,
            items,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }

    fn distribution(&self, stored: &StoredDistribution) -> TokenDistribution {
        TokenDistribution {
            id: TokenDistributionId(stored.id),
            user_id: stored.user_id,
            username: self
                .users
                .get(&stored.user_id.0)
                .map(|u| u.username.clone())
                .unwrap_or_default(),
            tokens_allocated: stored.tokens_allocated,
            allocation_month: stored.allocation_month,
        }
    }

    fn upsert_distribution(&mut self, user_id: UserId, tokens: i32, month: NaiveDate) -> i64 {
        if let Some(existing) = self
            .distributions
            .values_mut()
            .find(|d| d.user_id == user_id && d.allocation_month == month)
        {
            existing.tokens_allocated = tokens;
            return existing.id;
        }

        let id = self.next_id();
        self.distributions.insert(
            id,
            StoredDistribution {
                id,
                user_id,
                tokens_allocated: tokens,
                allocation_month: month,
            },
        );
        id
    }

    fn set_balance(&mut self, user_id: UserId, tokens: i32, month: NaiveDate) {
        if let Some(user) = self.users.get_mut(&user_id.0) {
            user.token_balance = tokens;
            user.token_period = month;
        }
    }

    fn allocate(&mut self, filter: &UserFilter, tokens: i32, month: NaiveDate) -> u64 {
        let ids: Vec<UserId> = self
            .users
            .values()
            .filter(|u| filter.matches(u))
            .map(|u| u.id)
            .collect();

        for id in &ids {
            self.set_balance(*id, tokens, month);
            self.upsert_distribution(*id, tokens, month);
        }
        ids.len() as u64
    }

    fn check_user_unique(
        &self,
        username: &str,
        employee_code: Option<&str>,
        except: Option<UserId>,
    ) -> Result<(), DomainError> {
        for user in self.users.values().filter(|u| Some(u.id) != except) {
            if user.username == username {
                return Err(DomainError::AlreadyExists(format!(
                    "Username {} is taken",
                    username
                )));
            }
            if employee_code.is_some() && user.employee_code.as_deref() == employee_code {
                return Err(DomainError::AlreadyExists(
                    "Employee code is already assigned".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn check_allocation_unique(
        &self,
        shift: Shift,
        month: NaiveDate,
        except: Option<i64>,
    ) -> Result<(), DomainError> {
        let taken = self
            .shift_allocations
            .values()
            .any(|a| a.shift == shift && a.allocation_month == month && Some(a.id.0) != except);
        if taken {
            return Err(DomainError::AlreadyExists(format!(
                "Allocation for {} shift in {} already exists",
                shift, month
            )));
        }
        Ok(())
    }
}

/// In-memory implementation of every repository port
#[derive(Default, Clone)]
pub struct InMemoryStore {
    data: Arc<RwLock<StoreData>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user as-is (keeping its timestamps and balance); a zero id is replaced
    pub fn insert_user(&self, mut user: User) -> User {
        let mut data = self.data.write().unwrap();
        if user.id.0 == 0 {
            user.id = UserId(data.next_id());
        }
        data.users.insert(user.id.0, user.clone());
        user
    }

    /// Insert a menu item as-is; a zero id is replaced
    pub fn insert_menu_item(&self, mut item: MenuItem) -> MenuItem {
        let mut data = self.data.write().unwrap();
        if item.id.0 == 0 {
            item.id = MenuItemId(data.next_id());
        }
        data.menu.insert(item.id.0, item.clone());
        item
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        self.data.read().unwrap().users.get(&id.0).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.data.read().unwrap().orders.len()
    }

    pub fn session_count(&self) -> usize {
        self.data.read().unwrap().sessions.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        Ok(self.data.read().unwrap().users.get(&id.0).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let data = self.data.read().unwrap();
        Ok(data
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, DomainError> {
        let data = self.data.read().unwrap();
        let mut users: Vec<User> = data
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| {
            (a.work_shift.to_string(), &a.username).cmp(&(b.work_shift.to_string(), &b.username))
        });
        Ok(users)
    }

    async fn create(&self, new_user: &NewUser) -> Result<User, DomainError> {
        let mut data = self.data.write().unwrap();
        data.check_user_unique(
            &new_user.username,
            new_user.employee_code.as_deref(),
            None,
        )?;

        let user = User {
            id: UserId(data.next_id()),
            username: new_user.username.clone(),
            password_hash: new_user.password_hash.clone(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            email: new_user.email.clone(),
            role: new_user.role,
            work_shift: new_user.work_shift,
            employee_code: new_user.employee_code.clone(),
            token_balance: 0,
            token_period: new_user.token_period,
            is_active: true,
            created_at: Utc::now(),
        };
        data.users.insert(user.id.0, user.clone());

        Ok(user)
    }

    async fn update(&self, id: UserId, update: &UserUpdate) -> Result<User, DomainError> {
        let mut data = self.data.write().unwrap();
        let mut user = data
            .users
            .get(&id.0)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("User {} not found", id)))?;

        if let Some(username) = &update.username {
            user.username = username.clone();
        }
        if let Some(first_name) = &update.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &update.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(shift) = update.work_shift {
            user.work_shift = shift;
        }
        if let Some(code) = &update.employee_code {
            user.employee_code = code.clone();
        }
        if let Some(is_active) = update.is_active {
            user.is_active = is_active;
        }

        data.check_user_unique(&user.username, user.employee_code.as_deref(), Some(id))?;
        data.users.insert(id.0, user.clone());

        Ok(user)
    }

    async fn set_password_hash(&self, id: UserId, hash: &str) -> Result<(), DomainError> {
        let mut data = self.data.write().unwrap();
        let user = data
            .users
            .get_mut(&id.0)
            .ok_or_else(|| DomainError::NotFound(format!("User {} not found", id)))?;
        user.password_hash = hash.to_string();
        Ok(())
    }

    async fn delete(&self, id: UserId) -> Result<bool, DomainError> {
        let mut data = self.data.write().unwrap();
        if data.users.remove(&id.0).is_none() {
            return Ok(false);
        }
        data.sessions.retain(|_, s| s.user_id != id);
        data.orders.retain(|_, o| o.user_id != id);
        data.distributions.retain(|_, d| d.user_id != id);
        Ok(true)
    }

    async fn count(&self, created_before: Option<DateTime<Utc>>) -> Result<u64, DomainError> {
        let data = self.data.read().unwrap();
        Ok(data
            .users
            .values()
            .filter(|u| created_before.map_or(true, |before| u.created_at < before))
            .count() as u64)
    }

    async fn count_by_role_and_shift(&self) -> Result<Vec<(Role, Shift, u64)>, DomainError> {
        let data = self.data.read().unwrap();
        let mut counts: Vec<(Role, Shift, u64)> = Vec::new();
        for user in data.users.values() {
            match counts
                .iter_mut()
                .find(|(r, s, _)| *r == user.role && *s == user.work_shift)
            {
                Some(entry) => entry.2 += 1,
                None => counts.push((user.role, user.work_shift, 1)),
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn create(&self, session: &NewSession) -> Result<Session, DomainError> {
        let mut data = self.data.write().unwrap();
        if !data.users.contains_key(&session.user_id.0) {
            return Err(DomainError::Conflict("Session owner does not exist".to_string()));
        }

        let created = Session {
            token_hash: session.token_hash.clone(),
            user_id: session.user_id,
            created_at: session.created_at,
            expires_at: session.expires_at,
        };
        data.sessions
            .insert(created.token_hash.clone(), created.clone());
        Ok(created)
    }

    async fn find_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, DomainError> {
        let data = self.data.read().unwrap();
        Ok(data
            .sessions
            .get(token_hash)
            .filter(|s| !s.is_expired(now))
            .cloned())
    }

    async fn delete(&self, token_hash: &str) -> Result<(), DomainError> {
        self.data.write().unwrap().sessions.remove(token_hash);
        Ok(())
    }

    async fn delete_for_user(&self, user_id: UserId) -> Result<u64, DomainError> {
        let mut data = self.data.write().unwrap();
        let before = data.sessions.len();
        data.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - data.sessions.len()) as u64)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        let mut data = self.data.write().unwrap();
        let before = data.sessions.len();
        data.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - data.sessions.len()) as u64)
    }
}

#[async_trait]
impl MenuRepository for InMemoryStore {
    async fn list(&self, available_only: bool) -> Result<Vec<MenuItem>, DomainError> {
        let data = self.data.read().unwrap();
        Ok(data
            .menu
            .values()
            .filter(|m| !available_only || m.is_available)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: MenuItemId) -> Result<Option<MenuItem>, DomainError> {
        Ok(self.data.read().unwrap().menu.get(&id.0).cloned())
    }

    async fn find_many(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>, DomainError> {
        let data = self.data.read().unwrap();
        Ok(data
            .menu
            .values()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn create(&self, item: &NewMenuItem) -> Result<MenuItem, DomainError> {
        let mut data = self.data.write().unwrap();
        let created = MenuItem {
            id: MenuItemId(data.next_id()),
            name: item.name.trim().to_string(),
            description: item.description.clone(),
            price: item.price,
            is_available: item.is_available,
            created_at: Utc::now(),
        };
        data.menu.insert(created.id.0, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: MenuItemId,
        update: &MenuItemUpdate,
    ) -> Result<Option<MenuItem>, DomainError> {
        let mut data = self.data.write().unwrap();
        let Some(item) = data.menu.get_mut(&id.0) else {
            return Ok(None);
        };
        update.apply(item);
        item.name = item.name.trim().to_string();
        Ok(Some(item.clone()))
    }

    async fn delete(&self, id: MenuItemId) -> Result<bool, DomainError> {
        let mut data = self.data.write().unwrap();
        let referenced = data
            .orders
            .values()
            .any(|o| o.lines.iter().any(|(_, l)| l.menu_item_id == id));
        if referenced {
            return Err(DomainError::Conflict(format!(
                "Menu item {} is part of existing orders; mark it unavailable instead",
                id
            )));
        }
        Ok(data.menu.remove(&id.0).is_some())
    }

    async fn count(&self, created_since: Option<DateTime<Utc>>) -> Result<u64, DomainError> {
        let data = self.data.read().unwrap();
        Ok(data
            .menu
            .values()
            .filter(|m| created_since.map_or(true, |since| m.created_at >= since))
            .count() as u64)
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn place(&self, order: &NewOrder) -> Result<Order, DomainError> {
        if order.lines.is_empty() {
            return Err(DomainError::Validation("No items provided".to_string()));
        }

        // One write guard covers the check and the deduction
        let mut data = self.data.write().unwrap();
        let user = data
            .users
            .get(&order.user_id.0)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("User {} not found", order.user_id)))?;

        let available = effective_balance(user.token_balance, user.token_period, order.today);
        if order.total_tokens > available {
            return Err(DomainError::InsufficientTokens {
                required: order.total_tokens,
                available,
            });
        }

        let id = data.next_id();
        let lines = order
            .lines
            .iter()
            .map(|line| (data.next_id(), *line))
            .collect::<Vec<_>>();
        let stored = StoredOrder {
            id,
            user_id: order.user_id,
            status: OrderStatus::Pending,
            total_tokens: order.total_tokens,
            lines,
            created_at: order.placed_at,
            updated_at: order.placed_at,
        };
        data.orders.insert(id, stored.clone());
        data.set_balance(
            order.user_id,
            available - order.total_tokens,
            month_start(order.today),
        );

        Ok(data.hydrate(&stored))
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, DomainError> {
        let data = self.data.read().unwrap();
        Ok(data.orders.get(&id.0).map(|o| data.hydrate(o)))
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError> {
        let data = self.data.read().unwrap();
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut orders: Vec<&StoredOrder> = data
            .orders
            .values()
            .filter(|o| filter.user_id.map_or(true, |id| o.user_id == id))
            .filter(|o| {
                let Some(term) = &search else {
                    return true;
                };
                if term.parse::<i64>().ok() == Some(o.id) {
                    return true;
                }
                data.users.get(&o.user_id.0).map_or(false, |u| {
                    u.username.to_lowercase().contains(term.as_str())
                        || u
                            .employee_code
                            .as_deref()
                            .map_or(false, |c| c.to_lowercase().contains(term.as_str()))
                })
            })
            .collect();

        orders.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        if let Some(limit) = filter.limit {
            orders.truncate(limit as usize);
        }

        Ok(orders.into_iter().map(|o| data.hydrate(o)).collect())
    }

    async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>, DomainError> {
        let mut data = self.data.write().unwrap();
        let Some(order) = data.orders.get_mut(&id.0) else {
            return Ok(None);
        };
        if order.status != from {
            return Ok(None);
        }
        order.status = to;
        order.updated_at = at;
        let order = order.clone();

        Ok(Some(data.hydrate(&order)))
    }

    async fn delete(&self, id: OrderId) -> Result<bool, DomainError> {
        Ok(self.data.write().unwrap().orders.remove(&id.0).is_some())
    }

    async fn count_by_status(
        &self,
        status: OrderStatus,
        created_on: Option<NaiveDate>,
    ) -> Result<u64, DomainError> {
        let data = self.data.read().unwrap();
        Ok(data
            .orders
            .values()
            .filter(|o| o.status == status)
            .filter(|o| created_on.map_or(true, |day| o.created_at.date_naive() == day))
            .count() as u64)
    }

    async fn completed_totals_by_day(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, i64)>, DomainError> {
        let data = self.data.read().unwrap();
        let mut totals: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for order in data
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Completed)
        {
            let day = order.created_at.date_naive();
            if day >= from && day <= to {
                *totals.entry(day).or_default() += i64::from(order.total_tokens);
            }
        }
        Ok(totals.into_iter().collect())
    }
}

#[async_trait]
impl TokenRepository for InMemoryStore {
    async fn allocate(
        &self,
        filter: &UserFilter,
        tokens: i32,
        month: NaiveDate,
    ) -> Result<u64, DomainError> {
        Ok(self.data.write().unwrap().allocate(filter, tokens, month))
    }

    async fn reset_all(&self, month: NaiveDate) -> Result<u64, DomainError> {
        let mut data = self.data.write().unwrap();
        for user in data.users.values_mut() {
            user.token_balance = 0;
            user.token_period = month;
        }
        Ok(data.users.len() as u64)
    }

    async fn list_shift_allocations(&self) -> Result<Vec<ShiftAllocation>, DomainError> {
        let data = self.data.read().unwrap();
        let mut allocations: Vec<ShiftAllocation> =
            data.shift_allocations.values().cloned().collect();
        allocations.sort_by(|a, b| {
            b.allocation_month
                .cmp(&a.allocation_month)
                .then_with(|| a.shift.to_string().cmp(&b.shift.to_string()))
        });
        Ok(allocations)
    }

    async fn find_shift_allocation(
        &self,
        id: ShiftAllocationId,
    ) -> Result<Option<ShiftAllocation>, DomainError> {
        Ok(self
            .data
            .read()
            .unwrap()
            .shift_allocations
            .get(&id.0)
            .cloned())
    }

    async fn create_shift_allocation(
        &self,
        allocation: &NewShiftAllocation,
    ) -> Result<(ShiftAllocation, u64), DomainError> {
        let mut data = self.data.write().unwrap();
        data.check_allocation_unique(allocation.shift, allocation.allocation_month, None)?;

        let created = ShiftAllocation {
            id: ShiftAllocationId(data.next_id()),
            shift: allocation.shift,
            tokens_per_user: allocation.tokens_per_user,
            allocation_month: allocation.allocation_month,
        };
        data.shift_allocations.insert(created.id.0, created.clone());
        let updated = data.allocate(
            &UserFilter::roles(&[Role::Employee]).with_shift(allocation.shift),
            allocation.tokens_per_user,
            allocation.allocation_month,
        );

        Ok((created, updated))
    }

    async fn update_shift_allocation(
        &self,
        id: ShiftAllocationId,
        allocation: &NewShiftAllocation,
    ) -> Result<Option<(ShiftAllocation, u64)>, DomainError> {
        let mut data = self.data.write().unwrap();
        if !data.shift_allocations.contains_key(&id.0) {
            return Ok(None);
        }
        data.check_allocation_unique(allocation.shift, allocation.allocation_month, Some(id.0))?;

        let saved = ShiftAllocation {
            id,
            shift: allocation.shift,
            tokens_per_user: allocation.tokens_per_user,
            allocation_month: allocation.allocation_month,
        };
        data.shift_allocations.insert(id.0, saved.clone());
        let updated = data.allocate(
            &UserFilter::roles(&[Role::Employee]).with_shift(allocation.shift),
            allocation.tokens_per_user,
            allocation.allocation_month,
        );

        Ok(Some((saved, updated)))
    }

    async fn delete_shift_allocation(&self, id: ShiftAllocationId) -> Result<bool, DomainError> {
        Ok(self
            .data
            .write()
            .unwrap()
            .shift_allocations
            .remove(&id.0)
            .is_some())
    }

    async fn list_distributions(
        &self,
        filter: &DistributionFilter,
    ) -> Result<Vec<TokenDistribution>, DomainError> {
        let data = self.data.read().unwrap();
        let mut rows: Vec<&StoredDistribution> = data
            .distributions
            .values()
            .filter(|d| filter.user_id.map_or(true, |id| d.user_id == id))
            .filter(|d| filter.month.map_or(true, |m| d.allocation_month == m))
            .collect();
        rows.sort_by(|a, b| {
            b.allocation_month
                .cmp(&a.allocation_month)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(rows.into_iter().map(|d| data.distribution(d)).collect())
    }

    async fn find_distribution(
        &self,
        id: TokenDistributionId,
    ) -> Result<Option<TokenDistribution>, DomainError> {
        let data = self.data.read().unwrap();
        Ok(data.distributions.get(&id.0).map(|d| data.distribution(d)))
    }

    async fn assign_distribution(
        &self,
        distribution: &NewTokenDistribution,
    ) -> Result<TokenDistribution, DomainError> {
        let mut data = self.data.write().unwrap();
        if !data.users.contains_key(&distribution.user_id.0) {
            return Err(DomainError::NotFound(format!(
                "User {} not found",
                distribution.user_id
            )));
        }

        let id = data.upsert_distribution(
            distribution.user_id,
            distribution.tokens_allocated,
            distribution.allocation_month,
        );
        data.set_balance(
            distribution.user_id,
            distribution.tokens_allocated,
            distribution.allocation_month,
        );

        let stored = data.distributions[&id].clone();
        Ok(data.distribution(&stored))
    }

    async fn update_distribution(
        &self,
        id: TokenDistributionId,
        distribution: &NewTokenDistribution,
    ) -> Result<Option<TokenDistribution>, DomainError> {
        let mut data = self.data.write().unwrap();
        if !data.distributions.contains_key(&id.0) {
            return Ok(None);
        }
        if !data.users.contains_key(&distribution.user_id.0) {
            return Err(DomainError::Conflict(format!(
                "User {} does not exist",
                distribution.user_id
            )));
        }
        let clash = data.distributions.values().any(|d| {
            d.id != id.0
                && d.user_id == distribution.user_id
                && d.allocation_month == distribution.allocation_month
        });
        if clash {
            return Err(DomainError::AlreadyExists(
                "A distribution for this user and month already exists".to_string(),
            ));
        }

        let stored = StoredDistribution {
            id: id.0,
            user_id: distribution.user_id,
            tokens_allocated: distribution.tokens_allocated,
            allocation_month: distribution.allocation_month,
        };
        data.distributions.insert(id.0, stored.clone());
        data.set_balance(
            distribution.user_id,
            distribution.tokens_allocated,
            distribution.allocation_month,
        );

        Ok(Some(data.distribution(&stored)))
    }

    async fn delete_distribution(&self, id: TokenDistributionId) -> Result<bool, DomainError> {
        Ok(self
            .data
            .write()
            .unwrap()
            .distributions
            .remove(&id.0)
            .is_some())
    }
}

// ============================================================================
// Fixed Clock
// ============================================================================

/// Clock frozen at a settable instant
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Noon UTC on the given day
    pub fn on(day: NaiveDate) -> Self {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).expect("valid time");
        Self::at(day.and_time(noon).and_utc())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap()
    }
}
