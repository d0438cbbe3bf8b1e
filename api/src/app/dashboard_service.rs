//! Dashboard service
//!
//! Read-only figures for the admin dashboard: headline stats, the latest
//! orders and completed-order revenue over a period.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::domain::entities::{Order, OrderFilter, OrderStatus, Role, Shift};
use crate::domain::ports::{Clock, MenuRepository, OrderRepository, UserRepository};
use crate::error::AppError;

pub const DEFAULT_RECENT_LIMIT: u64 = 5;
const MAX_RECENT_LIMIT: u64 = 100;

/// Head count per shift; every shift is always present
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShiftCounts {
    pub day: u64,
    pub mid: u64,
    pub night: u64,
}

impl ShiftCounts {
    fn add(&mut self, shift: Shift, count: u64) {
        match shift {
            Shift::Day => self.day += count,
            Shift::Mid => self.mid += count,
            Shift::Night => self.night += count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShiftData {
    pub employees: ShiftCounts,
    pub guests: ShiftCounts,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub user_growth: f64,
    pub total_menu_items: u64,
    pub new_items_this_week: u64,
    pub todays_revenue: i64,
    pub revenue_change: f64,
    pub pending_orders: u64,
    pub pending_change: i64,
    pub shift_data: ShiftData,
    pub total_staff: u64,
    pub total_guests: u64,
    pub status: &'static str,
}

/// One row of the "recent orders" table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentOrder {
    pub id: i64,
    pub user_name: String,
    pub items: Vec<String>,
    pub total_amount: i32,
    pub status: OrderStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Order> for RecentOrder {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.0,
            user_name: order.owner.username.clone(),
            items: order
                .items
                .iter()
                .map(|i| format!("{}x {}", i.quantity, i.menu_item.name))
                .collect(),
            total_amount: order.total_tokens,
            status: order.status,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenuePoint {
    pub date: NaiveDate,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevenuePeriod {
    #[default]
    Week,
    Month,
    Year,
}

impl RevenuePeriod {
    /// Missing means a week; anything unrecognized means a year
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") | Some("week") => RevenuePeriod::Week,
            Some("month") => RevenuePeriod::Month,
            Some(_) => RevenuePeriod::Year,
        }
    }

    /// Number of points and the days each covers
    fn buckets(self) -> (i64, i64) {
        match self {
            RevenuePeriod::Week => (7, 1),
            RevenuePeriod::Month => (30, 1),
            RevenuePeriod::Year => (12, 30),
        }
    }
}

pub struct DashboardService<UR, MR, OR>
where
    UR: UserRepository + ?Sized,
    MR: MenuRepository + ?Sized,
    OR: OrderRepository + ?Sized,
{
    users: Arc<UR>,
    menu: Arc<MR>,
    orders: Arc<OR>,
    clock: Arc<dyn Clock>,
}

impl<UR, MR, OR> DashboardService<UR, MR, OR>
where
    UR: UserRepository + ?Sized,
    MR: MenuRepository + ?Sized,
    OR: OrderRepository + ?Sized,
{
    pub fn new(users: Arc<UR>, menu: Arc<MR>, orders: Arc<OR>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            menu,
            orders,
            clock,
        }
    }

    pub async fn stats(&self) -> Result<DashboardStats, AppError> {
        let now = self.clock.now();
        let today = now.date_naive();
        let yesterday = today - Duration::days(1);

        let total_users = self.users.count(None).await?;
        let month_old_users = self.users.count(Some(now - Duration::days(30))).await?;

        let total_menu_items = self.menu.count(None).await?;
        let new_items_this_week = self.menu.count(Some(now - Duration::days(7))).await?;

        let daily = self.orders.completed_totals_by_day(yesterday, today).await?;
        let revenue_on = |day: NaiveDate| -> i64 {
            daily
                .iter()
                .filter(|(d, _)| *d == day)
                .map(|(_, amount)| amount)
                .sum()
        };
        let todays_revenue = revenue_on(today);
        let yesterdays_revenue = revenue_on(yesterday);

        let pending_orders = self.orders.count_by_status(OrderStatus::Pending, None).await?;
        let pending_yesterday = self
            .orders
            .count_by_status(OrderStatus::Pending, Some(yesterday))
            .await?;

        let mut shift_data = ShiftData::default();
        let mut total_staff = 0;
        let mut total_guests = 0;
        for (role, shift, count) in self.users.count_by_role_and_shift().await? {
            match role {
                Role::Employee => shift_data.employees.add(shift, count),
                Role::Guest => {
                    shift_data.guests.add(shift, count);
                    total_guests += count;
                }
                Role::Staff => total_staff += count,
                Role::Admin => {}
            }
        }

        Ok(DashboardStats {
            total_users,
            user_growth: percent_change(total_users as f64, month_old_users as f64),
            total_menu_items,
            new_items_this_week,
            todays_revenue,
            revenue_change: percent_change(todays_revenue as f64, yesterdays_revenue as f64),
            pending_orders,
            pending_change: pending_orders as i64 - pending_yesterday as i64,
            shift_data,
            total_staff,
            total_guests,
            status: "success",
        })
    }

    /// Newest orders first; `limit` defaults to 5 and is clamped to 1..=100
    pub async fn recent_orders(&self, limit: Option<u64>) -> Result<Vec<RecentOrder>, AppError> {
        let limit = limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, MAX_RECENT_LIMIT);

        let orders = self
            .orders
            .list(&OrderFilter {
                limit: Some(limit),
                ..Default::default()
            })
            .await?;

        Ok(orders.iter().map(RecentOrder::from).collect())
    }

    /// Completed-order revenue, oldest point first, zero-filled
    pub async fn revenue(&self, period: RevenuePeriod) -> Result<Vec<RevenuePoint>, AppError> {
        let today = self.clock.today();
        let (points, width) = period.buckets();
        let start = today - Duration::days(points * width - 1);

        let totals: HashMap<NaiveDate, i64> = self
            .orders
            .completed_totals_by_day(start, today)
            .await?
            .into_iter()
            .collect();

        Ok((0..points)
            .map(|i| {
                let from = start + Duration::days(i * width);
                let amount = (0..width)
                    .filter_map(|d| totals.get(&(from + Duration::days(d))))
                    .sum();
                RevenuePoint { date: from, amount }
            })
            .collect())
    }
}

/// Percent change from `base` to `current`, one decimal; 0 when `base` is 0
fn percent_change(current: f64, base: f64) -> f64 {
    if base <= 0.0 {
        return 0.0;
    }
    ((current - base) / base * 1000.0).round() / 10.0
}
