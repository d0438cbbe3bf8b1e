//! Order domain entity
//!
//! An order is a set of menu items bought with tokens. Each line keeps the
//! price at placement time so later menu edits never change a past order.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::menu_item::{MenuItem, MenuItemId};
use super::user::UserId;
use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Declined,
    Completed,
}

impl OrderStatus {
    /// Allowed moves: pending -> approved | declined | completed, approved -> completed
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Approved)
                | (OrderStatus::Pending, OrderStatus::Declined)
                | (OrderStatus::Pending, OrderStatus::Completed)
                | (OrderStatus::Approved, OrderStatus::Completed)
        )
    }

    pub fn transition_to(self, next: OrderStatus) -> Result<OrderStatus, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Declined | OrderStatus::Completed)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Approved => write!(f, "approved"),
            OrderStatus::Declined => write!(f, "declined"),
            OrderStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "approved" => Ok(OrderStatus::Approved),
            "declined" => Ok(OrderStatus::Declined),
            "completed" => Ok(OrderStatus::Completed),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

/// Who placed the order, as shown to staff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderOwner {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub employee_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub id: i64,
    pub menu_item: MenuItem,
    pub quantity: i32,
    pub tokens_per_item: i32,
}

impl OrderItem {
    pub fn line_total(&self) -> i32 {
        self.tokens_per_item * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub owner: OrderOwner,
    pub status: OrderStatus,
    pub total_tokens: i32,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Sum of the line totals; equals `total_tokens` for orders placed by this service
    pub fn items_total(&self) -> i32 {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

/// One requested line: which item and how many
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OrderLine {
    pub menu_item_id: MenuItemId,
    pub quantity: i32,
}

/// A requested line after pricing against the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub menu_item_id: MenuItemId,
    pub quantity: i32,
    pub tokens_per_item: i32,
}

/// Everything the repository needs to place an order atomically
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub lines: Vec<PricedLine>,
    pub total_tokens: i32,
    /// Day used to decide which token period the balance belongs to
    pub today: NaiveDate,
    pub placed_at: DateTime<Utc>,
}

/// Price the requested lines and compute the order total.
///
/// Unknown items, unavailable items and non-positive quantities are rejected.
pub fn price_lines(
    lines: &[OrderLine],
    menu: &[MenuItem],
) -> Result<(Vec<PricedLine>, i32), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::Validation("No items provided".to_string()));
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut total: i32 = 0;

    for line in lines {
        if line.quantity < 1 {
            return Err(DomainError::Validation(format!(
                "Quantity for menu item {} must be at least 1",
                line.menu_item_id
            )));
        }

        let item = menu
            .iter()
            .find(|m| m.id == line.menu_item_id)
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "Menu item with id {} does not exist",
                    line.menu_item_id
                ))
            })?;

        if !item.is_available {
            return Err(DomainError::Validation(format!(
                "Menu item '{}' is not available",
                item.name
            )));
        }

        total = item
            .price
            .checked_mul(line.quantity)
            .and_then(|t| total.checked_add(t))
            .ok_or_else(|| DomainError::Validation("Order total is too large".to_string()))?;

        priced.push(PricedLine {
            menu_item_id: item.id,
            quantity: line.quantity,
            tokens_per_item: item.price,
        });
    }

    Ok((priced, total))
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
    /// Matches username or employee code (case-insensitive substring) or the numeric order id
    pub search: Option<String>,
    pub limit: Option<u64>,
}
