//! Order service
//!
//! Pricing and placement for employees and guests, and the staff workflow
//! that moves orders through their statuses.

use std::sync::Arc;

use crate::domain::entities::{
    price_lines, MenuItemId, NewOrder, Order, OrderFilter, OrderId, OrderLine, OrderStatus, User,
};
use crate::domain::ports::{Clock, MenuRepository, OrderRepository};
use crate::error::{AppError, DomainError};

/// A user's orders split around the current day
#[derive(Debug, Clone)]
pub struct OrderHistory {
    pub today: Vec<Order>,
    pub past: Vec<Order>,
}

pub struct OrderService<MR, OR>
where
    MR: MenuRepository + ?Sized,
    OR: OrderRepository + ?Sized,
{
    menu: Arc<MR>,
    orders: Arc<OR>,
    clock: Arc<dyn Clock>,
}

impl<MR, OR> OrderService<MR, OR>
where
    MR: MenuRepository + ?Sized,
    OR: OrderRepository + ?Sized,
{
    pub fn new(menu: Arc<MR>, orders: Arc<OR>, clock: Arc<dyn Clock>) -> Self {
        Self {
            menu,
            orders,
            clock,
        }
    }

    /// Price the lines against the current menu and place the order,
    /// deducting its total from the user's balance
    pub async fn place(&self, user: &User, lines: &[OrderLine]) -> Result<Order, AppError> {
        if !user.role.uses_tokens() {
            return Err(AppError::Domain(DomainError::Forbidden(format!(
                "Role {} cannot place orders",
                user.role
            ))));
        }

        let ids: Vec<MenuItemId> = lines.iter().map(|l| l.menu_item_id).collect();
        let menu = self.menu.find_many(&ids).await?;
        let (priced, total_tokens) = price_lines(lines, &menu)?;

        let order = self
            .orders
            .place(&NewOrder {
                user_id: user.id,
                lines: priced,
                total_tokens,
                today: self.clock.today(),
                placed_at: self.clock.now(),
            })
            .await
            .map_err(|e| {
                if let DomainError::InsufficientTokens {
                    required,
                    available,
                } = &e
                {
                    tracing::info!(
                        user_id = %user.id,
                        required,
                        available,
                        "Order rejected for insufficient tokens"
                    );
                }
                e
            })?;

        tracing::info!(
            order_id = %order.id,
            user_id = %user.id,
            total_tokens,
            "Order placed"
        );

        Ok(order)
    }

    /// The user's own orders, newest first, split into today and earlier
    pub async fn history(&self, user: &User) -> Result<OrderHistory, AppError> {
        let today = self.clock.today();
        let orders = self
            .orders
            .list(&OrderFilter {
                user_id: Some(user.id),
                ..Default::default()
            })
            .await?;

        let (today, past) = orders
            .into_iter()
            .partition(|o| o.created_at.date_naive() == today);

        Ok(OrderHistory { today, past })
    }

    /// All orders for staff, optionally narrowed by a search term
    pub async fn list(&self, search: Option<String>) -> Result<Vec<Order>, AppError> {
        Ok(self
            .orders
            .list(&OrderFilter {
                search,
                ..Default::default()
            })
            .await?)
    }

    pub async fn get(&self, id: OrderId) -> Result<Order, AppError> {
        self.orders
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))
    }

    pub async fn delete(&self, id: OrderId) -> Result<(), AppError> {
        if !self.orders.delete(id).await? {
            return Err(AppError::NotFound(format!("Order {} not found", id)));
        }
        tracing::info!(order_id = %id, "Order deleted");
        Ok(())
    }

    /// Move an order to `status`. Tokens are not refunded on decline.
    pub async fn update_status(&self, id: OrderId, status: &str) -> Result<Order, AppError> {
        let current = self.get(id).await?;

        let next: OrderStatus = status.parse().map_err(|_| {
            AppError::Domain(DomainError::InvalidTransition {
                from: current.status.to_string(),
                to: status.to_string(),
            })
        })?;
        current.status.transition_to(next)?;

        let updated = self
            .orders
            .update_status(id, current.status, next, self.clock.now())
            .await?
            .ok_or_else(|| {
                AppError::Domain(DomainError::Conflict(format!(
                    "Order {} was modified concurrently",
                    id
                )))
            })?;

        tracing::info!(order_id = %id, from = %current.status, to = %next, "Order status changed");

        Ok(updated)
    }
}
