//! PostgreSQL adapter for OrderRepository
//!
//! Placement runs in one transaction holding a row lock on the ordering
//! user, so the balance check and the deduction cannot interleave with
//! another placement.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    Statement, TransactionTrait,
};

use super::db_err;
use crate::domain::entities::{
    effective_balance, month_start, MenuItem, NewOrder, Order, OrderFilter, OrderId, OrderItem,
    OrderOwner, OrderStatus, UserId,
};
use crate::domain::ports::OrderRepository;
use crate::entity::{menu_items, order_items, orders, users};
use crate::error::DomainError;

/// PostgreSQL implementation of OrderRepository
pub struct PostgresOrderRepository {
    db: DatabaseConnection,
}

impl PostgresOrderRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromQueryResult)]
struct DailyTotal {
    day: NaiveDate,
    amount: i64,
}

fn unique_ids(ids: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut ids: Vec<i64> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Load items, menu entries and owners for a batch of order rows
async fn hydrate<C: ConnectionTrait>(
    conn: &C,
    models: Vec<orders::Model>,
) -> Result<Vec<Order>, DomainError> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids = unique_ids(models.iter().map(|m| m.id));
    let user_ids = unique_ids(models.iter().map(|m| m.user_id));

    let items = order_items::Entity::find()
        .filter(order_items::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_items::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)?;

    let menu_ids = unique_ids(items.iter().map(|i| i.menu_item_id));
    let menu: HashMap<i64, MenuItem> = menu_items::Entity::find()
        .filter(menu_items::Column::Id.is_in(menu_ids))
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(|m| (m.id, m.into()))
        .collect();

    let owners: HashMap<i64, users::Model> = users::Entity::find()
        .filter(users::Column::Id.is_in(user_ids))
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut items_by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    for item in items {
        let Some(menu_item) = menu.get(&item.menu_item_id) else {
            tracing::warn!(order_item_id = item.id, "Order item references missing menu item");
            continue;
        };
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItem {
                id: item.id,
                menu_item: menu_item.clone(),
                quantity: item.quantity,
                tokens_per_item: item.tokens_per_item,
            });
    }

    Ok(models
        .into_iter()
        .map(|m| {
            let owner = owners
                .get(&m.user_id)
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

            Order {
                id: OrderId(m.id),
                user_id: UserId(m.user_id),
                owner,
                status: m.status.parse().unwrap_or(OrderStatus::Pending),
                total_tokens: m.total_tokens,
                items: items_by_order.remove(&m.id).unwrap_or_default(),
                created_at: m.created_at.with_timezone(&Utc),
                updated_at: m.updated_at.with_timezone(&Utc),
            }
        })
        .collect())
}

fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    (start, start + chrono::Duration::days(1))
}

/// Case-insensitive substring pattern; `%`, `_` and `\` in the term match literally
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn place(&self, order: &NewOrder) -> Result<Order, DomainError> {
        if order.lines.is_empty() {
            return Err(DomainError::Validation("No items provided".to_string()));
        }

        let txn = self.db.begin().await.map_err(db_err)?;

        let user = users::Entity::find_by_id(order.user_id.0)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::NotFound(format!("User {} not found", order.user_id)))?;

        let available = effective_balance(user.token_balance, user.token_period, order.today);
        if order.total_tokens > available {
            // Dropping the transaction rolls it back and releases the lock
            return Err(DomainError::InsufficientTokens {
                required: order.total_tokens,
                available,
            });
        }

        let placed_at = order.placed_at.fixed_offset();
        let created = orders::ActiveModel {
            user_id: Set(order.user_id.0),
            status: Set(OrderStatus::Pending.to_string()),
            total_tokens: Set(order.total_tokens),
            created_at: Set(placed_at),
            updated_at: Set(placed_at),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        let lines = order.lines.iter().map(|line| order_items::ActiveModel {
            order_id: Set(created.id),
            menu_item_id: Set(line.menu_item_id.0),
            quantity: Set(line.quantity),
            tokens_per_item: Set(line.tokens_per_item),
            ..Default::default()
        });
        order_items::Entity::insert_many(lines)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        users::ActiveModel {
            id: Set(user.id),
            token_balance: Set(available - order.total_tokens),
            token_period: Set(month_start(order.today)),
            ..Default::default()
        }
        .update(&txn)
        .await
        .map_err(db_err)?;

        let mut placed = hydrate(&txn, vec![created]).await?;
        txn.commit().await.map_err(db_err)?;

        placed
            .pop()
            .ok_or_else(|| DomainError::Internal("Placed order could not be loaded".to_string()))
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, DomainError> {
        let Some(model) = orders::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        Ok(hydrate(&self.db, vec![model]).await?.pop())
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError> {
        let mut query = orders::Entity::find()
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id);

        if let Some(user_id) = filter.user_id {
            query = query.filter(orders::Column::UserId.eq(user_id.0));
        }

        if let Some(search) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let pattern = contains_pattern(search);
            let matching_users: Vec<i64> = users::Entity::find()
                .select_only()
                .column(users::Column::Id)
                .filter(
                    Condition::any()
                        .add(
                            Expr::expr(Func::lower(Expr::col(users::Column::Username)))
                                .like(pattern.clone()),
                        )
                        .add(
                            Expr::expr(Func::lower(Expr::col(users::Column::EmployeeCode)))
                                .like(pattern),
                        ),
                )
                .into_tuple()
                .all(&self.db)
                .await
                .map_err(db_err)?;

            let mut condition = Condition::any().add(orders::Column::UserId.is_in(matching_users));
            if let Ok(order_id) = search.parse::<i64>() {
                condition = condition.add(orders::Column::Id.eq(order_id));
            }
            query = query.filter(condition);
        }

        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let models = query.all(&self.db).await.map_err(db_err)?;
        hydrate(&self.db, models).await
    }

    async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>, DomainError> {
        // Conditional on the current status so two staff members cannot both move it
        let result = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(to.to_string()))
            .col_expr(orders::Column::UpdatedAt, Expr::value(at.fixed_offset()))
            .filter(orders::Column::Id.eq(id.0))
            .filter(orders::Column::Status.eq(from.to_string()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn delete(&self, id: OrderId) -> Result<bool, DomainError> {
        let result = orders::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn count_by_status(
        &self,
        status: OrderStatus,
        created_on: Option<NaiveDate>,
    ) -> Result<u64, DomainError> {
        let mut query = orders::Entity::find().filter(orders::Column::Status.eq(status.to_string()));

        if let Some(day) = created_on {
            let (start, end) = day_bounds(day);
            query = query
                .filter(orders::Column::CreatedAt.gte(start.fixed_offset()))
                .filter(orders::Column::CreatedAt.lt(end.fixed_offset()));
        }

        query.count(&self.db).await.map_err(db_err)
    }

    async fn completed_totals_by_day(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, i64)>, DomainError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                      COALESCE(SUM(total_tokens), 0)::BIGINT AS amount
               FROM orders
               WHERE status = 'completed'
                 AND (created_at AT TIME ZONE 'UTC')::date BETWEEN $1 AND $2
               GROUP BY day
               ORDER BY day"#,
            [from.into(), to.into()],
        );

        let rows = DailyTotal::find_by_statement(stmt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows.into_iter().map(|r| (r.day, r.amount)).collect())
    }
}
