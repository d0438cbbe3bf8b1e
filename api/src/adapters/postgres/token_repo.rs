//! PostgreSQL adapter for TokenRepository

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::db_err;
use super::user_repo::filter_condition;
use crate::domain::entities::{
    DistributionFilter, NewShiftAllocation, NewTokenDistribution, Role, Shift, ShiftAllocation,
    ShiftAllocationId, TokenDistribution, TokenDistributionId, UserFilter, UserId,
};
use crate::domain::ports::TokenRepository;
use crate::entity::{shift_allocations, token_distributions, users};
use crate::error::DomainError;

/// PostgreSQL implementation of TokenRepository
pub struct PostgresTokenRepository {
    db: DatabaseConnection,
}

impl PostgresTokenRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Set the balance of every user matching `condition` and upsert their ledger rows
async fn apply_allocation<C: ConnectionTrait>(
    conn: &C,
    condition: Condition,
    tokens: i32,
    month: NaiveDate,
) -> Result<u64, DomainError> {
    let ids: Vec<i64> = users::Entity::find()
        .select_only()
        .column(users::Column::Id)
        .filter(condition)
        .into_tuple()
        .all(conn)
        .await
        .map_err(db_err)?;

    if ids.is_empty() {
        return Ok(0);
    }

    users::Entity::update_many()
        .col_expr(users::Column::TokenBalance, Expr::value(tokens))
        .col_expr(users::Column::TokenPeriod, Expr::value(month))
        .filter(users::Column::Id.is_in(ids.clone()))
        .exec(conn)
        .await
        .map_err(db_err)?;

    let rows = ids.iter().map(|&user_id| token_distributions::ActiveModel {
        user_id: Set(user_id),
        tokens_allocated: Set(tokens),
        allocation_month: Set(month),
        ..Default::default()
    });
    token_distributions::Entity::insert_many(rows)
        .on_conflict(
            OnConflict::columns([
                token_distributions::Column::UserId,
                token_distributions::Column::AllocationMonth,
            ])
            .update_column(token_distributions::Column::TokensAllocated)
            .to_owned(),
        )
        .exec(conn)
        .await
        .map_err(db_err)?;

    Ok(ids.len() as u64)
}

fn employees_of(shift: Shift) -> Condition {
    filter_condition(&UserFilter::roles(&[Role::Employee]).with_shift(shift))
}

async fn sync_user_balance<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    tokens: i32,
    month: NaiveDate,
) -> Result<(), DomainError> {
    users::Entity::update_many()
        .col_expr(users::Column::TokenBalance, Expr::value(tokens))
        .col_expr(users::Column::TokenPeriod, Expr::value(month))
        .filter(users::Column::Id.eq(user_id))
        .exec(conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

async fn load_distribution<C: ConnectionTrait>(
    conn: &C,
    condition: Condition,
) -> Result<Option<TokenDistribution>, DomainError> {
    let row = token_distributions::Entity::find()
        .find_also_related(users::Entity)
        .filter(condition)
        .one(conn)
        .await
        .map_err(db_err)?;

    Ok(row.map(to_distribution))
}

fn to_distribution(
    (model, user): (token_distributions::Model, Option<users::Model>),
) -> TokenDistribution {
    TokenDistribution {
        id: TokenDistributionId(model.id),
        user_id: UserId(model.user_id),
        username: user.map(|u| u.username).unwrap_or_default(),
        tokens_allocated: model.tokens_allocated,
        allocation_month: model.allocation_month,
    }
}

#[async_trait]
impl TokenRepository for PostgresTokenRepository {
    async fn allocate(
        &self,
        filter: &UserFilter,
        tokens: i32,
        month: NaiveDate,
    ) -> Result<u64, DomainError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let updated = apply_allocation(&txn, filter_condition(filter), tokens, month).await?;
        txn.commit().await.map_err(db_err)?;

        Ok(updated)
    }

    async fn reset_all(&self, month: NaiveDate) -> Result<u64, DomainError> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::TokenBalance, Expr::value(0))
            .col_expr(users::Column::TokenPeriod, Expr::value(month))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    async fn list_shift_allocations(&self) -> Result<Vec<ShiftAllocation>, DomainError> {
        let results = shift_allocations::Entity::find()
            .order_by_desc(shift_allocations::Column::AllocationMonth)
            .order_by_asc(shift_allocations::Column::Shift)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_shift_allocation(
        &self,
        id: ShiftAllocationId,
    ) -> Result<Option<ShiftAllocation>, DomainError> {
        let result = shift_allocations::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.map(|m| m.into()))
    }

    async fn create_shift_allocation(
        &self,
        allocation: &NewShiftAllocation,
    ) -> Result<(ShiftAllocation, u64), DomainError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let created = shift_allocations::ActiveModel {
            shift: Set(allocation.shift.to_string()),
            tokens_per_user: Set(allocation.tokens_per_user),
            allocation_month: Set(allocation.allocation_month),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        let updated = apply_allocation(
            &txn,
            employees_of(allocation.shift),
            allocation.tokens_per_user,
            allocation.allocation_month,
        )
        .await?;

        txn.commit().await.map_err(db_err)?;

        Ok((created.into(), updated))
    }

    async fn update_shift_allocation(
        &self,
        id: ShiftAllocationId,
        allocation: &NewShiftAllocation,
    ) -> Result<Option<(ShiftAllocation, u64)>, DomainError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let Some(existing) = shift_allocations::Entity::find_by_id(id.0)
            .one(&txn)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let mut active: shift_allocations::ActiveModel = existing.into();
        active.shift = Set(allocation.shift.to_string());
        active.tokens_per_user = Set(allocation.tokens_per_user);
        active.allocation_month = Set(allocation.allocation_month);
        let saved = active.update(&txn).await.map_err(db_err)?;

        let updated = apply_allocation(
            &txn,
            employees_of(allocation.shift),
            allocation.tokens_per_user,
            allocation.allocation_month,
        )
        .await?;

        txn.commit().await.map_err(db_err)?;

        Ok(Some((saved.into(), updated)))
    }

    async fn delete_shift_allocation(&self, id: ShiftAllocationId) -> Result<bool, DomainError> {
        let result = shift_allocations::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn list_distributions(
        &self,
        filter: &DistributionFilter,
    ) -> Result<Vec<TokenDistribution>, DomainError> {
        let mut query = token_distributions::Entity::find()
            .find_also_related(users::Entity)
            .order_by_desc(token_distributions::Column::AllocationMonth)
            .order_by_asc(token_distributions::Column::Id);

        if let Some(user_id) = filter.user_id {
            query = query.filter(token_distributions::Column::UserId.eq(user_id.0));
        }
        if let Some(month) = filter.month {
            query = query.filter(token_distributions::Column::AllocationMonth.eq(month));
        }

        let rows = query.all(&self.db).await.map_err(db_err)?;

        Ok(rows.into_iter().map(to_distribution).collect())
    }

    async fn find_distribution(
        &self,
        id: TokenDistributionId,
    ) -> Result<Option<TokenDistribution>, DomainError> {
        load_distribution(
            &self.db,
            Condition::all().add(token_distributions::Column::Id.eq(id.0)),
        )
        .await
    }

    async fn assign_distribution(
        &self,
        distribution: &NewTokenDistribution,
    ) -> Result<TokenDistribution, DomainError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let user_exists = users::Entity::find_by_id(distribution.user_id.0)
            .one(&txn)
            .await
            .map_err(db_err)?
            .is_some();
        if !user_exists {
            return Err(DomainError::NotFound(format!(
                "User {} not found",
                distribution.user_id
            )));
        }

        token_distributions::Entity::insert(token_distributions::ActiveModel {
            user_id: Set(distribution.user_id.0),
            tokens_allocated: Set(distribution.tokens_allocated),
            allocation_month: Set(distribution.allocation_month),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([
                token_distributions::Column::UserId,
                token_distributions::Column::AllocationMonth,
            ])
            .update_column(token_distributions::Column::TokensAllocated)
            .to_owned(),
        )
        .exec(&txn)
        .await
        .map_err(db_err)?;

        sync_user_balance(
            &txn,
            distribution.user_id.0,
            distribution.tokens_allocated,
            distribution.allocation_month,
        )
        .await?;

        let saved = load_distribution(
            &txn,
            Condition::all()
                .add(token_distributions::Column::UserId.eq(distribution.user_id.0))
                .add(token_distributions::Column::AllocationMonth.eq(distribution.allocation_month)),
        )
        .await?
        .ok_or_else(|| DomainError::Internal("Distribution vanished after upsert".to_string()))?;

        txn.commit().await.map_err(db_err)?;

        Ok(saved)
    }

    async fn update_distribution(
        &self,
        id: TokenDistributionId,
        distribution: &NewTokenDistribution,
    ) -> Result<Option<TokenDistribution>, DomainError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let Some(existing) = token_distributions::Entity::find_by_id(id.0)
            .one(&txn)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let mut active: token_distributions::ActiveModel = existing.into();
        active.user_id = Set(distribution.user_id.0);
        active.tokens_allocated = Set(distribution.tokens_allocated);
        active.allocation_month = Set(distribution.allocation_month);
        active.update(&txn).await.map_err(db_err)?;

        sync_user_balance(
            &txn,
            distribution.user_id.0,
            distribution.tokens_allocated,
            distribution.allocation_month,
        )
        .await?;

        let saved = load_distribution(
            &txn,
            Condition::all().add(token_distributions::Column::Id.eq(id.0)),
        )
        .await?;

        txn.commit().await.map_err(db_err)?;

        Ok(saved)
    }

    async fn delete_distribution(&self, id: TokenDistributionId) -> Result<bool, DomainError> {
        let result = token_distributions::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }
}

/// Convert SeaORM model to domain entity
impl From<shift_allocations::Model> for ShiftAllocation {
    fn from(model: shift_allocations::Model) -> Self {
        ShiftAllocation {
            id: ShiftAllocationId(model.id),
            shift: model.shift.parse().unwrap_or(Shift::Day),
            tokens_per_user: model.tokens_per_user,
            allocation_month: model.allocation_month,
        }
    }
}
