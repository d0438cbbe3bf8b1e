//! PostgreSQL adapter for UserRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use super::db_err;
use crate::domain::entities::{NewUser, Role, Shift, User, UserFilter, UserId, UserUpdate};
use crate::domain::ports::UserRepository;
use crate::entity::users;
use crate::error::DomainError;

/// PostgreSQL implementation of UserRepository
pub struct PostgresUserRepository {
    db: DatabaseConnection,
}

impl PostgresUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// SQL condition equivalent of `UserFilter::matches`
pub(crate) fn filter_condition(filter: &UserFilter) -> Condition {
    let mut condition = Condition::all();
    if !filter.roles.is_empty() {
        condition =
            condition.add(users::Column::Role.is_in(filter.roles.iter().map(|r| r.to_string())));
    }
    if let Some(shift) = filter.shift {
        condition = condition.add(users::Column::WorkShift.eq(shift.to_string()));
    }
    condition
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let result = users::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let result = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.map(|m| m.into()))
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, DomainError> {
        let results = users::Entity::find()
            .filter(filter_condition(filter))
            .order_by_asc(users::Column::WorkShift)
            .order_by_asc(users::Column::Username)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn create(&self, user: &NewUser) -> Result<User, DomainError> {
        let model = users::ActiveModel {
            username: Set(user.username.clone()),
            password_hash: Set(user.password_hash.clone()),
            first_name: Set(user.first_name.clone()),
            last_name: Set(user.last_name.clone()),
            email: Set(user.email.clone()),
            role: Set(user.role.to_string()),
            work_shift: Set(user.work_shift.to_string()),
            employee_code: Set(user.employee_code.clone()),
            token_balance: Set(0),
            token_period: Set(user.token_period),
            is_active: Set(true),
            created_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        };

        let result = model.insert(&self.db).await.map_err(db_err)?;

        Ok(result.into())
    }

    async fn update(&self, id: UserId, update: &UserUpdate) -> Result<User, DomainError> {
        let existing = users::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::NotFound(format!("User {} not found", id)))?;

        let mut active: users::ActiveModel = existing.clone().into();
        if let Some(username) = &update.username {
            active.username = Set(username.clone());
        }
        if let Some(first_name) = &update.first_name {
            active.first_name = Set(first_name.clone());
        }
        if let Some(last_name) = &update.last_name {
            active.last_name = Set(last_name.clone());
        }
        if let Some(email) = &update.email {
            active.email = Set(email.clone());
        }
        if let Some(role) = update.role {
            active.role = Set(role.to_string());
        }
        if let Some(shift) = update.work_shift {
            active.work_shift = Set(shift.to_string());
        }
        if let Some(code) = &update.employee_code {
            active.employee_code = Set(code.clone());
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }

        if !active.is_changed() {
            return Ok(existing.into());
        }

        let result = active.update(&self.db).await.map_err(db_err)?;

        Ok(result.into())
    }

    async fn set_password_hash(&self, id: UserId, hash: &str) -> Result<(), DomainError> {
        users::ActiveModel {
            id: Set(id.0),
            password_hash: Set(hash.to_string()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn delete(&self, id: UserId) -> Result<bool, DomainError> {
        let result = users::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn count(&self, created_before: Option<DateTime<Utc>>) -> Result<u64, DomainError> {
        let mut query = users::Entity::find();
        if let Some(before) = created_before {
            query = query.filter(users::Column::CreatedAt.lt(before.fixed_offset()));
        }

        query.count(&self.db).await.map_err(db_err)
    }

    async fn count_by_role_and_shift(&self) -> Result<Vec<(Role, Shift, u64)>, DomainError> {
        let rows: Vec<(String, String, i64)> = users::Entity::find()
            .select_only()
            .column(users::Column::Role)
            .column(users::Column::WorkShift)
            .column_as(Expr::col(users::Column::Id).count(), "count")
            .group_by(users::Column::Role)
            .group_by(users::Column::WorkShift)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .filter_map(|(role, shift, count)| {
                Some((role.parse().ok()?, shift.parse().ok()?, count.max(0) as u64))
            })
            .collect())
    }
}

/// Convert SeaORM model to domain entity
impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        User {
            id: UserId(model.id),
            username: model.username,
            password_hash: model.password_hash,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            role: model.role.parse().unwrap_or(Role::Employee),
            work_shift: model.work_shift.parse().unwrap_or(Shift::Day),
            employee_code: model.employee_code,
            token_balance: model.token_balance,
            token_period: model.token_period,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
