//! PostgreSQL adapter for MenuRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use super::db_err;
use crate::domain::entities::{MenuItem, MenuItemId, MenuItemUpdate, NewMenuItem};
use crate::domain::ports::MenuRepository;
use crate::entity::menu_items;
use crate::error::DomainError;

/// PostgreSQL implementation of MenuRepository
pub struct PostgresMenuRepository {
    db: DatabaseConnection,
}

impl PostgresMenuRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MenuRepository for PostgresMenuRepository {
    async fn list(&self, available_only: bool) -> Result<Vec<MenuItem>, DomainError> {
        let mut query = menu_items::Entity::find();
        if available_only {
            query = query.filter(menu_items::Column::IsAvailable.eq(true));
        }

        let results = query
            .order_by_asc(menu_items::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_by_id(&self, id: MenuItemId) -> Result<Option<MenuItem>, DomainError> {
        let result = menu_items::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_many(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let results = menu_items::Entity::find()
            .filter(menu_items::Column::Id.is_in(ids.iter().map(|id| id.0)))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn create(&self, item: &NewMenuItem) -> Result<MenuItem, DomainError> {
        let model = menu_items::ActiveModel {
            name: Set(item.name.trim().to_string()),
            description: Set(item.description.clone()),
            price: Set(item.price),
            is_available: Set(item.is_available),
            created_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        };

        let result = model.insert(&self.db).await.map_err(db_err)?;

        Ok(result.into())
    }

    async fn update(
        &self,
        id: MenuItemId,
        update: &MenuItemUpdate,
    ) -> Result<Option<MenuItem>, DomainError> {
        let Some(existing) = menu_items::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let mut active: menu_items::ActiveModel = existing.clone().into();
        if let Some(name) = &update.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = &update.description {
            active.description = Set(description.clone());
        }
        if let Some(price) = update.price {
            active.price = Set(price);
        }
        if let Some(is_available) = update.is_available {
            active.is_available = Set(is_available);
        }

        if !active.is_changed() {
            return Ok(Some(existing.into()));
        }

        let result = active.update(&self.db).await.map_err(db_err)?;

        Ok(Some(result.into()))
    }

    async fn delete(&self, id: MenuItemId) -> Result<bool, DomainError> {
        let result = menu_items::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await
            .map_err(|e| match db_err(e) {
                DomainError::Conflict(_) => DomainError::Conflict(format!(
                    "Menu item {} is part of existing orders; mark it unavailable instead",
                    id
                )),
                other => other,
            })?;

        Ok(result.rows_affected > 0)
    }

    async fn count(&self, created_since: Option<DateTime<Utc>>) -> Result<u64, DomainError> {
        let mut query = menu_items::Entity::find();
        if let Some(since) = created_since {
            query = query.filter(menu_items::Column::CreatedAt.gte(since.fixed_offset()));
        }

        query.count(&self.db).await.map_err(db_err)
    }
}

/// Convert SeaORM model to domain entity
impl From<menu_items::Model> for MenuItem {
    fn from(model: menu_items::Model) -> Self {
        MenuItem {
            id: MenuItemId(model.id),
            name: model.name,
            description: model.description,
            price: model.price,
            is_available: model.is_available,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
