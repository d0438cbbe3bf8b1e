//! PostgreSQL adapter for SessionRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use super::db_err;
use crate::domain::entities::{NewSession, Session, UserId};
use crate::domain::ports::SessionRepository;
use crate::entity::sessions;
use crate::error::DomainError;

/// PostgreSQL implementation of SessionRepository
pub struct PostgresSessionRepository {
    db: DatabaseConnection,
}

impl PostgresSessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn create(&self, session: &NewSession) -> Result<Session, DomainError> {
        let model = sessions::ActiveModel {
            token_hash: Set(session.token_hash.clone()),
            user_id: Set(session.user_id.0),
            created_at: Set(session.created_at.fixed_offset()),
            expires_at: Set(session.expires_at.fixed_offset()),
        };

        let result = model.insert(&self.db).await.map_err(db_err)?;

        Ok(result.into())
    }

    async fn find_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, DomainError> {
        let result = sessions::Entity::find_by_id(token_hash.to_string())
            .filter(sessions::Column::ExpiresAt.gt(now.fixed_offset()))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.map(|m| m.into()))
    }

    async fn delete(&self, token_hash: &str) -> Result<(), DomainError> {
        sessions::Entity::delete_by_id(token_hash.to_string())
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn delete_for_user(&self, user_id: UserId) -> Result<u64, DomainError> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::UserId.eq(user_id.0))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::ExpiresAt.lte(now.fixed_offset()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }
}

impl From<sessions::Model> for Session {
    fn from(model: sessions::Model) -> Self {
        Session {
            token_hash: model.token_hash,
            user_id: UserId(model.user_id),
            created_at: model.created_at.with_timezone(&Utc),
            expires_at: model.expires_at.with_timezone(&Utc),
        }
    }
}
