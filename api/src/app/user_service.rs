//! User service
//!
//! Admin management of non-admin accounts. Administrators themselves are
//! invisible here; they are created from the command line.

use std::sync::Arc;

use super::auth_service::{hash_password, validate_password};
use crate::domain::entities::{
    month_start, validate_employee_code, validate_username, NewUser, Role, Shift, User,
    UserFilter, UserId, UserUpdate,
};
use crate::domain::ports::{Clock, UserRepository};
use crate::error::{AppError, DomainError};

/// Roles an admin can manage through the API
const MANAGED_ROLES: [Role; 3] = [Role::Staff, Role::Employee, Role::Guest];

/// Account data supplied by an admin
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub employee_code: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub work_shift: Shift,
    pub password: Option<String>,
}

/// Service for managing user accounts
pub struct UserService<UR>
where
    UR: UserRepository + ?Sized,
{
    users: Arc<UR>,
    clock: Arc<dyn Clock>,
}

impl<UR> UserService<UR>
where
    UR: UserRepository + ?Sized,
{
    pub fn new(users: Arc<UR>, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self.users.list(&UserFilter::roles(&MANAGED_ROLES)).await?)
    }

    pub async fn get(&self, id: UserId) -> Result<User, AppError> {
        self.users
            .find_by_id(id)
            .await?
            .filter(|u| u.role != Role::Admin)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    pub async fn create(&self, account: NewAccount) -> Result<User, AppError> {
        let username = account.username.trim().to_string();
        validate_username(&username)?;
        ensure_managed_role(account.role)?;

        let employee_code = normalize_code(account.employee_code);
        if let Some(code) = &employee_code {
            validate_employee_code(code)?;
        }

        // Explicit password, else the employee code, else the username
        let initial_password = account
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(employee_code.as_deref())
            .unwrap_or(&username);
        let password_hash = hash_password(initial_password)?;

        let user = self
            .users
            .create(&NewUser {
                username,
                password_hash,
                first_name: account.first_name.trim().to_string(),
                last_name: account.last_name.trim().to_string(),
                email: account.email.trim().to_string(),
                role: account.role,
                work_shift: account.work_shift,
                employee_code,
                token_period: month_start(self.clock.today()),
            })
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "Created user");

        Ok(user)
    }

    /// Apply a partial update; `password` replaces the stored hash when present
    pub async fn update(
        &self,
        id: UserId,
        mut update: UserUpdate,
        password: Option<String>,
    ) -> Result<User, AppError> {
        self.get(id).await?;

        let password = password.filter(|p| !p.is_empty());
        if let Some(password) = &password {
            validate_password(password)?;
        }
        if let Some(username) = update.username.as_mut() {
            *username = username.trim().to_string();
            validate_username(username)?;
        }
        if let Some(role) = update.role {
            ensure_managed_role(role)?;
        }
        if let Some(code) = update.employee_code.take() {
            let code = normalize_code(code);
            if let Some(code) = &code {
                validate_employee_code(code)?;
            }
            update.employee_code = Some(code);
        }

        let user = self.users.update(id, &update).await?;

        if let Some(password) = password {
            self.users
                .set_password_hash(id, &hash_password(&password)?)
                .await?;
        }

        Ok(user)
    }

    pub async fn delete(&self, id: UserId) -> Result<(), AppError> {
        self.get(id).await?;
        self.users.delete(id).await?;
        tracing::info!(user_id = %id, "Deleted user");
        Ok(())
    }
}

fn ensure_managed_role(role: Role) -> Result<(), AppError> {
    if role == Role::Admin {
        return Err(AppError::Domain(DomainError::Validation(
            "Admin accounts can only be created from the command line".to_string(),
        )));
    }
    Ok(())
}

fn normalize_code(code: Option<String>) -> Option<String> {
    code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}
