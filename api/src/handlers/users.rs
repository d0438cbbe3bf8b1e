//! User handlers
//!
//! Admin management of staff, employee and guest accounts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::app::NewAccount;
use crate::domain::entities::{Role, Shift, User, UserId, UserUpdate};
use crate::error::AppError;
use crate::AppState;

/// User as returned by the API; `user_id` is the employee code
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub work_shift: Shift,
    pub user_id: Option<String>,
    /// Effective balance; null for admin and staff
    pub tokens: Option<i32>,
}

impl UserResponse {
    pub fn new(user: &User, today: NaiveDate) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
            work_shift: user.work_shift,
            user_id: user.employee_code.clone(),
            tokens: user.reported_tokens(today),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    /// Employee code
    pub user_id: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
    #[serde(default = "default_shift")]
    pub work_shift: Shift,
    pub password: Option<String>,
}

fn default_shift() -> Shift {
    Shift::Day
}

/// Partial update; an empty `user_id` clears the employee code
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub work_shift: Option<Shift>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

/// GET /api/admin/users/
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, AppError> {
    let today = state.clock.today();
    let users = state.user_service.list().await?;

    Ok(Json(
        users.iter().map(|u| UserResponse::new(u, today)).collect(),
    ))
}

/// POST /api/admin/users/
///
/// Without a password the initial one is the employee code, else the username.
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = state
        .user_service
        .create(NewAccount {
            username: request.username,
            employee_code: request.user_id,
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            role: request.role,
            work_shift: request.work_shift,
            password: request.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse::new(&user, state.clock.today())),
    ))
}

/// GET /api/admin/users/:id/
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.user_service.get(UserId(id)).await?;
    Ok(Json(UserResponse::new(&user, state.clock.today())))
}

/// PUT|PATCH /api/admin/users/:id/
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let update = UserUpdate {
        username: request.username,
        first_name: request.first_name,
        last_name: request.last_name,
        email: request.email,
        role: request.role,
        work_shift: request.work_shift,
        employee_code: request.user_id.map(Some),
        is_active: request.is_active,
    };

    let user = state
        .user_service
        .update(UserId(id), update, request.password)
        .await?;

    Ok(Json(UserResponse::new(&user, state.clock.today())))
}

/// DELETE /api/admin/users/:id/
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.user_service.delete(UserId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
