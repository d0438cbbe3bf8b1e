//! Menu handlers
//!
//! Staff CRUD over the menu and the orderable list for employees and guests.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{MenuItem, MenuItemId, MenuItemUpdate, NewMenuItem};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct MenuItemResponse {
    pub id: MenuItemId,
    pub name: String,
    pub description: String,
    pub price: i32,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&MenuItem> for MenuItemResponse {
    fn from(item: &MenuItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            price: item.price,
            is_available: item.is_available,
            created_at: item.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMenuItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i32,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateMenuItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i32>,
    pub is_available: Option<bool>,
}

fn respond(items: Vec<MenuItem>) -> Json<Vec<MenuItemResponse>> {
    Json(items.iter().map(MenuItemResponse::from).collect())
}

/// GET /api/staff/menu/
pub async fn list_menu(
    State(state): State<AppState>,
) -> Result<Json<Vec<MenuItemResponse>>, AppError> {
    Ok(respond(state.menu_service.list_all().await?))
}

/// GET /api/employee/menu/ and /api/guest/menu/
pub async fn available_menu(
    State(state): State<AppState>,
) -> Result<Json<Vec<MenuItemResponse>>, AppError> {
    Ok(respond(state.menu_service.list_available().await?))
}

/// POST /api/staff/menu/
pub async fn create_menu_item(
    State(state): State<AppState>,
    Json(request): Json<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<MenuItemResponse>), AppError> {
    let item = state
        .menu_service
        .create(NewMenuItem {
            name: request.name,
            description: request.description,
            price: request.price,
            is_available: request.is_available,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(MenuItemResponse::from(&item))))
}

/// GET /api/staff/menu/:id/
pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MenuItemResponse>, AppError> {
    let item = state.menu_service.get(MenuItemId(id)).await?;
    Ok(Json(MenuItemResponse::from(&item)))
}

/// PUT|PATCH /api/staff/menu/:id/
pub async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateMenuItemRequest>,
) -> Result<Json<MenuItemResponse>, AppError> {
    let item = state
        .menu_service
        .update(
            MenuItemId(id),
            MenuItemUpdate {
                name: request.name,
                description: request.description,
                price: request.price,
                is_available: request.is_available,
            },
        )
        .await?;

    Ok(Json(MenuItemResponse::from(&item)))
}

/// DELETE /api/staff/menu/:id/
///
/// Items referenced by past orders cannot be deleted (409); mark them unavailable instead.
pub async fn delete_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.menu_service.delete(MenuItemId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
