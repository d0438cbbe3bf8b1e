//! Order handlers
//!
//! Placement and history for employees and guests; the staff order queue.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::menu::MenuItemResponse;
use crate::domain::entities::{Order, OrderId, OrderItem, OrderLine, OrderStatus, User, UserId};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UserDetails {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub id: i64,
    pub menu_item: MenuItemResponse,
    pub quantity: i32,
    pub tokens_per_item: i32,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id,
            menu_item: MenuItemResponse::from(&item.menu_item),
            quantity: item.quantity,
            tokens_per_item: item.tokens_per_item,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub user: UserId,
    pub user_details: UserDetails,
    pub status: OrderStatus,
    pub total_tokens: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub order_items: Vec<OrderItemResponse>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            user: order.user_id,
            user_details: UserDetails {
                username: order.owner.username.clone(),
                first_name: order.owner.first_name.clone(),
                last_name: order.owner.last_name.clone(),
                user_id: order.owner.employee_code.clone(),
            },
            status: order.status,
            total_tokens: order.total_tokens,
            created_at: order.created_at,
            updated_at: order.updated_at,
            order_items: order.items.iter().map(OrderItemResponse::from).collect(),
        }
    }
}

fn respond(orders: &[Order]) -> Vec<OrderResponse> {
    orders.iter().map(OrderResponse::from).collect()
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderLine>,
}

/// POST /api/employee/order/ and /api/guest/order/
///
/// Deducts the order total from the caller's balance.
pub async fn place_order(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let order = state.order_service.place(&user, &request.items).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

#[derive(Debug, Serialize)]
pub struct OrderHistoryResponse {
    pub today_orders: Vec<OrderResponse>,
    pub past_orders: Vec<OrderResponse>,
}

/// GET /api/employee/orders/ and /api/guest/orders/
pub async fn my_orders(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<OrderHistoryResponse>, AppError> {
    let history = state.order_service.history(&user).await?;

    Ok(Json(OrderHistoryResponse {
        today_orders: respond(&history.today),
        past_orders: respond(&history.past),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub search: Option<String>,
}

/// GET /api/staff/orders/?search=
///
/// `search` matches username or employee code (case-insensitive) or the order id.
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders = state.order_service.list(query.search).await?;
    Ok(Json(respond(&orders)))
}

/// GET /api/staff/orders/:id/
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state.order_service.get(OrderId(id)).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// DELETE /api/staff/orders/:id/
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.order_service.delete(OrderId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

/// PATCH /api/staff/orders/:id/update_status/
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state
        .order_service
        .update_status(OrderId(id), &request.status)
        .await?;

    Ok(Json(OrderResponse::from(&order)))
}
