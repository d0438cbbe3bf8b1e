//! Admin dashboard handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::app::{DashboardStats, RecentOrder, RevenuePeriod, RevenuePoint};
use crate::error::AppError;
use crate::AppState;

/// GET /api/admin/dashboard/stats/
pub async fn stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(state.dashboard_service.stats().await?))
}

#[derive(Debug, Deserialize)]
pub struct RecentOrdersQuery {
    pub limit: Option<u64>,
}

/// GET /api/admin/dashboard/orders/recent/?limit=
pub async fn recent_orders(
    State(state): State<AppState>,
    Query(query): Query<RecentOrdersQuery>,
) -> Result<Json<Vec<RecentOrder>>, AppError> {
    Ok(Json(
        state.dashboard_service.recent_orders(query.limit).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    pub period: Option<String>,
}

/// GET /api/admin/dashboard/revenue/?period=week|month|year
pub async fn revenue(
    State(state): State<AppState>,
    Query(query): Query<RevenueQuery>,
) -> Result<Json<Vec<RevenuePoint>>, AppError> {
    let period = RevenuePeriod::from_query(query.period.as_deref());
    Ok(Json(state.dashboard_service.revenue(period).await?))
}
