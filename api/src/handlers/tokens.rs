//! Token administration handlers
//!
//! Bulk assign and refresh, the per-shift summary, shift allocations and
//! per-user token distributions.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::app::{HolderTokens, ShiftSummary};
use crate::domain::entities::{
    parse_month, DistributionFilter, NewShiftAllocation, NewTokenDistribution, Role, Shift,
    ShiftAllocation, ShiftAllocationId, TokenDistribution, TokenDistributionId, UserId,
};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub shift: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssignResponse {
    pub status: &'static str,
    pub updated: u64,
    pub tokens_assigned: i32,
    pub shift: Shift,
}

/// POST /api/admin/tokens/assign/
pub async fn assign(
    State(state): State<AppState>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<AssignResponse>, AppError> {
    let shift: Shift = request
        .shift
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::BadRequest("Invalid shift".to_string()))?;

    let outcome = state.token_service.assign_shift(shift).await?;

    Ok(Json(AssignResponse {
        status: "success",
        updated: outcome.updated,
        tokens_assigned: outcome.tokens_assigned,
        shift: outcome.shift,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub count: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: String,
    pub tokens_assigned: i32,
    pub users_updated: u64,
    pub reset_date: NaiveDate,
}

/// POST /api/admin/tokens/refresh/
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let outcome = state.token_service.refresh(request.count).await?;

    Ok(Json(RefreshResponse {
        message: format!(
            "Successfully refreshed tokens for {} users",
            outcome.users_updated
        ),
        tokens_assigned: outcome.tokens_assigned,
        users_updated: outcome.users_updated,
        reset_date: outcome.reset_date,
    }))
}

#[derive(Debug, Serialize)]
pub struct HolderResponse {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub tokens: i32,
    pub role: Role,
}

impl From<&HolderTokens> for HolderResponse {
    fn from(holder: &HolderTokens) -> Self {
        Self {
            id: holder.user.id,
            username: holder.user.username.clone(),
            name: holder.user.full_name(),
            tokens: holder.tokens,
            role: holder.user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShiftSummaryResponse {
    pub users: Vec<HolderResponse>,
    pub total_tokens: i64,
}

/// Keyed `day_shift`, `mid_shift`, `night_shift`
pub type TokenSummaryResponse = BTreeMap<String, ShiftSummaryResponse>;

fn summary_response(summaries: &[ShiftSummary]) -> TokenSummaryResponse {
    summaries
        .iter()
        .map(|s| {
            (
                format!("{}_shift", s.shift),
                ShiftSummaryResponse {
                    users: s.users.iter().map(HolderResponse::from).collect(),
                    total_tokens: s.total_tokens,
                },
            )
        })
        .collect()
}

/// GET /api/admin/tokens/summary/
pub async fn summary(
    State(state): State<AppState>,
) -> Result<Json<TokenSummaryResponse>, AppError> {
    let summaries = state.token_service.summary().await?;
    Ok(Json(summary_response(&summaries)))
}

/// `YYYY-MM` or `YYYY-MM-DD`, normalized to the first of the month
fn required_month(value: &str) -> Result<NaiveDate, AppError> {
    parse_month(value).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Invalid allocation_month '{}', expected YYYY-MM or YYYY-MM-DD",
            value
        ))
    })
}

// Shift allocations

#[derive(Debug, Deserialize)]
pub struct ShiftAllocationRequest {
    pub shift: Shift,
    pub tokens_per_user: i32,
    pub allocation_month: String,
}

impl ShiftAllocationRequest {
    fn into_new(self) -> Result<NewShiftAllocation, AppError> {
        Ok(NewShiftAllocation {
            shift: self.shift,
            tokens_per_user: self.tokens_per_user,
            allocation_month: required_month(&self.allocation_month)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ShiftAllocationResponse {
    pub id: ShiftAllocationId,
    pub shift: Shift,
    pub tokens_per_user: i32,
    pub allocation_month: NaiveDate,
}

impl From<&ShiftAllocation> for ShiftAllocationResponse {
    fn from(allocation: &ShiftAllocation) -> Self {
        Self {
            id: allocation.id,
            shift: allocation.shift,
            tokens_per_user: allocation.tokens_per_user,
            allocation_month: allocation.allocation_month,
        }
    }
}

/// Allocation plus how many employees it was applied to
#[derive(Debug, Serialize)]
pub struct AppliedAllocationResponse {
    #[serde(flatten)]
    pub allocation: ShiftAllocationResponse,
    pub users_updated: u64,
}

/// GET /api/admin/shift-allocations/
pub async fn list_allocations(
    State(state): State<AppState>,
) -> Result<Json<Vec<ShiftAllocationResponse>>, AppError> {
    let allocations = state.token_service.list_allocations().await?;
    Ok(Json(
        allocations
            .iter()
            .map(ShiftAllocationResponse::from)
            .collect(),
    ))
}

/// POST /api/admin/shift-allocations/
///
/// Applies the allocation to every employee of the shift for that month.
pub async fn create_allocation(
    State(state): State<AppState>,
    Json(request): Json<ShiftAllocationRequest>,
) -> Result<(StatusCode, Json<AppliedAllocationResponse>), AppError> {
    let (allocation, users_updated) = state
        .token_service
        .create_allocation(request.into_new()?)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AppliedAllocationResponse {
            allocation: ShiftAllocationResponse::from(&allocation),
            users_updated,
        }),
    ))
}

/// GET /api/admin/shift-allocations/:id/
pub async fn get_allocation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ShiftAllocationResponse>, AppError> {
    let allocation = state
        .token_service
        .get_allocation(ShiftAllocationId(id))
        .await?;
    Ok(Json(ShiftAllocationResponse::from(&allocation)))
}

/// PUT /api/admin/shift-allocations/:id/
pub async fn update_allocation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ShiftAllocationRequest>,
) -> Result<Json<AppliedAllocationResponse>, AppError> {
    let (allocation, users_updated) = state
        .token_service
        .update_allocation(ShiftAllocationId(id), request.into_new()?)
        .await?;

    Ok(Json(AppliedAllocationResponse {
        allocation: ShiftAllocationResponse::from(&allocation),
        users_updated,
    }))
}

/// DELETE /api/admin/shift-allocations/:id/
pub async fn delete_allocation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state
        .token_service
        .delete_allocation(ShiftAllocationId(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// Token distributions

#[derive(Debug, Deserialize)]
pub struct DistributionQuery {
    pub user: Option<i64>,
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DistributionRequest {
    pub user: i64,
    pub tokens_allocated: i32,
    pub allocation_month: String,
}

impl DistributionRequest {
    fn into_new(self) -> Result<NewTokenDistribution, AppError> {
        Ok(NewTokenDistribution {
            user_id: UserId(self.user),
            tokens_allocated: self.tokens_allocated,
            allocation_month: required_month(&self.allocation_month)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DistributionResponse {
    pub id: TokenDistributionId,
    pub user: UserId,
    pub user_username: String,
    pub tokens_allocated: i32,
    pub allocation_month: NaiveDate,
}

impl From<&TokenDistribution> for DistributionResponse {
    fn from(row: &TokenDistribution) -> Self {
        Self {
            id: row.id,
            user: row.user_id,
            user_username: row.username.clone(),
            tokens_allocated: row.tokens_allocated,
            allocation_month: row.allocation_month,
        }
    }
}

/// GET /api/admin/token-distributions/?user=&month=
///
/// An unparseable `month` is ignored rather than rejected.
pub async fn list_distributions(
    State(state): State<AppState>,
    Query(query): Query<DistributionQuery>,
) -> Result<Json<Vec<DistributionResponse>>, AppError> {
    let filter = DistributionFilter {
        user_id: query.user.map(UserId),
        month: query.month.as_deref().and_then(parse_month),
    };

    let rows = state.token_service.list_distributions(filter).await?;
    Ok(Json(rows.iter().map(DistributionResponse::from).collect()))
}

/// POST /api/admin/token-distributions/
///
/// Upserts the user's row for the month and sets their balance to it.
pub async fn create_distribution(
    State(state): State<AppState>,
    Json(request): Json<DistributionRequest>,
) -> Result<(StatusCode, Json<DistributionResponse>), AppError> {
    let row = state
        .token_service
        .assign_distribution(request.into_new()?)
        .await?;
    Ok((StatusCode::CREATED, Json(DistributionResponse::from(&row))))
}

/// GET /api/admin/token-distributions/:id/
pub async fn get_distribution(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DistributionResponse>, AppError> {
    let row = state
        .token_service
        .get_distribution(TokenDistributionId(id))
        .await?;
    Ok(Json(DistributionResponse::from(&row)))
}

/// PUT /api/admin/token-distributions/:id/
pub async fn update_distribution(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<DistributionRequest>,
) -> Result<Json<DistributionResponse>, AppError> {
    let row = state
        .token_service
        .update_distribution(TokenDistributionId(id), request.into_new()?)
        .await?;
    Ok(Json(DistributionResponse::from(&row)))
}

/// DELETE /api/admin/token-distributions/:id/
pub async fn delete_distribution(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state
        .token_service
        .delete_distribution(TokenDistributionId(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
