//! Token service
//!
//! Monthly token budgets: bulk assignment per shift, refresh, the monthly
//! reset, shift allocations and per-user distributions.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};

use crate::domain::entities::{
    month_start, DistributionFilter, NewShiftAllocation, NewTokenDistribution, Role, Shift,
    ShiftAllocation, ShiftAllocationId, ShiftTokenLimits, TokenDistribution, TokenDistributionId,
    User, UserFilter,
};
use crate::domain::ports::{Clock, TokenRepository, UserRepository};
use crate::error::{AppError, DomainError};

/// Outcome of a bulk assign for one shift
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignOutcome {
    pub shift: Shift,
    pub tokens_assigned: i32,
    pub updated: u64,
}

/// Outcome of a refresh across all token holders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub tokens_assigned: i32,
    pub users_updated: u64,
    pub reset_date: NaiveDate,
}

/// A token holder and their spendable balance
#[derive(Debug, Clone)]
pub struct HolderTokens {
    pub user: User,
    pub tokens: i32,
}

#[derive(Debug, Clone)]
pub struct ShiftSummary {
    pub shift: Shift,
    pub users: Vec<HolderTokens>,
    pub total_tokens: i64,
}

/// Knobs for bulk operations
#[derive(Debug, Clone, Copy)]
pub struct TokenPolicy {
    pub limits: ShiftTokenLimits,
    pub assign_window_days: u32,
    pub default_refresh: i32,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            limits: ShiftTokenLimits::default(),
            assign_window_days: 3,
            default_refresh: 100,
        }
    }
}

pub struct TokenService<UR, TR>
where
    UR: UserRepository + ?Sized,
    TR: TokenRepository + ?Sized,
{
    users: Arc<UR>,
    tokens: Arc<TR>,
    clock: Arc<dyn Clock>,
    policy: TokenPolicy,
}

impl<UR, TR> TokenService<UR, TR>
where
    UR: UserRepository + ?Sized,
    TR: TokenRepository + ?Sized,
{
    pub fn new(
        users: Arc<UR>,
        tokens: Arc<TR>,
        clock: Arc<dyn Clock>,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            users,
            tokens,
            clock,
            policy,
        }
    }

    fn current_month(&self) -> NaiveDate {
        month_start(self.clock.today())
    }

    /// Give every employee and guest of `shift` the shift's monthly limit
    pub async fn assign_shift(&self, shift: Shift) -> Result<AssignOutcome, AppError> {
        let today = self.clock.today();
        if today.day() > self.policy.assign_window_days {
            return Err(AppError::BadRequest(format!(
                "Tokens can only be assigned within the first {} days of the month",
                self.policy.assign_window_days
            )));
        }

        let tokens = self.policy.limits.for_shift(shift);
        let updated = self
            .tokens
            .allocate(
                &UserFilter::roles(&Role::TOKEN_HOLDERS).with_shift(shift),
                tokens,
                month_start(today),
            )
            .await?;

        tracing::info!(%shift, tokens, updated, "Assigned shift tokens");

        Ok(AssignOutcome {
            shift,
            tokens_assigned: tokens,
            updated,
        })
    }

    /// Set every employee and guest to `count` tokens for the current month
    pub async fn refresh(&self, count: Option<i32>) -> Result<RefreshOutcome, AppError> {
        let count = count.unwrap_or(self.policy.default_refresh);
        if count <= 0 {
            return Err(AppError::BadRequest(
                "Token count must be a positive number".to_string(),
            ));
        }

        let month = self.current_month();
        let users_updated = self
            .tokens
            .allocate(&UserFilter::roles(&Role::TOKEN_HOLDERS), count, month)
            .await?;

        tracing::info!(count, users_updated, "Refreshed monthly tokens");

        Ok(RefreshOutcome {
            tokens_assigned: count,
            users_updated,
            reset_date: self.clock.today(),
        })
    }

    /// Token holders grouped by shift with their effective balances
    pub async fn summary(&self) -> Result<Vec<ShiftSummary>, AppError> {
        let today = self.clock.today();
        let holders = self
            .users
            .list(&UserFilter::roles(&Role::TOKEN_HOLDERS))
            .await?;

        Ok(Shift::ALL
            .iter()
            .map(|&shift| {
                let users: Vec<HolderTokens> = holders
                    .iter()
                    .filter(|u| u.work_shift == shift)
                    .map(|u| HolderTokens {
                        tokens: u.current_tokens(today),
                        user: u.clone(),
                    })
                    .collect();
                let total_tokens = users.iter().map(|h| i64::from(h.tokens)).sum();

                ShiftSummary {
                    shift,
                    users,
                    total_tokens,
                }
            })
            .collect())
    }

    /// Zero every balance for the new month.
    ///
    /// Returns None (and does nothing) when it is not the 1st and `force` is unset.
    pub async fn monthly_reset(&self, force: bool) -> Result<Option<u64>, AppError> {
        let today = self.clock.today();
        if !force && today.day() != 1 {
            return Ok(None);
        }

        let updated = self.tokens.reset_all(month_start(today)).await?;
        tracing::info!(updated, month = %month_start(today), "Monthly token reset");

        Ok(Some(updated))
    }

    // Shift allocations

    pub async fn list_allocations(&self) -> Result<Vec<ShiftAllocation>, AppError> {
        Ok(self.tokens.list_shift_allocations().await?)
    }

    pub async fn get_allocation(&self, id: ShiftAllocationId) -> Result<ShiftAllocation, AppError> {
        self.tokens
            .find_shift_allocation(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shift allocation {} not found", id.0)))
    }

    /// Record an allocation and apply it to the shift's employees
    pub async fn create_allocation(
        &self,
        allocation: NewShiftAllocation,
    ) -> Result<(ShiftAllocation, u64), AppError> {
        let allocation = normalize_allocation(allocation)?;
        let (created, updated) = self.tokens.create_shift_allocation(&allocation).await?;

        tracing::info!(
            shift = %created.shift,
            month = %created.allocation_month,
            tokens = created.tokens_per_user,
            updated,
            "Created shift allocation"
        );

        Ok((created, updated))
    }

    pub async fn update_allocation(
        &self,
        id: ShiftAllocationId,
        allocation: NewShiftAllocation,
    ) -> Result<(ShiftAllocation, u64), AppError> {
        let allocation = normalize_allocation(allocation)?;
        self.tokens
            .update_shift_allocation(id, &allocation)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shift allocation {} not found", id.0)))
    }

    pub async fn delete_allocation(&self, id: ShiftAllocationId) -> Result<(), AppError> {
        if !self.tokens.delete_shift_allocation(id).await? {
            return Err(AppError::NotFound(format!(
                "Shift allocation {} not found",
                id.0
            )));
        }
        Ok(())
    }

    // Per-user distributions

    pub async fn list_distributions(
        &self,
        filter: DistributionFilter,
    ) -> Result<Vec<TokenDistribution>, AppError> {
        Ok(self.tokens.list_distributions(&filter).await?)
    }

    pub async fn get_distribution(
        &self,
        id: TokenDistributionId,
    ) -> Result<TokenDistribution, AppError> {
        self.tokens
            .find_distribution(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Token distribution {} not found", id.0)))
    }

    /// Upsert the user's row for the month and set their balance to it
    pub async fn assign_distribution(
        &self,
        distribution: NewTokenDistribution,
    ) -> Result<TokenDistribution, AppError> {
        let distribution = self.check_distribution(distribution).await?;
        Ok(self.tokens.assign_distribution(&distribution).await?)
    }

    pub async fn update_distribution(
        &self,
        id: TokenDistributionId,
        distribution: NewTokenDistribution,
    ) -> Result<TokenDistribution, AppError> {
        let distribution = self.check_distribution(distribution).await?;
        self.tokens
            .update_distribution(id, &distribution)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Token distribution {} not found", id.0)))
    }

    pub async fn delete_distribution(&self, id: TokenDistributionId) -> Result<(), AppError> {
        if !self.tokens.delete_distribution(id).await? {
            return Err(AppError::NotFound(format!(
                "Token distribution {} not found",
                id.0
            )));
        }
        Ok(())
    }

    async fn check_distribution(
        &self,
        mut distribution: NewTokenDistribution,
    ) -> Result<NewTokenDistribution, AppError> {
        if distribution.tokens_allocated < 0 {
            return Err(validation("Tokens allocated cannot be negative"));
        }

        let user = self
            .users
            .find_by_id(distribution.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", distribution.user_id)))?;
        if !user.role.uses_tokens() {
            return Err(validation("Only employees and guests hold tokens"));
        }

        distribution.allocation_month = month_start(distribution.allocation_month);
        Ok(distribution)
    }
}

fn normalize_allocation(mut allocation: NewShiftAllocation) -> Result<NewShiftAllocation, AppError> {
    if allocation.tokens_per_user < 0 {
        return Err(validation("Tokens per user cannot be negative"));
    }
    allocation.allocation_month = month_start(allocation.allocation_month);
    Ok(allocation)
}

fn validation(msg: &str) -> AppError {
    AppError::Domain(DomainError::Validation(msg.to_string()))
}
