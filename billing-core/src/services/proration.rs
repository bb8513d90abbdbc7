//! Time-based proration for mid-period line item changes.
//!
//! Amounts are split by seconds: the coefficient is remaining period seconds
//! over total period seconds, with the proration date clamped into the
//! period. Advance-billed charges produce credits for the unused remainder
//! or charges for the remainder being added; arrear-billed charges settle at
//! period end on their own and prorate to zero here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use service_core::error::AppError;

/// What kind of change triggered the proration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProrationAction {
    AddItem,
    RemoveItem,
    Cancellation,
    PlanChange,
}

#[derive(Debug, Clone)]
pub struct ProrationParams {
    pub line_item_id: Uuid,
    /// Full per-period amount of the line item (unit amount times quantity).
    pub amount: Decimal,
    pub pay_in_advance: bool,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub proration_date: DateTime<Utc>,
    pub action: ProrationAction,
}

#[derive(Debug, Clone, Default)]
pub struct ProrationResult {
    /// Amount owed back to the customer.
    pub credit_amount: Decimal,
    /// Amount to charge the customer now.
    pub charge_amount: Decimal,
}

pub trait ProrationCalculator: Send + Sync {
    fn calculate(&self, params: &ProrationParams) -> Result<ProrationResult, AppError>;
}

/// Second-resolution calculator.
#[derive(Debug, Default)]
pub struct TimeBasedProrationCalculator;

impl ProrationCalculator for TimeBasedProrationCalculator {
    fn calculate(&self, params: &ProrationParams) -> Result<ProrationResult, AppError> {
        if params.period_end <= params.period_start {
            return Err(AppError::invalid_operation(
                "proration period is empty or inverted",
            ));
        }

        let ratio = remaining_ratio(params);
        let prorated = params.amount * ratio;

        let mut result = ProrationResult::default();
        if !params.pay_in_advance {
            // Arrear items are invoiced for actual coverage at period end.
            return Ok(result);
        }
        match params.action {
            ProrationAction::RemoveItem | ProrationAction::Cancellation => {
                result.credit_amount = prorated;
            }
            ProrationAction::AddItem | ProrationAction::PlanChange => {
                result.charge_amount = prorated;
            }
        }
        Ok(result)
    }
}

fn remaining_ratio(params: &ProrationParams) -> Decimal {
    let effective = params
        .proration_date
        .clamp(params.period_start, params.period_end);
    let remaining = (params.period_end - effective).num_seconds();
    let total = (params.period_end - params.period_start).num_seconds();
    if total <= 0 {
        return Decimal::ZERO;
    }
    Decimal::from(remaining) / Decimal::from(total)
}
