//! Credit grant and credit grant application models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BillingPeriod, RecordStatus};

/// Whether a grant is defined on a plan or directly on a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditGrantScope {
    Plan,
    Subscription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditGrantCadence {
    OneTime,
    Recurring,
}

/// When granted credits expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationType {
    Never,
    Duration,
    BillingCycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationDurationUnit {
    Days,
    Weeks,
    Months,
    Years,
}

/// State of one credit grant application attempt.
///
/// `Pending` and `Deferred` are schedulable; `Applied`, `Skipped`,
/// `Cancelled` are terminal; `Failed` is terminal for the attempt but the
/// application may be picked up again for retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Applied,
    Skipped,
    Deferred,
    Failed,
    Cancelled,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Skipped => "skipped",
            ApplicationStatus::Deferred => "deferred",
            ApplicationStatus::Failed => "failed",
            ApplicationStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "applied" => ApplicationStatus::Applied,
            "skipped" => ApplicationStatus::Skipped,
            "deferred" => ApplicationStatus::Deferred,
            "failed" => ApplicationStatus::Failed,
            "cancelled" => ApplicationStatus::Cancelled,
            _ => ApplicationStatus::Pending,
        }
    }
}

/// What to do with a due application given the subscription's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditGrantAction {
    Apply,
    Skip,
    Defer,
    Cancel,
}

/// Credit grant definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditGrant {
    pub credit_grant_id: Uuid,
    pub name: String,
    pub scope: CreditGrantScope,
    pub plan_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub credits: Decimal,
    pub cadence: CreditGrantCadence,
    /// Recurrence period; required for recurring grants.
    pub period: Option<BillingPeriod>,
    pub period_count: Option<i32>,
    pub credit_grant_anchor: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub expiration_type: ExpirationType,
    pub expiration_duration: Option<i32>,
    pub expiration_duration_unit: Option<ExpirationDurationUnit>,
    pub priority: Option<i32>,
    pub status: RecordStatus,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// One scheduled (or executed) application of a grant to a subscription
/// period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditGrantApplication {
    pub application_id: Uuid,
    pub credit_grant_id: Uuid,
    pub subscription_id: Uuid,
    pub scheduled_for: DateTime<Utc>,
    pub period_start: DateTime<Utc>,
    pub period_end: Option<DateTime<Utc>>,
    pub credits: Decimal,
    pub application_status: ApplicationStatus,
    pub retry_count: i32,
    pub failure_reason: Option<String>,
    pub applied_at: Option<DateTime<Utc>>,
    /// Deterministic across retries for the same grant and period.
    pub idempotency_key: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a credit grant.
#[derive(Debug, Clone)]
pub struct CreateCreditGrant {
    pub name: String,
    pub scope: CreditGrantScope,
    pub plan_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub credits: Decimal,
    pub cadence: CreditGrantCadence,
    pub period: Option<BillingPeriod>,
    pub period_count: Option<i32>,
    pub credit_grant_anchor: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub expiration_type: ExpirationType,
    pub expiration_duration: Option<i32>,
    pub expiration_duration_unit: Option<ExpirationDurationUnit>,
    pub priority: Option<i32>,
}

/// Aggregate outcome of a scheduled-applications processing run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessScheduledApplicationsOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}
