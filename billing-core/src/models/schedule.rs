//! Subscription schedule models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered set of contiguous phases overriding subscription terms over time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSchedule {
    pub schedule_id: Uuid,
    pub subscription_id: Uuid,
    pub phases: Vec<SchedulePhase>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// One phase of a schedule. Phases are contiguous and non-overlapping; only
/// the last phase may be open-ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulePhase {
    pub phase_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub commitment_amount: Option<Decimal>,
    pub overage_factor: Option<Decimal>,
}

/// Input for one phase when creating a schedule or appending to one.
#[derive(Debug, Clone)]
pub struct SchedulePhaseInput {
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub commitment_amount: Option<Decimal>,
    pub overage_factor: Option<Decimal>,
}
