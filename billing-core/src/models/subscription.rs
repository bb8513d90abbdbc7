//! Subscription, line item, and pause models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BillingPeriod, InvoiceCadence, PriceType, RecordStatus};

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Incomplete,
    Active,
    Paused,
    Cancelled,
    Trialing,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Trialing => "trialing",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "incomplete" => SubscriptionStatus::Incomplete,
            "paused" => SubscriptionStatus::Paused,
            "cancelled" => SubscriptionStatus::Cancelled,
            "trialing" => SubscriptionStatus::Trialing,
            _ => SubscriptionStatus::Active,
        }
    }
}

/// Pause state, used both on the subscription and on pause records.
///
/// A subscription carries `None | Scheduled | Active`; a pause record moves
/// `Scheduled -> Active -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseStatus {
    None,
    Scheduled,
    Active,
    Completed,
}

impl PauseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PauseStatus::None => "none",
            PauseStatus::Scheduled => "scheduled",
            PauseStatus::Active => "active",
            PauseStatus::Completed => "completed",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "scheduled" => PauseStatus::Scheduled,
            "active" => PauseStatus::Active,
            "completed" => PauseStatus::Completed,
            _ => PauseStatus::None,
        }
    }
}

/// When a requested pause takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseMode {
    Immediate,
    Scheduled,
    PeriodEnd,
}

impl PauseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PauseMode::Immediate => "immediate",
            PauseMode::Scheduled => "scheduled",
            PauseMode::PeriodEnd => "period_end",
        }
    }
}

/// How period boundaries align: to the subscription start day or to the
/// calendar unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycleAlignment {
    Anniversary,
    Calendar,
}

/// What a line item bills for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemEntityType {
    Plan,
    Addon,
}

/// Subscription.
///
/// `current_period_start..current_period_end` is half-open: the end instant
/// belongs to the next period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub subscription_id: Uuid,
    pub tenant_id: Uuid,
    pub environment_id: Uuid,
    pub customer_id: Uuid,
    pub plan_id: Uuid,
    pub currency: String,
    pub status: SubscriptionStatus,
    pub billing_anchor: DateTime<Utc>,
    pub billing_period: BillingPeriod,
    pub billing_period_count: i32,
    pub billing_cycle: BillingCycleAlignment,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub pause_status: PauseStatus,
    pub active_pause_id: Option<Uuid>,
    pub cancel_at_period_end: bool,
    pub cancel_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub commitment_amount: Option<Decimal>,
    pub overage_factor: Option<Decimal>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// One billed component of a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionLineItem {
    pub line_item_id: Uuid,
    pub subscription_id: Uuid,
    pub customer_id: Uuid,
    pub entity_type: LineItemEntityType,
    pub entity_id: Uuid,
    pub price_id: Uuid,
    pub price_type: PriceType,
    pub meter_id: Option<Uuid>,
    pub currency: String,
    pub billing_period: BillingPeriod,
    pub invoice_cadence: InvoiceCadence,
    pub display_name: String,
    pub quantity: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: RecordStatus,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Immutable record of one pause interval.
///
/// The original period bounds are snapshotted at pause time so the resume
/// shift can be audited against what the period looked like before.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPause {
    pub pause_id: Uuid,
    pub subscription_id: Uuid,
    pub pause_status: PauseStatus,
    pub pause_mode: PauseMode,
    pub pause_start: DateTime<Utc>,
    pub pause_end: Option<DateTime<Utc>>,
    pub original_period_start: DateTime<Utc>,
    pub original_period_end: DateTime<Utc>,
    pub resumed_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for pausing a subscription.
#[derive(Debug, Clone)]
pub struct PauseSubscription {
    pub pause_mode: PauseMode,
    /// Required for `Scheduled` mode, ignored otherwise.
    pub pause_start: Option<DateTime<Utc>>,
    pub pause_end: Option<DateTime<Utc>>,
    pub pause_days: Option<i64>,
    pub reason: Option<String>,
    pub dry_run: bool,
}

/// Input for resuming a subscription.
#[derive(Debug, Clone, Default)]
pub struct ResumeSubscription {
    pub dry_run: bool,
}

/// Estimated billing consequences of a pause or resume.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BillingImpact {
    /// Adjustment to the current period: negative is a credit owed to the
    /// customer, positive a charge.
    pub period_adjustment_amount: Decimal,
    pub pause_duration_days: i64,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub next_billing_amount: Decimal,
    pub original_period_start: Option<DateTime<Utc>>,
    pub original_period_end: Option<DateTime<Utc>>,
    pub adjusted_period_start: Option<DateTime<Utc>>,
    pub adjusted_period_end: Option<DateTime<Utc>>,
}

/// Per-subscription outcome of a billing period update run.
#[derive(Debug, Clone, Serialize)]
pub struct UpdatePeriodItem {
    pub subscription_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
}

/// Aggregate outcome of a billing period update run.
#[derive(Debug, Clone, Serialize)]
pub struct UpdatePeriodOutcome {
    pub items: Vec<UpdatePeriodItem>,
    pub total_success: usize,
    pub total_failed: usize,
    pub start_at: DateTime<Utc>,
}

/// Filter parameters for listing subscriptions.
#[derive(Debug, Clone, Default)]
pub struct ListSubscriptionsFilter {
    pub statuses: Vec<SubscriptionStatus>,
    pub plan_id: Option<Uuid>,
    /// Only subscriptions whose current period ended at or before this
    /// instant.
    pub period_end_before: Option<DateTime<Utc>>,
    pub page_size: i32,
    pub page_token: Option<Uuid>,
}
