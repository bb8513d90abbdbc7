//! Plan and price models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{RecordStatus, Subscription};

/// Billing period length for prices and subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    HalfYearly,
    Annual,
}

impl BillingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingPeriod::Daily => "daily",
            BillingPeriod::Weekly => "weekly",
            BillingPeriod::Monthly => "monthly",
            BillingPeriod::Quarterly => "quarterly",
            BillingPeriod::HalfYearly => "half_yearly",
            BillingPeriod::Annual => "annual",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "daily" => BillingPeriod::Daily,
            "weekly" => BillingPeriod::Weekly,
            "quarterly" => BillingPeriod::Quarterly,
            "half_yearly" => BillingPeriod::HalfYearly,
            "annual" => BillingPeriod::Annual,
            _ => BillingPeriod::Monthly,
        }
    }
}

/// Whether a charge is billed at period start or period end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceCadence {
    Advance,
    Arrear,
}

impl InvoiceCadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceCadence::Advance => "advance",
            InvoiceCadence::Arrear => "arrear",
        }
    }
}

/// Fixed recurring charge or usage-metered charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    Fixed,
    Usage,
}

/// What entity a price belongs to. Subscription-scoped prices are overrides
/// of a plan price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceEntityType {
    Plan,
    Subscription,
}

/// Billing plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub lookup_key: Option<String>,
    pub status: RecordStatus,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Price attached to a plan or, as an override, to a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    pub price_id: Uuid,
    pub entity_type: PriceEntityType,
    pub entity_id: Uuid,
    /// Lineage pointer. Always the ROOT of the chain: if P2 supersedes P1
    /// and P3 supersedes P2, both P2 and P3 carry P1 here.
    pub parent_price_id: Option<Uuid>,
    pub price_type: PriceType,
    pub meter_id: Option<Uuid>,
    pub currency: String,
    pub billing_period: BillingPeriod,
    pub billing_period_count: i32,
    pub invoice_cadence: InvoiceCadence,
    pub amount: Decimal,
    pub display_name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: RecordStatus,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Price {
    /// Root of the lineage chain this price belongs to.
    pub fn root_price_id(&self) -> Uuid {
        self.parent_price_id.unwrap_or(self.price_id)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_date.map(|d| d <= now).unwrap_or(false)
    }

    /// A price fits a subscription only on an exact currency, period, and
    /// period-count match. No partial matches.
    pub fn is_eligible_for(&self, subscription: &Subscription) -> bool {
        self.currency.eq_ignore_ascii_case(&subscription.currency)
            && self.billing_period == subscription.billing_period
            && self.billing_period_count == subscription.billing_period_count
    }
}

/// Input for creating a plan.
#[derive(Debug, Clone)]
pub struct CreatePlan {
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub lookup_key: Option<String>,
}

/// Input for updating a plan.
#[derive(Debug, Clone, Default)]
pub struct UpdatePlan {
    pub name: Option<String>,
    pub description: Option<String>,
    pub lookup_key: Option<String>,
}

/// Input for creating a price.
#[derive(Debug, Clone)]
pub struct CreatePrice {
    pub entity_type: PriceEntityType,
    pub entity_id: Uuid,
    pub parent_price_id: Option<Uuid>,
    pub price_type: PriceType,
    pub meter_id: Option<Uuid>,
    pub currency: String,
    pub billing_period: BillingPeriod,
    pub billing_period_count: i32,
    pub invoice_cadence: InvoiceCadence,
    pub amount: Decimal,
    pub display_name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Counters reported by a plan price synchronization run.
///
/// Every examined price/subscription pair lands in exactly one of created,
/// skipped, or failed; the three `skipped_*` fields break down the skips.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanSyncSummary {
    pub subscriptions_processed: usize,
    pub prices_processed: usize,
    pub line_items_created: usize,
    pub line_items_terminated: usize,
    pub line_items_skipped: usize,
    pub skipped_incompatible: usize,
    pub skipped_already_terminated: usize,
    pub skipped_overridden: usize,
    pub line_items_failed: usize,
}
