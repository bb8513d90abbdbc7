//! Domain models for billing-core.

mod coupon;
mod credit_grant;
mod plan;
mod schedule;
mod subscription;

pub use coupon::{Coupon, CouponType, CreateCoupon};
pub use credit_grant::{
    ApplicationStatus, CreateCreditGrant, CreditGrant, CreditGrantAction,
    CreditGrantApplication, CreditGrantCadence, CreditGrantScope, ExpirationDurationUnit,
    ExpirationType, ProcessScheduledApplicationsOutcome,
};
pub use plan::{
    BillingPeriod, CreatePlan, CreatePrice, InvoiceCadence, Plan, PlanSyncSummary, Price,
    PriceEntityType, PriceType, UpdatePlan,
};
pub use schedule::{SchedulePhase, SchedulePhaseInput, SubscriptionSchedule};
pub use subscription::{
    BillingCycleAlignment, BillingImpact, LineItemEntityType, ListSubscriptionsFilter,
    PauseMode, PauseStatus, PauseSubscription, ResumeSubscription, Subscription,
    SubscriptionLineItem, SubscriptionPause, SubscriptionStatus, UpdatePeriodItem,
    UpdatePeriodOutcome,
};

use serde::{Deserialize, Serialize};

/// Lifecycle status shared by plans, prices, grants, and line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Published,
    Archived,
    Deleted,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Published => "published",
            RecordStatus::Archived => "archived",
            RecordStatus::Deleted => "deleted",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "archived" => RecordStatus::Archived,
            "deleted" => RecordStatus::Deleted,
            _ => RecordStatus::Published,
        }
    }
}
