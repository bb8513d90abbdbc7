//! Domain services. Each service owns one slice of the billing domain and
//! talks to the outside world only through the [`crate::stores`] traits.

pub mod calendar;
pub mod coupon;
pub mod credit_grant;
pub mod plan;
pub mod proration;
pub mod schedule;
pub mod subscription;

pub use coupon::CouponService;
pub use credit_grant::{
    calculate_next_credit_grant_period, compute_expiry_date, determine_credit_grant_action,
    generate_idempotency_key, CreditGrantService,
};
pub use plan::PlanService;
pub use proration::{
    ProrationAction, ProrationCalculator, ProrationParams, ProrationResult,
    TimeBasedProrationCalculator,
};
pub use schedule::ScheduleService;
pub use subscription::{
    calculate_billing_impact, CancelOutcome, PauseOutcome, SubscriptionService,
};
