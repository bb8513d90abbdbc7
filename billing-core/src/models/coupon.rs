//! Coupon model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RecordStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponType {
    Fixed,
    Percentage,
}

/// Discount coupon. Carries exactly one of `amount_off` or `percentage_off`
/// depending on `coupon_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub coupon_id: Uuid,
    pub name: String,
    pub coupon_type: CouponType,
    pub amount_off: Option<Decimal>,
    pub percentage_off: Option<Decimal>,
    pub currency: Option<String>,
    pub redeem_after: Option<DateTime<Utc>>,
    pub redeem_before: Option<DateTime<Utc>>,
    pub status: RecordStatus,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a coupon.
#[derive(Debug, Clone)]
pub struct CreateCoupon {
    pub name: String,
    pub coupon_type: CouponType,
    pub amount_off: Option<Decimal>,
    pub percentage_off: Option<Decimal>,
    pub currency: Option<String>,
    pub redeem_after: Option<DateTime<Utc>>,
    pub redeem_before: Option<DateTime<Utc>>,
}
