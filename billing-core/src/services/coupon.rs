//! Coupon administration.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use service_core::clock::Clock;
use service_core::error::AppError;

use crate::models::{Coupon, CouponType, CreateCoupon, RecordStatus};
use crate::stores::CouponStore;

pub struct CouponService {
    coupons: Arc<dyn CouponStore>,
    clock: Arc<dyn Clock>,
}

impl CouponService {
    pub fn new(coupons: Arc<dyn CouponStore>, clock: Arc<dyn Clock>) -> Self {
        Self { coupons, clock }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_coupon(&self, request: &CreateCoupon) -> Result<Coupon, AppError> {
        validate_create(request)?;
        let now = self.clock.now();
        let coupon = Coupon {
            coupon_id: Uuid::new_v4(),
            name: request.name.clone(),
            coupon_type: request.coupon_type,
            amount_off: request.amount_off,
            percentage_off: request.percentage_off,
            currency: request.currency.clone(),
            redeem_after: request.redeem_after,
            redeem_before: request.redeem_before,
            status: RecordStatus::Published,
            created_utc: now,
            updated_utc: now,
        };
        self.coupons.create(&coupon).await?;
        Ok(coupon)
    }

    pub async fn get_coupon(&self, coupon_id: Uuid) -> Result<Coupon, AppError> {
        self.coupons.get(coupon_id).await
    }

    pub async fn list_coupons(&self) -> Result<Vec<Coupon>, AppError> {
        self.coupons.list().await
    }

    /// Soft delete. The coupon stays readable but can no longer be redeemed.
    pub async fn delete_coupon(&self, coupon_id: Uuid) -> Result<(), AppError> {
        let mut coupon = self.coupons.get(coupon_id).await?;
        coupon.status = RecordStatus::Deleted;
        coupon.updated_utc = self.clock.now();
        self.coupons.update(&coupon).await
    }
}

fn validate_create(request: &CreateCoupon) -> Result<(), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::validation(
            "coupon name must not be empty",
            "Provide a coupon name",
        ));
    }
    match request.coupon_type {
        CouponType::Fixed => {
            if request.amount_off.is_none() || request.percentage_off.is_some() {
                return Err(AppError::validation(
                    "fixed coupons carry amount_off and nothing else",
                    "Set amount_off and leave percentage_off empty",
                ));
            }
            if request.currency.as_deref().map(str::is_empty).unwrap_or(true) {
                return Err(AppError::validation(
                    "fixed coupons require a currency",
                    "Provide the currency of the discount amount",
                ));
            }
        }
        CouponType::Percentage => {
            let percentage = match request.percentage_off {
                Some(p) if request.amount_off.is_none() => p,
                _ => {
                    return Err(AppError::validation(
                        "percentage coupons carry percentage_off and nothing else",
                        "Set percentage_off and leave amount_off empty",
                    ));
                }
            };
            if percentage <= Decimal::ZERO || percentage > Decimal::new(100, 0) {
                return Err(AppError::validation_with_details(
                    "percentage_off must be between 0 and 100",
                    "Provide a percentage in (0, 100]",
                    json!({ "percentage_off": percentage }),
                ));
            }
        }
    }
    if let (Some(after), Some(before)) = (request.redeem_after, request.redeem_before) {
        if before <= after {
            return Err(AppError::validation(
                "redemption window is inverted",
                "redeem_before must be after redeem_after",
            ));
        }
    }
    Ok(())
}
