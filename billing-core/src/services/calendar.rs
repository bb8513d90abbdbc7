//! Billing period date math.
//!
//! The billing anchor is the reference point for every cycle:
//! - monthly-based periods take the anchor's day of month (clamped to the
//!   target month's length),
//! - annual periods also preserve the anchor's month,
//! - weekly periods align to the anchor's weekday,
//! - the time of day always comes from the anchor.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde_json::json;

use service_core::error::AppError;

use crate::models::BillingPeriod;

/// Next period boundary after `current_period_start`.
///
/// With an `end_date` ceiling the result is clamped to the ceiling; once the
/// input already sits at the ceiling the input comes back unchanged, which
/// callers treat as the cannot-advance signal.
pub fn next_billing_date(
    current_period_start: DateTime<Utc>,
    billing_anchor: DateTime<Utc>,
    period_count: i32,
    period: BillingPeriod,
    end_date: Option<DateTime<Utc>>,
) -> Result<DateTime<Utc>, AppError> {
    validate_period_count(period_count)?;

    if let Some(end) = end_date {
        if current_period_start >= end {
            return Ok(end);
        }
    }

    let next = advance(current_period_start, billing_anchor, period_count, period)?;

    if let Some(end) = end_date {
        if next > end {
            return Ok(end);
        }
    }
    Ok(next)
}

/// Previous period boundary before `current_period_start`. Inverse of
/// [`next_billing_date`] without a ceiling.
pub fn previous_billing_date(
    current_period_start: DateTime<Utc>,
    billing_anchor: DateTime<Utc>,
    period_count: i32,
    period: BillingPeriod,
) -> Result<DateTime<Utc>, AppError> {
    validate_period_count(period_count)?;
    advance(current_period_start, billing_anchor, -period_count, period)
}

fn validate_period_count(period_count: i32) -> Result<(), AppError> {
    if period_count <= 0 {
        return Err(AppError::validation_with_details(
            "billing period count must be a positive integer",
            "Billing period count must be a positive integer",
            json!({ "period_count": period_count }),
        ));
    }
    Ok(())
}

fn advance(
    current: DateTime<Utc>,
    anchor: DateTime<Utc>,
    count: i32,
    period: BillingPeriod,
) -> Result<DateTime<Utc>, AppError> {
    match period {
        BillingPeriod::Daily => Ok(current + Duration::days(count as i64)),
        BillingPeriod::Weekly => weekly(current, anchor, count),
        BillingPeriod::Monthly => month_based(current, anchor, count, false),
        BillingPeriod::Quarterly => month_based(current, anchor, count.saturating_mul(3), false),
        BillingPeriod::HalfYearly => month_based(current, anchor, count.saturating_mul(6), false),
        BillingPeriod::Annual => month_based(current, anchor, count.saturating_mul(12), true),
    }
}

fn weekly(
    current: DateTime<Utc>,
    anchor: DateTime<Utc>,
    count: i32,
) -> Result<DateTime<Utc>, AppError> {
    let anchor_weekday = anchor.weekday().num_days_from_sunday() as i64;
    let current_weekday = current.weekday().num_days_from_sunday() as i64;
    let count = count as i64;

    let days = if count >= 0 {
        let mut days = anchor_weekday - current_weekday;
        if days < 0 {
            days += 7;
        }
        days += (count - 1) * 7;
        if anchor_weekday == current_weekday {
            days = count * 7;
        }
        days
    } else {
        // Going backwards: align to the anchor weekday on or before the
        // current date, then step whole weeks.
        let mut days = anchor_weekday - current_weekday;
        if days > 0 {
            days -= 7;
        }
        days += (count + 1) * 7;
        if anchor_weekday == current_weekday {
            days = count * 7;
        }
        days
    };

    at_anchor_time(current.date_naive() + Duration::days(days), anchor)
}

fn month_based(
    current: DateTime<Utc>,
    anchor: DateTime<Utc>,
    months: i32,
    preserve_anchor_month: bool,
) -> Result<DateTime<Utc>, AppError> {
    let mut target_year = current.year();
    let mut target_month = current.month() as i32 + months;

    while target_month > 12 {
        target_month -= 12;
        target_year += 1;
    }
    while target_month < 1 {
        target_month += 12;
        target_year -= 1;
    }

    if preserve_anchor_month {
        target_month = anchor.month() as i32;
    }

    // Anchor day of month, clamped to the target month's length. This also
    // covers Feb 29 anchors in non-leap years.
    let mut target_day = anchor.day();
    let last_day = last_day_of_month(target_year, target_month as u32);
    if target_day > last_day {
        target_day = last_day;
    }

    let date = NaiveDate::from_ymd_opt(target_year, target_month as u32, target_day)
        .ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "invalid billing date {}-{}-{}",
                target_year,
                target_month,
                target_day
            ))
        })?;
    at_anchor_time(date, anchor)
}

fn at_anchor_time(date: NaiveDate, anchor: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
    let datetime = date
        .and_hms_opt(anchor.hour(), anchor.minute(), anchor.second())
        .ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("invalid anchor time of day"))
        })?;
    Ok(Utc.from_utc_datetime(&datetime))
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}
