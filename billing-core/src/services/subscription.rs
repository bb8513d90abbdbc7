//! Subscription lifecycle service: billing period advancement, pause and
//! resume, and cancellation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use service_core::clock::Clock;
use service_core::error::AppError;

use crate::models::{
    BillingImpact, InvoiceCadence, ListSubscriptionsFilter, PauseMode, PauseStatus,
    PauseSubscription, PriceType, RecordStatus, ResumeSubscription, Subscription,
    SubscriptionLineItem, SubscriptionPause, SubscriptionStatus, UpdatePeriodItem,
    UpdatePeriodOutcome,
};
use crate::stores::{
    InvoiceCreator, InvoiceReferencePoint, PriceStore, SubscriptionStore, TransactionRunner,
    WebhookEvent, WebhookPublisher,
};

use super::calendar;
use super::credit_grant::CreditGrantService;
use super::proration::{ProrationAction, ProrationCalculator, ProrationParams};

const UPDATE_PERIOD_BATCH_SIZE: i32 = 100;

/// Estimation window for pauses with no end date.
const DEFAULT_PAUSE_ESTIMATION_DAYS: i64 = 30;

/// Result of a pause or resume request. `subscription` and `pause` are absent
/// for dry runs.
#[derive(Debug, Clone)]
pub struct PauseOutcome {
    pub subscription: Option<Subscription>,
    pub pause: Option<SubscriptionPause>,
    pub billing_impact: BillingImpact,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub subscription: Subscription,
    /// Prorated credit for advance-billed fixed charges on immediate
    /// cancellation. Zero for period-end cancellation.
    pub proration_credit: Decimal,
}

pub struct SubscriptionService {
    subscriptions: Arc<dyn SubscriptionStore>,
    prices: Arc<dyn PriceStore>,
    invoices: Arc<dyn InvoiceCreator>,
    credit_grants: Arc<CreditGrantService>,
    proration: Arc<dyn ProrationCalculator>,
    tx: Arc<dyn TransactionRunner>,
    webhooks: Arc<dyn WebhookPublisher>,
    clock: Arc<dyn Clock>,
}

impl SubscriptionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        prices: Arc<dyn PriceStore>,
        invoices: Arc<dyn InvoiceCreator>,
        credit_grants: Arc<CreditGrantService>,
        proration: Arc<dyn ProrationCalculator>,
        tx: Arc<dyn TransactionRunner>,
        webhooks: Arc<dyn WebhookPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscriptions,
            prices,
            invoices,
            credit_grants,
            proration,
            tx,
            webhooks,
            clock,
        }
    }

    pub async fn get_subscription(&self, subscription_id: Uuid) -> Result<Subscription, AppError> {
        self.subscriptions.get(subscription_id).await
    }

    /// Advance every subscription whose current period has elapsed.
    ///
    /// Scans in batches and isolates failures: one bad subscription is
    /// recorded in the outcome and the run moves on.
    #[instrument(skip(self))]
    pub async fn update_billing_periods(&self) -> Result<UpdatePeriodOutcome, AppError> {
        let now = self.clock.now();
        let mut outcome = UpdatePeriodOutcome {
            items: Vec::new(),
            total_success: 0,
            total_failed: 0,
            start_at: now,
        };

        let mut page_token = None;
        loop {
            let filter = ListSubscriptionsFilter {
                // Paused subscriptions stay in the scan so scheduled pauses
                // activate and expired pauses auto-resume.
                statuses: vec![SubscriptionStatus::Active, SubscriptionStatus::Paused],
                plan_id: None,
                period_end_before: Some(now),
                page_size: UPDATE_PERIOD_BATCH_SIZE,
                page_token,
            };
            let batch = self.subscriptions.list(&filter).await?;
            if batch.is_empty() {
                break;
            }
            let batch_len = batch.len();
            page_token = batch.last().map(|s| s.subscription_id);

            for mut subscription in batch {
                let subscription_id = subscription.subscription_id;
                let old_start = subscription.current_period_start;
                let old_end = subscription.current_period_end;

                match self.process_subscription_period(&mut subscription, now).await {
                    Ok(()) => {
                        outcome.total_success += 1;
                        outcome.items.push(UpdatePeriodItem {
                            subscription_id,
                            period_start: subscription.current_period_start,
                            period_end: subscription.current_period_end,
                            success: true,
                            error: None,
                        });
                    }
                    Err(err) => {
                        warn!(
                            subscription_id = %subscription_id,
                            error = %err,
                            "failed to process subscription period"
                        );
                        outcome.total_failed += 1;
                        outcome.items.push(UpdatePeriodItem {
                            subscription_id,
                            period_start: old_start,
                            period_end: old_end,
                            success: false,
                            error: Some(err.to_string()),
                        });
                    }
                }
            }

            if batch_len < UPDATE_PERIOD_BATCH_SIZE as usize {
                break;
            }
        }

        info!(
            total_success = outcome.total_success,
            total_failed = outcome.total_failed,
            "billing period update run complete"
        );
        Ok(outcome)
    }

    /// Process one subscription up to `now`: pause transitions first, then
    /// period generation, invoicing, and the period commit.
    async fn process_subscription_period(
        &self,
        subscription: &mut Subscription,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        // A scheduled pause becomes active once its start arrives
        // (period-end pauses start when the current period closes).
        if subscription.pause_status == PauseStatus::Scheduled {
            if let Some(pause_id) = subscription.active_pause_id {
                let pause = self.subscriptions.get_pause(pause_id).await?;
                let due = match pause.pause_mode {
                    PauseMode::PeriodEnd => now >= subscription.current_period_end,
                    PauseMode::Scheduled | PauseMode::Immediate => now >= pause.pause_start,
                };
                if pause.pause_status == PauseStatus::Scheduled && due {
                    return self.activate_scheduled_pause(subscription, pause).await;
                }
            }
        }

        if subscription.status == SubscriptionStatus::Paused {
            let pause = match subscription.active_pause_id {
                Some(pause_id) => Some(self.subscriptions.get_pause(pause_id).await?),
                None => None,
            };
            let expired = pause
                .as_ref()
                .and_then(|p| p.pause_end)
                .map(|end| now >= end)
                .unwrap_or(false);
            match (pause, expired) {
                (Some(pause), true) => {
                    // Pause has run its course; resume and keep processing.
                    self.auto_resume(subscription, pause, now).await?;
                }
                _ => {
                    info!(
                        subscription_id = %subscription.subscription_id,
                        "skipping period processing for paused subscription"
                    );
                    return Ok(());
                }
            }
        }

        // Generate every period boundary between the current period end and
        // now, honoring the subscription end date.
        let mut periods = vec![(
            subscription.current_period_start,
            subscription.current_period_end,
        )];
        let mut current_end = subscription.current_period_end;
        while current_end < now {
            let next_end = calendar::next_billing_date(
                current_end,
                subscription.billing_anchor,
                subscription.billing_period_count,
                subscription.billing_period,
                subscription.end_date,
            )?;
            periods.push((current_end, next_end));
            // next == current means the end date ceiling was reached.
            if next_end == current_end {
                info!(
                    subscription_id = %subscription.subscription_id,
                    end_date = ?subscription.end_date,
                    "stopped period generation at subscription end date"
                );
                break;
            }
            current_end = next_end;
        }

        if periods.len() == 1 {
            debug!(
                subscription_id = %subscription.subscription_id,
                "no period transitions needed"
            );
            return Ok(());
        }

        let mut updated = subscription.clone();
        let work = async {
            // Every period but the last is closed: invoice it, then check
            // whether the subscription ends with it.
            for (start, end) in periods[..periods.len() - 1].iter().copied() {
                let invoice = self
                    .invoices
                    .create_subscription_invoice(
                        updated.subscription_id,
                        start,
                        end,
                        InvoiceReferencePoint::PeriodEnd,
                    )
                    .await?;

                if updated.cancel_at_period_end
                    && updated.cancel_at.map(|at| at <= end).unwrap_or(false)
                {
                    updated.status = SubscriptionStatus::Cancelled;
                    updated.cancelled_at = updated.cancel_at;
                    break;
                }

                if updated.end_date.map(|d| d == end).unwrap_or(false) {
                    updated.status = SubscriptionStatus::Cancelled;
                    updated.cancelled_at = updated.end_date;
                    info!(
                        subscription_id = %updated.subscription_id,
                        period_end = %end,
                        "cancelling subscription at end date"
                    );
                    break;
                }

                match invoice {
                    Some(invoice_id) => info!(
                        subscription_id = %updated.subscription_id,
                        invoice_id = %invoice_id,
                        period_start = %start,
                        period_end = %end,
                        "created invoice for closed period"
                    ),
                    // The period is still consumed; there was just nothing
                    // billable in it.
                    None => warn!(
                        subscription_id = %updated.subscription_id,
                        period_start = %start,
                        period_end = %end,
                        "no invoice created for period"
                    ),
                }
            }

            let (new_start, new_end) = periods[periods.len() - 1];
            updated.current_period_start = new_start;
            updated.current_period_end = new_end;

            if updated.cancel_at_period_end
                && updated.cancel_at.map(|at| at <= new_end).unwrap_or(false)
            {
                updated.status = SubscriptionStatus::Cancelled;
                updated.cancelled_at = updated.cancel_at;
            }
            if updated.end_date.map(|d| d == new_end).unwrap_or(false) {
                updated.status = SubscriptionStatus::Cancelled;
                updated.cancelled_at = updated.end_date;
            }

            updated.updated_utc = now;
            self.subscriptions.update(&updated).await?;

            info!(
                subscription_id = %updated.subscription_id,
                new_period_start = %updated.current_period_start,
                new_period_end = %updated.current_period_end,
                periods_processed = periods.len() - 1,
                "completed subscription period processing"
            );
            Ok(())
        };
        self.tx.with_tx(Box::pin(work)).await?;

        *subscription = updated;
        Ok(())
    }

    async fn activate_scheduled_pause(
        &self,
        subscription: &mut Subscription,
        mut pause: SubscriptionPause,
    ) -> Result<(), AppError> {
        let now = self.clock.now();
        pause.pause_status = PauseStatus::Active;
        pause.updated_utc = now;
        subscription.status = SubscriptionStatus::Paused;
        subscription.pause_status = PauseStatus::Active;
        subscription.updated_utc = now;

        let sub_ref = &*subscription;
        let pause_ref = &pause;
        let work = async {
            self.subscriptions.update(sub_ref).await?;
            self.subscriptions.update_pause(pause_ref).await?;
            Ok(())
        };
        self.tx.with_tx(Box::pin(work)).await?;

        info!(
            subscription_id = %subscription.subscription_id,
            pause_id = %pause.pause_id,
            "activated scheduled pause"
        );
        Ok(())
    }

    /// Complete an expired pause and push the current period end out by the
    /// time spent paused.
    async fn auto_resume(
        &self,
        subscription: &mut Subscription,
        mut pause: SubscriptionPause,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let pause_duration = now - pause.pause_start;

        pause.pause_status = PauseStatus::Completed;
        pause.resumed_at = Some(now);
        pause.updated_utc = now;

        subscription.status = SubscriptionStatus::Active;
        subscription.pause_status = PauseStatus::None;
        subscription.active_pause_id = None;
        subscription.current_period_end += pause_duration;
        subscription.updated_utc = now;

        let sub_ref = &*subscription;
        let pause_ref = &pause;
        let work = async {
            self.subscriptions.update(sub_ref).await?;
            self.subscriptions.update_pause(pause_ref).await?;
            Ok(())
        };
        self.tx.with_tx(Box::pin(work)).await?;

        info!(
            subscription_id = %subscription.subscription_id,
            pause_id = %pause.pause_id,
            pause_duration_secs = pause_duration.num_seconds(),
            "auto-resumed subscription"
        );
        Ok(())
    }

    #[instrument(skip(self, request), fields(subscription_id = %subscription_id))]
    pub async fn pause_subscription(
        &self,
        subscription_id: Uuid,
        request: &PauseSubscription,
    ) -> Result<PauseOutcome, AppError> {
        let (mut subscription, line_items) = self
            .subscriptions
            .get_with_line_items(subscription_id)
            .await?;

        if subscription.status != SubscriptionStatus::Active {
            return Err(AppError::validation_with_details(
                "invalid subscription status",
                "Subscription is not active",
                json!({ "status": subscription.status.as_str() }),
            ));
        }

        let now = self.clock.now();
        let (pause_start, pause_end) = calculate_pause_window(request, &subscription, now)?;
        let impact = calculate_billing_impact(
            &subscription,
            &line_items,
            pause_start,
            pause_end,
            None,
            now,
        )?;

        if request.dry_run {
            return Ok(PauseOutcome {
                subscription: None,
                pause: None,
                billing_impact: impact,
                dry_run: true,
            });
        }

        // Only an immediate pause flips the subscription status; scheduled
        // and period-end pauses wait for the advancer to activate them.
        let pause_status = match request.pause_mode {
            PauseMode::Immediate => PauseStatus::Active,
            PauseMode::Scheduled | PauseMode::PeriodEnd => PauseStatus::Scheduled,
        };
        let pause = SubscriptionPause {
            pause_id: Uuid::new_v4(),
            subscription_id,
            pause_status,
            pause_mode: request.pause_mode,
            pause_start,
            pause_end,
            original_period_start: subscription.current_period_start,
            original_period_end: subscription.current_period_end,
            resumed_at: None,
            reason: request.reason.clone(),
            created_utc: now,
            updated_utc: now,
        };

        subscription.pause_status = pause_status;
        subscription.active_pause_id = Some(pause.pause_id);
        if request.pause_mode == PauseMode::Immediate {
            subscription.status = SubscriptionStatus::Paused;
        }
        subscription.updated_utc = now;

        let sub_ref = &subscription;
        let pause_ref = &pause;
        let work = async {
            self.subscriptions.create_pause(pause_ref).await?;
            self.subscriptions.update(sub_ref).await?;
            Ok(())
        };
        self.tx.with_tx(Box::pin(work)).await?;

        self.publish_webhook(WebhookEvent::SubscriptionUpdated, subscription_id)
            .await;
        self.publish_webhook(WebhookEvent::SubscriptionPaused, subscription_id)
            .await;

        Ok(PauseOutcome {
            subscription: Some(subscription),
            pause: Some(pause),
            billing_impact: impact,
            dry_run: false,
        })
    }

    #[instrument(skip(self, request), fields(subscription_id = %subscription_id))]
    pub async fn resume_subscription(
        &self,
        subscription_id: Uuid,
        request: &ResumeSubscription,
    ) -> Result<PauseOutcome, AppError> {
        let (mut subscription, line_items) = self
            .subscriptions
            .get_with_line_items(subscription_id)
            .await?;

        let mut pause = self.require_active_pause(&subscription).await?;

        let now = self.clock.now();
        let impact = calculate_billing_impact(
            &subscription,
            &line_items,
            pause.pause_start,
            pause.pause_end,
            Some(&pause),
            now,
        )?;

        if request.dry_run {
            return Ok(PauseOutcome {
                subscription: None,
                pause: None,
                billing_impact: impact,
                dry_run: true,
            });
        }

        let pause_duration = now - pause.pause_start;
        pause.pause_status = PauseStatus::Completed;
        pause.resumed_at = Some(now);
        pause.updated_utc = now;

        subscription.pause_status = PauseStatus::None;
        subscription.active_pause_id = None;
        if subscription.status == SubscriptionStatus::Paused {
            subscription.status = SubscriptionStatus::Active;
        }
        subscription.current_period_end += pause_duration;
        subscription.updated_utc = now;

        let sub_ref = &subscription;
        let pause_ref = &pause;
        let work = async {
            self.subscriptions.update_pause(pause_ref).await?;
            self.subscriptions.update(sub_ref).await?;
            Ok(())
        };
        self.tx.with_tx(Box::pin(work)).await?;

        self.publish_webhook(WebhookEvent::SubscriptionUpdated, subscription_id)
            .await;
        self.publish_webhook(WebhookEvent::SubscriptionResumed, subscription_id)
            .await;

        Ok(PauseOutcome {
            subscription: Some(subscription),
            pause: Some(pause),
            billing_impact: impact,
            dry_run: false,
        })
    }

    /// Billing impact of a pause request, without mutating anything.
    pub async fn calculate_pause_impact(
        &self,
        subscription_id: Uuid,
        request: &PauseSubscription,
    ) -> Result<BillingImpact, AppError> {
        let (subscription, line_items) = self
            .subscriptions
            .get_with_line_items(subscription_id)
            .await?;

        if subscription.status != SubscriptionStatus::Active {
            return Err(AppError::validation_with_details(
                "invalid subscription status",
                "Subscription is not active",
                json!({ "status": subscription.status.as_str() }),
            ));
        }

        let now = self.clock.now();
        let (pause_start, pause_end) = calculate_pause_window(request, &subscription, now)?;
        calculate_billing_impact(&subscription, &line_items, pause_start, pause_end, None, now)
    }

    /// Billing impact of resuming now, without mutating anything.
    pub async fn calculate_resume_impact(
        &self,
        subscription_id: Uuid,
    ) -> Result<BillingImpact, AppError> {
        let (subscription, line_items) = self
            .subscriptions
            .get_with_line_items(subscription_id)
            .await?;
        let pause = self.require_active_pause(&subscription).await?;
        calculate_billing_impact(
            &subscription,
            &line_items,
            pause.pause_start,
            pause.pause_end,
            Some(&pause),
            self.clock.now(),
        )
    }

    async fn require_active_pause(
        &self,
        subscription: &Subscription,
    ) -> Result<SubscriptionPause, AppError> {
        if subscription.status != SubscriptionStatus::Paused
            && subscription.pause_status != PauseStatus::Scheduled
        {
            return Err(AppError::validation_with_details(
                "invalid subscription status",
                "Subscription is not paused",
                json!({ "status": subscription.status.as_str() }),
            ));
        }
        let pause_id = subscription.active_pause_id.ok_or_else(|| {
            AppError::validation("invalid subscription status", "Subscription has no active pause")
        })?;
        self.subscriptions.get_pause(pause_id).await
    }

    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    pub async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        cancel_at_period_end: bool,
    ) -> Result<CancelOutcome, AppError> {
        let (mut subscription, line_items) = self
            .subscriptions
            .get_with_line_items(subscription_id)
            .await?;

        if subscription.status == SubscriptionStatus::Cancelled {
            return Err(AppError::validation_with_details(
                "subscription is already cancelled",
                "The subscription is already cancelled",
                json!({ "subscription_id": subscription_id }),
            ));
        }

        let now = self.clock.now();
        subscription.cancelled_at = Some(now);

        let mut proration_credit = Decimal::ZERO;
        if cancel_at_period_end {
            subscription.cancel_at_period_end = true;
            subscription.cancel_at = Some(subscription.current_period_end);
        } else {
            subscription.status = SubscriptionStatus::Cancelled;
            subscription.cancel_at = None;
            proration_credit = self
                .cancellation_credit(&subscription, &line_items, now)
                .await?;
        }
        subscription.updated_utc = now;

        let sub_ref = &subscription;
        let work = async {
            self.credit_grants
                .cancel_future_subscription_grants(sub_ref.subscription_id)
                .await?;
            self.subscriptions.update(sub_ref).await?;
            Ok(())
        };
        self.tx.with_tx(Box::pin(work)).await?;

        self.publish_webhook(WebhookEvent::SubscriptionUpdated, subscription_id)
            .await;
        self.publish_webhook(WebhookEvent::SubscriptionCancelled, subscription_id)
            .await;

        Ok(CancelOutcome {
            subscription,
            proration_credit,
        })
    }

    /// Prorated credit owed for the unused remainder of advance-billed fixed
    /// charges.
    async fn cancellation_credit(
        &self,
        subscription: &Subscription,
        line_items: &[SubscriptionLineItem],
        now: DateTime<Utc>,
    ) -> Result<Decimal, AppError> {
        let mut credit = Decimal::ZERO;
        for item in line_items {
            if item.status != RecordStatus::Published || item.price_type != PriceType::Fixed {
                continue;
            }
            let price = self.prices.get(item.price_id).await?;
            let params = ProrationParams {
                line_item_id: item.line_item_id,
                amount: price.amount * item.quantity,
                pay_in_advance: item.invoice_cadence == InvoiceCadence::Advance,
                period_start: subscription.current_period_start,
                period_end: subscription.current_period_end,
                proration_date: now,
                action: ProrationAction::Cancellation,
            };
            credit += self.proration.calculate(&params)?.credit_amount;
        }
        Ok(credit)
    }

    pub async fn get_pause(&self, pause_id: Uuid) -> Result<SubscriptionPause, AppError> {
        self.subscriptions.get_pause(pause_id).await
    }

    pub async fn list_pauses(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<SubscriptionPause>, AppError> {
        self.subscriptions.list_pauses(subscription_id).await
    }

    async fn publish_webhook(&self, event: WebhookEvent, subscription_id: Uuid) {
        if let Err(err) = self.webhooks.publish(event, subscription_id).await {
            warn!(
                event = event.as_str(),
                subscription_id = %subscription_id,
                error = %err,
                "failed to publish webhook event"
            );
        }
    }
}

/// Resolve the pause window from the request and the subscription's current
/// period.
fn calculate_pause_window(
    request: &PauseSubscription,
    subscription: &Subscription,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, Option<DateTime<Utc>>), AppError> {
    let pause_start = match request.pause_mode {
        PauseMode::Immediate => now,
        PauseMode::Scheduled => request.pause_start.ok_or_else(|| {
            AppError::validation("invalid pause start date", "Pause start date is required")
        })?,
        PauseMode::PeriodEnd => subscription.current_period_end,
    };

    let pause_end = if let Some(days) = request.pause_days {
        Some(pause_start + Duration::days(days))
    } else {
        request.pause_end
    };

    if let Some(end) = pause_end {
        if end < pause_start {
            return Err(AppError::validation_with_details(
                "invalid pause end date",
                "Pause end date is not valid",
                json!({ "pause_start": pause_start, "pause_end": end }),
            ));
        }
    }

    Ok((pause_start, pause_end))
}

/// Pure estimate of the billing consequences of a pause or resume.
///
/// The cadence comes from the first fixed-price line item (arrear when none
/// exists). Pass the active pause as `resume_from` for resume impact.
pub fn calculate_billing_impact(
    subscription: &Subscription,
    line_items: &[SubscriptionLineItem],
    pause_start: DateTime<Utc>,
    pause_end: Option<DateTime<Utc>>,
    resume_from: Option<&SubscriptionPause>,
    now: DateTime<Utc>,
) -> Result<BillingImpact, AppError> {
    let cadence = line_items
        .iter()
        .find(|li| li.price_type == PriceType::Fixed)
        .map(|li| li.invoice_cadence)
        .unwrap_or(InvoiceCadence::Arrear);

    let mut impact = BillingImpact::default();
    let hundred = Decimal::new(10000, 2);

    if let Some(pause) = resume_from {
        impact.original_period_start = Some(pause.original_period_start);
        impact.original_period_end = Some(pause.original_period_end);

        let pause_duration = now - pause.pause_start;
        impact.pause_duration_days = pause_duration.num_hours() / 24;
        impact.next_billing_date = Some(now);

        let adjusted_end = pause.original_period_end + pause_duration;
        impact.adjusted_period_start = Some(now);
        impact.adjusted_period_end = Some(adjusted_end);

        impact.next_billing_amount = match cadence {
            InvoiceCadence::Advance => {
                let total = pause.original_period_end - pause.original_period_start;
                let remaining = adjusted_end - now;
                hundred * duration_ratio(remaining, total) // Placeholder value
            }
            InvoiceCadence::Arrear => Decimal::ZERO,
        };
        return Ok(impact);
    }

    impact.original_period_start = Some(subscription.current_period_start);
    impact.original_period_end = Some(subscription.current_period_end);

    let total = subscription.current_period_end - subscription.current_period_start;
    impact.period_adjustment_amount = match cadence {
        InvoiceCadence::Advance => {
            // Credit for the unused remainder of the period.
            let unused = subscription.current_period_end - pause_start;
            -hundred * duration_ratio(unused, total) // Placeholder value
        }
        InvoiceCadence::Arrear => {
            // Charge for the portion already used.
            let used = pause_start - subscription.current_period_start;
            hundred * duration_ratio(used, total) // Placeholder value
        }
    };

    match pause_end {
        Some(end) => {
            let pause_duration = end - pause_start;
            impact.pause_duration_days = pause_duration.num_hours() / 24;
            impact.next_billing_date = Some(end);
            impact.adjusted_period_start = Some(pause_start);
            impact.adjusted_period_end = Some(subscription.current_period_end + pause_duration);
        }
        None => {
            // Indefinite pause: estimate with a default window.
            impact.pause_duration_days = DEFAULT_PAUSE_ESTIMATION_DAYS;
            impact.next_billing_date =
                Some(pause_start + Duration::days(DEFAULT_PAUSE_ESTIMATION_DAYS));
            impact.adjusted_period_start = Some(pause_start);
            impact.adjusted_period_end = Some(
                subscription.current_period_end + Duration::days(DEFAULT_PAUSE_ESTIMATION_DAYS),
            );
        }
    }

    Ok(impact)
}

fn duration_ratio(numerator: Duration, denominator: Duration) -> Decimal {
    let den = denominator.num_seconds();
    if den <= 0 {
        return Decimal::ZERO;
    }
    Decimal::from(numerator.num_seconds()) / Decimal::from(den)
}
