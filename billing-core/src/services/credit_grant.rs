//! Credit grant service: grant CRUD plus the application state machine that
//! turns grants into wallet credits, period after period.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use service_core::clock::Clock;
use service_core::error::AppError;

use crate::models::{
    ApplicationStatus, CreateCreditGrant, CreditGrant, CreditGrantAction,
    CreditGrantApplication, CreditGrantCadence, CreditGrantScope, ExpirationDurationUnit,
    ExpirationType, PriceType, ProcessScheduledApplicationsOutcome, RecordStatus, Subscription,
    SubscriptionStatus,
};
use crate::stores::{
    CreateWallet, CreditGrantApplicationStore, CreditGrantStore, PlanStore, SubscriptionStore,
    TransactionRunner, WalletService, WalletSummary, WalletTopUp,
};

use super::calendar;

/// What to do with a due application, from the subscription's state alone.
///
/// Terminal subscription states cancel the chain; recoverable ones defer it;
/// a pause skips the period but keeps the chain alive.
pub fn determine_credit_grant_action(subscription: &Subscription) -> CreditGrantAction {
    match subscription.status {
        SubscriptionStatus::Cancelled => CreditGrantAction::Cancel,
        SubscriptionStatus::Paused => CreditGrantAction::Skip,
        SubscriptionStatus::Incomplete => CreditGrantAction::Defer,
        SubscriptionStatus::Active | SubscriptionStatus::Trialing => {
            if subscription.cancel_at_period_end && subscription.cancel_at.is_some() {
                CreditGrantAction::Defer
            } else {
                CreditGrantAction::Apply
            }
        }
    }
}

pub struct CreditGrantService {
    grants: Arc<dyn CreditGrantStore>,
    applications: Arc<dyn CreditGrantApplicationStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    plans: Arc<dyn PlanStore>,
    wallets: Arc<dyn WalletService>,
    tx: Arc<dyn TransactionRunner>,
    clock: Arc<dyn Clock>,
}

impl CreditGrantService {
    pub fn new(
        grants: Arc<dyn CreditGrantStore>,
        applications: Arc<dyn CreditGrantApplicationStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        plans: Arc<dyn PlanStore>,
        wallets: Arc<dyn WalletService>,
        tx: Arc<dyn TransactionRunner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            grants,
            applications,
            subscriptions,
            plans,
            wallets,
            tx,
            clock,
        }
    }

    #[instrument(skip(self, request), fields(grant_name = %request.name))]
    pub async fn create_credit_grant(
        &self,
        request: &CreateCreditGrant,
    ) -> Result<CreditGrant, AppError> {
        self.validate_create(request).await?;

        let now = self.clock.now();
        let mut grant = CreditGrant {
            credit_grant_id: Uuid::new_v4(),
            name: request.name.clone(),
            scope: request.scope,
            plan_id: request.plan_id,
            subscription_id: request.subscription_id,
            credits: request.credits,
            cadence: request.cadence,
            period: request.period,
            period_count: request.period_count,
            credit_grant_anchor: request.credit_grant_anchor,
            start_date: request.start_date,
            end_date: request.end_date,
            expiration_type: request.expiration_type,
            expiration_duration: request.expiration_duration,
            expiration_duration_unit: request.expiration_duration_unit,
            priority: request.priority,
            status: RecordStatus::Published,
            created_utc: now,
            updated_utc: now,
        };
        // The anchor defaults to the grant start so the first recurrence
        // cycle begins where the grant does.
        if grant.credit_grant_anchor.is_none() {
            grant.credit_grant_anchor = grant.start_date;
        }

        self.grants.create(&grant).await?;
        info!(credit_grant_id = %grant.credit_grant_id, "created credit grant");

        if grant.scope == CreditGrantScope::Subscription {
            self.initialize_credit_grant_workflow(&grant).await?;
        }

        Ok(grant)
    }

    async fn validate_create(&self, request: &CreateCreditGrant) -> Result<(), AppError> {
        if request.credits <= Decimal::ZERO {
            return Err(AppError::validation(
                "credits must be greater than zero",
                "Provide a positive credit amount",
            ));
        }
        if request.cadence == CreditGrantCadence::Recurring
            && (request.period.is_none() || request.period_count.is_none())
        {
            return Err(AppError::validation(
                "recurring grants require a period and period count",
                "Provide period and period_count for recurring cadence",
            ));
        }

        match request.scope {
            CreditGrantScope::Plan => {
                let plan_id = request.plan_id.ok_or_else(|| {
                    AppError::validation(
                        "plan_id is required for plan-scoped grants",
                        "Provide the plan the grant belongs to",
                    )
                })?;
                let plan = self.plans.get(plan_id).await?;
                if plan.status != RecordStatus::Published {
                    return Err(AppError::validation_with_details(
                        "plan is not published",
                        "Credit grants can only target published plans",
                        json!({ "plan_id": plan_id }),
                    ));
                }
            }
            CreditGrantScope::Subscription => {
                let subscription_id = request.subscription_id.ok_or_else(|| {
                    AppError::validation(
                        "subscription_id is required for subscription-scoped grants",
                        "Provide the subscription the grant belongs to",
                    )
                })?;
                let subscription = self.subscriptions.get(subscription_id).await?;
                if subscription.status == SubscriptionStatus::Cancelled {
                    return Err(AppError::validation_with_details(
                        "subscription is cancelled",
                        "Credit grants cannot target cancelled subscriptions",
                        json!({ "subscription_id": subscription_id }),
                    ));
                }

                let start = request.start_date.ok_or_else(|| {
                    AppError::validation(
                        "start_date is required for subscription-scoped grants",
                        "Provide the grant start date",
                    )
                })?;
                if start < subscription.start_date {
                    return Err(AppError::validation(
                        "grant start date is before the subscription start date",
                        "The grant window must lie within the subscription window",
                    ));
                }
                if let (Some(grant_end), Some(sub_end)) = (request.end_date, subscription.end_date)
                {
                    if grant_end > sub_end {
                        return Err(AppError::validation(
                            "grant end date is after the subscription end date",
                            "The grant window must lie within the subscription window",
                        ));
                    }
                }
                let anchor = request.credit_grant_anchor.unwrap_or(start);
                if anchor < start || request.end_date.map(|e| anchor > e).unwrap_or(false) {
                    return Err(AppError::validation_with_details(
                        "credit grant anchor is outside the grant window",
                        "The anchor must lie between the grant start and end dates",
                        json!({ "anchor": anchor }),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Create the first application for a subscription-scoped grant and, when
    /// the anchor is already due, process it eagerly. Eager processing errors
    /// are logged, not propagated: the scheduled run will retry.
    #[instrument(skip(self, grant), fields(credit_grant_id = %grant.credit_grant_id))]
    pub async fn initialize_credit_grant_workflow(
        &self,
        grant: &CreditGrant,
    ) -> Result<CreditGrantApplication, AppError> {
        let subscription_id = grant.subscription_id.ok_or_else(|| {
            AppError::invalid_operation("cannot initialize workflow for a grant with no subscription")
        })?;

        let period_start = grant.start_date.ok_or_else(|| {
            AppError::invalid_operation("cannot initialize workflow for a grant with no start date")
        })?;
        let period_end = match grant.cadence {
            CreditGrantCadence::Recurring => {
                Some(calculate_next_credit_grant_period(grant, period_start)?)
            }
            CreditGrantCadence::OneTime => None,
        };

        let now = self.clock.now();
        let application = CreditGrantApplication {
            application_id: Uuid::new_v4(),
            credit_grant_id: grant.credit_grant_id,
            subscription_id,
            scheduled_for: period_start,
            period_start,
            period_end,
            credits: grant.credits,
            application_status: ApplicationStatus::Pending,
            retry_count: 0,
            failure_reason: None,
            applied_at: None,
            idempotency_key: generate_idempotency_key(
                grant.credit_grant_id,
                period_start,
                period_end,
            ),
            created_utc: now,
            updated_utc: now,
        };
        self.applications.create(&application).await?;

        let anchor = grant.credit_grant_anchor.unwrap_or(period_start);
        if anchor <= now {
            if let Err(err) = self
                .process_credit_grant_application(application.application_id)
                .await
            {
                warn!(
                    application_id = %application.application_id,
                    error = %err,
                    "eager credit grant application failed; scheduled processing will retry"
                );
            }
        }

        Ok(application)
    }

    pub async fn get_credit_grant(&self, credit_grant_id: Uuid) -> Result<CreditGrant, AppError> {
        self.grants.get(credit_grant_id).await
    }

    pub async fn list_credit_grant_applications(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<CreditGrantApplication>, AppError> {
        self.applications.list_by_subscription(subscription_id).await
    }

    /// Archive a grant after cancelling everything still scheduled for it.
    #[instrument(skip(self), fields(credit_grant_id = %credit_grant_id))]
    pub async fn delete_credit_grant(&self, credit_grant_id: Uuid) -> Result<(), AppError> {
        let grant = self.grants.get(credit_grant_id).await?;
        if grant.status != RecordStatus::Published {
            return Err(AppError::invalid_operation(
                "only published credit grants can be deleted",
            ));
        }

        let grant_ref = &grant;
        let work = async {
            self.cancel_future_grant_applications(grant_ref).await?;
            self.grants.delete(grant_ref.credit_grant_id).await?;
            Ok(())
        };
        self.tx.with_tx(Box::pin(work)).await
    }

    /// Process every application whose schedule has come due. Failures are
    /// isolated per application.
    #[instrument(skip(self))]
    pub async fn process_scheduled_credit_grant_applications(
        &self,
    ) -> Result<ProcessScheduledApplicationsOutcome, AppError> {
        let now = self.clock.now();
        let due = self.applications.find_all_scheduled(now).await?;

        let mut outcome = ProcessScheduledApplicationsOutcome {
            total: due.len(),
            succeeded: 0,
            failed: 0,
        };
        for application in due {
            let application_id = application.application_id;
            match self.process_application(application).await {
                Ok(()) => outcome.succeeded += 1,
                Err(err) => {
                    warn!(
                        application_id = %application_id,
                        error = %err,
                        "failed to process credit grant application"
                    );
                    outcome.failed += 1;
                }
            }
        }

        info!(
            total = outcome.total,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "scheduled credit grant processing complete"
        );
        Ok(outcome)
    }

    /// Manual reprocessing entry point for a single application.
    pub async fn process_credit_grant_application(
        &self,
        application_id: Uuid,
    ) -> Result<(), AppError> {
        let application = self.applications.get(application_id).await?;
        self.process_application(application).await
    }

    async fn process_application(
        &self,
        mut application: CreditGrantApplication,
    ) -> Result<(), AppError> {
        // Terminal applications never re-enter the state machine: replaying
        // an applied one would chain a duplicate next-period application and
        // credit the period twice.
        if matches!(
            application.application_status,
            ApplicationStatus::Applied | ApplicationStatus::Skipped | ApplicationStatus::Cancelled
        ) {
            debug!(
                application_id = %application.application_id,
                status = application.application_status.as_str(),
                "credit grant application already settled, nothing to do"
            );
            return Ok(());
        }

        let subscription = self.subscriptions.get(application.subscription_id).await?;
        let grant = self.grants.get(application.credit_grant_id).await?;

        if grant.status != RecordStatus::Published {
            debug!(
                credit_grant_id = %grant.credit_grant_id,
                "credit grant is not published, skipping"
            );
            return Ok(());
        }

        // The failure reason stays on the record until a successful
        // application clears it; only the retry counter moves here.
        if application.application_status == ApplicationStatus::Failed {
            info!(
                application_id = %application.application_id,
                retry_count = application.retry_count,
                "retrying failed credit grant application"
            );
            application.retry_count += 1;
        }

        match determine_credit_grant_action(&subscription) {
            CreditGrantAction::Apply => {
                self.apply_credit_grant_to_wallet(&mut application, &grant, &subscription)
                    .await
            }
            CreditGrantAction::Skip => {
                self.skip_application(&mut application, &grant).await
            }
            CreditGrantAction::Defer => self.defer_application(&mut application).await,
            CreditGrantAction::Cancel => {
                application.application_status = ApplicationStatus::Cancelled;
                application.applied_at = None;
                application.updated_utc = self.clock.now();
                self.applications.update(&application).await?;
                self.cancel_future_grant_applications(&grant).await
            }
        }
    }

    /// Credit the wallet and advance the chain, atomically.
    ///
    /// The expiry pre-check runs inside the transaction: credits already
    /// expired are never granted, the application lands in `Skipped` with the
    /// reason recorded, and a recurring chain still continues.
    async fn apply_credit_grant_to_wallet(
        &self,
        application: &mut CreditGrantApplication,
        grant: &CreditGrant,
        subscription: &Subscription,
    ) -> Result<(), AppError> {
        let wallet = self.find_or_create_wallet(subscription).await?;
        let expiry = compute_expiry_date(grant, subscription, application.period_start)?;
        let now = self.clock.now();

        let top_up = WalletTopUp {
            wallet_id: wallet.wallet_id,
            credits: application.credits,
            expiry_date: expiry,
            priority: grant.priority,
            // The application id keys the wallet credit: a replayed
            // transaction cannot double-credit.
            idempotency_key: application.application_id.to_string(),
        };

        let application_ref = &mut *application;
        let work = async {
            if expiry.map(|e| e < now).unwrap_or(false) {
                application_ref.application_status = ApplicationStatus::Skipped;
                application_ref.failure_reason = Some("Expired".to_string());
                application_ref.applied_at = None;
                application_ref.updated_utc = now;
                self.applications.update(application_ref).await?;

                if grant.cadence == CreditGrantCadence::Recurring {
                    if let Some(period_end) = application_ref.period_end {
                        self.create_next_period_application(grant, period_end).await?;
                    }
                }
                return Ok(());
            }

            self.wallets.top_up(&top_up).await?;

            application_ref.application_status = ApplicationStatus::Applied;
            application_ref.applied_at = Some(now);
            application_ref.failure_reason = None;
            application_ref.updated_utc = now;
            self.applications.update(application_ref).await?;

            if grant.cadence == CreditGrantCadence::Recurring {
                if let Some(period_end) = application_ref.period_end {
                    self.create_next_period_application(grant, period_end).await?;
                }
            }
            Ok(())
        };

        if let Err(err) = self.tx.with_tx(Box::pin(work)).await {
            self.handle_application_failure(application, &err).await;
            return Err(err);
        }

        info!(
            application_id = %application.application_id,
            credit_grant_id = %grant.credit_grant_id,
            wallet_id = %wallet.wallet_id,
            status = application.application_status.as_str(),
            "processed credit grant application"
        );
        Ok(())
    }

    /// Mark the application failed and record why. The original error is what
    /// the caller sees; a failure to record the failure is only logged.
    async fn handle_application_failure(
        &self,
        application: &mut CreditGrantApplication,
        err: &AppError,
    ) {
        application.application_status = ApplicationStatus::Failed;
        application.failure_reason = Some(err.to_string());
        application.applied_at = None;
        application.updated_utc = self.clock.now();
        if let Err(update_err) = self.applications.update(application).await {
            error!(
                application_id = %application.application_id,
                error = %update_err,
                "failed to record credit grant application failure"
            );
        }
    }

    async fn skip_application(
        &self,
        application: &mut CreditGrantApplication,
        grant: &CreditGrant,
    ) -> Result<(), AppError> {
        info!(
            application_id = %application.application_id,
            credit_grant_id = %application.credit_grant_id,
            "skipping credit grant application"
        );
        application.application_status = ApplicationStatus::Skipped;
        application.applied_at = None;
        application.updated_utc = self.clock.now();
        self.applications.update(application).await?;

        if grant.cadence == CreditGrantCadence::Recurring {
            if let Some(period_end) = application.period_end {
                self.create_next_period_application(grant, period_end).await?;
            }
        }
        Ok(())
    }

    /// Push the application out with exponential backoff: 30 minutes
    /// doubling per retry, capped at 8 hours.
    async fn defer_application(
        &self,
        application: &mut CreditGrantApplication,
    ) -> Result<(), AppError> {
        let backoff_minutes = 30 * (1i64 << application.retry_count.clamp(0, 4));
        let next_retry = self.clock.now() + Duration::minutes(backoff_minutes);

        application.application_status = ApplicationStatus::Deferred;
        application.scheduled_for = next_retry;
        application.retry_count += 1;
        application.updated_utc = self.clock.now();
        self.applications.update(application).await?;

        info!(
            application_id = %application.application_id,
            next_retry = %next_retry,
            backoff_minutes = backoff_minutes,
            "deferred credit grant application"
        );
        Ok(())
    }

    /// Queue the next period's application for a recurring grant, unless the
    /// next period would run past the grant's end date.
    async fn create_next_period_application(
        &self,
        grant: &CreditGrant,
        current_period_end: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let next_period_start = current_period_end;
        let next_period_end = calculate_next_credit_grant_period(grant, next_period_start)?;

        if grant.end_date.map(|e| next_period_end > e).unwrap_or(false) {
            info!(
                credit_grant_id = %grant.credit_grant_id,
                "next period runs past the grant end date, chain complete"
            );
            return Ok(());
        }

        let subscription_id = grant.subscription_id.ok_or_else(|| {
            AppError::invalid_operation("recurring chain requires a subscription-scoped grant")
        })?;

        let now = self.clock.now();
        let application = CreditGrantApplication {
            application_id: Uuid::new_v4(),
            credit_grant_id: grant.credit_grant_id,
            subscription_id,
            scheduled_for: next_period_start,
            period_start: next_period_start,
            period_end: Some(next_period_end),
            credits: grant.credits,
            application_status: ApplicationStatus::Pending,
            retry_count: 0,
            failure_reason: None,
            applied_at: None,
            idempotency_key: generate_idempotency_key(
                grant.credit_grant_id,
                next_period_start,
                Some(next_period_end),
            ),
            created_utc: now,
            updated_utc: now,
        };
        self.applications.create(&application).await?;

        info!(
            credit_grant_id = %grant.credit_grant_id,
            application_id = %application.application_id,
            next_period_start = %next_period_start,
            next_period_end = %next_period_end,
            "created next period credit grant application"
        );
        Ok(())
    }

    /// Cancel everything still scheduled for one grant on its subscription.
    /// Best-effort per application: one bad record does not stop the rest.
    async fn cancel_future_grant_applications(
        &self,
        grant: &CreditGrant,
    ) -> Result<(), AppError> {
        let subscription_id = match (grant.scope, grant.subscription_id) {
            (CreditGrantScope::Subscription, Some(id)) => id,
            _ => return Ok(()),
        };

        let applications = self
            .applications
            .list_cancellable(grant.credit_grant_id, subscription_id)
            .await?;
        let now = self.clock.now();
        for mut application in applications {
            application.application_status = ApplicationStatus::Cancelled;
            application.updated_utc = now;
            if let Err(err) = self.applications.update(&application).await {
                warn!(
                    application_id = %application.application_id,
                    error = %err,
                    "failed to cancel future credit grant application"
                );
                continue;
            }
        }
        Ok(())
    }

    /// Cancellation fan-out for a whole subscription: cancel the scheduled
    /// applications of every published grant, then archive the grants.
    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    pub async fn cancel_future_subscription_grants(
        &self,
        subscription_id: Uuid,
    ) -> Result<(), AppError> {
        let grants = self.grants.list_by_subscription(subscription_id).await?;
        for mut grant in grants {
            if grant.status != RecordStatus::Published {
                continue;
            }
            self.cancel_future_grant_applications(&grant).await?;
            grant.status = RecordStatus::Archived;
            grant.updated_utc = self.clock.now();
            self.grants.update(&grant).await?;
        }
        Ok(())
    }

    /// Wallet in the subscription's currency, created on first use.
    async fn find_or_create_wallet(
        &self,
        subscription: &Subscription,
    ) -> Result<WalletSummary, AppError> {
        let wallets = self.wallets.list_by_customer(subscription.customer_id).await?;
        if let Some(wallet) = wallets
            .into_iter()
            .find(|w| w.currency.eq_ignore_ascii_case(&subscription.currency))
        {
            return Ok(wallet);
        }

        self.wallets
            .create_wallet(&CreateWallet {
                name: "Subscription Wallet".to_string(),
                customer_id: subscription.customer_id,
                currency: subscription.currency.clone(),
                allowed_price_types: vec![PriceType::Usage],
            })
            .await
    }
}

/// Next recurrence boundary for a recurring grant, anchored to the grant's
/// own anchor rather than the subscription's billing anchor.
pub fn calculate_next_credit_grant_period(
    grant: &CreditGrant,
    next_period_start: DateTime<Utc>,
) -> Result<DateTime<Utc>, AppError> {
    let period = grant.period.ok_or_else(|| {
        AppError::invalid_operation("recurring credit grant has no period")
    })?;
    let period_count = grant.period_count.ok_or_else(|| {
        AppError::invalid_operation("recurring credit grant has no period count")
    })?;
    let anchor = grant
        .credit_grant_anchor
        .or(grant.start_date)
        .unwrap_or(next_period_start);

    calendar::next_billing_date(next_period_start, anchor, period_count, period, None)
}

/// When credits granted for a period stop being usable.
pub fn compute_expiry_date(
    grant: &CreditGrant,
    subscription: &Subscription,
    effective_date: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, AppError> {
    match grant.expiration_type {
        ExpirationType::Never => Ok(None),
        ExpirationType::BillingCycle => Ok(Some(subscription.current_period_end)),
        ExpirationType::Duration => {
            let duration = grant.expiration_duration.ok_or_else(|| {
                AppError::validation(
                    "expiration duration is required",
                    "Duration-expiring grants need an expiration_duration",
                )
            })?;
            let unit = grant.expiration_duration_unit.ok_or_else(|| {
                AppError::validation(
                    "expiration duration unit is required",
                    "Duration-expiring grants need an expiration_duration_unit",
                )
            })?;
            if duration < 0 {
                return Err(AppError::validation(
                    "expiration duration must not be negative",
                    "Provide a non-negative expiration_duration",
                ));
            }
            let expiry = match unit {
                ExpirationDurationUnit::Days => effective_date + Duration::days(duration as i64),
                ExpirationDurationUnit::Weeks => {
                    effective_date + Duration::days(duration as i64 * 7)
                }
                ExpirationDurationUnit::Months => effective_date + Months::new(duration as u32),
                ExpirationDurationUnit::Years => {
                    effective_date + Months::new(duration as u32 * 12)
                }
            };
            Ok(Some(expiry))
        }
    }
}

/// Deterministic key for one grant and period: retries and replays of the
/// same application always carry the same key.
pub fn generate_idempotency_key(
    credit_grant_id: Uuid,
    period_start: DateTime<Utc>,
    period_end: Option<DateTime<Utc>>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credit_grant_id.as_bytes());
    hasher.update(period_start.timestamp_millis().to_be_bytes());
    if let Some(end) = period_end {
        hasher.update(end.timestamp_millis().to_be_bytes());
    }
    let digest = hasher.finalize();
    let mut key = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(key, "{byte:02x}");
    }
    key
}
