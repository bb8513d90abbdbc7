#![allow(dead_code)]

//! In-memory collaborators and builders shared by the integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use billing_core::models::{
    BillingCycleAlignment, BillingPeriod, Coupon, CreditGrant, CreditGrantApplication,
    ApplicationStatus, InvoiceCadence, LineItemEntityType, ListSubscriptionsFilter, Plan,
    PauseStatus, Price, PriceEntityType, PriceType, RecordStatus, Subscription,
    SubscriptionLineItem, SubscriptionPause, SubscriptionSchedule, SubscriptionStatus,
};
use billing_core::services::proration::TimeBasedProrationCalculator;
use billing_core::services::{CouponService, CreditGrantService, PlanService, ScheduleService};
use billing_core::services::subscription::SubscriptionService;
use billing_core::stores::{
    CouponStore, CreateWallet, CreditGrantApplicationStore, CreditGrantStore, InvoiceCreator,
    InvoiceReferencePoint, LineItemStore, PlanStore, PriceStore, ScheduleStore,
    SubscriptionStore, TransactionRunner, TxFuture, WalletService, WalletSummary, WalletTopUp,
    WebhookEvent, WebhookPublisher,
};
use service_core::clock::FixedClock;
use service_core::error::AppError;

pub fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn utc_hms(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

/// Single in-memory database implementing every persistence trait.
#[derive(Default)]
pub struct InMemoryDb {
    pub subscriptions: Mutex<HashMap<Uuid, Subscription>>,
    pub pauses: Mutex<HashMap<Uuid, SubscriptionPause>>,
    pub line_items: Mutex<HashMap<Uuid, SubscriptionLineItem>>,
    pub plans: Mutex<HashMap<Uuid, Plan>>,
    pub prices: Mutex<HashMap<Uuid, Price>>,
    pub grants: Mutex<HashMap<Uuid, CreditGrant>>,
    pub applications: Mutex<HashMap<Uuid, CreditGrantApplication>>,
    pub schedules: Mutex<HashMap<Uuid, SubscriptionSchedule>>,
    pub coupons: Mutex<HashMap<Uuid, Coupon>>,
    /// Subscription ids whose store writes should fail.
    pub failing_subscription_updates: Mutex<HashSet<Uuid>>,
}

impl InMemoryDb {
    pub fn insert_subscription(&self, subscription: Subscription) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.subscription_id, subscription);
    }

    pub fn subscription(&self, id: Uuid) -> Subscription {
        self.subscriptions.lock().unwrap().get(&id).unwrap().clone()
    }

    pub fn insert_line_item(&self, item: SubscriptionLineItem) {
        self.line_items.lock().unwrap().insert(item.line_item_id, item);
    }

    pub fn insert_plan(&self, plan: Plan) {
        self.plans.lock().unwrap().insert(plan.plan_id, plan);
    }

    pub fn insert_price(&self, price: Price) {
        self.prices.lock().unwrap().insert(price.price_id, price);
    }

    pub fn insert_grant(&self, grant: CreditGrant) {
        self.grants.lock().unwrap().insert(grant.credit_grant_id, grant);
    }

    pub fn insert_pause(&self, pause: SubscriptionPause) {
        self.pauses.lock().unwrap().insert(pause.pause_id, pause);
    }

    pub fn grant(&self, id: Uuid) -> CreditGrant {
        self.grants.lock().unwrap().get(&id).unwrap().clone()
    }

    pub fn pause(&self, id: Uuid) -> SubscriptionPause {
        self.pauses.lock().unwrap().get(&id).unwrap().clone()
    }

    pub fn applications_for(&self, subscription_id: Uuid) -> Vec<CreditGrantApplication> {
        let mut items: Vec<_> = self
            .applications
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.subscription_id == subscription_id)
            .cloned()
            .collect();
        items.sort_by_key(|a| a.created_utc);
        items
    }

    pub fn line_items_for(&self, subscription_id: Uuid) -> Vec<SubscriptionLineItem> {
        self.line_items
            .lock()
            .unwrap()
            .values()
            .filter(|li| li.subscription_id == subscription_id)
            .cloned()
            .collect()
    }

    pub fn fail_updates_for(&self, subscription_id: Uuid) {
        self.failing_subscription_updates
            .lock()
            .unwrap()
            .insert(subscription_id);
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryDb {
    async fn get(&self, subscription_id: Uuid) -> Result<Subscription, AppError> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(&subscription_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("subscription not found"))
    }

    async fn get_with_line_items(
        &self,
        subscription_id: Uuid,
    ) -> Result<(Subscription, Vec<SubscriptionLineItem>), AppError> {
        let subscription = SubscriptionStore::get(self, subscription_id).await?;
        Ok((subscription, self.line_items_for(subscription_id)))
    }

    async fn list(&self, filter: &ListSubscriptionsFilter) -> Result<Vec<Subscription>, AppError> {
        let mut matches: Vec<Subscription> = self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| filter.statuses.is_empty() || filter.statuses.contains(&s.status))
            .filter(|s| filter.plan_id.map(|p| s.plan_id == p).unwrap_or(true))
            .filter(|s| {
                filter
                    .period_end_before
                    .map(|t| s.current_period_end <= t)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        matches.sort_by_key(|s| s.subscription_id);
        if let Some(token) = filter.page_token {
            matches.retain(|s| s.subscription_id > token);
        }
        matches.truncate(filter.page_size.max(0) as usize);
        Ok(matches)
    }

    async fn any_active_for_plan(&self, plan_id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .any(|s| s.plan_id == plan_id && s.status != SubscriptionStatus::Cancelled))
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), AppError> {
        if self
            .failing_subscription_updates
            .lock()
            .unwrap()
            .contains(&subscription.subscription_id)
        {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "simulated write failure"
            )));
        }
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.subscription_id, subscription.clone());
        Ok(())
    }

    async fn create_pause(&self, pause: &SubscriptionPause) -> Result<(), AppError> {
        self.pauses.lock().unwrap().insert(pause.pause_id, pause.clone());
        Ok(())
    }

    async fn update_pause(&self, pause: &SubscriptionPause) -> Result<(), AppError> {
        self.pauses.lock().unwrap().insert(pause.pause_id, pause.clone());
        Ok(())
    }

    async fn get_pause(&self, pause_id: Uuid) -> Result<SubscriptionPause, AppError> {
        self.pauses
            .lock()
            .unwrap()
            .get(&pause_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("pause not found"))
    }

    async fn list_pauses(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<SubscriptionPause>, AppError> {
        let mut pauses: Vec<_> = self
            .pauses
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.subscription_id == subscription_id)
            .cloned()
            .collect();
        pauses.sort_by_key(|p| p.created_utc);
        Ok(pauses)
    }
}

#[async_trait]
impl LineItemStore for InMemoryDb {
    async fn list_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<SubscriptionLineItem>, AppError> {
        Ok(self.line_items_for(subscription_id))
    }

    async fn create_bulk(&self, items: &[SubscriptionLineItem]) -> Result<(), AppError> {
        let mut map = self.line_items.lock().unwrap();
        for item in items {
            map.insert(item.line_item_id, item.clone());
        }
        Ok(())
    }

    async fn update(&self, item: &SubscriptionLineItem) -> Result<(), AppError> {
        self.line_items
            .lock()
            .unwrap()
            .insert(item.line_item_id, item.clone());
        Ok(())
    }

    async fn terminate_expired_plan_line_items(
        &self,
        plan_id: Uuid,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<usize, AppError> {
        let prices = self.prices.lock().unwrap();
        let expired: HashMap<Uuid, DateTime<Utc>> = prices
            .values()
            .filter(|p| {
                p.entity_type == PriceEntityType::Plan
                    && p.entity_id == plan_id
                    && p.is_expired(now)
            })
            .filter_map(|p| p.end_date.map(|e| (p.price_id, e)))
            .collect();
        drop(prices);

        let mut items = self.line_items.lock().unwrap();
        let mut terminated = 0;
        for item in items.values_mut() {
            if terminated >= limit {
                break;
            }
            if item.entity_type == LineItemEntityType::Plan
                && item.status == RecordStatus::Published
                && item.end_date.is_none()
            {
                if let Some(price_end) = expired.get(&item.price_id) {
                    item.end_date = Some(*price_end);
                    item.updated_utc = now;
                    terminated += 1;
                }
            }
        }
        Ok(terminated)
    }
}

#[async_trait]
impl PlanStore for InMemoryDb {
    async fn get(&self, plan_id: Uuid) -> Result<Plan, AppError> {
        self.plans
            .lock()
            .unwrap()
            .get(&plan_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("plan not found"))
    }

    async fn create(&self, plan: &Plan) -> Result<(), AppError> {
        self.plans.lock().unwrap().insert(plan.plan_id, plan.clone());
        Ok(())
    }

    async fn update(&self, plan: &Plan) -> Result<(), AppError> {
        self.plans.lock().unwrap().insert(plan.plan_id, plan.clone());
        Ok(())
    }
}

#[async_trait]
impl PriceStore for InMemoryDb {
    async fn get(&self, price_id: Uuid) -> Result<Price, AppError> {
        self.prices
            .lock()
            .unwrap()
            .get(&price_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("price not found"))
    }

    async fn list_by_plan(&self, plan_id: Uuid) -> Result<Vec<Price>, AppError> {
        let mut prices: Vec<_> = self
            .prices
            .lock()
            .unwrap()
            .values()
            .filter(|p| {
                p.entity_type == PriceEntityType::Plan
                    && p.entity_id == plan_id
                    && p.status == RecordStatus::Published
            })
            .cloned()
            .collect();
        prices.sort_by_key(|p| p.price_id);
        Ok(prices)
    }

    async fn list_subscription_overrides(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<Price>, AppError> {
        Ok(self
            .prices
            .lock()
            .unwrap()
            .values()
            .filter(|p| {
                p.entity_type == PriceEntityType::Subscription
                    && p.entity_id == subscription_id
                    && p.status == RecordStatus::Published
            })
            .cloned()
            .collect())
    }

    async fn create(&self, price: &Price) -> Result<(), AppError> {
        self.prices.lock().unwrap().insert(price.price_id, price.clone());
        Ok(())
    }

    async fn update(&self, price: &Price) -> Result<(), AppError> {
        self.prices.lock().unwrap().insert(price.price_id, price.clone());
        Ok(())
    }
}

#[async_trait]
impl CreditGrantStore for InMemoryDb {
    async fn get(&self, credit_grant_id: Uuid) -> Result<CreditGrant, AppError> {
        self.grants
            .lock()
            .unwrap()
            .get(&credit_grant_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("credit grant not found"))
    }

    async fn create(&self, grant: &CreditGrant) -> Result<(), AppError> {
        self.grants
            .lock()
            .unwrap()
            .insert(grant.credit_grant_id, grant.clone());
        Ok(())
    }

    async fn update(&self, grant: &CreditGrant) -> Result<(), AppError> {
        self.grants
            .lock()
            .unwrap()
            .insert(grant.credit_grant_id, grant.clone());
        Ok(())
    }

    async fn delete(&self, credit_grant_id: Uuid) -> Result<(), AppError> {
        if let Some(grant) = self.grants.lock().unwrap().get_mut(&credit_grant_id) {
            grant.status = RecordStatus::Deleted;
        }
        Ok(())
    }

    async fn list_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<CreditGrant>, AppError> {
        Ok(self
            .grants
            .lock()
            .unwrap()
            .values()
            .filter(|g| g.subscription_id == Some(subscription_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CreditGrantApplicationStore for InMemoryDb {
    async fn get(&self, application_id: Uuid) -> Result<CreditGrantApplication, AppError> {
        self.applications
            .lock()
            .unwrap()
            .get(&application_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("credit grant application not found"))
    }

    async fn create(&self, application: &CreditGrantApplication) -> Result<(), AppError> {
        let mut map = self.applications.lock().unwrap();
        // Unique idempotency key: a duplicate insert is a no-op, like
        // ON CONFLICT DO NOTHING on the key column.
        if map
            .values()
            .any(|a| a.idempotency_key == application.idempotency_key)
        {
            return Ok(());
        }
        map.insert(application.application_id, application.clone());
        Ok(())
    }

    async fn update(&self, application: &CreditGrantApplication) -> Result<(), AppError> {
        self.applications
            .lock()
            .unwrap()
            .insert(application.application_id, application.clone());
        Ok(())
    }

    async fn find_all_scheduled(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<CreditGrantApplication>, AppError> {
        let mut due: Vec<_> = self
            .applications
            .lock()
            .unwrap()
            .values()
            .filter(|a| {
                matches!(
                    a.application_status,
                    ApplicationStatus::Pending
                        | ApplicationStatus::Deferred
                        | ApplicationStatus::Failed
                ) && a.scheduled_for <= now
            })
            .cloned()
            .collect();
        due.sort_by_key(|a| a.scheduled_for);
        Ok(due)
    }

    async fn list_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<CreditGrantApplication>, AppError> {
        Ok(self.applications_for(subscription_id))
    }

    async fn list_cancellable(
        &self,
        credit_grant_id: Uuid,
        subscription_id: Uuid,
    ) -> Result<Vec<CreditGrantApplication>, AppError> {
        Ok(self
            .applications
            .lock()
            .unwrap()
            .values()
            .filter(|a| {
                a.credit_grant_id == credit_grant_id
                    && a.subscription_id == subscription_id
                    && matches!(
                        a.application_status,
                        ApplicationStatus::Pending
                            | ApplicationStatus::Deferred
                            | ApplicationStatus::Failed
                    )
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ScheduleStore for InMemoryDb {
    async fn get(&self, schedule_id: Uuid) -> Result<SubscriptionSchedule, AppError> {
        self.schedules
            .lock()
            .unwrap()
            .get(&schedule_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("schedule not found"))
    }

    async fn get_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<SubscriptionSchedule>, AppError> {
        Ok(self
            .schedules
            .lock()
            .unwrap()
            .values()
            .find(|s| s.subscription_id == subscription_id)
            .cloned())
    }

    async fn create(&self, schedule: &SubscriptionSchedule) -> Result<(), AppError> {
        self.schedules
            .lock()
            .unwrap()
            .insert(schedule.schedule_id, schedule.clone());
        Ok(())
    }

    async fn update(&self, schedule: &SubscriptionSchedule) -> Result<(), AppError> {
        self.schedules
            .lock()
            .unwrap()
            .insert(schedule.schedule_id, schedule.clone());
        Ok(())
    }
}

#[async_trait]
impl CouponStore for InMemoryDb {
    async fn get(&self, coupon_id: Uuid) -> Result<Coupon, AppError> {
        self.coupons
            .lock()
            .unwrap()
            .get(&coupon_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("coupon not found"))
    }

    async fn create(&self, coupon: &Coupon) -> Result<(), AppError> {
        self.coupons
            .lock()
            .unwrap()
            .insert(coupon.coupon_id, coupon.clone());
        Ok(())
    }

    async fn update(&self, coupon: &Coupon) -> Result<(), AppError> {
        self.coupons
            .lock()
            .unwrap()
            .insert(coupon.coupon_id, coupon.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Coupon>, AppError> {
        Ok(self.coupons.lock().unwrap().values().cloned().collect())
    }
}

/// Wallet fake that records top-ups and honors idempotency keys.
#[derive(Default)]
pub struct RecordingWalletService {
    pub wallets: Mutex<Vec<WalletSummary>>,
    pub top_ups: Mutex<Vec<WalletTopUp>>,
    seen_keys: Mutex<HashSet<String>>,
    failures_remaining: Mutex<u32>,
}

impl RecordingWalletService {
    /// Make the next `n` top-up calls fail.
    pub fn fail_next_top_ups(&self, n: u32) {
        *self.failures_remaining.lock().unwrap() = n;
    }

    pub fn top_up_count(&self) -> usize {
        self.top_ups.lock().unwrap().len()
    }

    pub fn total_credits(&self) -> Decimal {
        self.top_ups
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.credits)
            .sum()
    }
}

#[async_trait]
impl WalletService for RecordingWalletService {
    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<WalletSummary>, AppError> {
        Ok(self
            .wallets
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn create_wallet(&self, request: &CreateWallet) -> Result<WalletSummary, AppError> {
        let wallet = WalletSummary {
            wallet_id: Uuid::new_v4(),
            customer_id: request.customer_id,
            currency: request.currency.clone(),
        };
        self.wallets.lock().unwrap().push(wallet.clone());
        Ok(wallet)
    }

    async fn top_up(&self, request: &WalletTopUp) -> Result<(), AppError> {
        {
            let mut failures = self.failures_remaining.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(AppError::DatabaseError(anyhow::anyhow!(
                    "simulated wallet failure"
                )));
            }
        }
        if !self
            .seen_keys
            .lock()
            .unwrap()
            .insert(request.idempotency_key.clone())
        {
            // Replay of an already-processed key: succeed without crediting.
            return Ok(());
        }
        self.top_ups.lock().unwrap().push(request.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceMode {
    Create,
    Empty,
    Fail,
}

/// Invoice fake: counts calls and returns per the configured mode.
pub struct StubInvoiceCreator {
    pub calls: Mutex<Vec<(Uuid, DateTime<Utc>, DateTime<Utc>)>>,
    mode: Mutex<InvoiceMode>,
}

impl Default for StubInvoiceCreator {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            mode: Mutex::new(InvoiceMode::Create),
        }
    }
}

impl StubInvoiceCreator {
    pub fn set_mode(&self, mode: InvoiceMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn periods_for(&self, subscription_id: Uuid) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _, _)| *id == subscription_id)
            .map(|(_, s, e)| (*s, *e))
            .collect()
    }
}

#[async_trait]
impl InvoiceCreator for StubInvoiceCreator {
    async fn create_subscription_invoice(
        &self,
        subscription_id: Uuid,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        _reference_point: InvoiceReferencePoint,
    ) -> Result<Option<Uuid>, AppError> {
        let mode = *self.mode.lock().unwrap();
        match mode {
            InvoiceMode::Fail => Err(AppError::DatabaseError(anyhow::anyhow!(
                "simulated invoice failure"
            ))),
            InvoiceMode::Empty => {
                self.calls
                    .lock()
                    .unwrap()
                    .push((subscription_id, period_start, period_end));
                Ok(None)
            }
            InvoiceMode::Create => {
                self.calls
                    .lock()
                    .unwrap()
                    .push((subscription_id, period_start, period_end));
                Ok(Some(Uuid::new_v4()))
            }
        }
    }
}

/// Transaction fake: runs the work inline. Rollback is not simulated; the
/// in-memory stores keep whatever was written before the error.
#[derive(Default)]
pub struct NoopTransactionRunner;

#[async_trait]
impl TransactionRunner for NoopTransactionRunner {
    async fn with_tx<'a>(&'a self, work: TxFuture<'a>) -> Result<(), AppError> {
        work.await
    }
}

#[derive(Default)]
pub struct CapturingWebhookPublisher {
    pub events: Mutex<Vec<(WebhookEvent, Uuid)>>,
}

impl CapturingWebhookPublisher {
    pub fn events_for(&self, entity_id: Uuid) -> Vec<WebhookEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, id)| *id == entity_id)
            .map(|(e, _)| *e)
            .collect()
    }
}

#[async_trait]
impl WebhookPublisher for CapturingWebhookPublisher {
    async fn publish(&self, event: WebhookEvent, entity_id: Uuid) -> Result<(), AppError> {
        self.events.lock().unwrap().push((event, entity_id));
        Ok(())
    }
}

/// Fully wired service graph over the in-memory collaborators.
pub struct TestEnv {
    pub db: Arc<InMemoryDb>,
    pub wallets: Arc<RecordingWalletService>,
    pub invoices: Arc<StubInvoiceCreator>,
    pub webhooks: Arc<CapturingWebhookPublisher>,
    pub clock: Arc<FixedClock>,
    pub subscriptions: SubscriptionService,
    pub credit_grants: Arc<CreditGrantService>,
    pub plans: PlanService,
    pub schedules: ScheduleService,
    pub coupons: CouponService,
}

impl TestEnv {
    pub fn new(now: DateTime<Utc>) -> Self {
        let db = Arc::new(InMemoryDb::default());
        let wallets = Arc::new(RecordingWalletService::default());
        let invoices = Arc::new(StubInvoiceCreator::default());
        let webhooks = Arc::new(CapturingWebhookPublisher::default());
        let clock = Arc::new(FixedClock::new(now));
        let tx = Arc::new(NoopTransactionRunner);

        let credit_grants = Arc::new(CreditGrantService::new(
            db.clone(),
            db.clone(),
            db.clone(),
            db.clone(),
            wallets.clone(),
            tx.clone(),
            clock.clone(),
        ));
        let subscriptions = SubscriptionService::new(
            db.clone(),
            db.clone(),
            invoices.clone(),
            credit_grants.clone(),
            Arc::new(TimeBasedProrationCalculator),
            tx.clone(),
            webhooks.clone(),
            clock.clone(),
        );
        let plans = PlanService::new(
            db.clone(),
            db.clone(),
            db.clone(),
            db.clone(),
            tx.clone(),
            clock.clone(),
        );
        let schedules = ScheduleService::new(db.clone(), db.clone(), clock.clone());
        let coupons = CouponService::new(db.clone(), clock.clone());

        Self {
            db,
            wallets,
            invoices,
            webhooks,
            clock,
            subscriptions,
            credit_grants,
            plans,
            schedules,
            coupons,
        }
    }
}

pub fn monthly_subscription(plan_id: Uuid, start: DateTime<Utc>) -> Subscription {
    let period_end = start
        .checked_add_months(chrono::Months::new(1))
        .unwrap();
    Subscription {
        subscription_id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        environment_id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        plan_id,
        currency: "usd".to_string(),
        status: SubscriptionStatus::Active,
        billing_anchor: start,
        billing_period: BillingPeriod::Monthly,
        billing_period_count: 1,
        billing_cycle: BillingCycleAlignment::Anniversary,
        start_date: start,
        end_date: None,
        current_period_start: start,
        current_period_end: period_end,
        pause_status: PauseStatus::None,
        active_pause_id: None,
        cancel_at_period_end: false,
        cancel_at: None,
        cancelled_at: None,
        commitment_amount: None,
        overage_factor: None,
        created_utc: start,
        updated_utc: start,
    }
}

pub fn published_plan(now: DateTime<Utc>) -> Plan {
    Plan {
        plan_id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        name: "standard".to_string(),
        description: None,
        lookup_key: None,
        status: RecordStatus::Published,
        created_utc: now,
        updated_utc: now,
    }
}

pub fn monthly_plan_price(plan_id: Uuid, now: DateTime<Utc>) -> Price {
    Price {
        price_id: Uuid::new_v4(),
        entity_type: PriceEntityType::Plan,
        entity_id: plan_id,
        parent_price_id: None,
        price_type: PriceType::Fixed,
        meter_id: None,
        currency: "usd".to_string(),
        billing_period: BillingPeriod::Monthly,
        billing_period_count: 1,
        invoice_cadence: InvoiceCadence::Advance,
        amount: Decimal::new(5000, 2),
        display_name: "base fee".to_string(),
        start_date: Some(now),
        end_date: None,
        status: RecordStatus::Published,
        created_utc: now,
        updated_utc: now,
    }
}

pub fn fixed_line_item(
    subscription: &Subscription,
    price: &Price,
    cadence: InvoiceCadence,
) -> SubscriptionLineItem {
    SubscriptionLineItem {
        line_item_id: Uuid::new_v4(),
        subscription_id: subscription.subscription_id,
        customer_id: subscription.customer_id,
        entity_type: LineItemEntityType::Plan,
        entity_id: price.entity_id,
        price_id: price.price_id,
        price_type: price.price_type,
        meter_id: price.meter_id,
        currency: price.currency.clone(),
        billing_period: price.billing_period,
        invoice_cadence: cadence,
        display_name: price.display_name.clone(),
        quantity: Decimal::ONE,
        start_date: subscription.start_date,
        end_date: None,
        status: RecordStatus::Published,
        created_utc: subscription.start_date,
        updated_utc: subscription.start_date,
    }
}
