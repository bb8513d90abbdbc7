//! Collaborator contracts for the domain services.
//!
//! Everything the services need from the outside world (persistence,
//! invoicing, wallets, webhooks, transactions) is one of these narrow
//! async traits. Implementations live outside this crate; the tests
//! provide in-memory ones.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

use service_core::error::AppError;

use crate::models::{
    Coupon, CreditGrant, CreditGrantApplication, ListSubscriptionsFilter, Plan, Price,
    PriceType, Subscription, SubscriptionLineItem, SubscriptionPause, SubscriptionSchedule,
};

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get(&self, subscription_id: Uuid) -> Result<Subscription, AppError>;

    async fn get_with_line_items(
        &self,
        subscription_id: Uuid,
    ) -> Result<(Subscription, Vec<SubscriptionLineItem>), AppError>;

    /// Cursor-paginated listing ordered by subscription id.
    async fn list(&self, filter: &ListSubscriptionsFilter) -> Result<Vec<Subscription>, AppError>;

    /// True when any non-cancelled subscription references the plan.
    async fn any_active_for_plan(&self, plan_id: Uuid) -> Result<bool, AppError>;

    async fn update(&self, subscription: &Subscription) -> Result<(), AppError>;

    async fn create_pause(&self, pause: &SubscriptionPause) -> Result<(), AppError>;

    async fn update_pause(&self, pause: &SubscriptionPause) -> Result<(), AppError>;

    async fn get_pause(&self, pause_id: Uuid) -> Result<SubscriptionPause, AppError>;

    async fn list_pauses(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<SubscriptionPause>, AppError>;
}

#[async_trait]
pub trait LineItemStore: Send + Sync {
    async fn list_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<SubscriptionLineItem>, AppError>;

    async fn create_bulk(&self, items: &[SubscriptionLineItem]) -> Result<(), AppError>;

    async fn update(&self, item: &SubscriptionLineItem) -> Result<(), AppError>;

    /// End-date published plan line items whose backing price has expired,
    /// copying the price's end date onto the line item. Processes at most
    /// `limit` items; returns how many were terminated.
    async fn terminate_expired_plan_line_items(
        &self,
        plan_id: Uuid,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<usize, AppError>;
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn get(&self, plan_id: Uuid) -> Result<Plan, AppError>;

    async fn create(&self, plan: &Plan) -> Result<(), AppError>;

    async fn update(&self, plan: &Plan) -> Result<(), AppError>;
}

#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn get(&self, price_id: Uuid) -> Result<Price, AppError>;

    /// Published plan-scoped prices of a plan.
    async fn list_by_plan(&self, plan_id: Uuid) -> Result<Vec<Price>, AppError>;

    /// Published subscription-scoped override prices of a subscription.
    async fn list_subscription_overrides(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<Price>, AppError>;

    async fn create(&self, price: &Price) -> Result<(), AppError>;

    async fn update(&self, price: &Price) -> Result<(), AppError>;
}

#[async_trait]
pub trait CreditGrantStore: Send + Sync {
    async fn get(&self, credit_grant_id: Uuid) -> Result<CreditGrant, AppError>;

    async fn create(&self, grant: &CreditGrant) -> Result<(), AppError>;

    async fn update(&self, grant: &CreditGrant) -> Result<(), AppError>;

    async fn delete(&self, credit_grant_id: Uuid) -> Result<(), AppError>;

    /// Published grants attached to the subscription directly.
    async fn list_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<CreditGrant>, AppError>;
}

#[async_trait]
pub trait CreditGrantApplicationStore: Send + Sync {
    async fn get(&self, application_id: Uuid) -> Result<CreditGrantApplication, AppError>;

    /// `idempotency_key` is unique across applications. Creating a duplicate
    /// key must succeed without inserting a second row, so a replayed chain
    /// step never yields two applications for the same grant and period.
    async fn create(&self, application: &CreditGrantApplication) -> Result<(), AppError>;

    async fn update(&self, application: &CreditGrantApplication) -> Result<(), AppError>;

    /// Applications due for processing: pending, deferred, or failed, with
    /// `scheduled_for <= now`.
    async fn find_all_scheduled(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<CreditGrantApplication>, AppError>;

    async fn list_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<CreditGrantApplication>, AppError>;

    /// Pending and failed applications of one grant on one subscription,
    /// i.e. the set a cancellation fan-out must visit.
    async fn list_cancellable(
        &self,
        credit_grant_id: Uuid,
        subscription_id: Uuid,
    ) -> Result<Vec<CreditGrantApplication>, AppError>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn get(&self, schedule_id: Uuid) -> Result<SubscriptionSchedule, AppError>;

    async fn get_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<SubscriptionSchedule>, AppError>;

    async fn create(&self, schedule: &SubscriptionSchedule) -> Result<(), AppError>;

    async fn update(&self, schedule: &SubscriptionSchedule) -> Result<(), AppError>;
}

#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn get(&self, coupon_id: Uuid) -> Result<Coupon, AppError>;

    async fn create(&self, coupon: &Coupon) -> Result<(), AppError>;

    async fn update(&self, coupon: &Coupon) -> Result<(), AppError>;

    async fn list(&self) -> Result<Vec<Coupon>, AppError>;
}

/// Reference point an invoice is generated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceReferencePoint {
    PeriodStart,
    PeriodEnd,
}

/// Invoice generation for a closed subscription period.
#[async_trait]
pub trait InvoiceCreator: Send + Sync {
    /// Idempotent per subscription and period. `Ok(None)` means nothing was
    /// billable for the period; the caller still consumes the period.
    async fn create_subscription_invoice(
        &self,
        subscription_id: Uuid,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        reference_point: InvoiceReferencePoint,
    ) -> Result<Option<Uuid>, AppError>;
}

#[derive(Debug, Clone)]
pub struct WalletSummary {
    pub wallet_id: Uuid,
    pub customer_id: Uuid,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct CreateWallet {
    pub name: String,
    pub customer_id: Uuid,
    pub currency: String,
    pub allowed_price_types: Vec<PriceType>,
}

#[derive(Debug, Clone)]
pub struct WalletTopUp {
    pub wallet_id: Uuid,
    pub credits: Decimal,
    pub expiry_date: Option<DateTime<Utc>>,
    pub priority: Option<i32>,
    /// Exactly-once guard. A replay with the same key must succeed without
    /// crediting again.
    pub idempotency_key: String,
}

#[async_trait]
pub trait WalletService: Send + Sync {
    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<WalletSummary>, AppError>;

    async fn create_wallet(&self, request: &CreateWallet) -> Result<WalletSummary, AppError>;

    async fn top_up(&self, request: &WalletTopUp) -> Result<(), AppError>;
}

/// Domain events published to downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEvent {
    SubscriptionUpdated,
    SubscriptionPaused,
    SubscriptionResumed,
    SubscriptionCancelled,
}

impl WebhookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEvent::SubscriptionUpdated => "subscription.updated",
            WebhookEvent::SubscriptionPaused => "subscription.paused",
            WebhookEvent::SubscriptionResumed => "subscription.resumed",
            WebhookEvent::SubscriptionCancelled => "subscription.cancelled",
        }
    }
}

/// Fire-and-forget event delivery. Callers log failures and move on; a
/// webhook error never fails the state change that produced it.
#[async_trait]
pub trait WebhookPublisher: Send + Sync {
    async fn publish(&self, event: WebhookEvent, entity_id: Uuid) -> Result<(), AppError>;
}

pub type TxFuture<'a> = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'a>>;

/// Atomic execution boundary. The future's error is the rollback signal:
/// either every write inside commits or none do.
#[async_trait]
pub trait TransactionRunner: Send + Sync {
    async fn with_tx<'a>(&'a self, work: TxFuture<'a>) -> Result<(), AppError>;
}
