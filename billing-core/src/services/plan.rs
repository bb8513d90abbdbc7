//! Plan service: plan and price administration plus the plan price
//! synchronizer that reconciles subscription line items with the plan's
//! current price set.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use service_core::clock::Clock;
use service_core::error::AppError;

use crate::models::{
    CreatePlan, CreatePrice, LineItemEntityType, ListSubscriptionsFilter, Plan, PlanSyncSummary,
    Price, PriceEntityType, PriceType, RecordStatus, Subscription, SubscriptionLineItem,
    SubscriptionStatus, UpdatePlan,
};
use crate::stores::{LineItemStore, PlanStore, PriceStore, SubscriptionStore, TransactionRunner};

/// Page size for ending line items of expired prices.
const TERMINATE_PAGE_SIZE: usize = 1000;
/// Subscription scan page size during synchronization.
const SYNC_BATCH_SIZE: i32 = 1000;
/// Missing price/subscription pairs are flushed once this many accumulate.
const PAIR_CHUNK_SIZE: usize = 1000;
/// Bulk insert sub-batch size.
const BULK_INSERT_BATCH_SIZE: usize = 2000;

pub struct PlanService {
    plans: Arc<dyn PlanStore>,
    prices: Arc<dyn PriceStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    line_items: Arc<dyn LineItemStore>,
    tx: Arc<dyn TransactionRunner>,
    clock: Arc<dyn Clock>,
}

impl PlanService {
    pub fn new(
        plans: Arc<dyn PlanStore>,
        prices: Arc<dyn PriceStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        line_items: Arc<dyn LineItemStore>,
        tx: Arc<dyn TransactionRunner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            plans,
            prices,
            subscriptions,
            line_items,
            tx,
            clock,
        }
    }

    pub async fn create_plan(&self, request: &CreatePlan) -> Result<Plan, AppError> {
        if request.name.trim().is_empty() {
            return Err(AppError::validation(
                "plan name must not be empty",
                "Provide a plan name",
            ));
        }
        let now = self.clock.now();
        let plan = Plan {
            plan_id: Uuid::new_v4(),
            tenant_id: request.tenant_id,
            name: request.name.clone(),
            description: request.description.clone(),
            lookup_key: request.lookup_key.clone(),
            status: RecordStatus::Published,
            created_utc: now,
            updated_utc: now,
        };
        self.plans.create(&plan).await?;
        Ok(plan)
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> Result<Plan, AppError> {
        self.plans.get(plan_id).await
    }

    pub async fn update_plan(&self, plan_id: Uuid, request: &UpdatePlan) -> Result<Plan, AppError> {
        let mut plan = self.plans.get(plan_id).await?;
        if let Some(name) = &request.name {
            plan.name = name.clone();
        }
        if let Some(description) = &request.description {
            plan.description = Some(description.clone());
        }
        if let Some(lookup_key) = &request.lookup_key {
            plan.lookup_key = Some(lookup_key.clone());
        }
        plan.updated_utc = self.clock.now();
        self.plans.update(&plan).await?;
        Ok(plan)
    }

    /// Soft-delete a plan. Refused while any non-cancelled subscription still
    /// references it.
    #[instrument(skip(self), fields(plan_id = %plan_id))]
    pub async fn delete_plan(&self, plan_id: Uuid) -> Result<(), AppError> {
        let mut plan = self.plans.get(plan_id).await?;
        if self.subscriptions.any_active_for_plan(plan_id).await? {
            return Err(AppError::invalid_operation(
                "plan is still associated with subscriptions",
            ));
        }
        plan.status = RecordStatus::Deleted;
        plan.updated_utc = self.clock.now();
        self.plans.update(&plan).await
    }

    pub async fn create_price(&self, request: &CreatePrice) -> Result<Price, AppError> {
        if request.entity_type == PriceEntityType::Plan {
            self.plans.get(request.entity_id).await?;
        }
        if request.billing_period_count <= 0 {
            return Err(AppError::validation_with_details(
                "billing period count must be a positive integer",
                "Billing period count must be a positive integer",
                json!({ "billing_period_count": request.billing_period_count }),
            ));
        }
        let price = self.build_price(request);
        self.prices.create(&price).await?;
        Ok(price)
    }

    /// Replace a plan price: the old price is end-dated and the successor is
    /// created pointing at the root of the lineage chain, so a chain
    /// P1 -> P2 -> P3 has both P2 and P3 carrying parent P1.
    #[instrument(skip(self, request), fields(old_price_id = %old_price_id))]
    pub async fn create_successor_price(
        &self,
        old_price_id: Uuid,
        request: &CreatePrice,
    ) -> Result<Price, AppError> {
        let mut old = self.prices.get(old_price_id).await?;
        if old.entity_type != PriceEntityType::Plan {
            return Err(AppError::invalid_operation(
                "only plan prices can be superseded",
            ));
        }
        if old.end_date.is_some() {
            return Err(AppError::invalid_operation(
                "price already has an end date",
            ));
        }

        let now = self.clock.now();
        let effective = request.start_date.unwrap_or(now);
        old.end_date = Some(effective);
        old.updated_utc = now;

        let mut successor = self.build_price(request);
        successor.entity_type = PriceEntityType::Plan;
        successor.entity_id = old.entity_id;
        successor.parent_price_id = Some(old.root_price_id());
        successor.start_date = Some(effective);

        let old_ref = &old;
        let successor_ref = &successor;
        let work = async {
            self.prices.update(old_ref).await?;
            self.prices.create(successor_ref).await?;
            Ok(())
        };
        self.tx.with_tx(Box::pin(work)).await?;

        info!(
            old_price_id = %old.price_id,
            new_price_id = %successor.price_id,
            root_price_id = %successor.root_price_id(),
            "created successor price"
        );
        Ok(successor)
    }

    fn build_price(&self, request: &CreatePrice) -> Price {
        let now = self.clock.now();
        Price {
            price_id: Uuid::new_v4(),
            entity_type: request.entity_type,
            entity_id: request.entity_id,
            parent_price_id: request.parent_price_id,
            price_type: request.price_type,
            meter_id: request.meter_id,
            currency: request.currency.clone(),
            billing_period: request.billing_period,
            billing_period_count: request.billing_period_count,
            invoice_cadence: request.invoice_cadence,
            amount: request.amount,
            display_name: request.display_name.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
            status: RecordStatus::Published,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Reconcile every subscription on the plan with the plan's current
    /// price set.
    ///
    /// Two deltas: line items backed by expired prices are terminated, and
    /// missing line items for eligible live prices are created. Pairs with an
    /// override price, an incompatible price, or existing coverage are
    /// skipped and counted.
    #[instrument(skip(self), fields(plan_id = %plan_id))]
    pub async fn sync_plan_prices(&self, plan_id: Uuid) -> Result<PlanSyncSummary, AppError> {
        let now = self.clock.now();
        let plan = self.plans.get(plan_id).await?;
        let plan_prices = self.prices.list_by_plan(plan_id).await?;
        if plan_prices.is_empty() {
            return Err(AppError::invalid_operation(
                "plan has no prices to synchronize",
            ));
        }

        let mut summary = PlanSyncSummary {
            prices_processed: plan_prices.len(),
            ..Default::default()
        };

        // Delta 1: end line items whose backing price has expired, one page
        // at a time until the store reports a short page.
        loop {
            let terminated = self
                .line_items
                .terminate_expired_plan_line_items(plan_id, now, TERMINATE_PAGE_SIZE)
                .await?;
            summary.line_items_terminated += terminated;
            if terminated < TERMINATE_PAGE_SIZE {
                break;
            }
        }

        // Delta 2: create line items for eligible live prices not yet
        // covered, accumulating pairs and bulk-inserting in sub-batches.
        let mut candidates: Vec<SubscriptionLineItem> = Vec::new();
        let mut page_token = None;
        loop {
            let filter = ListSubscriptionsFilter {
                statuses: vec![SubscriptionStatus::Active, SubscriptionStatus::Trialing],
                plan_id: Some(plan_id),
                period_end_before: None,
                page_size: SYNC_BATCH_SIZE,
                page_token,
            };
            let batch = self.subscriptions.list(&filter).await?;
            if batch.is_empty() {
                break;
            }
            let batch_len = batch.len();
            page_token = batch.last().map(|s| s.subscription_id);

            for subscription in &batch {
                summary.subscriptions_processed += 1;
                if let Err(err) = self
                    .collect_missing_line_items(
                        subscription,
                        &plan_prices,
                        now,
                        &mut candidates,
                        &mut summary,
                    )
                    .await
                {
                    warn!(
                        subscription_id = %subscription.subscription_id,
                        error = %err,
                        "failed to evaluate subscription during price sync"
                    );
                    summary.line_items_failed += 1;
                }
                if candidates.len() >= PAIR_CHUNK_SIZE {
                    self.flush_candidates(&mut candidates, &mut summary).await;
                }
            }

            if batch_len < SYNC_BATCH_SIZE as usize {
                break;
            }
        }
        self.flush_candidates(&mut candidates, &mut summary).await;

        info!(
            plan_id = %plan.plan_id,
            subscriptions_processed = summary.subscriptions_processed,
            line_items_created = summary.line_items_created,
            line_items_terminated = summary.line_items_terminated,
            line_items_skipped = summary.line_items_skipped,
            line_items_failed = summary.line_items_failed,
            "plan price synchronization complete"
        );
        Ok(summary)
    }

    async fn collect_missing_line_items(
        &self,
        subscription: &Subscription,
        plan_prices: &[Price],
        now: DateTime<Utc>,
        candidates: &mut Vec<SubscriptionLineItem>,
        summary: &mut PlanSyncSummary,
    ) -> Result<(), AppError> {
        let items = self
            .line_items
            .list_by_subscription(subscription.subscription_id)
            .await?;
        let live_coverage: HashSet<Uuid> = items
            .iter()
            .filter(|li| {
                li.entity_type == LineItemEntityType::Plan
                    && li.status == RecordStatus::Published
                    && li.end_date.is_none()
            })
            .map(|li| li.price_id)
            .collect();

        // One-hop override detection: subscription-scoped prices carry the
        // ROOT of the plan price lineage in parent_price_id.
        let overrides = self
            .prices
            .list_subscription_overrides(subscription.subscription_id)
            .await?;
        let overridden_roots: HashSet<Uuid> = overrides
            .iter()
            .filter_map(|p| p.parent_price_id)
            .collect();

        for price in plan_prices {
            if price.is_expired(now) {
                summary.line_items_skipped += 1;
                summary.skipped_already_terminated += 1;
                continue;
            }
            if !price.is_eligible_for(subscription) {
                summary.line_items_skipped += 1;
                summary.skipped_incompatible += 1;
                continue;
            }
            if live_coverage.contains(&price.price_id) {
                summary.line_items_skipped += 1;
                continue;
            }
            if overridden_roots.contains(&price.root_price_id()) {
                summary.line_items_skipped += 1;
                summary.skipped_overridden += 1;
                continue;
            }
            candidates.push(new_plan_line_item(subscription, price, now));
        }
        Ok(())
    }

    async fn flush_candidates(
        &self,
        candidates: &mut Vec<SubscriptionLineItem>,
        summary: &mut PlanSyncSummary,
    ) {
        for chunk in candidates.chunks(BULK_INSERT_BATCH_SIZE) {
            match self.line_items.create_bulk(chunk).await {
                Ok(()) => summary.line_items_created += chunk.len(),
                Err(err) => {
                    warn!(
                        chunk_size = chunk.len(),
                        error = %err,
                        "bulk line item insert failed during price sync"
                    );
                    summary.line_items_failed += chunk.len();
                }
            }
        }
        candidates.clear();
    }
}

fn new_plan_line_item(
    subscription: &Subscription,
    price: &Price,
    now: DateTime<Utc>,
) -> SubscriptionLineItem {
    let quantity = match price.price_type {
        PriceType::Fixed => Decimal::ONE,
        PriceType::Usage => Decimal::ZERO,
    };
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
        invoice_cadence: price.invoice_cadence,
        display_name: price.display_name.clone(),
        quantity,
        start_date: now,
        end_date: None,
        status: RecordStatus::Published,
        created_utc: now,
        updated_utc: now,
    }
}
