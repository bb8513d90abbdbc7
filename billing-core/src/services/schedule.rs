//! Subscription schedules: an ordered list of phases carrying commitment
//! amount and overage factor over time. One schedule per subscription.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use service_core::clock::Clock;
use service_core::error::AppError;

use crate::models::{SchedulePhase, SchedulePhaseInput, SubscriptionSchedule};
use crate::stores::{ScheduleStore, SubscriptionStore};

pub struct ScheduleService {
    schedules: Arc<dyn ScheduleStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    clock: Arc<dyn Clock>,
}

impl ScheduleService {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            schedules,
            subscriptions,
            clock,
        }
    }

    /// Create the schedule for a subscription. Phases must be contiguous and
    /// ordered; only the final phase may be open-ended.
    #[instrument(skip(self, phases), fields(subscription_id = %subscription_id))]
    pub async fn create_schedule(
        &self,
        subscription_id: Uuid,
        phases: &[SchedulePhaseInput],
    ) -> Result<SubscriptionSchedule, AppError> {
        let subscription = self.subscriptions.get(subscription_id).await?;
        if self
            .schedules
            .get_by_subscription(subscription_id)
            .await?
            .is_some()
        {
            return Err(AppError::invalid_operation(
                "subscription already has a schedule",
            ));
        }
        if phases.is_empty() {
            return Err(AppError::validation(
                "schedule requires at least one phase",
                "Provide at least one phase",
            ));
        }
        if phases[0].start_date != subscription.start_date {
            return Err(AppError::validation_with_details(
                "first phase must start at the subscription start date",
                "Align the first phase with the subscription start",
                json!({
                    "phase_start": phases[0].start_date,
                    "subscription_start": subscription.start_date,
                }),
            ));
        }
        validate_phase_sequence(phases)?;

        let now = self.clock.now();
        let schedule = SubscriptionSchedule {
            schedule_id: Uuid::new_v4(),
            subscription_id,
            phases: phases
                .iter()
                .map(|input| SchedulePhase {
                    phase_id: Uuid::new_v4(),
                    start_date: input.start_date,
                    end_date: input.end_date,
                    commitment_amount: input.commitment_amount,
                    overage_factor: input.overage_factor,
                })
                .collect(),
            created_utc: now,
            updated_utc: now,
        };
        self.schedules.create(&schedule).await?;
        info!(
            schedule_id = %schedule.schedule_id,
            phase_count = schedule.phases.len(),
            "created subscription schedule"
        );
        Ok(schedule)
    }

    pub async fn get_schedule(&self, schedule_id: Uuid) -> Result<SubscriptionSchedule, AppError> {
        self.schedules.get(schedule_id).await
    }

    pub async fn get_subscription_schedule(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<SubscriptionSchedule>, AppError> {
        self.schedules.get_by_subscription(subscription_id).await
    }

    /// Append a phase. The current final phase must be closed and the new
    /// phase must begin exactly where it ends.
    #[instrument(skip(self, input), fields(schedule_id = %schedule_id))]
    pub async fn add_phase(
        &self,
        schedule_id: Uuid,
        input: &SchedulePhaseInput,
    ) -> Result<SubscriptionSchedule, AppError> {
        let mut schedule = self.schedules.get(schedule_id).await?;
        let last_end = match schedule.phases.last().and_then(|p| p.end_date) {
            Some(end) => end,
            None => {
                return Err(AppError::invalid_operation(
                    "cannot append after an open-ended phase",
                ));
            }
        };
        if input.start_date != last_end {
            return Err(AppError::validation_with_details(
                "new phase must start where the previous phase ends",
                "Align the new phase with the end of the last phase",
                json!({ "expected_start": last_end, "given_start": input.start_date }),
            ));
        }
        if let Some(end) = input.end_date {
            if end <= input.start_date {
                return Err(AppError::validation(
                    "phase end must be after its start",
                    "Provide an end date after the start date",
                ));
            }
        }

        schedule.phases.push(SchedulePhase {
            phase_id: Uuid::new_v4(),
            start_date: input.start_date,
            end_date: input.end_date,
            commitment_amount: input.commitment_amount,
            overage_factor: input.overage_factor,
        });
        schedule.updated_utc = self.clock.now();
        self.schedules.update(&schedule).await?;
        Ok(schedule)
    }
}

fn validate_phase_sequence(phases: &[SchedulePhaseInput]) -> Result<(), AppError> {
    for (index, phase) in phases.iter().enumerate() {
        let is_last = index == phases.len() - 1;
        match phase.end_date {
            None if !is_last => {
                return Err(AppError::validation(
                    "only the final phase may be open-ended",
                    "Give every non-final phase an end date",
                ));
            }
            Some(end) if end <= phase.start_date => {
                return Err(AppError::validation_with_details(
                    "phase end must be after its start",
                    "Provide an end date after the start date",
                    json!({ "phase_index": index }),
                ));
            }
            _ => {}
        }
        if index > 0 {
            // Contiguity: each phase starts exactly where the previous ends.
            let previous_end = phases[index - 1].end_date;
            if previous_end != Some(phase.start_date) {
                return Err(AppError::validation_with_details(
                    "phases must be contiguous",
                    "Each phase must start where the previous phase ends",
                    json!({ "phase_index": index }),
                ));
            }
        }
    }
    Ok(())
}
