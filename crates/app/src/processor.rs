//! TriggerProcessor — serialized coordinator of the live trigger set.
//!
//! The processor is the only component permitted to mutate prepared
//! triggers. One async mutex over the trigger set serializes every public
//! operation, including the persist await, so no two operations ever
//! interleave their reads/writes or overlap a persist batch. Callers submit
//! operations without blocking; the mutex's fair queueing preserves
//! per-caller submission order.
//!
//! Fired results go out on a broadcast channel: multicast, fire-and-forget.
//! Subscribers may come and go; publishing with none is not an error.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast;

use tally_domain::event::{AutomationEvent, TriggerableState};
use tally_domain::id::ScheduleId;
use tally_domain::result::TriggerResult;
use tally_domain::schedule::{
    AutomationScheduleData, ScheduleExecutionState, TriggerExecutionType,
};
use tally_domain::time;
use tally_domain::trigger::AutomationTrigger;
use tally_domain::trigger_state::TriggerState;

use crate::ports::TriggerStateStore;
use crate::prepared_trigger::PreparedTrigger;

struct Inner {
    triggers: Vec<Arc<PreparedTrigger>>,
    /// Most recently observed app-lifecycle snapshot, re-delivered to
    /// triggers on activation so edge rules do not miss a transition that
    /// occurred while their schedule was inactive.
    app_state: Option<TriggerableState>,
}

/// Owns every [`PreparedTrigger`] for the process lifetime; routes events to
/// them, persists the resulting state deltas, and publishes goal-reached
/// results.
pub struct TriggerProcessor<S> {
    store: S,
    results: broadcast::Sender<TriggerResult>,
    paused: std::sync::Mutex<bool>,
    inner: tokio::sync::Mutex<Inner>,
}

impl<S: TriggerStateStore> TriggerProcessor<S> {
    /// Create a processor over the given store. `capacity` bounds how many
    /// unread results a slow subscriber may lag behind.
    #[must_use]
    pub fn new(store: S, capacity: usize) -> Self {
        let (results, _) = broadcast::channel(capacity);
        Self {
            store,
            results,
            paused: std::sync::Mutex::new(false),
            inner: tokio::sync::Mutex::new(Inner {
                triggers: Vec::new(),
                app_state: None,
            }),
        }
    }

    /// Subscribe to fired [`TriggerResult`]s. Only results published after
    /// the subscription are delivered.
    #[must_use]
    pub fn results(&self) -> broadcast::Receiver<TriggerResult> {
        self.results.subscribe()
    }

    /// Gate event processing. While paused, [`process_event`] is a complete
    /// no-op: no match, no persist, no emission.
    ///
    /// [`process_event`]: Self::process_event
    pub fn set_paused(&self, paused: bool) {
        *self
            .paused
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = paused;
    }

    fn is_paused(&self) -> bool {
        *self
            .paused
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Fan one event out to every prepared trigger, persist the resulting
    /// state deltas, and publish any fired results.
    pub async fn process_event(&self, event: &AutomationEvent) {
        if self.is_paused() {
            return;
        }

        let mut inner = self.inner.lock().await;

        if let AutomationEvent::StateChanged { state } = event {
            inner.app_state = Some(state.clone());
        }

        let now = time::now();
        let mut updates = Vec::new();
        for prepared in &inner.triggers {
            let Some(outcome) = prepared.process(event, now) else {
                continue;
            };
            updates.push(outcome.new_state);
            if let Some(result) = outcome.result {
                let _ = self.results.send(result);
            }
        }

        self.persist(updates).await;
    }

    /// Full reinitialization from the given schedules.
    ///
    /// Replaces the entire in-memory trigger set — one prepared trigger per
    /// execution trigger, plus one per delay-cancellation trigger when the
    /// schedule defines a cancellation delay — resuming each from persisted
    /// state where available. Persisted state for schedules absent from the
    /// input is garbage-collected. Finally the activation step runs for
    /// every restored schedule.
    pub async fn restore_schedules(&self, schedules: &[AutomationScheduleData]) {
        let mut inner = self.inner.lock().await;

        let mut restored = Vec::new();
        for data in schedules {
            for trigger in &data.triggers {
                restored.push(
                    self.prepare(data, trigger, TriggerExecutionType::Execution)
                        .await,
                );
            }
            for trigger in data.delay_cancellation_triggers.iter().flatten() {
                restored.push(
                    self.prepare(data, trigger, TriggerExecutionType::DelayCancellation)
                        .await,
                );
            }
        }
        inner.triggers = restored;

        let keep: HashSet<ScheduleId> = schedules.iter().map(|data| data.schedule_id).collect();
        if let Err(err) = self.store.remove_all_except(&keep).await {
            tracing::error!(error = %err, "failed to garbage-collect trigger states");
        }

        for data in schedules {
            self.apply_execution_state(&inner, data).await;
        }
    }

    /// Partial update: refresh the validity window of already-prepared
    /// triggers — progress is neither recreated nor reset — then re-run the
    /// activation step for the schedule.
    pub async fn update_schedule(&self, data: &AutomationScheduleData) {
        let inner = self.inner.lock().await;

        for trigger in data
            .triggers
            .iter()
            .chain(data.delay_cancellation_triggers.iter().flatten())
        {
            if let Some(prepared) = inner
                .triggers
                .iter()
                .find(|prepared| prepared.trigger_id() == trigger.id)
            {
                prepared.update_schedule(data.start, data.end);
            }
        }

        self.apply_execution_state(&inner, data).await;
    }

    /// [`update_schedule`] over a batch.
    ///
    /// [`update_schedule`]: Self::update_schedule
    pub async fn update_schedules(&self, schedules: &[AutomationScheduleData]) {
        for data in schedules {
            self.update_schedule(data).await;
        }
    }

    /// Drop the given schedules' triggers from memory and delete their
    /// persisted state.
    pub async fn cancel_schedules(&self, schedule_ids: &[ScheduleId]) {
        let mut inner = self.inner.lock().await;
        inner
            .triggers
            .retain(|prepared| !schedule_ids.contains(&prepared.schedule_id()));

        if let Err(err) = self.store.remove_for_schedules(schedule_ids).await {
            tracing::error!(error = %err, "failed to delete trigger states for cancelled schedules");
        }
    }

    /// Cancel every schedule tagged with `group`.
    pub async fn cancel_group(&self, group: &str) {
        let mut inner = self.inner.lock().await;
        inner
            .triggers
            .retain(|prepared| prepared.group() != Some(group));

        if let Err(err) = self.store.remove_for_group(group).await {
            tracing::error!(error = %err, group, "failed to delete trigger states for cancelled group");
        }
    }

    /// Diagnostic snapshot of every prepared trigger's current state.
    pub async fn trigger_states(&self) -> Vec<TriggerState> {
        let inner = self.inner.lock().await;
        inner
            .triggers
            .iter()
            .map(|prepared| prepared.state())
            .collect()
    }

    async fn prepare(
        &self,
        data: &AutomationScheduleData,
        trigger: &AutomationTrigger,
        execution_type: TriggerExecutionType,
    ) -> Arc<PreparedTrigger> {
        // A failed read is the same as no prior state: start from zero.
        let state = match self.store.trigger_state(trigger.id).await {
            Ok(state) => state,
            Err(err) => {
                tracing::error!(error = %err, trigger_id = %trigger.id, "failed to load trigger state, starting fresh");
                None
            }
        };

        Arc::new(PreparedTrigger::new(
            data.schedule_id,
            data.group.clone(),
            trigger.clone(),
            execution_type,
            data.start,
            data.end,
            state,
        ))
    }

    /// Map the schedule's execution state onto trigger activation.
    async fn apply_execution_state(&self, inner: &Inner, data: &AutomationScheduleData) {
        match data.execution_state {
            ScheduleExecutionState::Idle => {
                self.activate_triggers(inner, data.schedule_id, TriggerExecutionType::Execution)
                    .await;
            }
            ScheduleExecutionState::Triggered | ScheduleExecutionState::Prepared => {
                self.activate_triggers(
                    inner,
                    data.schedule_id,
                    TriggerExecutionType::DelayCancellation,
                )
                .await;
            }
            ScheduleExecutionState::Paused | ScheduleExecutionState::Finished => {
                for prepared in inner
                    .triggers
                    .iter()
                    .filter(|prepared| prepared.schedule_id() == data.schedule_id)
                {
                    prepared.disable();
                }
            }
        }
    }

    /// Activate the schedule's triggers of the given type, then re-deliver
    /// the last observed app state as a synthetic `state_changed` event so
    /// edge-triggered rules catch up on transitions they were inactive for.
    async fn activate_triggers(
        &self,
        inner: &Inner,
        schedule_id: ScheduleId,
        execution_type: TriggerExecutionType,
    ) {
        let now = time::now();
        let mut updates = Vec::new();

        for prepared in inner.triggers.iter().filter(|prepared| {
            prepared.schedule_id() == schedule_id && prepared.execution_type() == execution_type
        }) {
            prepared.activate();

            let Some(state) = inner.app_state.clone() else {
                continue;
            };
            let event = AutomationEvent::StateChanged { state };
            if let Some(outcome) = prepared.process(&event, now) {
                updates.push(outcome.new_state);
                if let Some(result) = outcome.result {
                    let _ = self.results.send(result);
                }
            }
        }

        self.persist(updates).await;
    }

    /// Best-effort batch persist: a failure is logged, never surfaced — the
    /// in-memory state stays authoritative for this process lifetime.
    async fn persist(&self, states: Vec<TriggerState>) {
        if states.is_empty() {
            return;
        }
        if let Err(err) = self.store.save_states(&states).await {
            tracing::error!(error = %err, count = states.len(), "failed to save trigger states");
        }
    }
}
