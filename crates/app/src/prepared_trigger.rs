//! PreparedTrigger — one live instance of a configured trigger bound to a
//! schedule.
//!
//! A prepared trigger matches events against its configuration and evolves
//! its own [`TriggerState`]; it never touches persistence. All writes come
//! from the processor's serialized context, but `is_active` and `state` are
//! readable concurrently by diagnostics, so each mutable field sits behind
//! its own lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tally_domain::event::{AutomationEvent, TriggerableState};
use tally_domain::id::{ScheduleId, TriggerId};
use tally_domain::result::{TriggerContext, TriggerResult, TriggeringInfo};
use tally_domain::schedule::TriggerExecutionType;
use tally_domain::time::Timestamp;
use tally_domain::trigger::{AutomationTrigger, TriggerType};
use tally_domain::trigger_state::TriggerState;

/// What processing one event produced: the evolved state (always persisted)
/// and, when the goal was reached, the fired result to publish.
#[derive(Debug, Clone)]
pub struct EventProcessResult {
    pub new_state: TriggerState,
    pub result: Option<TriggerResult>,
}

#[derive(Debug, Default)]
struct ValidityWindow {
    valid_from: Option<Timestamp>,
    valid_until: Option<Timestamp>,
}

/// One configured trigger, prepared for live event matching.
#[derive(Debug)]
pub struct PreparedTrigger {
    schedule_id: ScheduleId,
    group: Option<String>,
    execution_type: TriggerExecutionType,
    trigger: AutomationTrigger,

    state: Mutex<TriggerState>,
    is_active: Mutex<bool>,
    window: Mutex<ValidityWindow>,
    last_app_state: Mutex<Option<TriggerableState>>,
}

/// Recover the guard even if a previous holder panicked; trigger state has
/// no invariant that a partial write could break.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PreparedTrigger {
    /// Bind a configured trigger to a schedule, resuming from persisted
    /// state when available.
    #[must_use]
    pub fn new(
        schedule_id: ScheduleId,
        group: Option<String>,
        trigger: AutomationTrigger,
        execution_type: TriggerExecutionType,
        valid_from: Option<Timestamp>,
        valid_until: Option<Timestamp>,
        state: Option<TriggerState>,
    ) -> Self {
        let state =
            state.unwrap_or_else(|| TriggerState::fresh(&trigger, schedule_id, group.clone()));
        Self {
            schedule_id,
            group,
            execution_type,
            trigger,
            state: Mutex::new(state),
            is_active: Mutex::new(false),
            window: Mutex::new(ValidityWindow {
                valid_from,
                valid_until,
            }),
            last_app_state: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn schedule_id(&self) -> ScheduleId {
        self.schedule_id
    }

    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    #[must_use]
    pub fn trigger_id(&self) -> TriggerId {
        self.trigger.id
    }

    #[must_use]
    pub fn execution_type(&self) -> TriggerExecutionType {
        self.execution_type
    }

    /// Snapshot of the current progress state.
    #[must_use]
    pub fn state(&self) -> TriggerState {
        lock(&self.state).clone()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        *lock(&self.is_active)
    }

    /// The most recently observed app-lifecycle snapshot, if any.
    #[must_use]
    pub fn last_app_state(&self) -> Option<TriggerableState> {
        lock(&self.last_app_state).clone()
    }

    /// Match one event and evolve the progress state.
    ///
    /// Returns `None` when the trigger is inactive, `now` falls outside the
    /// validity window, or the event does not match. Otherwise returns the
    /// updated state and, if the goal-reached invariant now holds, a
    /// [`TriggerResult`] — in which case the count has been reset to zero.
    #[must_use]
    pub fn process(&self, event: &AutomationEvent, now: Timestamp) -> Option<EventProcessResult> {
        if !self.is_active() || !self.is_within_window(now) {
            return None;
        }

        let (matched, amount) = self.matching(event);
        if !matched {
            return None;
        }

        let mut state = lock(&self.state);
        let updated = state.incremented(amount);

        // Progress updates are persisted but not published.
        if !updated.is_goal_reached() {
            *state = updated.clone();
            return Some(EventProcessResult {
                new_state: updated,
                result: None,
            });
        }

        let mut reached = updated;
        reached.reset();
        *state = reached.clone();

        Some(EventProcessResult {
            new_state: reached,
            result: Some(self.fired_result(event, now)),
        })
    }

    /// Replace the validity window. Progress is untouched.
    pub fn update_schedule(&self, valid_from: Option<Timestamp>, valid_until: Option<Timestamp>) {
        *lock(&self.window) = ValidityWindow {
            valid_from,
            valid_until,
        };
    }

    /// Start matching events.
    ///
    /// Clears the last observed app state so the next `state_changed` event
    /// is treated as new. Delay-cancellation triggers additionally restart
    /// their count from zero; execution triggers retain accumulated
    /// progress across activation cycles.
    pub fn activate(&self) {
        let mut active = lock(&self.is_active);
        if *active {
            return;
        }

        *lock(&self.last_app_state) = None;
        *active = true;

        if self.execution_type == TriggerExecutionType::DelayCancellation {
            lock(&self.state).reset();
        }
    }

    /// Stop matching events. State and last observed app state are kept.
    pub fn disable(&self) {
        *lock(&self.is_active) = false;
    }

    fn is_within_window(&self, now: Timestamp) -> bool {
        let window = lock(&self.window);
        if window.valid_from.is_some_and(|start| start > now) {
            return false;
        }
        if window.valid_until.is_some_and(|end| end < now) {
            return false;
        }
        true
    }

    fn matching(&self, event: &AutomationEvent) -> (bool, f64) {
        match event {
            AutomationEvent::StateChanged { state } => {
                if lock(&self.last_app_state).as_ref() == Some(state) {
                    return (false, 1.0);
                }
                self.on_new_app_state(state)
            }
            AutomationEvent::Foreground => {
                (self.trigger.trigger_type == TriggerType::Foreground, 1.0)
            }
            AutomationEvent::Background => {
                (self.trigger.trigger_type == TriggerType::Background, 1.0)
            }
            AutomationEvent::AppInit => (self.trigger.trigger_type == TriggerType::AppInit, 1.0),
            AutomationEvent::ScreenView { name } => {
                if self.trigger.trigger_type != TriggerType::Screen {
                    return (false, 1.0);
                }
                self.predicate_match(&serde_json::Value::String(name.clone()), 1.0)
            }
            AutomationEvent::RegionEnter { region_id } => {
                if self.trigger.trigger_type != TriggerType::RegionEnter {
                    return (false, 1.0);
                }
                self.predicate_match(&serde_json::Value::String(region_id.clone()), 1.0)
            }
            AutomationEvent::RegionExit { region_id } => {
                if self.trigger.trigger_type != TriggerType::RegionExit {
                    return (false, 1.0);
                }
                self.predicate_match(&serde_json::Value::String(region_id.clone()), 1.0)
            }
            AutomationEvent::CustomEvent { data, value } => self.custom_event_match(data, *value),
            AutomationEvent::FeatureFlagInteracted { data } => {
                if self.trigger.trigger_type != TriggerType::FeatureFlagInteraction {
                    return (false, 1.0);
                }
                self.predicate_match(data, 1.0)
            }
        }
    }

    /// Edge-triggered matching: only a change relative to the last observed
    /// snapshot counts. The snapshot is remembered even on a failed match,
    /// so a rejected edge is still consumed.
    fn on_new_app_state(&self, new_state: &TriggerableState) -> (bool, f64) {
        let previous = lock(&self.last_app_state).replace(new_state.clone());

        match self.trigger.trigger_type {
            TriggerType::Version => match &new_state.version_updated {
                Some(marker)
                    if previous
                        .as_ref()
                        .and_then(|state| state.version_updated.as_ref())
                        != Some(marker) =>
                {
                    self.predicate_match(&serde_json::Value::String(marker.clone()), 1.0)
                }
                _ => (false, 1.0),
            },
            TriggerType::ActiveSession => {
                let matched = new_state.app_session_id.is_some()
                    && new_state.app_session_id
                        != previous.and_then(|state| state.app_session_id);
                (matched, 1.0)
            }
            _ => (false, 1.0),
        }
    }

    fn custom_event_match(&self, data: &serde_json::Value, value: Option<f64>) -> (bool, f64) {
        match self.trigger.trigger_type {
            TriggerType::CustomEventCount => self.predicate_match(data, 1.0),
            TriggerType::CustomEventValue => match value {
                Some(value) => self.predicate_match(data, value),
                None => (false, 1.0),
            },
            _ => (false, 1.0),
        }
    }

    fn predicate_match(&self, payload: &serde_json::Value, increment: f64) -> (bool, f64) {
        match &self.trigger.predicate {
            Some(predicate) => (predicate.matches(payload), increment),
            None => (true, increment),
        }
    }

    fn fired_result(&self, event: &AutomationEvent, now: Timestamp) -> TriggerResult {
        TriggerResult {
            schedule_id: self.schedule_id,
            execution_type: self.execution_type,
            info: TriggeringInfo {
                event_snapshot: event.report_payload(),
                context: TriggerContext {
                    trigger_type: self.trigger.trigger_type,
                    goal: self.trigger.goal,
                },
                fired_at: now,
            },
        }
    }
}
