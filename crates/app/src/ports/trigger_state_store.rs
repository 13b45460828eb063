//! Trigger state store port — durable persistence for trigger progress.

use std::collections::HashSet;
use std::future::Future;

use tally_domain::error::TallyError;
use tally_domain::id::{ScheduleId, TriggerId};
use tally_domain::trigger_state::TriggerState;

/// Repository for persisting and querying [`TriggerState`] trees.
///
/// Each `save_states` batch is atomic as a whole: either every entry is
/// applied or none is and the caller observes an error. No cross-batch
/// transaction guarantee is offered. An upsert locates-or-creates each record
/// by trigger id, recursively for children; children previously persisted but
/// absent from the batch are left untouched.
pub trait TriggerStateStore {
    /// Load the persisted state tree for a trigger, or `None` if absent.
    fn trigger_state(
        &self,
        trigger_id: TriggerId,
    ) -> impl Future<Output = Result<Option<TriggerState>, TallyError>> + Send;

    /// Upsert a batch of state trees atomically.
    fn save_states(
        &self,
        states: &[TriggerState],
    ) -> impl Future<Output = Result<(), TallyError>> + Send;

    /// Delete every state whose schedule is *not* in the given set.
    fn remove_all_except(
        &self,
        schedule_ids: &HashSet<ScheduleId>,
    ) -> impl Future<Output = Result<(), TallyError>> + Send;

    /// Delete all state belonging to the given schedules.
    fn remove_for_schedules(
        &self,
        schedule_ids: &[ScheduleId],
    ) -> impl Future<Output = Result<(), TallyError>> + Send;

    /// Delete all state belonging to schedules tagged with `group`.
    fn remove_for_group(
        &self,
        group: &str,
    ) -> impl Future<Output = Result<(), TallyError>> + Send;
}

impl<T: TriggerStateStore + Send + Sync> TriggerStateStore for std::sync::Arc<T> {
    fn trigger_state(
        &self,
        trigger_id: TriggerId,
    ) -> impl Future<Output = Result<Option<TriggerState>, TallyError>> + Send {
        (**self).trigger_state(trigger_id)
    }

    fn save_states(
        &self,
        states: &[TriggerState],
    ) -> impl Future<Output = Result<(), TallyError>> + Send {
        (**self).save_states(states)
    }

    fn remove_all_except(
        &self,
        schedule_ids: &HashSet<ScheduleId>,
    ) -> impl Future<Output = Result<(), TallyError>> + Send {
        (**self).remove_all_except(schedule_ids)
    }

    fn remove_for_schedules(
        &self,
        schedule_ids: &[ScheduleId],
    ) -> impl Future<Output = Result<(), TallyError>> + Send {
        (**self).remove_for_schedules(schedule_ids)
    }

    fn remove_for_group(
        &self,
        group: &str,
    ) -> impl Future<Output = Result<(), TallyError>> + Send {
        (**self).remove_for_group(group)
    }
}
