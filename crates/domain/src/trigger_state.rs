//! TriggerState — mutable, persistable progress toward a trigger's goal.

use serde::{Deserialize, Serialize};

use crate::id::{ScheduleId, TriggerId};
use crate::trigger::AutomationTrigger;

/// Progress of one trigger, forming a tree for nested triggers.
///
/// This is both the authoritative in-memory value between persists and the
/// record shape the store round-trips across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerState {
    pub trigger_id: TriggerId,
    pub schedule_id: ScheduleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub count: f64,
    pub goal: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TriggerState>,
}

impl TriggerState {
    /// Synthesize a zero-count state for a trigger with no persisted history.
    #[must_use]
    pub fn fresh(
        trigger: &AutomationTrigger,
        schedule_id: ScheduleId,
        group: Option<String>,
    ) -> Self {
        Self {
            trigger_id: trigger.id,
            schedule_id,
            group,
            count: 0.0,
            goal: trigger.goal,
            children: Vec::new(),
        }
    }

    /// Whether the goal-reached invariant holds: own count at goal AND every
    /// child independently at its own goal, recursively.
    #[must_use]
    pub fn is_goal_reached(&self) -> bool {
        self.count >= self.goal && self.children.iter().all(TriggerState::is_goal_reached)
    }

    /// A copy of this state with `amount` added to the count. Children are
    /// carried over untouched.
    #[must_use]
    pub fn incremented(&self, amount: f64) -> Self {
        Self {
            count: self.count + amount,
            ..self.clone()
        }
    }

    /// Zero the count. Child progress is intentionally retained across
    /// cycles.
    pub fn reset(&mut self) {
        self.count = 0.0;
    }
}
