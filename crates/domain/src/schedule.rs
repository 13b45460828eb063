//! Schedule — the automation unit whose execution triggers gate.
//!
//! The engine does not own schedules; it receives them on load and update
//! and reacts to their execution state by activating or disabling the
//! matching prepared triggers.

use serde::{Deserialize, Serialize};

use crate::id::ScheduleId;
use crate::time::Timestamp;
use crate::trigger::AutomationTrigger;

/// Lifecycle state of a schedule, owned by the external schedule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleExecutionState {
    /// Waiting for its execution triggers to fire.
    Idle,
    /// An execution trigger fired; a delay may be pending.
    Triggered,
    /// Prepared to execute once the delay elapses.
    Prepared,
    /// Temporarily suspended; trigger progress is retained.
    Paused,
    /// Will not execute again.
    Finished,
}

/// Which role a prepared trigger plays for its schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerExecutionType {
    /// Progress toward beginning execution.
    Execution,
    /// Active only while a delay is pending; cancels it when fired.
    DelayCancellation,
}

impl std::fmt::Display for TriggerExecutionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Execution => f.write_str("execution"),
            Self::DelayCancellation => f.write_str("delay_cancellation"),
        }
    }
}

/// Everything the trigger engine needs to know about one schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationScheduleData {
    pub schedule_id: ScheduleId,
    /// Optional tag shared by related schedules; cancellation can target a
    /// whole group at once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub triggers: Vec<AutomationTrigger>,
    /// Present only when the schedule defines a cancellation delay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_cancellation_triggers: Option<Vec<AutomationTrigger>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Timestamp>,
    pub execution_state: ScheduleExecutionState,
}
