//! Result — the payload published when a trigger reaches its goal.

use serde::{Deserialize, Serialize};

use crate::id::ScheduleId;
use crate::schedule::TriggerExecutionType;
use crate::time::Timestamp;
use crate::trigger::TriggerType;

/// Emitted exactly once per goal achievement and delivered to the external
/// schedule engine, which decides whether to begin execution or cancel a
/// pending delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResult {
    pub schedule_id: ScheduleId,
    pub execution_type: TriggerExecutionType,
    pub info: TriggeringInfo,
}

/// What fired, and on which event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeringInfo {
    /// Report payload of the event that completed the goal.
    pub event_snapshot: serde_json::Value,
    pub context: TriggerContext,
    pub fired_at: Timestamp,
}

/// The configured rule behind a fired result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerContext {
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    pub goal: f64,
}
