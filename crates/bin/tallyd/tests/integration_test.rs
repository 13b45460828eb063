//! End-to-end tests for the full tallyd stack.
//!
//! Each test wires the complete engine (in-memory `SQLite`, real store
//! adapter, real processor) and drives it with JSON-decoded schedules and
//! events — the same shapes the daemon reads at runtime.

use tally_adapter_storage_sqlite_sqlx::{Config, Database, SqliteTriggerStateStore};
use tally_app::processor::TriggerProcessor;
use tally_domain::event::AutomationEvent;
use tally_domain::id::{ScheduleId, TriggerId};
use tally_domain::result::TriggerResult;
use tally_domain::schedule::AutomationScheduleData;

async fn database() -> Database {
    Config {
        database_url: "sqlite::memory:".to_string(),
    }
    .build()
    .await
    .expect("in-memory database should initialise")
}

fn event(line: &str) -> AutomationEvent {
    serde_json::from_str(line).expect("event line should decode")
}

fn drain(
    receiver: &mut tokio::sync::broadcast::Receiver<TriggerResult>,
) -> Vec<TriggerResult> {
    let mut results = Vec::new();
    while let Ok(result) = receiver.try_recv() {
        results.push(result);
    }
    results
}

// ---------------------------------------------------------------------------
// Goal accumulation across the wire format
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_fire_once_purchases_accumulate_to_goal() {
    let db = database().await;
    let processor = TriggerProcessor::new(SqliteTriggerStateStore::new(db.pool().clone()), 16);

    let schedules: Vec<AutomationScheduleData> = serde_json::from_value(serde_json::json!([{
        "schedule_id": ScheduleId::new(),
        "triggers": [{
            "id": TriggerId::new(),
            "type": "custom_event_value",
            "goal": 10.0,
            "predicate": {"scope": ["name"], "equals": "purchase"}
        }],
        "execution_state": "idle"
    }]))
    .unwrap();

    processor.restore_schedules(&schedules).await;
    let mut results = processor.results();

    processor
        .process_event(&event(
            r#"{"type":"custom_event","data":{"name":"purchase"},"value":4.0}"#,
        ))
        .await;
    assert!(drain(&mut results).is_empty());

    // Non-matching event is ignored entirely.
    processor
        .process_event(&event(
            r#"{"type":"custom_event","data":{"name":"other"},"value":100.0}"#,
        ))
        .await;
    assert!(drain(&mut results).is_empty());

    processor
        .process_event(&event(
            r#"{"type":"custom_event","data":{"name":"purchase"},"value":7.0}"#,
        ))
        .await;

    let fired = drain(&mut results);
    assert_eq!(fired.len(), 1);
    assert_eq!(
        fired[0].info.event_snapshot,
        serde_json::json!({"name": "purchase"})
    );

    // The emitted result serializes to the daemon's output shape.
    let line = serde_json::to_string(&fired[0]).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed["execution_type"], "execution");
    assert_eq!(parsed["info"]["context"]["type"], "custom_event_value");
}

// ---------------------------------------------------------------------------
// Durability across restarts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_resume_progress_from_sqlite_after_restart() {
    let db = database().await;

    let schedules: Vec<AutomationScheduleData> = serde_json::from_value(serde_json::json!([{
        "schedule_id": ScheduleId::new(),
        "triggers": [{
            "id": TriggerId::new(),
            "type": "foreground",
            "goal": 3.0
        }],
        "execution_state": "idle"
    }]))
    .unwrap();

    let processor = TriggerProcessor::new(SqliteTriggerStateStore::new(db.pool().clone()), 16);
    processor.restore_schedules(&schedules).await;
    processor.process_event(&AutomationEvent::Foreground).await;
    processor.process_event(&AutomationEvent::Foreground).await;
    drop(processor);

    // Fresh processor over the same database file.
    let restarted = TriggerProcessor::new(SqliteTriggerStateStore::new(db.pool().clone()), 16);
    restarted.restore_schedules(&schedules).await;

    let states = restarted.trigger_states().await;
    assert_eq!(states.len(), 1);
    assert!((states[0].count - 2.0).abs() < f64::EPSILON);

    let mut results = restarted.results();
    restarted.process_event(&AutomationEvent::Foreground).await;
    assert_eq!(drain(&mut results).len(), 1);
}

// ---------------------------------------------------------------------------
// Delay cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_emit_delay_cancellation_result_for_triggered_schedule() {
    let db = database().await;
    let processor = TriggerProcessor::new(SqliteTriggerStateStore::new(db.pool().clone()), 16);

    let schedules: Vec<AutomationScheduleData> = serde_json::from_value(serde_json::json!([{
        "schedule_id": ScheduleId::new(),
        "triggers": [{
            "id": TriggerId::new(),
            "type": "foreground",
            "goal": 1.0
        }],
        "delay_cancellation_triggers": [{
            "id": TriggerId::new(),
            "type": "background",
            "goal": 1.0
        }],
        "execution_state": "triggered"
    }]))
    .unwrap();

    processor.restore_schedules(&schedules).await;
    let mut results = processor.results();

    // Execution triggers are inactive while the delay is pending.
    processor.process_event(&AutomationEvent::Foreground).await;
    assert!(drain(&mut results).is_empty());

    processor.process_event(&AutomationEvent::Background).await;
    let fired = drain(&mut results);
    assert_eq!(fired.len(), 1);

    let line = serde_json::to_string(&fired[0]).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed["execution_type"], "delay_cancellation");
}
