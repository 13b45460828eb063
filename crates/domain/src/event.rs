//! Event — one application happening a trigger can react to.
//!
//! Events arrive from an external feed one at a time, in delivery order.
//! The engine never rejects an event; one that matches no trigger is a
//! silent no-op.

use serde::{Deserialize, Serialize};

/// An application event delivered to the trigger processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutomationEvent {
    /// The application moved to the foreground.
    Foreground,
    /// The application moved to the background.
    Background,
    /// The application finished initializing.
    AppInit,
    /// A screen was displayed.
    ScreenView { name: String },
    /// The device entered a geographic region.
    RegionEnter { region_id: String },
    /// The device exited a geographic region.
    RegionExit { region_id: String },
    /// An application-defined event, optionally carrying a numeric value
    /// (e.g. a purchase amount).
    CustomEvent {
        data: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<f64>,
    },
    /// A feature flag was interacted with.
    FeatureFlagInteracted { data: serde_json::Value },
    /// An app-lifecycle snapshot changed. Edge-triggered rules react to the
    /// difference between consecutive snapshots, not to the snapshot itself.
    StateChanged { state: TriggerableState },
}

impl AutomationEvent {
    /// The JSON snapshot embedded in a fired [`TriggerResult`].
    ///
    /// Events without a meaningful payload report JSON null.
    ///
    /// [`TriggerResult`]: crate::result::TriggerResult
    #[must_use]
    pub fn report_payload(&self) -> serde_json::Value {
        match self {
            Self::ScreenView { name } => serde_json::Value::String(name.clone()),
            Self::RegionEnter { region_id } | Self::RegionExit { region_id } => {
                serde_json::Value::String(region_id.clone())
            }
            Self::CustomEvent { data, .. } | Self::FeatureFlagInteracted { data } => data.clone(),
            Self::Foreground | Self::Background | Self::AppInit | Self::StateChanged { .. } => {
                serde_json::Value::Null
            }
        }
    }
}

/// App-lifecycle facts to which edge-triggered rules react.
///
/// Two consecutive equal snapshots never produce a match; only a change in
/// one of the fields can.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerableState {
    /// Set when the app version changed since the last launch; carries the
    /// new version marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_updated: Option<String>,
    /// Identifier of the current app session, if one is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_report_screen_name_as_payload() {
        let event = AutomationEvent::ScreenView {
            name: "home".to_string(),
        };
        assert_eq!(event.report_payload(), serde_json::json!("home"));
    }

    #[test]
    fn should_report_region_id_as_payload() {
        let event = AutomationEvent::RegionEnter {
            region_id: "store-42".to_string(),
        };
        assert_eq!(event.report_payload(), serde_json::json!("store-42"));
    }

    #[test]
    fn should_report_custom_event_data_as_payload() {
        let event = AutomationEvent::CustomEvent {
            data: serde_json::json!({"name": "purchase"}),
            value: Some(9.99),
        };
        assert_eq!(event.report_payload(), serde_json::json!({"name": "purchase"}));
    }

    #[test]
    fn should_report_null_payload_for_lifecycle_events() {
        assert_eq!(
            AutomationEvent::Foreground.report_payload(),
            serde_json::Value::Null
        );
        assert_eq!(
            AutomationEvent::AppInit.report_payload(),
            serde_json::Value::Null
        );
    }

    #[test]
    fn should_roundtrip_events_through_serde_json() {
        let events = vec![
            AutomationEvent::Foreground,
            AutomationEvent::ScreenView {
                name: "settings".to_string(),
            },
            AutomationEvent::CustomEvent {
                data: serde_json::json!({"name": "purchase"}),
                value: Some(4.0),
            },
            AutomationEvent::CustomEvent {
                data: serde_json::json!({"name": "view"}),
                value: None,
            },
            AutomationEvent::StateChanged {
                state: TriggerableState {
                    version_updated: Some("1.2.3".to_string()),
                    app_session_id: None,
                },
            },
        ];

        for event in &events {
            let json = serde_json::to_string(event).unwrap();
            let parsed: AutomationEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(&parsed, event);
        }
    }

    #[test]
    fn should_use_snake_case_type_tags() {
        let json = serde_json::to_value(AutomationEvent::AppInit).unwrap();
        assert_eq!(json["type"], "app_init");

        let json = serde_json::to_value(AutomationEvent::RegionExit {
            region_id: "r".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "region_exit");
    }

    #[test]
    fn should_compare_triggerable_states_by_value() {
        let a = TriggerableState {
            version_updated: Some("2.0.0".to_string()),
            app_session_id: Some("s1".to_string()),
        };
        let b = a.clone();
        assert_eq!(a, b);

        let c = TriggerableState {
            app_session_id: Some("s2".to_string()),
            ..a.clone()
        };
        assert_ne!(a, c);
    }
}
