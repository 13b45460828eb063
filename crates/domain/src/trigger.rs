//! Trigger — an immutable rule that accumulates event matches toward a goal.
//!
//! A trigger names the kind of event it counts, how much progress is needed
//! before it fires, and optionally a [`EventPredicate`] narrowing which
//! events qualify. A trigger may nest child triggers; the goal-reached
//! invariant then requires every child to independently reach its own goal
//! (see [`crate::trigger_state`]).

use serde::{Deserialize, Serialize};

use crate::error::{TallyError, ValidationError};
use crate::id::TriggerId;
use crate::predicate::EventPredicate;

/// The kind of event a trigger counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// App moved to the foreground.
    Foreground,
    /// App moved to the background.
    Background,
    /// App finished initializing.
    AppInit,
    /// A screen was viewed; the predicate targets the screen name.
    Screen,
    /// A region was entered; the predicate targets the region id.
    RegionEnter,
    /// A region was exited; the predicate targets the region id.
    RegionExit,
    /// A custom event occurred; counts 1 per match.
    CustomEventCount,
    /// A custom event occurred; counts the event's numeric value.
    CustomEventValue,
    /// A feature flag was interacted with.
    FeatureFlagInteraction,
    /// The app version changed since the last observed snapshot.
    Version,
    /// A new app session began since the last observed snapshot.
    ActiveSession,
}

impl TriggerType {
    /// Stable snake_case name, as used in serialized form and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Foreground => "foreground",
            Self::Background => "background",
            Self::AppInit => "app_init",
            Self::Screen => "screen",
            Self::RegionEnter => "region_enter",
            Self::RegionExit => "region_exit",
            Self::CustomEventCount => "custom_event_count",
            Self::CustomEventValue => "custom_event_value",
            Self::FeatureFlagInteraction => "feature_flag_interaction",
            Self::Version => "version",
            Self::ActiveSession => "active_session",
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, configuration-supplied trigger definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationTrigger {
    pub id: TriggerId,
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    /// Cumulative increment threshold; must be positive.
    pub goal: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<EventPredicate>,
    /// Nested triggers that must each reach their own goal before this
    /// trigger can fire.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AutomationTrigger>,
}

impl AutomationTrigger {
    /// Create a builder for constructing an [`AutomationTrigger`].
    #[must_use]
    pub fn builder() -> AutomationTriggerBuilder {
        AutomationTriggerBuilder::default()
    }

    /// Check domain invariants, recursively over children.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Validation`] when the goal of this trigger or
    /// any descendant is not a positive finite number
    /// ([`ValidationError::NonPositiveGoal`]).
    pub fn validate(&self) -> Result<(), TallyError> {
        if !(self.goal > 0.0 && self.goal.is_finite()) {
            return Err(ValidationError::NonPositiveGoal.into());
        }
        for child in &self.children {
            child.validate()?;
        }
        Ok(())
    }
}

/// Step-by-step builder for [`AutomationTrigger`].
#[derive(Debug, Default)]
pub struct AutomationTriggerBuilder {
    id: Option<TriggerId>,
    trigger_type: Option<TriggerType>,
    goal: Option<f64>,
    predicate: Option<EventPredicate>,
    children: Vec<AutomationTrigger>,
}

impl AutomationTriggerBuilder {
    #[must_use]
    pub fn id(mut self, id: TriggerId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn trigger_type(mut self, trigger_type: TriggerType) -> Self {
        self.trigger_type = Some(trigger_type);
        self
    }

    #[must_use]
    pub fn goal(mut self, goal: f64) -> Self {
        self.goal = Some(goal);
        self
    }

    #[must_use]
    pub fn predicate(mut self, predicate: EventPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    #[must_use]
    pub fn child(mut self, child: AutomationTrigger) -> Self {
        self.children.push(child);
        self
    }

    /// Consume the builder, validate, and return an [`AutomationTrigger`].
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Validation`] when no trigger type was given
    /// ([`ValidationError::MissingTriggerType`]) or a goal is not positive
    /// ([`ValidationError::NonPositiveGoal`]).
    pub fn build(self) -> Result<AutomationTrigger, TallyError> {
        let trigger = AutomationTrigger {
            id: self.id.unwrap_or_default(),
            trigger_type: self
                .trigger_type
                .ok_or(ValidationError::MissingTriggerType)?,
            goal: self.goal.unwrap_or(1.0),
            predicate: self.predicate,
            children: self.children,
        };
        trigger.validate()?;
        Ok(trigger)
    }
}
