//! Predicate — a configuration-supplied boolean test over an event payload.
//!
//! Predicates narrow which events count toward a trigger's goal, e.g.
//! "only custom events whose `name` field equals `purchase`". The matcher
//! is deliberately small: an optional key path into the payload, an expected
//! value, and a negation flag.

use serde::{Deserialize, Serialize};

/// A scoped equality test against a JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPredicate {
    /// Key path descended into the payload before comparing. An empty scope
    /// compares the payload itself.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,
    /// The value the scoped payload must equal.
    pub equals: serde_json::Value,
    /// Invert the outcome.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub negate: bool,
}

impl EventPredicate {
    /// Build a predicate matching a payload equal to `value`.
    #[must_use]
    pub fn equals(value: impl Into<serde_json::Value>) -> Self {
        Self {
            scope: Vec::new(),
            equals: value.into(),
            negate: false,
        }
    }

    /// Build a predicate matching `payload[scope...] == value`.
    #[must_use]
    pub fn scoped(scope: Vec<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            scope,
            equals: value.into(),
            negate: false,
        }
    }

    /// Evaluate this predicate against a payload.
    ///
    /// A scope path that does not exist in the payload fails the comparison
    /// (and therefore matches when negated).
    #[must_use]
    pub fn matches(&self, payload: &serde_json::Value) -> bool {
        let mut current = payload;
        for key in &self.scope {
            match current.get(key) {
                Some(value) => current = value,
                None => return self.negate,
            }
        }
        (*current == self.equals) != self.negate
    }
}
