//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`TallyError`]
//! at the port boundary.

/// Base error type crossing port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum TallyError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// A storage adapter failed. The concrete error lives behind the box so
    /// the domain stays free of adapter dependencies.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A trigger goal must be a positive, finite number.
    #[error("trigger goal must be greater than zero")]
    NonPositiveGoal,

    /// A trigger must have a type before it can be built.
    #[error("trigger type is required")]
    MissingTriggerType,
}

/// A lookup failed to find the requested record.
#[derive(Debug, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    /// Human-readable record kind (e.g. `"TriggerState"`).
    pub entity: &'static str,
    /// Identifier used in the failed lookup.
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_found_with_entity_and_id() {
        let err = NotFoundError {
            entity: "TriggerState",
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "TriggerState not found: abc");
    }

    #[test]
    fn should_convert_validation_error_into_tally_error() {
        let err: TallyError = ValidationError::NonPositiveGoal.into();
        assert!(matches!(
            err,
            TallyError::Validation(ValidationError::NonPositiveGoal)
        ));
    }

    #[test]
    fn should_display_validation_error_message() {
        assert_eq!(
            ValidationError::NonPositiveGoal.to_string(),
            "trigger goal must be greater than zero"
        );
    }
}
