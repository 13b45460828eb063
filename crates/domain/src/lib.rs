//! # tally-domain
//!
//! Pure domain model for the tally trigger engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Events** (application happenings a trigger can react to)
//! - Define **Triggers** (immutable goal-based matching rules, possibly nested)
//! - Define **TriggerState** (mutable, persistable progress toward a goal)
//! - Define **Schedules** (the automation units whose execution triggers gate)
//! - Define **Results** (the payload emitted when a trigger reaches its goal)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod event;
pub mod predicate;
pub mod result;
pub mod schedule;
pub mod trigger;
pub mod trigger_state;
