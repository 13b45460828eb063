//! # tally-app
//!
//! Application layer — the trigger engine and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define the **port trait** adapters must implement (driven/outbound):
//!   - `TriggerStateStore` — durable trigger progress, keyed by trigger id
//! - Provide the engine itself:
//!   - `PreparedTrigger` — matches one configured trigger against events and
//!     evolves its progress state
//!   - `TriggerProcessor` — serialized owner of all prepared triggers;
//!     routes events, persists progress, publishes fired results
//! - Orchestrate domain objects without knowing *how* persistence works
//!
//! ## Dependency rule
//! Depends on `tally-domain` only (plus `tokio::sync` for channels and
//! serialization). Never imports adapter crates. Adapters depend on *this*
//! crate, not the reverse.

pub mod ports;
pub mod prepared_trigger;
pub mod processor;
