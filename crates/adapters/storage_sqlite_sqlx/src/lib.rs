//! # tally-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the [`TriggerStateStore`] port defined in `tally-app`
//! - Manage the `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between the [`TriggerState`] tree and flat parent-linked rows
//!
//! ## Dependency rule
//! Depends on `tally-app` (for the port trait) and `tally-domain` (for
//! domain types). The `app` and `domain` crates must never reference this
//! adapter.
//!
//! [`TriggerStateStore`]: tally_app::ports::TriggerStateStore
//! [`TriggerState`]: tally_domain::trigger_state::TriggerState

pub mod error;
pub mod pool;
pub mod trigger_state_repo;

pub use error::StorageError;
pub use pool::{Config, Database};
pub use trigger_state_repo::SqliteTriggerStateStore;
