//! `SQLite` implementation of [`TriggerStateStore`].
//!
//! The [`TriggerState`] tree is flattened into parent-linked rows keyed by
//! trigger id. Fetching rebuilds the tree by walking child links; saving
//! upserts every node of each tree inside one transaction.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, Sqlite, SqlitePool, Transaction};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

use tally_app::ports::TriggerStateStore;
use tally_domain::error::TallyError;
use tally_domain::id::{ScheduleId, TriggerId};
use tally_domain::trigger_state::TriggerState;

use crate::error::StorageError;

struct Wrapper(TriggerState);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let trigger_id: uuid::Uuid = row.try_get("trigger_id")?;
        let schedule_id: uuid::Uuid = row.try_get("schedule_id")?;
        let group: Option<String> = row.try_get("group_tag")?;
        let count: f64 = row.try_get("count")?;
        let goal: f64 = row.try_get("goal")?;

        Ok(Self(TriggerState {
            trigger_id: TriggerId::from_uuid(trigger_id),
            schedule_id: ScheduleId::from_uuid(schedule_id),
            group,
            count,
            goal,
            children: Vec::new(),
        }))
    }
}

const SELECT_BY_TRIGGER_ID: &str = "SELECT * FROM trigger_states WHERE trigger_id = ?";
const SELECT_CHILD_IDS: &str =
    "SELECT trigger_id FROM trigger_states WHERE parent_trigger_id = ? ORDER BY rowid";

const UPSERT: &str = r"
    INSERT INTO trigger_states (trigger_id, schedule_id, group_tag, count, goal, parent_trigger_id)
    VALUES (?, ?, ?, ?, ?, ?)
    ON CONFLICT (trigger_id) DO UPDATE
    SET group_tag = excluded.group_tag, count = excluded.count, goal = excluded.goal
";

/// Load one state tree rooted at `trigger_id`.
///
/// Boxed because the future recurses into children.
fn load_node(
    pool: &SqlitePool,
    trigger_id: uuid::Uuid,
) -> BoxFuture<'_, Result<Option<TriggerState>, StorageError>> {
    Box::pin(async move {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_TRIGGER_ID)
            .bind(trigger_id)
            .fetch_optional(pool)
            .await?;
        let Some(Wrapper(mut state)) = row else {
            return Ok(None);
        };

        let child_ids: Vec<(uuid::Uuid,)> = sqlx::query_as(SELECT_CHILD_IDS)
            .bind(trigger_id)
            .fetch_all(pool)
            .await?;
        for (child_id,) in child_ids {
            if let Some(child) = load_node(pool, child_id).await? {
                state.children.push(child);
            }
        }

        Ok(Some(state))
    })
}

/// Upsert one tree node and recurse into its children.
///
/// Existing rows keep their schedule and parent links; only progress fields
/// are updated. Children already persisted but absent from `state.children`
/// are left untouched.
fn upsert_node<'a>(
    tx: &'a mut Transaction<'static, Sqlite>,
    state: &'a TriggerState,
    parent: Option<TriggerId>,
) -> BoxFuture<'a, Result<(), StorageError>> {
    Box::pin(async move {
        sqlx::query(UPSERT)
            .bind(state.trigger_id.as_uuid())
            .bind(state.schedule_id.as_uuid())
            .bind(&state.group)
            .bind(state.count)
            .bind(state.goal)
            .bind(parent.map(TriggerId::as_uuid))
            .execute(&mut **tx)
            .await?;

        for child in &state.children {
            upsert_node(tx, child, Some(state.trigger_id)).await?;
        }

        Ok(())
    })
}

/// `SQLite`-backed trigger state store.
pub struct SqliteTriggerStateStore {
    pool: SqlitePool,
}

impl SqliteTriggerStateStore {
    /// Create a new store backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TriggerStateStore for SqliteTriggerStateStore {
    async fn trigger_state(&self, trigger_id: TriggerId) -> Result<Option<TriggerState>, TallyError> {
        let state = load_node(&self.pool, trigger_id.as_uuid()).await?;
        Ok(state)
    }

    async fn save_states(&self, states: &[TriggerState]) -> Result<(), TallyError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        for state in states {
            upsert_node(&mut tx, state, None).await?;
        }
        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn remove_all_except(
        &self,
        schedule_ids: &HashSet<ScheduleId>,
    ) -> Result<(), TallyError> {
        if schedule_ids.is_empty() {
            sqlx::query("DELETE FROM trigger_states")
                .execute(&self.pool)
                .await
                .map_err(StorageError::from)?;
            return Ok(());
        }

        let placeholders = vec!["?"; schedule_ids.len()].join(", ");
        let sql =
            format!("DELETE FROM trigger_states WHERE schedule_id NOT IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for schedule_id in schedule_ids {
            query = query.bind(schedule_id.as_uuid());
        }
        query.execute(&self.pool).await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn remove_for_schedules(&self, schedule_ids: &[ScheduleId]) -> Result<(), TallyError> {
        if schedule_ids.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; schedule_ids.len()].join(", ");
        let sql = format!("DELETE FROM trigger_states WHERE schedule_id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for schedule_id in schedule_ids {
            query = query.bind(schedule_id.as_uuid());
        }
        query.execute(&self.pool).await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn remove_for_group(&self, group: &str) -> Result<(), TallyError> {
        sqlx::query("DELETE FROM trigger_states WHERE group_tag = ?")
            .bind(group)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
