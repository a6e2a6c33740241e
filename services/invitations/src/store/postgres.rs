//! Postgres-backed implementation of the guest store.
//!
//! # Data model
//! - `guests` holds current state. A unique index on `slug` makes the database
//!   the final arbiter of slug uniqueness, so a lost race between two admins
//!   surfaces as a conflict instead of two colliding invitation links.
//! - `guest_changes` is an append-only log written in the same transaction as
//!   every mutation. An insert trigger publishes the new `seq` on the
//!   `guest_changes` notification channel, which feeds live subscriptions.
//!
//! # Decoding
//! Rows are read into `DbGuest` and validated into [`Guest`]. A row whose slug
//! or name would not pass application validation is reported as
//! [`StoreError::Malformed`] rather than handed to callers.
//!
//! # Security notes
//! Database URLs may contain credentials; never log `PostgresConfig::url`.
use super::{
    ChangeSet, GuestStore, NOTIFY_CAPACITY, Snapshot, StoreConfig, StoreError, StoreResult,
};
use crate::config::PostgresConfig;
use crate::model::{Guest, GuestChange, GuestChangeOp, GuestDraft, GuestId, GuestPatch, Slug};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgListener, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

#[cfg(feature = "pg-tests")]
const RETENTION_TICK: Duration = Duration::from_secs(1);
#[cfg(not(feature = "pg-tests"))]
const RETENTION_TICK: Duration = Duration::from_secs(60);

const NOTIFY_CHANNEL: &str = "guest_changes";
const LISTENER_RETRY: Duration = Duration::from_secs(2);

const GUEST_COLUMNS: &str = "id, slug, name, email, plus_one, created_at, updated_at";

pub struct PostgresStore {
    pool: PgPool,
    config: StoreConfig,
    notify: broadcast::Sender<u64>,
}

#[derive(Debug, Clone, FromRow)]
struct DbGuest {
    id: Uuid,
    slug: String,
    name: String,
    email: Option<String>,
    plus_one: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct GuestChangeRow {
    seq: i64,
    op: String,
    guest_id: Uuid,
    payload: Option<Value>,
}

impl PostgresStore {
    /// Connect, run migrations, and start the change listener.
    ///
    /// # Errors
    /// Connection, pool setup, or migration failures.
    pub async fn connect(pg: &PostgresConfig, config: StoreConfig) -> StoreResult<Self> {
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let pool = tokio::time::timeout(
            Duration::from_millis(pg.connect_timeout_ms),
            PgPoolOptions::new()
                .max_connections(pg.max_connections)
                .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
                .connect_with(connect_options),
        )
        .await
        .map_err(|_| StoreError::Unexpected(anyhow!("postgres connect timed out")))??;

        // Handlers assume the schema exists; refuse to start otherwise.
        sqlx::migrate!("./migrations").run(&pool).await?;

        if let Some(retention) = config.change_retention_max_rows {
            spawn_retention_task(pool.clone(), retention);
        }

        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        spawn_change_listener(pool.clone(), notify.clone());

        Ok(Self {
            pool,
            config,
            notify,
        })
    }

    fn limit(&self) -> i64 {
        self.config.changes_limit as i64
    }
}

/// Bound `guest_changes` to the newest `max_rows` entries. Best effort; a
/// failed delete is retried on the next tick.
fn spawn_retention_task(pool: PgPool, max_rows: i64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RETENTION_TICK);
        loop {
            ticker.tick().await;
            if let Err(err) = sqlx::query(
                "DELETE FROM guest_changes WHERE seq < (SELECT COALESCE(MAX(seq) - $1 + 1, 0) FROM guest_changes)",
            )
            .bind(max_rows)
            .execute(&pool)
            .await
            {
                tracing::debug!(error = %err, "guest change retention pass failed");
            }
        }
    });
}

/// Forward `NOTIFY guest_changes` payloads into the in-process broadcast
/// channel, reconnecting after listener failures.
fn spawn_change_listener(pool: PgPool, notify: broadcast::Sender<u64>) {
    tokio::spawn(async move {
        loop {
            let mut listener = match PgListener::connect_with(&pool).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::warn!(error = %err, "guest change listener connect failed");
                    tokio::time::sleep(LISTENER_RETRY).await;
                    continue;
                }
            };
            if let Err(err) = listener.listen(NOTIFY_CHANNEL).await {
                tracing::warn!(error = %err, "guest change listen failed");
                tokio::time::sleep(LISTENER_RETRY).await;
                continue;
            }
            loop {
                match listener.recv().await {
                    Ok(notification) => match notification.payload().parse::<u64>() {
                        Ok(seq) => {
                            let _ = notify.send(seq);
                        }
                        Err(_) => {
                            tracing::warn!(
                                payload = notification.payload(),
                                "ignoring malformed guest change notification"
                            );
                        }
                    },
                    Err(err) => {
                        tracing::warn!(error = %err, "guest change listener dropped");
                        break;
                    }
                }
            }
            tokio::time::sleep(LISTENER_RETRY).await;
        }
    });
}

#[async_trait]
impl GuestStore for PostgresStore {
    async fn insert_guest(&self, draft: GuestDraft) -> StoreResult<Guest> {
        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query_as::<_, DbGuest>(&format!(
            "INSERT INTO guests (id, slug, name, email, plus_one) VALUES ($1, $2, $3, $4, $5) RETURNING {GUEST_COLUMNS}"
        ))
        .bind(GuestId::new().as_uuid())
        .bind(draft.slug.as_str())
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(draft.plus_one)
        .fetch_one(&mut *tx)
        .await;
        let row = match inserted {
            Ok(row) => row,
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::Conflict(format!("slug {} exists", draft.slug)));
            }
            Err(err) => return Err(err.into()),
        };
        let guest = guest_from_db(row)?;
        append_change(&mut tx, GuestChangeOp::Created, &guest.id, Some(&guest)).await?;
        tx.commit().await?;
        metrics::counter!("invitations_guest_changes_total", "op" => "Created").increment(1);
        self.record_guest_count().await;
        Ok(guest)
    }

    async fn get_guest(&self, id: &GuestId) -> StoreResult<Guest> {
        let row = sqlx::query_as::<_, DbGuest>(&format!(
            "SELECT {GUEST_COLUMNS} FROM guests WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => guest_from_db(row),
            None => Err(StoreError::NotFound("guest".into())),
        }
    }

    async fn find_by_slug(&self, slug: &Slug) -> StoreResult<Vec<Guest>> {
        let rows = sqlx::query_as::<_, DbGuest>(&format!(
            "SELECT {GUEST_COLUMNS} FROM guests WHERE slug = $1 ORDER BY created_at"
        ))
        .bind(slug.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(guest_from_db).collect()
    }

    async fn list_guests(&self) -> StoreResult<Vec<Guest>> {
        let rows = sqlx::query_as::<_, DbGuest>(&format!(
            "SELECT {GUEST_COLUMNS} FROM guests ORDER BY lower(name), created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(guest_from_db).collect()
    }

    async fn update_guest(&self, id: &GuestId, patch: GuestPatch) -> StoreResult<Guest> {
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_as::<_, DbGuest>(&format!(
            "SELECT {GUEST_COLUMNS} FROM guests WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;
        let mut guest = match current {
            Some(row) => guest_from_db(row)?,
            None => return Err(StoreError::NotFound("guest".into())),
        };
        patch.apply(&mut guest);

        // Slug is never updated.
        let row = sqlx::query_as::<_, DbGuest>(&format!(
            "UPDATE guests SET name = $1, email = $2, plus_one = $3, updated_at = now() WHERE id = $4 RETURNING {GUEST_COLUMNS}"
        ))
        .bind(&guest.name)
        .bind(&guest.email)
        .bind(guest.plus_one)
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;
        let updated = guest_from_db(row)?;
        append_change(&mut tx, GuestChangeOp::Updated, id, Some(&updated)).await?;
        tx.commit().await?;
        metrics::counter!("invitations_guest_changes_total", "op" => "Updated").increment(1);
        Ok(updated)
    }

    async fn delete_guest(&self, id: &GuestId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM guests WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound("guest".into()));
        }
        append_change(&mut tx, GuestChangeOp::Deleted, id, None).await?;
        tx.commit().await?;
        metrics::counter!("invitations_guest_changes_total", "op" => "Deleted").increment(1);
        self.record_guest_count().await;
        Ok(())
    }

    async fn guest_snapshot(&self) -> StoreResult<Snapshot<Guest>> {
        // Read the checkpoint first so no change between the two reads is lost;
        // a consumer may see a change it already has, never miss one.
        let next_seq = self.next_seq().await?;
        let items = self.list_guests().await?;
        Ok(Snapshot { items, next_seq })
    }

    async fn guest_changes(&self, since: u64) -> StoreResult<ChangeSet<GuestChange>> {
        let rows = sqlx::query_as::<_, GuestChangeRow>(
            "SELECT seq, op, guest_id, payload FROM guest_changes WHERE seq >= $1 ORDER BY seq LIMIT $2",
        )
        .bind(since as i64)
        .bind(self.limit())
        .fetch_all(&self.pool)
        .await?;
        let items = rows
            .into_iter()
            .map(change_from_db)
            .collect::<StoreResult<Vec<_>>>()?;
        let next_seq = self.next_seq().await?;
        Ok(ChangeSet { items, next_seq })
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<u64> {
        self.notify.subscribe()
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

impl PostgresStore {
    async fn next_seq(&self) -> StoreResult<u64> {
        let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(seq) + 1, 0) FROM guest_changes")
            .fetch_one(&self.pool)
            .await?;
        Ok(next.max(0) as u64)
    }

    async fn record_guest_count(&self) {
        match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM guests")
            .fetch_one(&self.pool)
            .await
        {
            Ok(count) => metrics::gauge!("invitations_guests_total").set(count as f64),
            Err(err) => tracing::debug!(error = %err, "guest count for metrics failed"),
        }
    }
}

async fn append_change(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    op: GuestChangeOp,
    id: &GuestId,
    guest: Option<&Guest>,
) -> StoreResult<()> {
    let payload = match guest {
        Some(guest) => Some(
            serde_json::to_value(guest).map_err(|err| StoreError::Unexpected(err.into()))?,
        ),
        None => None,
    };
    sqlx::query("INSERT INTO guest_changes (op, guest_id, payload) VALUES ($1, $2, $3)")
        .bind(op.as_str())
        .bind(id.as_uuid())
        .bind(payload)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

fn guest_from_db(row: DbGuest) -> StoreResult<Guest> {
    let slug = Slug::parse(&row.slug)
        .map_err(|err| StoreError::Malformed(format!("guest {}: {err}", row.id)))?;
    if row.name.trim().is_empty() {
        return Err(StoreError::Malformed(format!("guest {}: empty name", row.id)));
    }
    Ok(Guest {
        id: GuestId::from_uuid(row.id),
        slug,
        name: row.name,
        email: row.email,
        plus_one: row.plus_one,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn change_from_db(row: GuestChangeRow) -> StoreResult<GuestChange> {
    let op = GuestChangeOp::parse(&row.op)
        .ok_or_else(|| StoreError::Malformed(format!("change {}: unknown op {}", row.seq, row.op)))?;
    let guest = match row.payload {
        Some(value) => Some(
            serde_json::from_value::<Guest>(value)
                .map_err(|err| StoreError::Malformed(format!("change {}: {err}", row.seq)))?,
        ),
        None => None,
    };
    Ok(GuestChange {
        seq: row.seq.max(0) as u64,
        op,
        guest_id: GuestId::from_uuid(row.guest_id),
        guest,
    })
}
