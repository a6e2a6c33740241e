//! Guest directory store abstraction.
//!
//! # Purpose
//! Defines the operation set the directory depends on (insert with generated
//! id, exact slug lookup, name-ordered scan, partial update, delete, change
//! feed, live change notification) so backends can be swapped freely.
//!
//! # Key invariants
//! - Every backend enforces slug uniqueness itself; a duplicate insert fails
//!   with [`StoreError::Conflict`].
//! - Change sequence numbers are strictly increasing per store.
use crate::model::{Guest, GuestChange, GuestDraft, GuestId, GuestPatch, Slug};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

pub mod memory;
pub mod postgres;

/// Capacity of the change notification channel. Slow subscribers that fall
/// further behind see a lag and reload the full list.
pub const NOTIFY_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub changes_limit: u64,
    pub change_retention_max_rows: Option<i64>,
}

impl StoreConfig {
    pub fn change_window(&self) -> usize {
        self.change_retention_max_rows
            .unwrap_or(self.changes_limit as i64)
            .max(self.changes_limit as i64) as usize
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    pub next_seq: u64,
}

#[derive(Debug, Clone)]
pub struct ChangeSet<T> {
    pub items: Vec<T>,
    pub next_seq: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unexpected(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait GuestStore: Send + Sync {
    /// Insert a new guest; the store assigns id and timestamps.
    async fn insert_guest(&self, draft: GuestDraft) -> StoreResult<Guest>;
    async fn get_guest(&self, id: &GuestId) -> StoreResult<Guest>;
    /// Every guest whose slug equals `slug`, in store order.
    async fn find_by_slug(&self, slug: &Slug) -> StoreResult<Vec<Guest>>;
    /// Full scan ordered by name.
    async fn list_guests(&self) -> StoreResult<Vec<Guest>>;
    async fn update_guest(&self, id: &GuestId, patch: GuestPatch) -> StoreResult<Guest>;
    async fn delete_guest(&self, id: &GuestId) -> StoreResult<()>;

    async fn guest_snapshot(&self) -> StoreResult<Snapshot<Guest>>;
    async fn guest_changes(&self, since: u64) -> StoreResult<ChangeSet<GuestChange>>;

    /// Receive a notification (the change `seq`) after every committed write.
    fn subscribe_changes(&self) -> broadcast::Receiver<u64>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

/// Name ordering shared by backends that sort in process.
pub(crate) fn sort_by_name(guests: &mut [Guest]) {
    guests.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}
