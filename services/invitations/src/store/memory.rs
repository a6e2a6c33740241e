//! In-memory implementation of the guest store.
//!
//! # Purpose
//! Backs local development and tests with a `HashMap` guarded by
//! `tokio::sync::RwLock`. All state is lost on restart.
//!
//! # Consistency
//! - Writes hold the guest map write lock while checking the slug constraint,
//!   so two concurrent inserts of the same slug cannot both succeed.
//! - The change is recorded before the guest lock is released, so change log
//!   order matches the order writes were applied. Lock order is guests, then
//!   changes.
//! - The change log is bounded by `StoreConfig::change_window`; consumers that
//!   fall behind it must reload from a snapshot.
use super::{
    ChangeSet, GuestStore, NOTIFY_CAPACITY, Snapshot, StoreConfig, StoreError, StoreResult,
    sort_by_name,
};
use crate::model::{Guest, GuestChange, GuestChangeOp, GuestDraft, GuestId, GuestPatch, Slug};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use tokio::sync::{RwLock, broadcast};

/// Bounded append-only change log with a process-local sequence.
#[derive(Debug)]
struct ChangeLog {
    next_seq: u64,
    capacity: usize,
    items: VecDeque<GuestChange>,
}

impl ChangeLog {
    fn new(capacity: usize) -> Self {
        Self {
            next_seq: 0,
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    fn record(&mut self, op: GuestChangeOp, guest_id: GuestId, guest: Option<Guest>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push_back(GuestChange {
            seq,
            op,
            guest_id,
            guest,
        });
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
        seq
    }
}

pub struct InMemoryStore {
    config: StoreConfig,
    guests: RwLock<HashMap<GuestId, Guest>>,
    changes: RwLock<ChangeLog>,
    notify: broadcast::Sender<u64>,
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        let capacity = config.change_window();
        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            config,
            guests: RwLock::new(HashMap::new()),
            changes: RwLock::new(ChangeLog::new(capacity)),
            notify,
        }
    }

    fn limit(&self) -> usize {
        self.config.changes_limit as usize
    }

    async fn record(&self, op: GuestChangeOp, guest_id: GuestId, guest: Option<Guest>) {
        let seq = self.changes.write().await.record(op, guest_id, guest);
        metrics::counter!("invitations_guest_changes_total", "op" => op.as_str()).increment(1);
        // No receivers is fine; nobody is watching.
        let _ = self.notify.send(seq);
    }
}

#[async_trait]
impl GuestStore for InMemoryStore {
    async fn insert_guest(&self, draft: GuestDraft) -> StoreResult<Guest> {
        let mut guests = self.guests.write().await;
        if guests.values().any(|existing| existing.slug == draft.slug) {
            return Err(StoreError::Conflict(format!("slug {} exists", draft.slug)));
        }
        let now = Utc::now();
        let guest = Guest {
            id: GuestId::new(),
            slug: draft.slug,
            name: draft.name,
            email: draft.email,
            plus_one: draft.plus_one,
            created_at: now,
            updated_at: now,
        };
        guests.insert(guest.id, guest.clone());
        metrics::gauge!("invitations_guests_total").set(guests.len() as f64);
        self.record(GuestChangeOp::Created, guest.id, Some(guest.clone()))
            .await;
        drop(guests);
        Ok(guest)
    }

    async fn get_guest(&self, id: &GuestId) -> StoreResult<Guest> {
        self.guests
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("guest".into()))
    }

    async fn find_by_slug(&self, slug: &Slug) -> StoreResult<Vec<Guest>> {
        let mut matches: Vec<Guest> = self
            .guests
            .read()
            .await
            .values()
            .filter(|guest| &guest.slug == slug)
            .cloned()
            .collect();
        matches.sort_by_key(|guest| guest.created_at);
        Ok(matches)
    }

    async fn list_guests(&self) -> StoreResult<Vec<Guest>> {
        let mut items: Vec<Guest> = self.guests.read().await.values().cloned().collect();
        sort_by_name(&mut items);
        Ok(items)
    }

    async fn update_guest(&self, id: &GuestId, patch: GuestPatch) -> StoreResult<Guest> {
        let mut guests = self.guests.write().await;
        let guest = guests
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound("guest".into()))?;
        patch.apply(guest);
        guest.updated_at = Utc::now();
        let updated = guest.clone();
        self.record(GuestChangeOp::Updated, updated.id, Some(updated.clone()))
            .await;
        drop(guests);
        Ok(updated)
    }

    async fn delete_guest(&self, id: &GuestId) -> StoreResult<()> {
        let mut guests = self.guests.write().await;
        if guests.remove(id).is_none() {
            return Err(StoreError::NotFound("guest".into()));
        }
        metrics::gauge!("invitations_guests_total").set(guests.len() as f64);
        self.record(GuestChangeOp::Deleted, *id, None).await;
        drop(guests);
        Ok(())
    }

    async fn guest_snapshot(&self) -> StoreResult<Snapshot<Guest>> {
        // Cursor first: replaying from it may repeat a change already in
        // `items`, but never skips one.
        let next_seq = self.changes.read().await.next_seq;
        let items = self.list_guests().await?;
        Ok(Snapshot { items, next_seq })
    }

    async fn guest_changes(&self, since: u64) -> StoreResult<ChangeSet<GuestChange>> {
        // `since` is inclusive.
        let guard = self.changes.read().await;
        let items = guard
            .items
            .iter()
            .filter(|item| item.seq >= since)
            .take(self.limit())
            .cloned()
            .collect();
        Ok(ChangeSet {
            items,
            next_seq: guard.next_seq,
        })
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<u64> {
        self.notify.subscribe()
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryStore {
        InMemoryStore::new(StoreConfig {
            changes_limit: 100,
            change_retention_max_rows: Some(3),
        })
    }

    fn draft(slug: &str, name: &str) -> GuestDraft {
        GuestDraft {
            slug: Slug::parse(slug).expect("slug"),
            name: name.to_string(),
            email: None,
            plus_one: false,
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let store = store();
        let guest = store
            .insert_guest(draft("john-smith", "John Smith"))
            .await
            .expect("insert");
        assert_eq!(guest.created_at, guest.updated_at);
        let fetched = store.get_guest(&guest.id).await.expect("get");
        assert_eq!(fetched, guest);
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let store = store();
        store
            .insert_guest(draft("john-smith", "John Smith"))
            .await
            .expect("first");
        let err = store
            .insert_guest(draft("john-smith", "John  Smith"))
            .await
            .expect_err("second");
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list_guests().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn list_is_ordered_by_name() {
        let store = store();
        for (slug, name) in [("zoe", "Zoe"), ("alex", "alex"), ("mike", "Mike")] {
            store.insert_guest(draft(slug, name)).await.expect("insert");
        }
        let names: Vec<String> = store
            .list_guests()
            .await
            .expect("list")
            .into_iter()
            .map(|guest| guest.name)
            .collect();
        assert_eq!(names, ["alex", "Mike", "Zoe"]);
    }

    #[tokio::test]
    async fn update_merges_and_keeps_slug() {
        let store = store();
        let guest = store
            .insert_guest(draft("jane-doe", "Jane Doe"))
            .await
            .expect("insert");
        let updated = store
            .update_guest(
                &guest.id,
                GuestPatch {
                    name: Some("Jane Doe-Smith".to_string()),
                    email: Some(Some("jane@example.com".to_string())),
                    plus_one: None,
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.slug.as_str(), "jane-doe");
        assert_eq!(updated.name, "Jane Doe-Smith");
        assert_eq!(updated.email.as_deref(), Some("jane@example.com"));
        assert!(updated.updated_at >= guest.updated_at);
    }

    #[tokio::test]
    async fn missing_guest_is_not_found() {
        let store = store();
        let id = GuestId::new();
        assert!(matches!(
            store.get_guest(&id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.update_guest(&id, GuestPatch::default()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_guest(&id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn changes_are_sequenced_and_bounded() {
        let store = InMemoryStore::new(StoreConfig {
            changes_limit: 3,
            change_retention_max_rows: Some(3),
        });
        let guest = store
            .insert_guest(draft("alex", "Alex"))
            .await
            .expect("insert");
        store
            .update_guest(
                &guest.id,
                GuestPatch {
                    plus_one: Some(true),
                    ..GuestPatch::default()
                },
            )
            .await
            .expect("update");
        store.delete_guest(&guest.id).await.expect("delete");

        let changes = store.guest_changes(0).await.expect("changes");
        let ops: Vec<_> = changes.items.iter().map(|change| change.op).collect();
        assert_eq!(
            ops,
            [
                GuestChangeOp::Created,
                GuestChangeOp::Updated,
                GuestChangeOp::Deleted
            ]
        );
        assert_eq!(changes.next_seq, 3);

        store.insert_guest(draft("sam", "Sam")).await.expect("insert");
        let changes = store.guest_changes(0).await.expect("changes");
        // Retention window is three entries; the oldest was evicted.
        assert_eq!(changes.items.len(), 3);
        assert_eq!(changes.items.first().map(|c| c.seq), Some(1));
        assert_eq!(changes.next_seq, 4);

        let snapshot = store.guest_snapshot().await.expect("snapshot");
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.next_seq, 4);
    }

    #[tokio::test]
    async fn writes_notify_subscribers() {
        let store = store();
        let mut rx = store.subscribe_changes();
        store
            .insert_guest(draft("alex", "Alex"))
            .await
            .expect("insert");
        assert_eq!(rx.recv().await.expect("notified"), 0);
    }

    #[tokio::test]
    async fn concurrent_updates_log_in_applied_order() {
        let store = std::sync::Arc::new(store());
        let guest = store
            .insert_guest(draft("alex", "Alex"))
            .await
            .expect("insert");
        let mut tasks = Vec::new();
        for n in 0..16 {
            let store = store.clone();
            let id = guest.id;
            tasks.push(tokio::spawn(async move {
                store
                    .update_guest(
                        &id,
                        GuestPatch {
                            name: Some(format!("Alex {n}")),
                            ..GuestPatch::default()
                        },
                    )
                    .await
                    .expect("update");
            }));
        }
        for task in tasks {
            task.await.expect("join");
        }

        let current = store.get_guest(&guest.id).await.expect("get");
        let changes = store.guest_changes(0).await.expect("changes");
        let last = changes
            .items
            .last()
            .and_then(|change| change.guest.as_ref())
            .expect("last change");
        assert_eq!(last.name, current.name);
        assert_eq!(changes.next_seq, 17);
    }

    #[tokio::test]
    async fn snapshot_cursor_never_skips_a_change() {
        let store = store();
        store
            .insert_guest(draft("alex", "Alex"))
            .await
            .expect("insert");
        let snapshot = store.guest_snapshot().await.expect("snapshot");
        store.insert_guest(draft("sam", "Sam")).await.expect("insert");
        let changes = store
            .guest_changes(snapshot.next_seq)
            .await
            .expect("changes");
        assert_eq!(changes.items.len(), 1);
        assert_eq!(
            changes.items[0].guest.as_ref().map(|guest| guest.slug.as_str()),
            Some("sam")
        );
    }
}
