//! Live guest-list subscription for the admin view.
//!
//! A [`GuestSubscription`] yields the full, name-ordered guest list once on
//! open and again after every change to the collection. Bursts of changes are
//! coalesced into one reload, and a receiver that lagged behind the
//! notification channel reloads instead of failing.
use crate::directory::{DirectoryResult, GuestDirectory};
use crate::model::Guest;
use futures::Stream;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

static ACTIVE_SUBSCRIBERS: AtomicUsize = AtomicUsize::new(0);

/// Number of subscriptions currently open in this process.
pub fn active_subscribers() -> usize {
    ACTIVE_SUBSCRIBERS.load(Ordering::Relaxed)
}

/// Keeps the subscriber gauge in step with open subscriptions.
#[derive(Debug)]
struct SubscriberGuard;

impl SubscriberGuard {
    fn acquire() -> Self {
        let now = ACTIVE_SUBSCRIBERS.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::gauge!("invitations_watch_subscribers").set(now as f64);
        Self
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        if let Ok(prev) =
            ACTIVE_SUBSCRIBERS.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                v.checked_sub(1)
            })
        {
            metrics::gauge!("invitations_watch_subscribers").set(prev.saturating_sub(1) as f64);
        }
    }
}

pub struct GuestSubscription {
    directory: GuestDirectory,
    receiver: Option<broadcast::Receiver<u64>>,
    initial: Option<Vec<Guest>>,
    guard: Option<SubscriberGuard>,
}

impl GuestSubscription {
    /// Subscribe to changes, then load the initial list. Registering first
    /// means a write racing with the initial load still triggers a reload.
    pub async fn open(directory: GuestDirectory) -> DirectoryResult<Self> {
        let receiver = directory.store().subscribe_changes();
        let initial = directory.list_guests().await?;
        Ok(Self {
            directory,
            receiver: Some(receiver),
            initial: Some(initial),
            guard: Some(SubscriberGuard::acquire()),
        })
    }

    /// Next full list. `None` once the subscription is closed, either by
    /// [`unsubscribe`](Self::unsubscribe) or because the store went away.
    pub async fn next_list(&mut self) -> Option<DirectoryResult<Vec<Guest>>> {
        if let Some(initial) = self.initial.take() {
            return Some(Ok(initial));
        }
        let receiver = self.receiver.as_mut()?;
        match receiver.recv().await {
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "guest watcher lagged; reloading");
            }
            Err(RecvError::Closed) => {
                self.unsubscribe();
                return None;
            }
        }
        // Fold any notifications already queued into this reload.
        loop {
            match receiver.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        Some(self.directory.list_guests().await)
    }

    /// Release the change receiver. Later calls to `next_list` return `None`.
    pub fn unsubscribe(&mut self) {
        self.initial = None;
        self.receiver = None;
        self.guard = None;
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn into_stream(self) -> impl Stream<Item = DirectoryResult<Vec<Guest>>> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            let item = subscription.next_list().await?;
            Some((item, subscription))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::NewGuest;
    use crate::store::StoreConfig;
    use crate::store::memory::InMemoryStore;
    use futures::StreamExt;
    use serial_test::serial;
    use std::sync::Arc;
    use std::time::Duration;

    fn directory() -> GuestDirectory {
        GuestDirectory::new(Arc::new(InMemoryStore::new(StoreConfig {
            changes_limit: 100,
            change_retention_max_rows: None,
        })))
    }

    fn named(name: &str) -> NewGuest {
        NewGuest {
            name: name.to_string(),
            ..NewGuest::default()
        }
    }

    fn names(list: &[Guest]) -> Vec<&str> {
        list.iter().map(|guest| guest.name.as_str()).collect()
    }

    #[tokio::test]
    #[serial]
    async fn yields_initial_list_then_reloads_on_change() {
        let directory = directory();
        directory.create_guest(named("Zoe")).await.expect("create");
        let mut subscription = GuestSubscription::open(directory.clone())
            .await
            .expect("open");

        let initial = subscription.next_list().await.expect("item").expect("list");
        assert_eq!(names(&initial), ["Zoe"]);

        directory.create_guest(named("Alex")).await.expect("create");
        let reloaded = tokio::time::timeout(Duration::from_secs(1), subscription.next_list())
            .await
            .expect("reload in time")
            .expect("item")
            .expect("list");
        assert_eq!(names(&reloaded), ["Alex", "Zoe"]);
    }

    #[tokio::test]
    #[serial]
    async fn burst_of_changes_is_one_reload() {
        let directory = directory();
        let mut subscription = GuestSubscription::open(directory.clone())
            .await
            .expect("open");
        subscription.next_list().await.expect("initial").expect("list");

        // More writes than the notification channel holds.
        for idx in 0..100 {
            directory
                .create_guest(named(&format!("Guest {idx}")))
                .await
                .expect("create");
        }
        let reloaded = subscription.next_list().await.expect("item").expect("list");
        assert_eq!(reloaded.len(), 100);

        let idle =
            tokio::time::timeout(Duration::from_millis(50), subscription.next_list()).await;
        assert!(idle.is_err(), "no further reload without new writes");
    }

    #[tokio::test]
    #[serial]
    async fn unsubscribe_and_drop_release_the_subscriber() {
        let directory = directory();
        let before = active_subscribers();
        let mut first = GuestSubscription::open(directory.clone())
            .await
            .expect("open");
        let second = GuestSubscription::open(directory.clone())
            .await
            .expect("open");
        assert_eq!(active_subscribers(), before + 2);

        first.unsubscribe();
        assert!(!first.is_active());
        assert!(first.next_list().await.is_none());
        assert_eq!(active_subscribers(), before + 1);

        drop(second);
        assert_eq!(active_subscribers(), before);
    }

    #[tokio::test]
    #[serial]
    async fn stream_adapter_forwards_lists() {
        let directory = directory();
        directory.create_guest(named("Sam")).await.expect("create");
        let mut stream = Box::pin(
            GuestSubscription::open(directory.clone())
                .await
                .expect("open")
                .into_stream(),
        );
        let first = stream.next().await.expect("item").expect("list");
        assert_eq!(names(&first), ["Sam"]);

        let sam = first[0].id;
        directory.delete_guest(&sam).await.expect("delete");
        let second = stream.next().await.expect("item").expect("list");
        assert!(second.is_empty());
    }
}
