//! Pending long-poll waiters and their resolution.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::observability::metrics;
use crate::store::Snapshot;

#[derive(Default)]
struct Registry {
    next_id: u64,
    pending: HashMap<u64, oneshot::Sender<Arc<Snapshot>>>,
}

/// Registry of suspended long-poll requests.
///
/// A waiter leaves the registry exactly once: drained by [`notify`],
/// removed by its own timeout, or removed when the wait is dropped.
/// The oneshot sender is consumed on resolution, so a waiter can never be
/// resolved twice.
///
/// [`notify`]: ChangeNotifier::notify
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    registry: Arc<Mutex<Registry>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new waiter. It observes the next [`notify`](Self::notify)
    /// call made after this returns.
    pub fn register(&self) -> Waiter {
        let (tx, rx) = oneshot::channel();
        let mut registry = self.registry.lock().expect("notifier mutex poisoned");
        let id = registry.next_id;
        registry.next_id += 1;
        registry.pending.insert(id, tx);
        metrics::record_pending_waiters(registry.pending.len());
        drop(registry);

        tracing::trace!(waiter = id, "Waiter registered");
        Waiter {
            id,
            rx,
            registry: self.registry.clone(),
        }
    }

    /// Register a waiter and wait on it.
    pub async fn wait_for_change(&self, timeout: Duration) -> Option<Arc<Snapshot>> {
        self.register().wait(timeout).await
    }

    /// Resolve every pending waiter with `snapshot`.
    ///
    /// The pending set is drained under the lock, so waiters registered
    /// afterwards wait for the next call. Returns how many were resolved.
    pub fn notify(&self, snapshot: Arc<Snapshot>) -> usize {
        let drained = {
            let mut registry = self.registry.lock().expect("notifier mutex poisoned");
            metrics::record_pending_waiters(0);
            std::mem::take(&mut registry.pending)
        };

        let mut resolved = 0;
        for (_, tx) in drained {
            // The receiver is gone if the client disconnected mid-drain. A
            // waiter whose timer fired after the drain is still waiting here.
            if tx.send(snapshot.clone()).is_ok() {
                resolved += 1;
            }
        }
        resolved
    }

    /// Drop every pending waiter without a snapshot; each resolves as
    /// not modified.
    pub fn release_all(&self) -> usize {
        let mut registry = self.registry.lock().expect("notifier mutex poisoned");
        let released = registry.pending.len();
        registry.pending.clear();
        metrics::record_pending_waiters(0);
        released
    }

    /// Number of waiters still registered.
    pub fn pending(&self) -> usize {
        self.registry.lock().expect("notifier mutex poisoned").pending.len()
    }
}

/// A registered long-poll wait. Dropping it deregisters the waiter.
pub struct Waiter {
    id: u64,
    rx: oneshot::Receiver<Arc<Snapshot>>,
    registry: Arc<Mutex<Registry>>,
}

impl Waiter {
    /// Wait for a change, giving up after `timeout`.
    ///
    /// `Some(snapshot)` when a mutation resolved the waiter, `None` when the
    /// timeout elapsed or the waiter was released.
    pub async fn wait(mut self, timeout: Duration) -> Option<Arc<Snapshot>> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(snapshot)) => Some(snapshot),
            Ok(Err(_)) => None,
            Err(_) => {
                if self.deregister() {
                    tracing::trace!(waiter = self.id, "Waiter timed out");
                    None
                } else {
                    // Already drained by notify, which holds our sender and
                    // sends or drops it right after releasing the lock.
                    (&mut self.rx).await.ok()
                }
            }
        }
    }

    /// Remove this waiter if it is still pending. Returns whether it was.
    fn deregister(&self) -> bool {
        let mut registry = self.registry.lock().expect("notifier mutex poisoned");
        let removed = registry.pending.remove(&self.id).is_some();
        if removed {
            metrics::record_pending_waiters(registry.pending.len());
        }
        removed
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        self.deregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Talk;

    fn snapshot(version: u64) -> Arc<Snapshot> {
        Arc::new(Snapshot {
            version,
            talks: vec![Talk::new("T", "A", "B")],
        })
    }

    #[tokio::test]
    async fn test_notify_resolves_all_waiters() {
        let notifier = ChangeNotifier::new();
        let a = notifier.register();
        let b = notifier.register();
        assert_eq!(notifier.pending(), 2);

        assert_eq!(notifier.notify(snapshot(1)), 2);
        assert_eq!(notifier.pending(), 0);

        let a = a.wait(Duration::from_secs(5)).await.unwrap();
        let b = b.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(a.version, 1);
        assert_eq!(b.version, 1);
    }

    #[tokio::test]
    async fn test_waiter_registered_after_notify_waits_for_next() {
        let notifier = ChangeNotifier::new();
        notifier.notify(snapshot(1));

        let late = notifier.register();
        let handle = tokio::spawn(late.wait(Duration::from_secs(5)));
        tokio::task::yield_now().await;
        notifier.notify(snapshot(2));

        let resolved = handle.await.unwrap().unwrap();
        assert_eq!(resolved.version, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_resolves_none_and_deregisters() {
        let notifier = ChangeNotifier::new();
        let result = notifier.wait_for_change(Duration::from_secs(30)).await;
        assert!(result.is_none());
        assert_eq!(notifier.pending(), 0);
    }

    #[tokio::test]
    async fn test_zero_timeout_after_notify_still_delivers() {
        let notifier = ChangeNotifier::new();
        let waiter = notifier.register();
        notifier.notify(snapshot(7));
        // Already resolved: the elapsed timer must not turn this into a miss.
        let result = waiter.wait(Duration::ZERO).await;
        assert_eq!(result.unwrap().version, 7);
    }

    #[tokio::test]
    async fn test_timeout_after_drain_waits_for_send() {
        let notifier = ChangeNotifier::new();
        let waiter = notifier.register();

        // First half of notify: drain under the lock, send later.
        let drained = std::mem::take(
            &mut notifier.registry.lock().unwrap().pending,
        );
        let handle = tokio::spawn(waiter.wait(Duration::ZERO));
        tokio::task::yield_now().await;

        let mut delivered = 0;
        for (_, tx) in drained {
            if tx.send(snapshot(3)).is_ok() {
                delivered += 1;
            }
        }
        assert_eq!(delivered, 1);
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.unwrap().version, 3);
    }

    #[tokio::test]
    async fn test_dropped_waiter_is_removed() {
        let notifier = ChangeNotifier::new();
        let waiter = notifier.register();
        assert_eq!(notifier.pending(), 1);
        drop(waiter);
        assert_eq!(notifier.pending(), 0);
        assert_eq!(notifier.notify(snapshot(1)), 0);
    }

    #[tokio::test]
    async fn test_release_all_resolves_as_not_modified() {
        let notifier = ChangeNotifier::new();
        let waiter = notifier.register();
        assert_eq!(notifier.release_all(), 1);
        assert!(waiter.wait(Duration::from_secs(5)).await.is_none());
    }
}
