// crates/server/src/broadcast.rs
//! Fan-out of rendered fragments to live viewers.
//!
//! One registry of per-subscriber channels behind a single mutex. The lock is
//! held only to register, unregister, or enqueue — senders never block on a
//! slow reader, and each subscriber drains its own queue at its own pace.
//! Queues are unbounded; a stalled viewer grows its queue rather than
//! stalling the publisher or its peers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;

/// A live subscriber handle: drop the receiver to disconnect.
pub struct Subscription {
    pub id: u64,
    pub rx: mpsc::UnboundedReceiver<String>,
}

/// Registry of subscriber channels.
#[derive(Default, Debug)]
pub struct Broadcaster {
    subscribers: Mutex<Vec<(u64, mpsc::UnboundedSender<String>)>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. It will receive every fragment published
    /// after this call, and nothing published before it.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push((id, tx));
        Subscription { id, rx }
    }

    pub fn unsubscribe(&self, id: u64) {
        self.lock().retain(|(sub_id, _)| *sub_id != id);
    }

    /// Enqueue a payload to every registered subscriber, in one pass, in
    /// registration order. Subscribers whose receiver is gone are pruned;
    /// nobody else is affected. Returns the number of deliveries.
    pub fn publish(&self, payload: &str) -> usize {
        let mut subscribers = self.lock();
        let mut delivered = 0;
        subscribers.retain(|(_, tx)| match tx.send(payload.to_string()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => false,
        });
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, mpsc::UnboundedSender<String>)>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_subscribers_receive_in_identical_order() {
        let broadcaster = Broadcaster::new();
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();

        assert_eq!(broadcaster.publish("one"), 2);
        assert_eq!(broadcaster.publish("two"), 2);

        assert_eq!(a.rx.recv().await.unwrap(), "one");
        assert_eq!(a.rx.recv().await.unwrap(), "two");
        assert_eq!(b.rx.recv().await.unwrap(), "one");
        assert_eq!(b.rx.recv().await.unwrap(), "two");
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_publishes() {
        let broadcaster = Broadcaster::new();
        broadcaster.publish("before");

        let mut late = broadcaster.subscribe();
        broadcaster.publish("after");

        assert_eq!(late.rx.recv().await.unwrap(), "after");
        assert!(late.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_exactly_one_copy_per_subscriber() {
        let broadcaster = Broadcaster::new();
        let mut sub = broadcaster.subscribe();
        broadcaster.publish("only");
        assert_eq!(sub.rx.recv().await.unwrap(), "only");
        assert!(sub.rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscriber_is_pruned_on_publish() {
        let broadcaster = Broadcaster::new();
        let sub = broadcaster.subscribe();
        let _keep = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        drop(sub.rx);
        assert_eq!(broadcaster.publish("x"), 1);
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_channel() {
        let broadcaster = Broadcaster::new();
        let a = broadcaster.subscribe();
        let _b = broadcaster.subscribe();

        broadcaster.unsubscribe(a.id);
        assert_eq!(broadcaster.subscriber_count(), 1);
        // Unsubscribing twice is harmless.
        broadcaster.unsubscribe(a.id);
        assert_eq!(broadcaster.subscriber_count(), 1);
    }
}
