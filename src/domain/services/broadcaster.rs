//! Live portal connections grouped by public event code.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-connection outbound buffer. A subscriber that falls this far behind
/// counts as failed and is pruned on the next broadcast.
pub const SUBSCRIBER_BUFFER: usize = 64;

/// Sending half of one portal connection.
///
/// Clones share the eviction token: once the registry drops the subscriber,
/// every clone observes it and the socket owning it must close.
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: Uuid,
    tx: mpsc::Sender<Arc<String>>,
    evicted: CancellationToken,
}

impl Subscriber {
    pub fn new(tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx,
            evicted: CancellationToken::new(),
        }
    }

    /// Subscriber plus the receiver its socket writer drains.
    pub fn channel() -> (Self, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        (Self::new(tx), rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Resolves once the subscriber has been removed from its group.
    pub async fn evicted(&self) {
        self.evicted.cancelled().await
    }

    pub fn is_evicted(&self) -> bool {
        self.evicted.is_cancelled()
    }

    fn deliver(&self, payload: Arc<String>) -> bool {
        self.tx.try_send(payload).is_ok()
    }
}

#[derive(Default)]
pub struct Broadcaster {
    groups: Mutex<HashMap<String, Vec<Subscriber>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the subscriber to the event's group, creating the group if needed.
    /// Returns the group size afterwards.
    pub fn register(&self, subscriber: Subscriber, event_code: &str) -> usize {
        let mut groups = self.groups.lock();
        let group = groups.entry(event_code.to_string()).or_default();
        if !group.iter().any(|s| s.id == subscriber.id) {
            group.push(subscriber);
        }
        let size = group.len();
        info!(event_code, connections = size, "portal connection registered");
        size
    }

    /// Removes the subscriber if present and fires its eviction token.
    /// Empty groups are dropped.
    pub fn unregister(&self, subscriber_id: Uuid, event_code: &str) -> bool {
        let mut groups = self.groups.lock();
        let Some(group) = groups.get_mut(event_code) else {
            return false;
        };

        let before = group.len();
        group.retain(|s| {
            if s.id == subscriber_id {
                s.evicted.cancel();
                return false;
            }
            true
        });
        let removed = group.len() != before;
        let remaining = group.len();

        if remaining == 0 {
            groups.remove(event_code);
        }
        if removed {
            info!(event_code, remaining, "portal connection removed");
        }
        removed
    }

    /// Delivers to one connection. Failures are logged; the connection stays.
    pub fn send_to<M: Serialize>(&self, subscriber: &Subscriber, message: &M) -> bool {
        let Some(payload) = serialize(message) else {
            return false;
        };
        let delivered = subscriber.deliver(payload);
        if !delivered {
            warn!(subscriber = %subscriber.id, "failed to send message to portal connection");
        }
        delivered
    }

    /// Delivers to every subscriber of the event and prunes the ones that
    /// fail. Returns how many received the message.
    pub fn broadcast<M: Serialize>(&self, event_code: &str, message: &M) -> usize {
        // Snapshot under the lock; delivery and pruning happen outside it.
        let recipients: Vec<Subscriber> = match self.groups.lock().get(event_code) {
            Some(group) => group.clone(),
            None => {
                debug!(event_code, "no active connections for event");
                return 0;
            }
        };

        let Some(payload) = serialize(message) else {
            return 0;
        };

        let mut failed = Vec::new();
        for subscriber in &recipients {
            if !subscriber.deliver(Arc::clone(&payload)) {
                warn!(event_code, subscriber = %subscriber.id, "broadcast delivery failed");
                failed.push(subscriber.id);
            }
        }

        for id in &failed {
            self.unregister(*id, event_code);
        }

        let delivered = recipients.len() - failed.len();
        debug!(event_code, recipients = recipients.len(), delivered, pruned = failed.len(), "broadcast sent");
        delivered
    }

    pub fn count_for(&self, event_code: &str) -> usize {
        self.groups.lock().get(event_code).map_or(0, Vec::len)
    }

    pub fn all_counts(&self) -> HashMap<String, usize> {
        self.groups
            .lock()
            .iter()
            .map(|(code, group)| (code.clone(), group.len()))
            .collect()
    }
}

fn serialize<M: Serialize>(message: &M) -> Option<Arc<String>> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Arc::new(json)),
        Err(e) => {
            warn!(error = %e, "failed to serialize portal message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn recv_json(rx: &mut mpsc::Receiver<Arc<String>>) -> Value {
        let msg = rx.try_recv().expect("expected a message");
        serde_json::from_str(&msg).unwrap()
    }

    #[test]
    fn test_register_creates_group_lazily() {
        let b = Broadcaster::new();
        assert_eq!(b.count_for("CODE"), 0);

        let (s1, _rx1) = Subscriber::channel();
        let (s2, _rx2) = Subscriber::channel();
        assert_eq!(b.register(s1, "CODE"), 1);
        assert_eq!(b.register(s2, "CODE"), 2);
        assert_eq!(b.count_for("CODE"), 2);
    }

    #[test]
    fn test_register_same_subscriber_twice_keeps_one_entry() {
        let b = Broadcaster::new();
        let (s, _rx) = Subscriber::channel();
        b.register(s.clone(), "CODE");
        b.register(s, "CODE");
        assert_eq!(b.count_for("CODE"), 1);
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let b = Broadcaster::new();
        assert!(!b.unregister(Uuid::new_v4(), "NOPE"));

        let (s, _rx) = Subscriber::channel();
        b.register(s.clone(), "CODE");
        assert!(b.unregister(s.id(), "CODE"));
        assert!(!b.unregister(s.id(), "CODE"));
    }

    #[test]
    fn test_empty_group_is_dropped() {
        let b = Broadcaster::new();
        let (s, _rx) = Subscriber::channel();
        b.register(s.clone(), "CODE");
        b.unregister(s.id(), "CODE");
        assert!(b.all_counts().is_empty());
    }

    #[test]
    fn test_broadcast_without_group_is_noop() {
        let b = Broadcaster::new();
        assert_eq!(b.broadcast("NOBODY", &json!({"type": "seating_uploaded"})), 0);
        assert!(b.all_counts().is_empty());
    }

    #[test]
    fn test_broadcast_reaches_only_its_event() {
        let b = Broadcaster::new();
        let (s1, mut rx1) = Subscriber::channel();
        let (s2, mut rx2) = Subscriber::channel();
        b.register(s1, "A");
        b.register(s2, "B");

        assert_eq!(b.broadcast("A", &json!({"type": "checkin"})), 1);
        assert_eq!(recv_json(&mut rx1)["type"], "checkin");
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_prunes_severed_connection() {
        let b = Broadcaster::new();
        let (s1, mut rx1) = Subscriber::channel();
        let (s2, rx2) = Subscriber::channel();
        let (s3, mut rx3) = Subscriber::channel();
        b.register(s1, "CODE");
        b.register(s2, "CODE");
        b.register(s3, "CODE");

        drop(rx2);

        let delivered = b.broadcast("CODE", &json!({"type": "seating_uploaded"}));
        assert_eq!(delivered, 2);
        assert_eq!(recv_json(&mut rx1)["type"], "seating_uploaded");
        assert_eq!(recv_json(&mut rx3)["type"], "seating_uploaded");
        assert_eq!(b.count_for("CODE"), 2);
    }

    #[test]
    fn test_last_severed_connection_removes_group() {
        let b = Broadcaster::new();
        let (s, rx) = Subscriber::channel();
        b.register(s, "CODE");
        drop(rx);

        assert_eq!(b.broadcast("CODE", &json!({"type": "x"})), 0);
        assert!(!b.all_counts().contains_key("CODE"));
    }

    #[test]
    fn test_lagging_subscriber_is_pruned_and_evicted() {
        let b = Broadcaster::new();
        let (s, mut rx) = Subscriber::channel();
        let handle = s.clone();
        b.register(s, "CODE");

        for _ in 0..SUBSCRIBER_BUFFER {
            assert_eq!(b.broadcast("CODE", &json!({"type": "guest_updated"})), 1);
        }
        assert!(!handle.is_evicted());

        assert_eq!(b.broadcast("CODE", &json!({"type": "guest_updated"})), 0);
        assert_eq!(b.count_for("CODE"), 0);
        assert!(handle.is_evicted());

        // The receiver is still open; only the buffered messages remain.
        let mut drained = 0;
        while rx.try_recv().is_ok() {
            drained += 1;
        }
        assert_eq!(drained, SUBSCRIBER_BUFFER);
    }

    #[tokio::test]
    async fn test_unregister_wakes_evicted_waiter() {
        let b = Broadcaster::new();
        let (s, _rx) = Subscriber::channel();
        b.register(s.clone(), "CODE");

        let waiter = tokio::spawn({
            let s = s.clone();
            async move { s.evicted().await }
        });

        b.unregister(s.id(), "CODE");
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("eviction was not observed")
            .unwrap();
    }

    #[test]
    fn test_send_to_failure_does_not_unregister() {
        let b = Broadcaster::new();
        let (s, rx) = Subscriber::channel();
        b.register(s.clone(), "CODE");
        drop(rx);

        assert!(!b.send_to(&s, &json!({"type": "pong"})));
        assert_eq!(b.count_for("CODE"), 1);
    }

    #[test]
    fn test_all_counts() {
        let b = Broadcaster::new();
        let (s1, _rx1) = Subscriber::channel();
        let (s2, _rx2) = Subscriber::channel();
        let (s3, _rx3) = Subscriber::channel();
        b.register(s1, "A");
        b.register(s2, "A");
        b.register(s3, "B");

        let counts = b.all_counts();
        assert_eq!(counts.get("A"), Some(&2));
        assert_eq!(counts.get("B"), Some(&1));
    }

    #[tokio::test]
    async fn test_concurrent_register_and_broadcast() {
        let b = Arc::new(Broadcaster::new());
        let mut handles = Vec::new();
        let mut receivers = Vec::new();

        for _ in 0..32 {
            let (s, rx) = Subscriber::channel();
            receivers.push(rx);
            let b = b.clone();
            handles.push(tokio::spawn(async move {
                b.register(s, "CODE");
                b.broadcast("CODE", &json!({"type": "guest_updated"}));
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(b.count_for("CODE"), 32);
        for rx in receivers.iter_mut() {
            assert!(rx.try_recv().is_ok());
        }
    }
}
