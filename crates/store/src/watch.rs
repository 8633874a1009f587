//! Change subscription mechanics for the document store.
//!
//! A [`Subscription`] is a receiving handle onto a stream of
//! [`ChangeNotification`]s for one collection. The store publishes a
//! notification after every committed write, so a consumer (typically a UI
//! keeping a list view current) can fold changes into its local state
//! instead of re-reading the collection.
//!
//! Delivery is at-least-once and per-subscriber: each subscription gets a
//! copy of every notification published after it was created. There is no
//! replay of history; consumers read the collection first, then watch.

use std::sync::mpsc::Receiver;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// What kind of write produced a notification.
///
/// Soft deletes are patches that set a tombstone field, so they surface as
/// `Updated` like any other patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
}

/// A committed write, as seen by watchers of the collection.
///
/// `doc` is the full document after the write, not a delta. Consumers that
/// only care about one field still get the whole record, which keeps the
/// notification self-contained and idempotent to re-apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub collection: String,
    pub id: String,
    pub kind: ChangeKind,
    pub doc: JsonValue,
}

/// A subscription to a collection's change stream.
///
/// Each subscription owns the receiving half of a channel; the store holds
/// the sending half and drops it when the subscriber goes away. Designed for
/// single-threaded consumption: one subscription per consuming thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next notification is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a notification without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a notification.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn subscription_receives_in_publish_order() {
        let (tx, rx) = mpsc::channel();
        let sub = Subscription::new(rx);

        for i in 0..3 {
            tx.send(i).unwrap();
        }

        assert_eq!(sub.try_recv().unwrap(), 0);
        assert_eq!(sub.try_recv().unwrap(), 1);
        assert_eq!(sub.try_recv().unwrap(), 2);
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn disconnected_sender_surfaces_as_error() {
        let (tx, rx) = mpsc::channel::<u32>();
        let sub = Subscription::new(rx);
        drop(tx);

        assert!(sub.recv().is_err());
    }

    #[test]
    fn change_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ChangeKind::Created).unwrap(),
            serde_json::json!("created")
        );
        assert_eq!(
            serde_json::to_value(ChangeKind::Updated).unwrap(),
            serde_json::json!("updated")
        );
    }
}
