//! Change feed for the `geofence_locations` table.
//!
//! Backends publish a [`ChangeEvent`] on a `tokio::sync::broadcast` channel for every
//! inserted, updated or deleted row. Consumers treat an event as "something changed"
//! and re-fetch; the payload is informational only.

use serde::{Deserialize, Serialize};
use tokio::{sync::broadcast, task::JoinHandle};
use uuid::Uuid;

/// Postgres NOTIFY channel written by the `geofence_locations_change_feed` trigger.
pub const CHANGE_CHANNEL: &str = "geofence_locations_changes";

/// Buffer capacity of a backend's change-feed channel.
pub const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "op")]
    pub kind: ChangeKind,
    #[serde(rename = "id", default)]
    pub location_id: Option<Uuid>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, location_id: Uuid) -> Self {
        Self {
            kind,
            location_id: Some(location_id),
        }
    }

    /// Event carrying no usable payload.
    pub fn unknown() -> Self {
        Self {
            kind: ChangeKind::Unknown,
            location_id: None,
        }
    }

    /// Parse a NOTIFY payload such as `{"op":"INSERT","id":"..."}`.
    ///
    /// Anything unparsable still counts as a change.
    pub fn from_payload(payload: &str) -> Self {
        serde_json::from_str(payload).unwrap_or_else(|e| {
            log::debug!("Unparsable change payload {:?}: {}", payload, e);
            Self::unknown()
        })
    }
}

/// Handle for a live change-feed subscription.
///
/// Release it with [`Subscription::unsubscribe`]. Dropping the handle releases it as
/// well, so a view torn down on an error path does not leak its channel.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawn a task forwarding every event from `receiver` to `callback`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(mut receiver: broadcast::Receiver<ChangeEvent>, callback: F) -> Self
    where
        F: Fn(ChangeEvent) + Send + 'static,
    {
        let id = Uuid::new_v4();
        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => callback(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!(
                            "Change subscription {} lagged, {} event(s) dropped",
                            id,
                            skipped
                        );
                        callback(ChangeEvent::unknown());
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        log::info!("Change feed closed for subscription {}", id);
                        break;
                    }
                }
            }
        });

        log::info!("Change subscription {} opened", id);
        Self {
            id,
            task: Some(task),
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            log::info!("Change subscription {} released", self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notify_payload() {
        let id = Uuid::new_v4();
        let payload = format!(r#"{{"op":"DELETE","id":"{}"}}"#, id);
        let event = ChangeEvent::from_payload(&payload);
        assert_eq!(event, ChangeEvent::new(ChangeKind::Delete, id));
    }

    #[test]
    fn test_parse_unknown_operation() {
        let event = ChangeEvent::from_payload(r#"{"op":"TRUNCATE"}"#);
        assert_eq!(event.kind, ChangeKind::Unknown);
        assert_eq!(event.location_id, None);
    }

    #[test]
    fn test_parse_garbage_payload() {
        assert_eq!(ChangeEvent::from_payload("not json"), ChangeEvent::unknown());
    }

    #[tokio::test]
    async fn test_subscription_forwards_events_until_released() {
        let (sender, receiver) = broadcast::channel(8);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let subscription = Subscription::spawn(receiver, move |event| {
            let _ = tx.send(event);
        });
        assert!(subscription.is_active());

        let id = Uuid::new_v4();
        sender.send(ChangeEvent::new(ChangeKind::Insert, id)).unwrap();
        assert_eq!(rx.recv().await, Some(ChangeEvent::new(ChangeKind::Insert, id)));

        subscription.unsubscribe();
        // The callback (and its sender) is dropped once the task is aborted.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_dropping_subscription_releases_callback() {
        let (sender, receiver) = broadcast::channel(8);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ChangeEvent>();

        let subscription = Subscription::spawn(receiver, move |event| {
            let _ = tx.send(event);
        });
        drop(subscription);

        assert_eq!(rx.recv().await, None);
        assert_eq!(sender.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_gets_single_unknown_event() {
        let (sender, receiver) = broadcast::channel(4);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        // The forwarding task is not polled until this test yields, so the
        // receiver falls behind by six events.
        let _subscription = Subscription::spawn(receiver, move |event| {
            let _ = tx.send(event);
        });
        let ids: Vec<Uuid> = (0..10).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            sender.send(ChangeEvent::new(ChangeKind::Insert, *id)).unwrap();
        }

        assert_eq!(rx.recv().await, Some(ChangeEvent::unknown()));
        for id in &ids[6..] {
            assert_eq!(
                rx.recv().await,
                Some(ChangeEvent::new(ChangeKind::Insert, *id))
            );
        }
        assert!(rx.try_recv().is_err());
    }
}
