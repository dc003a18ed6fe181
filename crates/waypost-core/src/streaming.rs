//! Ordered history snapshots and the subscriptions that deliver them.
//!
//! Stores push the full current ordered set on every change. A
//! [`SnapshotFeed`] is the single-writer side of that push: the store
//! publishes, every [`SnapshotSubscription`] sees the latest value. Snapshots
//! are immutable and shared, so a reader always works on a consistent value.
//!
//! A subscription supports scoped release via [`SnapshotSubscription::unsubscribe`]
//! or by being dropped; both cancel the underlying token.

use std::ops::Deref;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, Stream, StreamExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use waypost_types::LocationRecord;

use crate::error::StoreError;

/// Full ordered set of records, ascending by timestamp and unique by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySnapshot {
    records: Arc<[LocationRecord]>,
}

impl HistorySnapshot {
    /// Build a snapshot, enforcing ascending timestamp order and id uniqueness.
    ///
    /// The sort is stable, so records with equal timestamps keep their
    /// delivery order. When an id repeats, the first occurrence wins.
    pub fn new(mut records: Vec<LocationRecord>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        let mut seen = std::collections::HashSet::with_capacity(records.len());
        records.retain(|r| seen.insert(r.id.clone()));
        Self {
            records: records.into(),
        }
    }

    /// An empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The records in ascending timestamp order.
    pub fn records(&self) -> &[LocationRecord] {
        &self.records
    }
}

impl Deref for HistorySnapshot {
    type Target = [LocationRecord];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

impl From<Vec<LocationRecord>> for HistorySnapshot {
    fn from(records: Vec<LocationRecord>) -> Self {
        Self::new(records)
    }
}

/// Result type for subscription items.
pub type SnapshotResult = std::result::Result<HistorySnapshot, StoreError>;

/// Broadcaster stores use to push full snapshots to subscribers.
///
/// Latest value wins: a slow subscriber skips intermediate snapshots but never
/// observes a partial one.
#[derive(Debug, Clone)]
pub struct SnapshotFeed {
    sender: Arc<watch::Sender<SnapshotResult>>,
}

impl SnapshotFeed {
    /// Create a feed holding `initial`.
    pub fn new(initial: HistorySnapshot) -> Self {
        let (sender, _) = watch::channel(Ok(initial));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Replace the current snapshot and notify subscribers.
    pub fn publish(&self, snapshot: HistorySnapshot) {
        let _ = self.sender.send_replace(Ok(snapshot));
    }

    /// Deliver an error to subscribers in place of a snapshot.
    pub fn fail(&self, err: StoreError) {
        let _ = self.sender.send_replace(Err(err));
    }

    /// The value the next subscriber would see first.
    pub fn current(&self) -> SnapshotResult {
        self.sender.borrow().clone()
    }

    /// Open a new subscription starting from the current value.
    pub fn subscribe(&self) -> SnapshotSubscription {
        let receiver = self.sender.subscribe();
        let stream = futures::stream::unfold((receiver, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                // Feed dropped: the store is gone.
                return None;
            }
            let item = rx.borrow_and_update().clone();
            Some((item, (rx, false)))
        });
        SnapshotSubscription::new(stream)
    }

    /// Get the number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SnapshotFeed {
    fn default() -> Self {
        Self::new(HistorySnapshot::empty())
    }
}

/// A standing subscription to a store's ordered snapshots.
///
/// Ends when released or when the store drops its feed.
pub struct SnapshotSubscription {
    inner: BoxStream<'static, SnapshotResult>,
    cancel_token: CancellationToken,
}

impl SnapshotSubscription {
    /// Wrap any stream of snapshot results as a subscription.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = SnapshotResult> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let inner = stream
            .take_until(cancel_token.clone().cancelled_owned())
            .boxed();
        Self {
            inner,
            cancel_token,
        }
    }

    /// Release the subscription. No further items are delivered.
    pub fn unsubscribe(self) {
        self.cancel_token.cancel();
    }

    /// Token that releases the subscription when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Check if the subscription has been released.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Drop for SnapshotSubscription {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

impl Stream for SnapshotSubscription {
    type Item = SnapshotResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for SnapshotSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotSubscription")
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use waypost_types::{OperatorId, RecordId};

    fn record(id: &str, ts: time::OffsetDateTime) -> LocationRecord {
        LocationRecord {
            id: RecordId::new(id),
            timestamp: ts,
            latitude: 0.0,
            longitude: 0.0,
            accuracy: None,
            altitude: None,
            tracker_id: OperatorId::new("op"),
        }
    }

    #[test]
    fn test_snapshot_orders_by_timestamp() {
        let snapshot = HistorySnapshot::new(vec![
            record("b", datetime!(2024-06-01 20:30 UTC)),
            record("a", datetime!(2024-06-01 08:00 UTC)),
        ]);
        let ids: Vec<_> = snapshot.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_snapshot_dedups_by_id() {
        let snapshot = HistorySnapshot::new(vec![
            record("a", datetime!(2024-06-01 08:00 UTC)),
            record("a", datetime!(2024-06-01 09:00 UTC)),
            record("b", datetime!(2024-06-01 09:00 UTC)),
        ]);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].timestamp, datetime!(2024-06-01 08:00 UTC));
    }

    #[test]
    fn test_snapshot_equal_timestamps_keep_order() {
        let ts = datetime!(2024-06-01 08:00 UTC);
        let snapshot = HistorySnapshot::new(vec![record("x", ts), record("y", ts), record("z", ts)]);
        let ids: Vec<_> = snapshot.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["x", "y", "z"]);
    }

    #[tokio::test]
    async fn test_feed_delivers_current_then_updates() {
        let feed = SnapshotFeed::default();
        let mut sub = feed.subscribe();

        let first = sub.next().await.unwrap().unwrap();
        assert!(first.is_empty());

        feed.publish(HistorySnapshot::new(vec![record(
            "a",
            datetime!(2024-06-01 08:00 UTC),
        )]));
        let second = sub.next().await.unwrap().unwrap();
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn test_feed_delivers_errors() {
        let feed = SnapshotFeed::default();
        let mut sub = feed.subscribe();
        let _ = sub.next().await;

        feed.fail(StoreError::Subscription("permission denied".to_string()));
        let item = sub.next().await.unwrap();
        assert!(matches!(item, Err(StoreError::Subscription(_))));
    }

    #[test]
    fn test_publish_without_subscribers_replaces_current() {
        let feed = SnapshotFeed::default();
        feed.publish(HistorySnapshot::new(vec![record(
            "a",
            datetime!(2024-06-01 08:00 UTC),
        )]));
        assert_eq!(feed.current().unwrap().len(), 1);

        feed.fail(StoreError::Subscription("offline".to_string()));
        assert!(matches!(feed.current(), Err(StoreError::Subscription(_))));
    }

    #[tokio::test]
    async fn test_subscription_ends_when_feed_dropped() {
        let feed = SnapshotFeed::default();
        let mut sub = feed.subscribe();
        let _ = sub.next().await;
        drop(feed);
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_subscription_ends() {
        let feed = SnapshotFeed::default();
        let mut sub = feed.subscribe();
        let token = sub.cancellation_token();
        let _ = sub.next().await;
        token.cancel();
        assert!(sub.is_cancelled());
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_subscriber_count() {
        let feed = SnapshotFeed::default();
        assert_eq!(feed.subscriber_count(), 0);
        let sub = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);
        sub.unsubscribe();
        assert_eq!(feed.subscriber_count(), 0);
    }
}
