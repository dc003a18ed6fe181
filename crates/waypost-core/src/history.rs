//! Live, ordered view of every emitted location.
//!
//! [`HistoryStream`] holds one standing store subscription and republishes
//! each delivered snapshot on a watch channel, replacing the previous one
//! wholesale. Dependents read whole snapshots only, so a filter pass never
//! sees a half-applied update.
//!
//! Subscription failures are logged and exposed through
//! [`HistoryStream::last_error`]; the stream never re-subscribes on its own.

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result, StoreError};
use crate::streaming::{HistorySnapshot, SnapshotSubscription};
use crate::traits::LocationStore;

/// A standing subscription to the store's ordered history.
///
/// Release it with [`unsubscribe`](Self::unsubscribe); dropping it also
/// releases the subscription, so every exit path is covered.
#[derive(Debug)]
pub struct HistoryStream {
    snapshots: watch::Receiver<HistorySnapshot>,
    errors: watch::Receiver<Option<StoreError>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl HistoryStream {
    /// Open the subscription and start applying snapshots.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(store: &dyn LocationStore) -> Result<Self> {
        let subscription = store.subscribe_ordered().map_err(|e| {
            error!("Failed to subscribe to location history: {}", e);
            Error::StoreSubscriptionFailure(e.to_string())
        })?;

        let (snapshot_tx, snapshots) = watch::channel(HistorySnapshot::empty());
        let (error_tx, errors) = watch::channel(None);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(apply_snapshots(
            subscription,
            snapshot_tx,
            error_tx,
            cancel.clone(),
        ));
        info!("Subscribed to location history");

        Ok(Self {
            snapshots,
            errors,
            cancel,
            task: Some(task),
        })
    }

    /// The most recently delivered snapshot.
    pub fn snapshot(&self) -> HistorySnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified whenever the snapshot is replaced.
    pub fn watch(&self) -> watch::Receiver<HistorySnapshot> {
        self.snapshots.clone()
    }

    /// The last subscription error, cleared by the next good snapshot.
    pub fn last_error(&self) -> Option<StoreError> {
        self.errors.borrow().clone()
    }

    /// A receiver notified whenever the error state changes.
    pub fn watch_errors(&self) -> watch::Receiver<Option<StoreError>> {
        self.errors.clone()
    }

    /// Whether snapshots are still being applied.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Release the subscription and wait until it is torn down.
    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!("History task ended abnormally: {}", e);
        }
        debug!("Unsubscribed from location history");
    }
}

impl Drop for HistoryStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn apply_snapshots(
    mut subscription: SnapshotSubscription,
    snapshots: watch::Sender<HistorySnapshot>,
    errors: watch::Sender<Option<StoreError>>,
    cancel: CancellationToken,
) {
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = subscription.next() => item,
        };

        match item {
            Some(Ok(snapshot)) => {
                debug!("History snapshot with {} records", snapshot.len());
                errors.send_if_modified(|e| e.take().is_some());
                snapshots.send_replace(snapshot);
            }
            Some(Err(e)) => {
                error!("Location history subscription failed: {}", e);
                errors.send_replace(Some(e));
            }
            None => {
                info!("Location history subscription closed");
                break;
            }
        }
    }
    subscription.unsubscribe();
}
