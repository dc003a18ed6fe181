//! Live tracking state machine.
//!
//! [`TrackingController`] turns start/stop intent plus positioning results
//! into appended [`LocationRecord`]s and a human-facing [`TrackingStatus`].
//!
//! ```text
//!   Idle --start--> RequestingPermission --fix--> Tracking
//!    ^                      |                        |
//!    +------ denied --------+                        |
//!    +------------------- stop ----------------------+
//! ```
//!
//! Each session owns a cancellation token. Every acquisition and every append
//! races against it, and [`TrackingController::stop`] waits for the repeating
//! task to finish, so no emit and no tick happens after `stop` returns.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use waypost_types::{LocationRecord, NewLocation, OperatorId, PositionSample, TrackingState};

use crate::error::{Error, Result};
use crate::events::{EventDispatcher, EventReceiver, TrackingEvent};
use crate::options::TrackingOptions;
use crate::source::SampleSource;
use crate::traits::{IdentityProvider, LocationStore, PositionSource};

/// What the operator sees: the current state and the last surfaced error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingStatus {
    pub state: TrackingState,
    /// Dismissible error message, if any.
    pub error: Option<String>,
}

struct Session {
    token: CancellationToken,
    ticker: Option<JoinHandle<()>>,
}

struct Inner {
    store: Arc<dyn LocationStore>,
    source: SampleSource,
    identity: Arc<dyn IdentityProvider>,
    options: TrackingOptions,
    status: watch::Sender<TrackingStatus>,
    events: EventDispatcher,
}

impl Inner {
    fn set_state(&self, state: TrackingState) {
        self.status.send_if_modified(|s| {
            if s.state == state {
                return false;
            }
            s.state = state;
            true
        });
    }

    fn surface(&self, err: &Error) {
        let message = err.user_message();
        self.status.send_modify(|s| s.error = Some(message));
    }

    /// Build a record draft from `sample` and append it.
    async fn emit(&self, operator: &OperatorId, sample: PositionSample) -> Result<LocationRecord> {
        let draft = match NewLocation::from_sample(&sample, operator.clone()) {
            Ok(draft) => draft,
            Err(e) => {
                let err = Error::from(e);
                warn!("Discarding sample: {}", err);
                self.surface(&err);
                self.events.send(TrackingEvent::AcquisitionFailed {
                    error: err.to_string(),
                    policy_denied: false,
                });
                return Err(err);
            }
        };

        match self.store.append(draft).await {
            Ok(record) => {
                debug!(
                    "Saved location {} at ({:.5}, {:.5})",
                    record.id, record.latitude, record.longitude
                );
                self.events.send(TrackingEvent::SampleSaved {
                    record: record.clone(),
                });
                Ok(record)
            }
            Err(e) => {
                let err = Error::from(e);
                warn!("Failed to save location: {}", err);
                self.surface(&err);
                self.events.send(TrackingEvent::SaveFailed {
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

/// Drives one operator's live tracking sessions.
///
/// At most one repeating acquisition cycle exists per controller.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use waypost_core::{TrackingController, TrackingOptions};
///
/// let controller = TrackingController::new(store, Some(source), identity, TrackingOptions::default())?;
/// controller.start().await?;
/// // ...
/// controller.stop().await;
/// ```
pub struct TrackingController {
    inner: Arc<Inner>,
    session: Mutex<Option<Session>>,
}

impl TrackingController {
    /// Create a controller from its collaborators.
    ///
    /// `source` is `None` on platforms without positioning; `start` then
    /// fails with [`Error::CapabilityUnavailable`].
    pub fn new(
        store: Arc<dyn LocationStore>,
        source: Option<Arc<dyn PositionSource>>,
        identity: Arc<dyn IdentityProvider>,
        options: TrackingOptions,
    ) -> Result<Self> {
        options.validate()?;
        let source = match source {
            Some(source) => SampleSource::new(source, options.position),
            None => SampleSource::unavailable(),
        };
        let (status, _) = watch::channel(TrackingStatus::default());
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                source,
                identity,
                options,
                status,
                events: EventDispatcher::default(),
            }),
            session: Mutex::new(None),
        })
    }

    /// Current status snapshot.
    pub fn status(&self) -> TrackingStatus {
        self.inner.status.borrow().clone()
    }

    /// Current state.
    pub fn state(&self) -> TrackingState {
        self.inner.status.borrow().state.clone()
    }

    /// Whether the controller is in the `Tracking` state.
    pub fn is_tracking(&self) -> bool {
        self.inner.status.borrow().state == TrackingState::Tracking
    }

    /// Receiver notified on every status change.
    pub fn watch_status(&self) -> watch::Receiver<TrackingStatus> {
        self.inner.status.subscribe()
    }

    /// Subscribe to tracking events.
    pub fn subscribe_events(&self) -> EventReceiver {
        self.inner.events.subscribe()
    }

    /// The options this controller was built with.
    pub fn options(&self) -> &TrackingOptions {
        &self.inner.options
    }

    /// Dismiss the surfaced error message.
    pub fn clear_error(&self) {
        self.inner.status.send_if_modified(|s| s.error.take().is_some());
    }

    /// Start a tracking session.
    ///
    /// Requires a signed-in operator and a positioning capability; both
    /// checks leave the state unchanged. Otherwise moves to
    /// `RequestingPermission` and issues one request. On success moves to
    /// `Tracking`, emits the sample, and begins the repeating cycle. On
    /// failure returns to `Idle` with the error surfaced.
    pub async fn start(&self) -> Result<()> {
        let inner = &self.inner;

        let Some(operator) = inner.identity.current_operator() else {
            let err = Error::NotAuthorized;
            inner.surface(&err);
            return Err(err);
        };
        if !inner.source.is_available() {
            let err = Error::CapabilityUnavailable;
            inner.surface(&err);
            return Err(err);
        }

        let token = {
            let mut session = self.session.lock().await;
            if session.is_some() {
                return Err(Error::AlreadyActive);
            }
            let token = CancellationToken::new();
            *session = Some(Session {
                token: token.clone(),
                ticker: None,
            });
            inner.status.send_modify(|s| {
                s.state = TrackingState::RequestingPermission;
                s.error = None;
            });
            token
        };

        info!("Requesting position for operator {}", operator);
        let first = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Error::Cancelled),
            result = inner.source.acquire_once() => result?,
        };

        let sample = match first {
            Ok(sample) => sample,
            Err(pos_err) => {
                let err = Error::permission_denied(&pos_err);
                warn!("Initial position request failed: {}", pos_err);
                let mut session = self.session.lock().await;
                if token.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                *session = None;
                inner.status.send_modify(|s| {
                    s.state = TrackingState::Idle;
                    s.error = Some(err.user_message());
                });
                inner.events.send(TrackingEvent::AcquisitionFailed {
                    error: pos_err.message.clone(),
                    policy_denied: err.is_policy_denial(),
                });
                return Err(err);
            }
        };

        {
            // stop() cancels while holding this lock.
            let _session = self.session.lock().await;
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }
            inner.set_state(TrackingState::Tracking);
            inner.events.send(TrackingEvent::Started {
                operator: operator.clone(),
            });
        }
        info!("Tracking started, period {:?}", inner.options.period);

        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Error::Cancelled),
            // Append failures are surfaced inside emit; tracking continues.
            _ = inner.emit(&operator, sample) => {}
        }

        let mut session = self.session.lock().await;
        match session.as_mut() {
            Some(active) if !token.is_cancelled() => {
                let ticker = tokio::spawn(run_ticker(Arc::clone(inner), token.clone(), operator));
                active.ticker = Some(ticker);
                Ok(())
            }
            _ => Err(Error::Cancelled),
        }
    }

    /// Stop tracking.
    ///
    /// Cancels the repeating cycle, moves to `Idle`, and clears any surfaced
    /// error. Safe to call in any state; never fails. Once it returns, no
    /// further emits or ticks happen for the stopped session.
    pub async fn stop(&self) {
        // Held throughout, so a concurrent start() cannot mark this session
        // Tracking after it is cancelled.
        let mut guard = self.session.lock().await;

        if let Some(session) = guard.take() {
            session.token.cancel();
            if let Some(ticker) = session.ticker
                && let Err(e) = ticker.await
            {
                warn!("Tracking task ended abnormally: {}", e);
            }
            info!("Tracking stopped");
            self.inner.events.send(TrackingEvent::Stopped);
        }

        self.inner.status.send_if_modified(|s| {
            let changed = s.state != TrackingState::Idle || s.error.is_some();
            s.state = TrackingState::Idle;
            s.error = None;
            changed
        });
    }

    /// Turn a raw sample into a record and append it for the signed-in
    /// operator.
    ///
    /// A failed append is surfaced as a non-fatal error and the sample is
    /// dropped; the caller decides whether to keep going.
    pub async fn emit(&self, sample: PositionSample) -> Result<LocationRecord> {
        let operator = self
            .inner
            .identity
            .current_operator()
            .ok_or(Error::NotAuthorized)?;
        self.inner.emit(&operator, sample).await
    }
}

impl Drop for TrackingController {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.token.cancel();
        }
    }
}

/// Repeating acquisition loop for one session.
async fn run_ticker(inner: Arc<Inner>, token: CancellationToken, operator: OperatorId) {
    let samples = match inner.source.repeating(inner.options.period) {
        Ok(samples) => samples,
        Err(e) => {
            warn!("Cannot start repeating acquisition: {}", e);
            return;
        }
    };
    futures::pin_mut!(samples);

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = samples.next() => next,
        };
        let Some(result) = next else { break };

        match result {
            Ok(sample) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = inner.emit(&operator, sample) => {}
                }
            }
            Err(pos_err) => {
                let err = Error::transient(&pos_err);
                warn!("Position request failed during tracking: {}", pos_err);
                inner.surface(&err);
                inner.events.send(TrackingEvent::AcquisitionFailed {
                    error: pos_err.message.clone(),
                    policy_denied: err.is_policy_denial(),
                });
            }
        }
    }

    debug!("Repeating acquisition ended");
}
