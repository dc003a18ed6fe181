//! In-memory capability implementations for testing and demos.
//!
//! These stand in for the remote store, the platform positioning service,
//! the map widget, and the sign-in flow, so the whole tracking pipeline can
//! run without any of them.
//!
//! # Features
//!
//! - **Failure injection**: fail the next N appends, refuse subscriptions,
//!   script positioning errors
//! - **Latency simulation**: delay positioning answers and appends (driven by
//!   the tokio clock, so paused-time tests stay deterministic)
//! - **Call recording**: every map call is kept for later assertions

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use waypost_types::{
    GeoPoint, LocationRecord, NewLocation, OperatorId, PositionError, PositionSample, RecordId,
};

use crate::error::StoreError;
use crate::options::PositionOptions;
use crate::source::SampleResult;
use crate::streaming::{HistorySnapshot, SnapshotFeed, SnapshotSubscription};
use crate::traits::{IdentityProvider, LayerHandle, LocationStore, MapSurface, PositionSource};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clock a [`MemoryStore`] reads when assigning timestamps.
pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

/// An in-memory [`LocationStore`].
///
/// Assigns UUID ids and clock timestamps, clamped so they never go backwards
/// in append order, and pushes the full ordered set to every subscriber after
/// each append.
pub struct MemoryStore {
    records: RwLock<Vec<LocationRecord>>,
    feed: SnapshotFeed,
    clock: Clock,
    append_count: AtomicU32,
    /// Number of upcoming appends that fail.
    failing_appends: AtomicU32,
    refuse_subscriptions: AtomicBool,
    append_latency_ms: AtomicU64,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("append_count", &self.append_count)
            .field("failing_appends", &self.failing_appends)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(OffsetDateTime::now_utc))
    }

    /// Create an empty store reading timestamps from `clock`.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            feed: SnapshotFeed::default(),
            clock,
            append_count: AtomicU32::new(0),
            failing_appends: AtomicU32::new(0),
            refuse_subscriptions: AtomicBool::new(false),
            append_latency_ms: AtomicU64::new(0),
        }
    }

    /// Create an empty store whose clock always reads `now`.
    pub fn with_fixed_clock(now: OffsetDateTime) -> Self {
        Self::with_clock(Arc::new(move || now))
    }

    /// Insert records as-is, bypassing id and timestamp assignment.
    pub async fn seed(&self, records: impl IntoIterator<Item = LocationRecord>) {
        let mut held = self.records.write().await;
        held.extend(records);
        self.feed.publish(HistorySnapshot::new(held.clone()));
    }

    /// All records in the order they were stored.
    pub async fn records(&self) -> Vec<LocationRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Number of append attempts, failed ones included.
    pub fn append_count(&self) -> u32 {
        self.append_count.load(Ordering::Relaxed)
    }

    /// Make the next `count` appends fail with [`StoreError::Write`].
    pub fn fail_next_appends(&self, count: u32) {
        self.failing_appends.store(count, Ordering::Relaxed);
    }

    /// Make `subscribe_ordered` fail while `refuse` is set.
    pub fn refuse_subscriptions(&self, refuse: bool) {
        self.refuse_subscriptions.store(refuse, Ordering::Relaxed);
    }

    /// Deliver an error to every open subscription.
    pub fn fail_subscribers(&self, err: StoreError) {
        self.feed.fail(err);
    }

    /// Delay every append by `latency`.
    pub fn set_append_latency(&self, latency: Duration) {
        self.append_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.feed.subscriber_count()
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn append(&self, draft: NewLocation) -> Result<LocationRecord, StoreError> {
        self.append_count.fetch_add(1, Ordering::Relaxed);

        let latency = self.append_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self
            .failing_appends
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Write("injected append failure".to_string()));
        }

        let mut held = self.records.write().await;
        let now = (self.clock)();
        let timestamp = match held.iter().map(|r| r.timestamp).max() {
            Some(last) if last > now => last,
            _ => now,
        };
        let record = LocationRecord::from_draft(RecordId::new(Uuid::new_v4().to_string()), timestamp, draft);
        held.push(record.clone());
        self.feed.publish(HistorySnapshot::new(held.clone()));
        Ok(record)
    }

    fn subscribe_ordered(&self) -> Result<SnapshotSubscription, StoreError> {
        if self.refuse_subscriptions.load(Ordering::Relaxed) {
            return Err(StoreError::Subscription(
                "injected subscription failure".to_string(),
            ));
        }
        Ok(self.feed.subscribe())
    }
}

/// A [`PositionSource`] answering from a script.
///
/// Queued results are returned first, in order; after that every request
/// gets the fallback result.
pub struct ScriptedSource {
    script: Mutex<VecDeque<SampleResult>>,
    fallback: Mutex<SampleResult>,
    last_options: Mutex<Option<PositionOptions>>,
    call_count: AtomicU32,
    latency_ms: AtomicU64,
}

impl std::fmt::Debug for ScriptedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedSource")
            .field("call_count", &self.call_count)
            .field("queued", &lock(&self.script).len())
            .finish_non_exhaustive()
    }
}

impl ScriptedSource {
    /// Create a source answering `fallback` once the script runs out.
    pub fn new(fallback: SampleResult) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            last_options: Mutex::new(None),
            call_count: AtomicU32::new(0),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// A source that always reports `sample`.
    pub fn fixed(sample: PositionSample) -> Self {
        Self::new(Ok(sample))
    }

    /// A source that always fails with `err`.
    pub fn failing(err: PositionError) -> Self {
        Self::new(Err(err))
    }

    /// Delay every answer by `latency`.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(latency);
        self
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Queue a result for an upcoming request.
    pub fn push(&self, result: SampleResult) {
        lock(&self.script).push_back(result);
    }

    /// Replace the result returned once the script is empty.
    pub fn set_fallback(&self, result: SampleResult) {
        *lock(&self.fallback) = result;
    }

    /// Number of requests received.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Options passed with the most recent request.
    pub fn last_options(&self) -> Option<PositionOptions> {
        *lock(&self.last_options)
    }
}

#[async_trait]
impl PositionSource for ScriptedSource {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<PositionSample, PositionError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *lock(&self.last_options) = Some(*options);
        let result = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| lock(&self.fallback).clone());

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        result
    }
}

/// One call made on a [`RecordingMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    DrawPath(LayerHandle, Vec<GeoPoint>),
    DrawMarker(LayerHandle, GeoPoint, String),
    RemoveLayer(LayerHandle),
    FitBounds(LayerHandle),
    ResetView(GeoPoint, u8),
}

#[derive(Debug, Default)]
struct MapState {
    calls: Vec<MapCall>,
    live: HashSet<LayerHandle>,
    next_handle: u64,
}

/// A [`MapSurface`] that records every call.
///
/// Clones share the same recording, so a test can keep one handle while the
/// other is owned by a projector.
#[derive(Debug, Clone, Default)]
pub struct RecordingMap {
    state: Arc<Mutex<MapState>>,
}

impl RecordingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<MapCall> {
        lock(&self.state).calls.clone()
    }

    /// Number of layers drawn and not yet removed.
    pub fn live_layers(&self) -> usize {
        lock(&self.state).live.len()
    }

    /// Forget recorded calls, keeping live layers.
    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    fn add_layer(state: &mut MapState) -> LayerHandle {
        state.next_handle += 1;
        let handle = LayerHandle(state.next_handle);
        state.live.insert(handle);
        handle
    }
}

impl MapSurface for RecordingMap {
    fn draw_path(&mut self, points: &[GeoPoint]) -> LayerHandle {
        let mut state = lock(&self.state);
        let handle = Self::add_layer(&mut state);
        state.calls.push(MapCall::DrawPath(handle, points.to_vec()));
        handle
    }

    fn draw_marker(&mut self, point: GeoPoint, label: &str) -> LayerHandle {
        let mut state = lock(&self.state);
        let handle = Self::add_layer(&mut state);
        state
            .calls
            .push(MapCall::DrawMarker(handle, point, label.to_string()));
        handle
    }

    fn remove_layer(&mut self, layer: LayerHandle) {
        let mut state = lock(&self.state);
        state.live.remove(&layer);
        state.calls.push(MapCall::RemoveLayer(layer));
    }

    fn fit_bounds(&mut self, layer: LayerHandle) {
        lock(&self.state).calls.push(MapCall::FitBounds(layer));
    }

    fn reset_view(&mut self, center: GeoPoint, zoom: u8) {
        lock(&self.state).calls.push(MapCall::ResetView(center, zoom));
    }
}

/// An [`IdentityProvider`] with a fixed answer.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    operator: Option<OperatorId>,
}

impl StaticIdentity {
    pub fn signed_in(id: impl Into<String>) -> Self {
        Self {
            operator: Some(OperatorId::new(id)),
        }
    }

    pub fn signed_out() -> Self {
        Self { operator: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_operator(&self) -> Option<OperatorId> {
        self.operator.clone()
    }
}
