//! Capability traits consumed by the tracking core.
//!
//! The core never talks to a platform directly. Stores, positioning, the map
//! widget, and the signed-in identity are passed in as objects implementing
//! these traits, so tests and demos can substitute the fakes in
//! [`crate::mock`].

use async_trait::async_trait;

use waypost_types::{GeoPoint, LocationRecord, NewLocation, OperatorId, PositionError, PositionSample};

use crate::error::StoreError;
use crate::options::PositionOptions;
use crate::streaming::SnapshotSubscription;

/// Remote store holding every emitted location.
///
/// The store assigns each record's `id` and its authoritative `timestamp`;
/// timestamps are non-decreasing in append order.
///
/// # Example
///
/// ```ignore
/// use waypost_core::{LocationStore, StoreError};
/// use waypost_types::NewLocation;
///
/// async fn save<S: LocationStore>(store: &S, draft: NewLocation) -> Result<(), StoreError> {
///     let record = store.append(draft).await?;
///     println!("saved {}", record.id);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Append a record.
    async fn append(&self, draft: NewLocation) -> Result<LocationRecord, StoreError>;

    /// Open a standing subscription to all records, ascending by timestamp.
    ///
    /// The first item is the current snapshot; every later change delivers
    /// the full ordered set again.
    fn subscribe_ordered(&self) -> Result<SnapshotSubscription, StoreError>;
}

/// Platform positioning service.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Request the current position once.
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<PositionSample, PositionError>;
}

/// Handle to a layer drawn on a [`MapSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerHandle(pub u64);

/// Map widget the projector draws on.
pub trait MapSurface {
    /// Draw a polyline through `points` in order.
    fn draw_path(&mut self, points: &[GeoPoint]) -> LayerHandle;

    /// Draw a marker with a popup label.
    fn draw_marker(&mut self, point: GeoPoint, label: &str) -> LayerHandle;

    /// Remove a previously drawn layer.
    fn remove_layer(&mut self, layer: LayerHandle);

    /// Fit the view to a layer's extent.
    fn fit_bounds(&mut self, layer: LayerHandle);

    /// Center the view on `center` at `zoom`.
    fn reset_view(&mut self, center: GeoPoint, zoom: u8);
}

/// Source of the signed-in operator.
pub trait IdentityProvider: Send + Sync {
    /// The current operator identifier, or `None` when nobody is signed in.
    fn current_operator(&self) -> Option<OperatorId>;
}
