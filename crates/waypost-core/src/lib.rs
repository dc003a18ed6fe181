//! Core tracking library for the waypost location tracker.
//!
//! This crate turns positioning readings into stored location records and
//! stored records back into a path on a map, for a single tracked subject and
//! one authorized operator.
//!
//! # Features
//!
//! - **Live tracking**: a start/stop state machine with a fixed-period
//!   repeating acquisition and deterministic cancellation
//! - **History streaming**: a standing store subscription delivering whole,
//!   ordered snapshots
//! - **Window filtering**: calendar day plus time-of-day selection, including
//!   windows that wrap past midnight
//! - **Map projection**: path, last-known marker, and bounds fitting on any
//!   map surface
//! - **Fakes**: in-memory store, scripted positioning, and a recording map in
//!   [`mock`]
//!
//! Every platform collaborator (store, positioning, map, identity) is a trait
//! object passed in explicitly; see [`traits`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use waypost_core::mock::{MemoryStore, ScriptedSource, StaticIdentity};
//! use waypost_core::{HistoryStream, TrackingController, TrackingOptions, WindowFilter};
//! use waypost_types::{PositionSample, TimeWindow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let source = Arc::new(ScriptedSource::fixed(PositionSample::new(47.6, -122.3)));
//!     let identity = Arc::new(StaticIdentity::signed_in("operator"));
//!
//!     let controller =
//!         TrackingController::new(store.clone(), Some(source), identity, TrackingOptions::default())?;
//!     controller.start().await?;
//!
//!     let history = HistoryStream::subscribe(store.as_ref())?;
//!     let matching = WindowFilter::utc().apply(&history.snapshot(), &TimeWindow::default());
//!     println!("{} records in window", matching.len());
//!
//!     controller.stop().await;
//!     history.unsubscribe().await;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod events;
pub mod filter;
pub mod history;
pub mod mock;
pub mod options;
pub mod projector;
pub mod session;
pub mod source;
pub mod streaming;
pub mod tracking;
pub mod traits;
pub mod view;
pub mod zone;

pub use error::{DenialReason, Error, Result, StoreError};
pub use events::{EventDispatcher, EventReceiver, EventSender, TrackingEvent};
pub use filter::{WindowFilter, minute_in_window};
pub use history::HistoryStream;
pub use options::{DEFAULT_PERIOD, PositionOptions, TrackingOptions};
pub use projector::{MapProjector, WORLD_ZOOM, marker_label};
pub use session::OperatorSession;
pub use source::{SampleResult, SampleSource};
pub use streaming::{HistorySnapshot, SnapshotFeed, SnapshotResult, SnapshotSubscription};
pub use tracking::{TrackingController, TrackingStatus};
pub use traits::{IdentityProvider, LayerHandle, LocationStore, MapSurface, PositionSource};
pub use view::{MapView, WindowSelector};
pub use zone::DisplayZone;

// Re-export from waypost-types
pub use waypost_types::{
    GeoBounds, GeoPoint, LocationRecord, NewLocation, OperatorId, PositionError, PositionSample,
    RecordId, TimeOfDay, TimeWindow, TrackingState,
};
