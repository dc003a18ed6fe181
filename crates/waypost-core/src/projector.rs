//! Drives a [`MapSurface`] from a filtered record sequence.

use tracing::debug;

use waypost_types::{GeoPoint, LocationRecord};

use crate::traits::{LayerHandle, MapSurface};
use crate::zone::DisplayZone;

/// Zoom level of the world overview shown when nothing matches.
pub const WORLD_ZOOM: u8 = 2;

/// Popup text for the marker at `record`, with its local time in `zone`.
pub fn marker_label(record: &LocationRecord, zone: DisplayZone) -> String {
    let local = zone.localize(record.timestamp);
    format!(
        "Last known location: {:02}:{:02}:{:02}",
        local.hour(),
        local.minute(),
        local.second()
    )
}

/// Owns the map surface and the layers it has drawn on it.
///
/// Every render removes the previous path and marker before drawing, so
/// layers never accumulate.
#[derive(Debug)]
pub struct MapProjector<M: MapSurface> {
    surface: M,
    zone: DisplayZone,
    path: Option<LayerHandle>,
    marker: Option<LayerHandle>,
}

impl<M: MapSurface> MapProjector<M> {
    /// Create a projector labelling markers in `zone`.
    pub fn new(surface: M, zone: impl Into<DisplayZone>) -> Self {
        Self {
            surface,
            zone: zone.into(),
            path: None,
            marker: None,
        }
    }

    /// Draw `filtered` in place of whatever was drawn before.
    ///
    /// An empty sequence resets the view to the world overview. Otherwise a
    /// path runs through every point in order, the view fits the path, and a
    /// marker labelled with its local time sits on the last point.
    pub fn render(&mut self, filtered: &[LocationRecord]) {
        self.clear();

        let Some(last) = filtered.last() else {
            debug!("No matching records, showing world view");
            self.surface.reset_view(GeoPoint::ORIGIN, WORLD_ZOOM);
            return;
        };

        let points: Vec<GeoPoint> = filtered.iter().map(LocationRecord::point).collect();
        let path = self.surface.draw_path(&points);
        self.surface.fit_bounds(path);
        let marker = self
            .surface
            .draw_marker(last.point(), &marker_label(last, self.zone));
        self.path = Some(path);
        self.marker = Some(marker);
        debug!("Rendered path through {} points", points.len());
    }

    /// Remove the drawn path and marker, if any.
    pub fn clear(&mut self) {
        if let Some(path) = self.path.take() {
            self.surface.remove_layer(path);
        }
        if let Some(marker) = self.marker.take() {
            self.surface.remove_layer(marker);
        }
    }

    /// Whether a path is currently drawn.
    pub fn has_path(&self) -> bool {
        self.path.is_some()
    }

    pub fn zone(&self) -> DisplayZone {
        self.zone
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut M {
        &mut self.surface
    }

    /// Consume the projector, returning the surface.
    pub fn into_surface(self) -> M {
        self.surface
    }
}
