//! A [`MapSurface`] that prints every draw call as a line of text.

use std::collections::HashMap;
use std::io::Write;

use owo_colors::OwoColorize;
use tracing::warn;

use waypost_core::{LayerHandle, MapSurface};
use waypost_types::{GeoBounds, GeoPoint};

pub struct TextMap<W: Write> {
    out: W,
    no_color: bool,
    next_handle: u64,
    layers: HashMap<LayerHandle, Option<GeoBounds>>,
}

impl<W: Write> TextMap<W> {
    pub fn new(out: W, no_color: bool) -> Self {
        Self {
            out,
            no_color,
            next_handle: 1,
            layers: HashMap::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn allocate(&mut self, bounds: Option<GeoBounds>) -> LayerHandle {
        let handle = LayerHandle(self.next_handle);
        self.next_handle += 1;
        self.layers.insert(handle, bounds);
        handle
    }

    fn line(&mut self, tag: &str, text: String) {
        let tag = if self.no_color {
            format!("{tag:>6}")
        } else {
            format!("{}", format!("{tag:>6}").cyan())
        };
        if let Err(e) = writeln!(self.out, "{tag} {text}").and_then(|()| self.out.flush()) {
            warn!("Failed to write map output: {}", e);
        }
    }
}

impl<W: Write> MapSurface for TextMap<W> {
    fn draw_path(&mut self, points: &[GeoPoint]) -> LayerHandle {
        let handle = self.allocate(GeoBounds::from_points(points));
        let text = match (points.first(), points.last()) {
            (Some(first), Some(last)) => format!(
                "#{} {} points from {} to {}",
                handle.0,
                points.len(),
                first,
                last
            ),
            _ => format!("#{} empty", handle.0),
        };
        self.line("path", text);
        handle
    }

    fn draw_marker(&mut self, point: GeoPoint, label: &str) -> LayerHandle {
        let handle = self.allocate(GeoBounds::from_points(&[point]));
        self.line("marker", format!("#{} {} {}", handle.0, point, label));
        handle
    }

    fn remove_layer(&mut self, layer: LayerHandle) {
        if self.layers.remove(&layer).is_some() {
            self.line("remove", format!("#{}", layer.0));
        }
    }

    fn fit_bounds(&mut self, layer: LayerHandle) {
        match self.layers.get(&layer).copied().flatten() {
            Some(b) => self.line(
                "fit",
                format!(
                    "#{} lat {:.6}..{:.6} lon {:.6}..{:.6} center {}",
                    layer.0,
                    b.south,
                    b.north,
                    b.west,
                    b.east,
                    b.center()
                ),
            ),
            None => warn!("Cannot fit bounds of unknown or empty layer #{}", layer.0),
        }
    }

    fn reset_view(&mut self, center: GeoPoint, zoom: u8) {
        self.line("view", format!("{} zoom {}", center, zoom));
    }
}
