//! The reactive display pipeline: history and window in, map calls out.
//!
//! [`MapView`] recomputes the filtered path whenever the history snapshot or
//! the selected window changes, and hands the result to its
//! [`MapProjector`]. The map surface is touched only from here.

use time::Date;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use waypost_types::{TimeOfDay, TimeWindow};

use crate::filter::WindowFilter;
use crate::projector::MapProjector;
use crate::streaming::HistorySnapshot;
use crate::traits::MapSurface;

/// The viewer's window inputs.
///
/// Each `select_*` call notifies watchers only when the value changes.
#[derive(Debug)]
pub struct WindowSelector {
    sender: watch::Sender<TimeWindow>,
}

impl WindowSelector {
    pub fn new(initial: TimeWindow) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// The current window.
    pub fn current(&self) -> TimeWindow {
        *self.sender.borrow()
    }

    /// A receiver notified whenever the window changes.
    pub fn watch(&self) -> watch::Receiver<TimeWindow> {
        self.sender.subscribe()
    }

    pub fn select_date(&self, date: Date) {
        self.update(|w| w.date = date);
    }

    pub fn select_start(&self, start: TimeOfDay) {
        self.update(|w| w.start = start);
    }

    pub fn select_end(&self, end: TimeOfDay) {
        self.update(|w| w.end = end);
    }

    /// Replace the whole window at once.
    pub fn set(&self, window: TimeWindow) {
        self.update(|w| *w = window);
    }

    fn update(&self, f: impl FnOnce(&mut TimeWindow)) {
        self.sender.send_if_modified(|window| {
            let before = *window;
            f(window);
            *window != before
        });
    }
}

impl Default for WindowSelector {
    fn default() -> Self {
        Self::new(TimeWindow::default())
    }
}

/// Filters history through the selected window and projects it on a map.
#[derive(Debug)]
pub struct MapView<M: MapSurface> {
    projector: MapProjector<M>,
    filter: WindowFilter,
    history: watch::Receiver<HistorySnapshot>,
    window: watch::Receiver<TimeWindow>,
}

impl<M: MapSurface> MapView<M> {
    /// Create a view drawing on `surface`.
    ///
    /// Marker labels use the filter's zone.
    pub fn new(
        surface: M,
        filter: WindowFilter,
        history: watch::Receiver<HistorySnapshot>,
        window: watch::Receiver<TimeWindow>,
    ) -> Self {
        Self {
            projector: MapProjector::new(surface, filter.zone()),
            filter,
            history,
            window,
        }
    }

    /// Filter the current snapshot through the current window and redraw.
    ///
    /// Returns the number of records drawn.
    pub fn refresh(&mut self) -> usize {
        let snapshot = self.history.borrow_and_update().clone();
        let window = *self.window.borrow_and_update();
        let filtered = self.filter.apply(&snapshot, &window);
        debug!(
            "Window {} matched {} of {} records",
            window,
            filtered.len(),
            snapshot.len()
        );
        self.projector.render(&filtered);
        filtered.len()
    }

    /// Redraw now and again after every history or window change, until
    /// `cancel` fires or both inputs are gone.
    pub async fn run(&mut self, cancel: CancellationToken) {
        self.refresh();
        let mut history_open = true;
        let mut window_open = true;

        while history_open || window_open {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                changed = self.history.changed(), if history_open => {
                    if changed.is_err() {
                        debug!("History closed, following window changes only");
                        history_open = false;
                        continue;
                    }
                }
                changed = self.window.changed(), if window_open => {
                    if changed.is_err() {
                        window_open = false;
                        continue;
                    }
                }
            }
            self.refresh();
        }
    }

    pub fn projector(&self) -> &MapProjector<M> {
        &self.projector
    }

    pub fn filter(&self) -> &WindowFilter {
        &self.filter
    }

    /// Consume the view, returning its projector.
    pub fn into_projector(self) -> MapProjector<M> {
        self.projector
    }
}
