//! One-shot and repeating position queries.
//!
//! [`SampleSource`] wraps an optional platform [`PositionSource`] together
//! with the request options. It holds no state of its own: every call goes
//! straight to the platform.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::Stream;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

use waypost_types::{PositionError, PositionSample};

use crate::error::{Error, Result};
use crate::options::PositionOptions;
use crate::traits::PositionSource;

/// Result type for a single acquisition.
pub type SampleResult = std::result::Result<PositionSample, PositionError>;

/// Positioning capability plus the options used for every request.
#[derive(Clone)]
pub struct SampleSource {
    source: Option<Arc<dyn PositionSource>>,
    options: PositionOptions,
}

impl SampleSource {
    /// Wrap a positioning capability.
    pub fn new(source: Arc<dyn PositionSource>, options: PositionOptions) -> Self {
        Self {
            source: Some(source),
            options,
        }
    }

    /// A source for platforms without positioning.
    pub fn unavailable() -> Self {
        Self {
            source: None,
            options: PositionOptions::default(),
        }
    }

    /// Whether a positioning capability exists.
    pub fn is_available(&self) -> bool {
        self.source.is_some()
    }

    /// The options applied to every request.
    pub fn options(&self) -> &PositionOptions {
        &self.options
    }

    /// Issue one position request.
    ///
    /// The outer error is [`Error::CapabilityUnavailable`]; the inner result
    /// is the platform's answer.
    pub async fn acquire_once(&self) -> Result<SampleResult> {
        let source = self.source.as_ref().ok_or(Error::CapabilityUnavailable)?;
        Ok(source.current_position(&self.options).await)
    }

    /// A stream issuing one request every `period`, the first one `period`
    /// from now.
    ///
    /// Ticks are driven by the consumer: nothing is requested while the
    /// stream is not being polled, and dropping it stops all further ticks.
    pub fn repeating(&self, period: Duration) -> Result<impl Stream<Item = SampleResult> + Send + use<>> {
        let source = Arc::clone(self.source.as_ref().ok_or(Error::CapabilityUnavailable)?);
        let options = self.options;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Ok(futures::stream::unfold(
            (ticker, source),
            move |(mut ticker, source)| async move {
                ticker.tick().await;
                debug!("Repeating position request");
                let result = source.current_position(&options).await;
                Some((result, (ticker, source)))
            },
        ))
    }
}

impl std::fmt::Debug for SampleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleSource")
            .field("available", &self.source.is_some())
            .field("options", &self.options)
            .finish()
    }
}
