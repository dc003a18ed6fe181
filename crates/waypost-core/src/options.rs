//! Options for positioning requests and live tracking.
//!
//! Use the builder methods for convenient configuration:
//!
//! ```
//! use std::time::Duration;
//! use waypost_core::TrackingOptions;
//!
//! let options = TrackingOptions::default()
//!     .period(Duration::from_secs(30))
//!     .high_accuracy(false);
//! assert!(options.validate().is_ok());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default period between repeating acquisitions.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Options passed to every positioning request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOptions {
    /// Ask the platform for its most accurate fix.
    pub high_accuracy: bool,
    /// How long a single request may take.
    pub timeout: Duration,
    /// Oldest cached fix the platform may return (zero forces a fresh one).
    pub max_cached_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_millis(5000),
            max_cached_age: Duration::ZERO,
        }
    }
}

/// Options for a [`TrackingController`](crate::TrackingController).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingOptions {
    /// Fixed period between repeating acquisitions.
    /// Default: 60 seconds.
    pub period: Duration,
    /// Options for each positioning request.
    pub position: PositionOptions,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            position: PositionOptions::default(),
        }
    }
}

impl TrackingOptions {
    /// Create options with a specific period.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Set the acquisition period.
    #[must_use]
    pub fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Request high-accuracy fixes.
    #[must_use]
    pub fn high_accuracy(mut self, enabled: bool) -> Self {
        self.position.high_accuracy = enabled;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.position.timeout = timeout;
        self
    }

    /// Set the oldest acceptable cached fix.
    #[must_use]
    pub fn max_cached_age(mut self, age: Duration) -> Self {
        self.position.max_cached_age = age;
        self
    }

    /// Validate the options and return an error if invalid.
    ///
    /// Checks that:
    /// - `period` is > 0
    /// - `position.timeout` is > 0
    pub fn validate(&self) -> Result<()> {
        if self.period.is_zero() {
            return Err(Error::invalid_config("period must be > 0"));
        }
        if self.position.timeout.is_zero() {
            return Err(Error::invalid_config("timeout must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_options_default() {
        let opts = TrackingOptions::default();
        assert_eq!(opts.period, Duration::from_secs(60));
        assert!(opts.position.high_accuracy);
        assert_eq!(opts.position.timeout, Duration::from_secs(5));
        assert_eq!(opts.position.max_cached_age, Duration::ZERO);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_tracking_options_builder() {
        let opts = TrackingOptions::with_period(Duration::from_secs(10))
            .high_accuracy(false)
            .timeout(Duration::from_secs(2))
            .max_cached_age(Duration::from_secs(30));
        assert_eq!(opts.period, Duration::from_secs(10));
        assert!(!opts.position.high_accuracy);
        assert_eq!(opts.position.timeout, Duration::from_secs(2));
        assert_eq!(opts.position.max_cached_age, Duration::from_secs(30));
    }

    #[test]
    fn test_tracking_options_validate() {
        let err = TrackingOptions::default()
            .period(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("period"));

        let err = TrackingOptions::default()
            .timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}
