//! Platform-agnostic types for the waypost location tracker.
//!
//! This crate provides the shared data model used by the tracking core, the
//! store implementations, and the command-line front end.
//!
//! # Features
//!
//! - Location records as stored and streamed back
//! - Raw positioning samples and positioning errors
//! - Time-of-day windows used to filter history
//! - Tracking state shown to the operator
//!
//! # Example
//!
//! ```
//! use waypost_types::{TimeOfDay, TimeWindow};
//! use time::macros::date;
//!
//! let window = TimeWindow::new(
//!     date!(2024 - 06 - 01),
//!     "22:00".parse().unwrap(),
//!     "02:00".parse().unwrap(),
//! );
//! assert!(window.is_overnight());
//! assert_eq!(TimeOfDay::new(2, 0).unwrap(), window.end);
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    GeoBounds, GeoPoint, LocationRecord, NewLocation, OperatorId, PositionError, PositionSample,
    RecordId, TimeOfDay, TimeWindow, TrackingState,
};


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn time_of_day_display_parses_back(hour in 0u8..24, minute in 0u8..60) {
            let t = TimeOfDay::new(hour, minute).unwrap();
            let parsed: TimeOfDay = t.to_string().parse().unwrap();
            prop_assert_eq!(parsed, t);
            prop_assert_eq!(t.minutes(), u16::from(hour) * 60 + u16::from(minute));
        }

        #[test]
        fn valid_samples_pass_validation(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
            prop_assert!(PositionSample::new(lat, lon).validate().is_ok());
        }
    }
}
