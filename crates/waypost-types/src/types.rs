//! Core types for tracked location data.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, UtcOffset};

use crate::error::{ParseError, ParseResult};

#[cfg(feature = "serde")]
time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Opaque identifier assigned to a record by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RecordId(pub String);

impl RecordId {
    /// Create a record id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of the operator who emitted a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct OperatorId(pub String);

impl OperatorId {
    /// Create an operator id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperatorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoPoint {
    /// Latitude in degrees, [-90, 90].
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180].
    pub longitude: f64,
}

impl GeoPoint {
    /// The point at latitude 0, longitude 0.
    pub const ORIGIN: GeoPoint = GeoPoint {
        latitude: 0.0,
        longitude: 0.0,
    };

    /// Create a new point.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.6}, {:.6}]", self.latitude, self.longitude)
    }
}

/// Axis-aligned bounding box around a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    /// Compute the extent of `points`, or `None` when empty.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self {
            south: first.latitude,
            west: first.longitude,
            north: first.latitude,
            east: first.longitude,
        };
        for p in rest {
            bounds.south = bounds.south.min(p.latitude);
            bounds.north = bounds.north.max(p.latitude);
            bounds.west = bounds.west.min(p.longitude);
            bounds.east = bounds.east.max(p.longitude);
        }
        Some(bounds)
    }

    /// Midpoint of the box.
    #[must_use]
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Check whether a point lies inside the box (edges included).
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.south..=self.north).contains(&point.latitude)
            && (self.west..=self.east).contains(&point.longitude)
    }
}

/// One raw positioning reading, before it becomes a stored record.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, when the source reports it.
    pub accuracy: Option<f64>,
    /// Altitude in meters, when the source reports it.
    pub altitude: Option<f64>,
}

impl PositionSample {
    /// Create a sample with coordinates only.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            altitude: None,
        }
    }

    /// Set the reported accuracy.
    #[must_use]
    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// Set the reported altitude.
    #[must_use]
    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    /// Check that coordinates are finite and in range and that accuracy,
    /// when present, is non-negative.
    pub fn validate(&self) -> ParseResult<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ParseError::InvalidCoordinate {
                axis: "latitude",
                value: self.latitude,
            });
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ParseError::InvalidCoordinate {
                axis: "longitude",
                value: self.longitude,
            });
        }
        if let Some(acc) = self.accuracy
            && acc < 0.0
        {
            return Err(ParseError::InvalidValue(format!(
                "accuracy must be non-negative, got {acc}"
            )));
        }
        Ok(())
    }
}

/// Failure reported by the positioning capability.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PositionError {
    pub message: String,
}

impl PositionError {
    /// Create a positioning error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Whether the environment disables positioning through a permissions
    /// policy. Recognized by message content only.
    #[must_use]
    pub fn is_policy_denial(&self) -> bool {
        self.message.to_lowercase().contains("permissions policy")
    }
}

impl fmt::Display for PositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PositionError {}

/// A location about to be appended to the store.
///
/// Carries every [`LocationRecord`] field except the ones the store assigns
/// (`id` and `timestamp`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub tracker_id: OperatorId,
}

impl NewLocation {
    /// Build a draft from a raw sample, validating its coordinates.
    ///
    /// Non-finite optional fields are treated as not reported.
    pub fn from_sample(sample: &PositionSample, tracker_id: OperatorId) -> ParseResult<Self> {
        sample.validate()?;
        Ok(Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
            accuracy: sample.accuracy.filter(|v| v.is_finite()),
            altitude: sample.altitude.filter(|v| v.is_finite()),
            tracker_id,
        })
    }
}

/// A stored location. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LocationRecord {
    pub id: RecordId,
    /// Store-assigned moment of receipt.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub tracker_id: OperatorId,
}

impl LocationRecord {
    /// Materialize a draft with the store-assigned id and timestamp.
    pub fn from_draft(id: RecordId, timestamp: OffsetDateTime, draft: NewLocation) -> Self {
        Self {
            id,
            timestamp,
            latitude: draft.latitude,
            longitude: draft.longitude,
            accuracy: draft.accuracy,
            altitude: draft.altitude,
            tracker_id: draft.tracker_id,
        }
    }

    /// The record's coordinates.
    #[must_use]
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Calendar day of the timestamp at the given offset.
    #[must_use]
    pub fn local_date(&self, offset: UtcOffset) -> Date {
        self.timestamp.to_offset(offset).date()
    }

    /// Minutes since local midnight (`hour * 60 + minute`), seconds dropped.
    #[must_use]
    pub fn local_minute_of_day(&self, offset: UtcOffset) -> u16 {
        let local = self.timestamp.to_offset(offset);
        u16::from(local.hour()) * 60 + u16::from(local.minute())
    }
}

/// An (hour, minute) pair in [0,23] x [0,59].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Midnight, 00:00.
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { hour: 0, minute: 0 };

    /// Create a time of day, rejecting out-of-range components.
    pub fn new(hour: u8, minute: u8) -> ParseResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(ParseError::InvalidTimeOfDay(format!(
                "{hour:02}:{minute:02} is outside 00:00-23:59"
            )));
        }
        Ok(Self { hour, minute })
    }

    #[must_use]
    pub fn hour(&self) -> u8 {
        self.hour
    }

    #[must_use]
    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Minutes since midnight.
    #[must_use]
    pub fn minutes(&self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = ParseError;

    /// Parse `"HH:MM"` (one- or two-digit components).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidTimeOfDay(format!("expected HH:MM, got '{s}'"));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// The (date, start, end) triple selecting which history to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeWindow {
    #[cfg_attr(feature = "serde", serde(with = "iso_date"))]
    pub date: Date,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeWindow {
    /// Create a window for `date` between `start` and `end` (both inclusive).
    #[must_use]
    pub fn new(date: Date, start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { date, start, end }
    }

    /// Whether the window spans midnight (`start > end`).
    #[must_use]
    pub fn is_overnight(&self) -> bool {
        self.start.minutes() > self.end.minutes()
    }

    #[must_use]
    pub fn with_date(mut self, date: Date) -> Self {
        self.date = date;
        self
    }

    #[must_use]
    pub fn with_start(mut self, start: TimeOfDay) -> Self {
        self.start = start;
        self
    }

    #[must_use]
    pub fn with_end(mut self, end: TimeOfDay) -> Self {
        self.end = end;
        self
    }
}

impl Default for TimeWindow {
    /// Today's UTC date, 19:00 to 21:00.
    fn default() -> Self {
        Self {
            date: OffsetDateTime::now_utc().date(),
            start: TimeOfDay { hour: 19, minute: 0 },
            end: TimeOfDay { hour: 21, minute: 0 },
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{}", self.date, self.start, self.end)
    }
}

/// Live-tracking state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrackingState {
    #[default]
    Idle,
    RequestingPermission,
    Tracking,
    Error(String),
}

impl TrackingState {
    /// Whether a session is in progress (requesting or tracking).
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::RequestingPermission | Self::Tracking)
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::RequestingPermission => write!(f, "Requesting permission..."),
            Self::Tracking => write!(f, "Tracking..."),
            Self::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}
