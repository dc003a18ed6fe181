//! Time zones used to read record timestamps as local time.
//!
//! A zone resolves its UTC offset separately for every instant, so two
//! records on either side of a daylight-saving change each get the offset
//! that was in force when they were taken.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Where local time comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayZone {
    /// A fixed offset with no daylight-saving rules.
    Fixed(UtcOffset),
    /// The system time zone.
    Local,
    /// A named IANA zone such as `America/Los_Angeles`.
    Named(Tz),
}

impl DisplayZone {
    pub const UTC: Self = Self::Fixed(UtcOffset::UTC);

    /// The offset this zone applies at `instant`.
    pub fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        match self {
            Self::Fixed(offset) => *offset,
            Self::Local => offset_in(&chrono::Local, instant),
            Self::Named(tz) => offset_in(tz, instant),
        }
    }

    /// `instant` expressed in this zone's local time.
    pub fn localize(&self, instant: OffsetDateTime) -> OffsetDateTime {
        instant.to_offset(self.offset_at(instant))
    }
}

fn offset_in<Z: TimeZone>(zone: &Z, instant: OffsetDateTime) -> UtcOffset {
    let seconds = DateTime::<Utc>::from_timestamp(instant.unix_timestamp(), instant.nanosecond())
        .map(|utc| zone.offset_from_utc_datetime(&utc.naive_utc()).fix().local_minus_utc())
        .unwrap_or(0);
    UtcOffset::from_whole_seconds(seconds).unwrap_or(UtcOffset::UTC)
}

impl Default for DisplayZone {
    fn default() -> Self {
        Self::UTC
    }
}

impl From<UtcOffset> for DisplayZone {
    fn from(offset: UtcOffset) -> Self {
        Self::Fixed(offset)
    }
}

impl From<Tz> for DisplayZone {
    fn from(tz: Tz) -> Self {
        Self::Named(tz)
    }
}

impl fmt::Display for DisplayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(offset) if offset.is_utc() => f.write_str("UTC"),
            Self::Fixed(offset) => {
                let text = offset
                    .format(format_description!("[offset_hour sign:mandatory]:[offset_minute]"))
                    .map_err(|_| fmt::Error)?;
                f.write_str(&text)
            }
            Self::Local => f.write_str("local"),
            Self::Named(tz) => f.write_str(tz.name()),
        }
    }
}

impl FromStr for DisplayZone {
    type Err = String;

    /// Accepts `local`, `UTC` (or `Z`), `+HH:MM`, or an IANA zone name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        if s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Ok(Self::UTC);
        }
        if s.starts_with(['+', '-']) {
            return UtcOffset::parse(s, format_description!("[offset_hour sign:mandatory]:[offset_minute]"))
                .map(Self::Fixed)
                .map_err(|_| format!("invalid offset '{s}': expected '+HH:MM' or '-HH:MM'"));
        }
        s.parse::<Tz>().map(Self::Named).map_err(|_| {
            format!("invalid time zone '{s}': expected 'local', 'UTC', '+HH:MM' or an IANA name")
        })
    }
}
