//! Output formatting for history listings and tracking events.

use anyhow::Result;
use owo_colors::OwoColorize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use waypost_core::{DisplayZone, TrackingEvent};
use waypost_types::LocationRecord;

/// Formatting options for output.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Omit the header row.
    pub no_header: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
    /// Zone timestamps are rendered in.
    pub zone: DisplayZone,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            no_color: false,
            no_header: false,
            compact: false,
            zone: DisplayZone::UTC,
        }
    }
}

impl FormatOptions {
    pub fn new(no_color: bool, zone: impl Into<DisplayZone>) -> Self {
        Self {
            no_color,
            zone: zone.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_no_header(mut self, no_header: bool) -> Self {
        self.no_header = no_header;
        self
    }

    #[must_use]
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    fn local_time(&self, ts: OffsetDateTime) -> String {
        self.zone
            .localize(ts)
            .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
            .unwrap_or_else(|_| ts.to_string())
    }
}

/// Escape a value for CSV output.
///
/// Wraps the value in quotes if it contains commas, quotes, or newlines.
/// Double quotes are escaped by doubling them.
#[must_use]
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn optional(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_default()
}

/// Format records as an aligned text table.
#[must_use]
pub fn format_records_text(records: &[LocationRecord], opts: &FormatOptions) -> String {
    if records.is_empty() {
        return "No locations in this window.\n".to_string();
    }

    let mut output = String::new();
    if !opts.no_header {
        let header = format!(
            "{:<19}  {:>10}  {:>11}  {:>8}  {:>8}  {}",
            "TIME", "LATITUDE", "LONGITUDE", "ACC (m)", "ALT (m)", "OPERATOR"
        );
        if opts.no_color {
            output.push_str(&header);
        } else {
            output.push_str(&format!("{}", header.bold()));
        }
        output.push('\n');
    }
    for record in records {
        output.push_str(&format!(
            "{:<19}  {:>10.6}  {:>11.6}  {:>8}  {:>8}  {}\n",
            opts.local_time(record.timestamp),
            record.latitude,
            record.longitude,
            optional(record.accuracy, 1),
            optional(record.altitude, 1),
            record.tracker_id
        ));
    }
    output
}

/// Format records as CSV with RFC 3339 timestamps in the display zone.
#[must_use]
pub fn format_records_csv(records: &[LocationRecord], opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        "id,timestamp,latitude,longitude,accuracy,altitude,tracker_id\n".to_string()
    };
    for record in records {
        let ts = opts
            .zone
            .localize(record.timestamp)
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::new());
        output.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            csv_escape(record.id.as_str()),
            ts,
            record.latitude,
            record.longitude,
            record.accuracy.map(|v| v.to_string()).unwrap_or_default(),
            record.altitude.map(|v| v.to_string()).unwrap_or_default(),
            csv_escape(record.tracker_id.as_str())
        ));
    }
    output
}

/// Format records as a JSON array.
pub fn format_records_json(records: &[LocationRecord], opts: &FormatOptions) -> Result<String> {
    let json = if opts.compact {
        serde_json::to_string(records)?
    } else {
        serde_json::to_string_pretty(records)?
    };
    Ok(format!("{json}\n"))
}

/// Format a tracking event as one status line.
#[must_use]
pub fn format_event(event: &TrackingEvent, opts: &FormatOptions) -> String {
    let (tag, detail) = match event {
        TrackingEvent::Started { operator } => ("started", format!("tracking as {operator}")),
        TrackingEvent::SampleSaved { record } => (
            "saved",
            format!(
                "{} at {}{}",
                record.point(),
                opts.local_time(record.timestamp),
                record
                    .accuracy
                    .map(|a| format!(" (±{a:.0} m)"))
                    .unwrap_or_default()
            ),
        ),
        TrackingEvent::SaveFailed { error } => ("save failed", error.clone()),
        TrackingEvent::AcquisitionFailed {
            error,
            policy_denied: true,
        } => ("denied", error.clone()),
        TrackingEvent::AcquisitionFailed { error, .. } => ("no fix", error.clone()),
        TrackingEvent::Stopped => ("stopped", "tracking ended".to_string()),
        _ => ("event", format!("{event:?}")),
    };

    if opts.no_color {
        return format!("[{tag}] {detail}");
    }
    let tag = match event {
        TrackingEvent::Started { .. } => format!("[{}]", tag.green()),
        TrackingEvent::SampleSaved { .. } => format!("[{}]", tag.cyan()),
        TrackingEvent::SaveFailed { .. } => format!("[{}]", tag.red()),
        TrackingEvent::AcquisitionFailed { .. } => format!("[{}]", tag.yellow()),
        _ => format!("[{}]", tag.dimmed()),
    };
    format!("{tag} {detail}")
}
