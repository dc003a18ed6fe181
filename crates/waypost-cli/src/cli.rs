//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use time::Date;
use time::macros::format_description;
use waypost_types::TimeOfDay;

#[derive(Parser, Debug)]
#[command(name = "waypost")]
#[command(author, version, about = "Record and replay operator location history", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Path to the config file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a live tracking session until Ctrl-C
    Track(TrackArgs),

    /// Print stored locations inside a time window
    History(HistoryArgs),

    /// Draw the filtered path on a text map
    Show(ShowArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct TrackArgs {
    /// Operator identifier (overrides the config file)
    #[arg(long, env = "WAYPOST_OPERATOR")]
    pub operator: Option<String>,

    /// Seconds between position fixes
    #[arg(short, long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Starting latitude of the simulated walk
    #[arg(long, default_value = "0.0", allow_negative_numbers = true)]
    pub lat: f64,

    /// Starting longitude of the simulated walk
    #[arg(long, default_value = "0.0", allow_negative_numbers = true)]
    pub lon: f64,

    /// Largest distance between consecutive simulated fixes, in meters
    #[arg(long, default_value = "25.0", value_name = "METERS")]
    pub step: f64,

    /// Seed for a reproducible simulated walk
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Time window selection shared by `history` and `show`.
#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// Day to show, YYYY-MM-DD (defaults to today)
    #[arg(short, long, value_parser = parse_date)]
    pub date: Option<Date>,

    /// Window start, HH:MM (inclusive)
    #[arg(short, long)]
    pub start: Option<TimeOfDay>,

    /// Window end, HH:MM (inclusive)
    #[arg(short, long)]
    pub end: Option<TimeOfDay>,
}

#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Omit the header row (CSV and text)
    #[arg(long)]
    pub no_header: bool,

    /// Compact JSON output
    #[arg(long)]
    pub compact: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Keep redrawing as new locations arrive
    #[arg(short, long)]
    pub follow: bool,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigAction {
    /// Print the config file location
    Path,
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Output format for history listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

fn parse_date(s: &str) -> Result<Date, String> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use time::macros::date;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_history_window() {
        let cli = Cli::try_parse_from([
            "waypost", "history", "--date", "2024-06-01", "--start", "19:00", "--end", "21:30",
            "--format", "csv",
        ])
        .unwrap();
        let Commands::History(args) = cli.command else {
            panic!("expected history");
        };
        assert_eq!(args.window.date, Some(date!(2024-06-01)));
        assert_eq!(args.window.start, Some("19:00".parse().unwrap()));
        assert_eq!(args.window.end.map(|t| t.minutes()), Some(21 * 60 + 30));
        assert_eq!(args.format, OutputFormat::Csv);
    }

    #[test]
    fn test_parse_rejects_bad_time() {
        assert!(Cli::try_parse_from(["waypost", "show", "--start", "25:00"]).is_err());
        assert!(Cli::try_parse_from(["waypost", "show", "--date", "06/01/2024"]).is_err());
    }

    #[test]
    fn test_parse_track_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "waypost", "track", "--operator", "austin", "--lat", "-33.9", "--lon", "151.2",
        ])
        .unwrap();
        let Commands::Track(args) = cli.command else {
            panic!("expected track");
        };
        assert_eq!(args.operator.as_deref(), Some("austin"));
        assert_eq!(args.lat, -33.9);
        assert_eq!(args.interval, None);
        assert_eq!(args.step, 25.0);
        assert_eq!(args.seed, None);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["waypost", "config", "show", "--config", "/tmp/w.toml", "-q"])
            .unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/w.toml")));
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));
    }
}
