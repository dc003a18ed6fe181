//! Helpers shared by the subcommands.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use time::OffsetDateTime;
use tracing::info;

use waypost_core::{HistorySnapshot, HistoryStream, WindowFilter};
use waypost_store::SqliteStore;
use waypost_types::TimeWindow;

use crate::cli::WindowArgs;
use crate::config::Config;

/// Build the window from flags, falling back to the config file and today's
/// date in the display zone.
pub fn resolve_window(args: &WindowArgs, config: &Config, filter: &WindowFilter) -> TimeWindow {
    let date = args
        .date
        .unwrap_or_else(|| filter.zone().localize(OffsetDateTime::now_utc()).date());
    TimeWindow::new(
        date,
        args.start.unwrap_or(config.display.start),
        args.end.unwrap_or(config.display.end),
    )
}

/// Open the configured database.
pub fn open_store(config: &Config) -> Result<SqliteStore> {
    let path = &config.storage.path;
    SqliteStore::open(path).with_context(|| format!("Failed to open database at {}", path.display()))
}

/// Wait for the first snapshot the subscription delivers.
pub async fn first_snapshot(history: &HistoryStream) -> Result<HistorySnapshot> {
    let mut snapshots = history.watch();
    let mut errors = history.watch_errors();
    tokio::select! {
        changed = snapshots.changed() => {
            changed.context("Location history closed before delivering a snapshot")?;
            let snapshot = snapshots.borrow_and_update().clone();
            info!("Loaded {} stored locations", snapshot.len());
            Ok(snapshot)
        }
        changed = errors.changed() => {
            changed.context("Location history closed before delivering a snapshot")?;
            match errors.borrow().clone() {
                Some(e) => bail!("Failed to load location history: {}", e),
                None => bail!("Location history reported an unknown error"),
            }
        }
    }
}

/// Write output to file or stdout.
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;
    use waypost_core::LocationStore;
    use waypost_core::mock::MemoryStore;
    use waypost_types::{NewLocation, OperatorId};

    #[test]
    fn test_resolve_window_prefers_flags() {
        let config = Config::default();
        let args = WindowArgs {
            date: Some(date!(2024-06-01)),
            start: Some("08:00".parse().unwrap()),
            end: None,
        };
        let window = resolve_window(&args, &config, &WindowFilter::utc());
        assert_eq!(window.date, date!(2024-06-01));
        assert_eq!(window.start.to_string(), "08:00");
        assert_eq!(window.end, config.display.end);
    }

    #[test]
    fn test_resolve_window_defaults_to_today() {
        let window = resolve_window(&WindowArgs::default(), &Config::default(), &WindowFilter::utc());
        assert_eq!(window.date, OffsetDateTime::now_utc().date());
    }

    #[tokio::test]
    async fn test_first_snapshot() {
        let store = MemoryStore::new();
        store
            .append(NewLocation {
                latitude: 1.0,
                longitude: 2.0,
                accuracy: None,
                altitude: None,
                tracker_id: OperatorId::new("op"),
            })
            .await
            .unwrap();
        let history = HistoryStream::subscribe(&store).unwrap();
        let snapshot = first_snapshot(&history).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        history.unsubscribe().await;
    }

    #[tokio::test]
    async fn test_first_snapshot_reports_errors() {
        let store = MemoryStore::new();
        store.fail_subscribers(waypost_core::StoreError::Subscription("offline".to_string()));
        let history = HistoryStream::subscribe(&store).unwrap();
        let err = first_snapshot(&history).await.unwrap_err();
        assert!(err.to_string().contains("offline"));
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_output(Some(&path), "a,b\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
    }
}
