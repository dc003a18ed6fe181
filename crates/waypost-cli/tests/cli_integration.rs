//! CLI integration tests.
//!
//! These run the `waypost` binary against a temporary config file and
//! database, so they never touch the user's real data.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;

use time::macros::datetime;
use waypost_core::LocationStore;
use waypost_store::SqliteStore;
use waypost_types::{NewLocation, OperatorId};

struct Sandbox {
    _dir: tempfile::TempDir,
    config: PathBuf,
    db: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        let db = dir.path().join("locations.db");
        std::fs::write(
            &config,
            format!(
                "[display]\nutc_offset = \"UTC\"\n\n[storage]\npath = {:?}\n",
                db.to_string_lossy()
            ),
        )
        .unwrap();
        Self {
            _dir: dir,
            config,
            db,
        }
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_waypost"))
            .arg("--config")
            .arg(&self.config)
            .arg("--no-color")
            .args(args)
            .env_remove("RUST_LOG")
            .env_remove("WAYPOST_OPERATOR")
            .output()
            .expect("failed to run waypost")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

async fn seed(db: &Path, points: &[(f64, f64)]) {
    let store = SqliteStore::open(db)
        .unwrap()
        .with_clock(Arc::new(|| datetime!(2024-06-01 20:00 UTC)));
    for &(latitude, longitude) in points {
        store
            .append(NewLocation {
                latitude,
                longitude,
                accuracy: Some(5.0),
                altitude: None,
                tracker_id: OperatorId::new("austin"),
            })
            .await
            .unwrap();
    }
}

#[test]
fn test_config_path_and_show() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["config", "path"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), sandbox.config.display().to_string());

    let output = sandbox.run(&["config", "show"]);
    assert!(output.status.success());
    let shown = stdout(&output);
    assert!(shown.contains("utc_offset = \"UTC\""));
    assert!(shown.contains("period_secs = 60"));
}

#[test]
fn test_config_init_requires_force() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["config", "init"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));

    let output = sandbox.run(&["config", "init", "--force"]);
    assert!(output.status.success());
    let written = std::fs::read_to_string(&sandbox.config).unwrap();
    assert!(written.contains("utc_offset = \"local\""));
}

#[test]
fn test_track_without_operator_fails() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["track"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No operator specified"));
}

#[tokio::test]
async fn test_history_csv_filters_by_window() {
    let sandbox = Sandbox::new();
    seed(&sandbox.db, &[(47.60, -122.33), (47.61, -122.34)]).await;

    let output = sandbox.run(&[
        "history", "--date", "2024-06-01", "--start", "19:00", "--end", "21:00", "--format",
        "csv",
    ]);
    assert!(output.status.success(), "{output:?}");
    let csv = stdout(&output);
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,timestamp"));
    assert!(lines[1].contains("2024-06-01T20:00:00Z,47.6,-122.33,5,,austin"));

    let output = sandbox.run(&[
        "history", "--date", "2024-06-01", "--start", "21:01", "--end", "23:00", "--format",
        "csv", "--no-header",
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
}

#[tokio::test]
async fn test_show_draws_path_and_marker() {
    let sandbox = Sandbox::new();
    seed(&sandbox.db, &[(1.0, 2.0), (3.0, 4.0)]).await;

    let output = sandbox.run(&["show", "--date", "2024-06-01"]);
    assert!(output.status.success(), "{output:?}");
    let text = stdout(&output);
    assert!(text.contains("path #1 2 points from [1.000000, 2.000000] to [3.000000, 4.000000]"));
    assert!(text.contains("marker #2 [3.000000, 4.000000] Last known location: 20:00:00"));

    let output = sandbox.run(&["show", "--date", "2024-06-02"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("view [0.000000, 0.000000] zoom 2"));
}
