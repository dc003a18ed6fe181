//! `waypost history`: list stored locations inside a time window.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use waypost_core::{HistoryStream, WindowFilter};

use crate::cli::{HistoryArgs, OutputFormat};
use crate::config::Config;
use crate::format::{FormatOptions, format_records_csv, format_records_json, format_records_text};
use crate::util::{first_snapshot, open_store, resolve_window, write_output};

pub async fn cmd_history(
    args: HistoryArgs,
    config: &Config,
    filter: &WindowFilter,
    opts: &FormatOptions,
    output: Option<&PathBuf>,
) -> Result<()> {
    let window = resolve_window(&args.window, config, filter);
    let store = open_store(config)?;
    let history =
        HistoryStream::subscribe(&store).context("Failed to subscribe to location history")?;
    let snapshot = first_snapshot(&history).await;
    history.unsubscribe().await;
    let snapshot = snapshot?;

    let records = filter.apply(&snapshot, &window);
    info!(
        "{} of {} locations fall within {}",
        records.len(),
        snapshot.len(),
        window
    );

    let opts = opts.with_no_header(args.no_header).with_compact(args.compact);
    let content = match args.format {
        OutputFormat::Text => format_records_text(&records, &opts),
        OutputFormat::Json => format_records_json(&records, &opts)?,
        OutputFormat::Csv => format_records_csv(&records, &opts),
    };
    write_output(output, &content)
}
