//! `waypost show`: draw the filtered path on a text map.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use waypost_core::{HistoryStream, MapView, WindowFilter, WindowSelector};

use crate::cli::ShowArgs;
use crate::config::Config;
use crate::text_map::TextMap;
use crate::util::{first_snapshot, open_store, resolve_window};

/// How often `--follow` checks the database for rows written by other
/// processes.
const RELOAD_INTERVAL: Duration = Duration::from_secs(2);

pub async fn cmd_show(
    args: ShowArgs,
    config: &Config,
    filter: &WindowFilter,
    no_color: bool,
) -> Result<()> {
    let window = resolve_window(&args.window, config, filter);
    let store = Arc::new(open_store(config)?);
    let history = HistoryStream::subscribe(store.as_ref())
        .context("Failed to subscribe to location history")?;
    if let Err(e) = first_snapshot(&history).await {
        history.unsubscribe().await;
        return Err(e);
    }

    let selector = WindowSelector::new(window);
    let mut view = MapView::new(
        TextMap::new(io::stdout(), no_color),
        *filter,
        history.watch(),
        selector.watch(),
    );

    if !args.follow {
        let drawn = view.refresh();
        info!("Drew {} locations for {}", drawn, window);
        history.unsubscribe().await;
        return Ok(());
    }

    info!("Following {}, press Ctrl-C to stop", window);
    let cancel = CancellationToken::new();
    let poller = tokio::spawn(poll_database(store.clone(), cancel.clone()));
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!("Failed to listen for Ctrl-C: {}", e);
                    }
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        })
    };

    view.run(cancel.clone()).await;
    cancel.cancel();
    let (poller, interrupt) = tokio::join!(poller, interrupt);
    log_task_failures([("Database poller", poller), ("Ctrl-C listener", interrupt)]);
    history.unsubscribe().await;
    Ok(())
}

/// Warn about every follow-mode task that panicked or was aborted, returning
/// how many did.
fn log_task_failures<const N: usize>(results: [(&str, Result<(), JoinError>); N]) -> usize {
    let mut failed = 0;
    for (name, result) in results {
        if let Err(e) = result {
            warn!("{} ended abnormally: {}", name, e);
            failed += 1;
        }
    }
    failed
}

async fn poll_database(store: Arc<waypost_store::SqliteStore>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(RELOAD_INTERVAL);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = store.reload().await {
                    warn!("Failed to reload locations: {}", e);
                }
            }
        }
    }
}
