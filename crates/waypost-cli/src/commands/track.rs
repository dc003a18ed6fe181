//! `waypost track`: a live session against the local database.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use waypost_core::{OperatorSession, TrackingController, TrackingEvent};
use waypost_types::{GeoPoint, OperatorId};

use crate::cli::TrackArgs;
use crate::config::Config;
use crate::format::{FormatOptions, format_event};
use crate::simulate::RandomWalkSource;
use crate::util::open_store;

pub async fn cmd_track(
    args: TrackArgs,
    config: &Config,
    opts: &FormatOptions,
    quiet: bool,
) -> Result<()> {
    let operator = match args.operator {
        Some(id) if id.trim().is_empty() => bail!("Operator id cannot be blank"),
        Some(id) => OperatorId::new(id),
        None => config.operator.operator_id().ok_or_else(|| {
            anyhow!(
                "No operator specified. Use --operator <ID> or set [operator] id in the config file."
            )
        })?,
    };

    let mut options = config.tracking_options();
    if let Some(secs) = args.interval {
        options = options.period(Duration::from_secs(secs));
    }

    let store = Arc::new(open_store(config)?);
    let start = GeoPoint::new(args.lat, args.lon);
    let source = match args.seed {
        Some(seed) => RandomWalkSource::seeded(start, seed),
        None => RandomWalkSource::new(start),
    };
    let source = Arc::new(source.max_step(args.step));
    let session = Arc::new(OperatorSession::signed_in(operator));
    let controller = TrackingController::new(store.clone(), Some(source), session.clone(), options)
        .context("Invalid tracking options")?;

    let mut events = controller.subscribe_events();
    if let Err(e) = controller.start().await {
        bail!("{}", e.user_message());
    }
    info!(
        "Tracking every {}s, press Ctrl-C to stop",
        options.period.as_secs()
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                break;
            }
            event = events.recv() => match event {
                Ok(event) => print_event(&event, opts, quiet),
                Err(RecvError::Lagged(n)) => warn!("Missed {} tracking events", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    session.sign_out(&controller).await;
    while let Ok(event) = events.try_recv() {
        print_event(&event, opts, quiet);
    }

    let count = store.count().await.context("Failed to count stored locations")?;
    println!(
        "{} locations stored in {}",
        count,
        config.storage.path.display()
    );
    Ok(())
}

fn print_event(event: &TrackingEvent, opts: &FormatOptions, quiet: bool) {
    // Quiet mode keeps failures only.
    let failure = matches!(
        event,
        TrackingEvent::SaveFailed { .. } | TrackingEvent::AcquisitionFailed { .. }
    );
    if quiet && !failure {
        return;
    }
    println!("{}", format_event(event, opts));
}
