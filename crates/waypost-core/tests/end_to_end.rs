//! End-to-end tests wiring the tracking controller, the in-memory store, the
//! history stream, and the map view together.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use time::macros::datetime;
use tokio_util::sync::CancellationToken;

use waypost_core::mock::{Clock, MapCall, MemoryStore, RecordingMap, ScriptedSource};
use waypost_core::{
    GeoPoint, HistoryStream, MapView, OperatorId, OperatorSession, PositionError, PositionSample,
    TimeWindow, TrackingController, TrackingOptions, TrackingState, WORLD_ZOOM, WindowFilter,
    WindowSelector,
};

const PERIOD: Duration = Duration::from_secs(60);

/// A store clock that follows the paused tokio clock from a fixed start.
fn tokio_clock(start: OffsetDateTime) -> Clock {
    let origin = tokio::time::Instant::now();
    Arc::new(move || start + origin.elapsed())
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

fn marker_labels(map: &RecordingMap) -> Vec<String> {
    map.calls()
        .into_iter()
        .filter_map(|c| match c {
            MapCall::DrawMarker(_, _, label) => Some(label),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_tracking_session_draws_path() {
    let store = Arc::new(MemoryStore::with_clock(tokio_clock(datetime!(2024-06-01 19:58 UTC))));
    let source = Arc::new(ScriptedSource::fixed(PositionSample::new(47.60, -122.33)));
    let session = Arc::new(OperatorSession::signed_in(OperatorId::new("austin")));
    let controller = TrackingController::new(
        store.clone(),
        Some(source.clone()),
        session.clone(),
        TrackingOptions::with_period(PERIOD),
    )
    .unwrap();

    let history = HistoryStream::subscribe(store.as_ref()).unwrap();
    let selector = WindowSelector::new(TimeWindow::new(
        datetime!(2024-06-01 00:00 UTC).date(),
        "19:00".parse().unwrap(),
        "21:00".parse().unwrap(),
    ));
    let map = RecordingMap::new();
    let mut view = MapView::new(map.clone(), WindowFilter::utc(), history.watch(), selector.watch());
    let cancel = CancellationToken::new();
    let view_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { view.run(cancel).await })
    };
    settle().await;
    assert_eq!(
        map.calls().last(),
        Some(&MapCall::ResetView(GeoPoint::ORIGIN, WORLD_ZOOM))
    );

    controller.start().await.unwrap();
    source.set_fallback(Ok(PositionSample::new(47.61, -122.34)));
    tokio::time::sleep(PERIOD * 2 + Duration::from_secs(1)).await;
    settle().await;

    assert_eq!(store.len().await, 3);
    assert_eq!(history.snapshot().len(), 3);
    let last_path = map
        .calls()
        .into_iter()
        .rev()
        .find_map(|c| match c {
            MapCall::DrawPath(_, points) => Some(points),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_path.len(), 3);
    assert_eq!(last_path[2], GeoPoint::new(47.61, -122.34));
    assert_eq!(
        marker_labels(&map).last().map(String::as_str),
        Some("Last known location: 20:00:00")
    );
    // Path and marker only: earlier renders were removed.
    assert_eq!(map.live_layers(), 2);

    session.sign_out(&controller).await;
    assert_eq!(controller.state(), TrackingState::Idle);
    tokio::time::sleep(PERIOD * 3).await;
    settle().await;
    assert_eq!(store.len().await, 3);

    cancel.cancel();
    view_task.await.unwrap();
    history.unsubscribe().await;
    assert_eq!(store.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failures_do_not_stop_the_map() {
    let store = Arc::new(MemoryStore::with_clock(tokio_clock(datetime!(2024-06-01 20:00 UTC))));
    let source = Arc::new(ScriptedSource::fixed(PositionSample::new(10.0, 20.0)));
    let controller = TrackingController::new(
        store.clone(),
        Some(source.clone()),
        Arc::new(OperatorSession::signed_in(OperatorId::new("austin"))),
        TrackingOptions::with_period(PERIOD),
    )
    .unwrap();
    let history = HistoryStream::subscribe(store.as_ref()).unwrap();
    let mut snapshots = history.watch();

    controller.start().await.unwrap();
    snapshots.wait_for(|s| s.len() == 1).await.unwrap();

    // One failed fix, then one failed save.
    source.push(Err(PositionError::new("Position unavailable")));
    tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(
        controller.status().error.as_deref(),
        Some("Positioning error: Position unavailable")
    );

    store.fail_next_appends(1);
    tokio::time::sleep(PERIOD).await;
    settle().await;
    assert_eq!(
        controller.status().error.as_deref(),
        Some("Failed to save location data.")
    );
    assert_eq!(controller.state(), TrackingState::Tracking);

    tokio::time::sleep(PERIOD).await;
    settle().await;
    assert_eq!(history.snapshot().len(), 2);

    let filtered = WindowFilter::utc().apply(
        &history.snapshot(),
        &TimeWindow::new(
            datetime!(2024-06-01 00:00 UTC).date(),
            "20:00".parse().unwrap(),
            "20:05".parse().unwrap(),
        ),
    );
    assert_eq!(filtered.len(), 2);

    controller.stop().await;
    assert!(controller.status().error.is_none());
    history.unsubscribe().await;
}
