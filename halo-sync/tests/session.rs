//! Single ticks of the sync session against in-memory collaborators.

mod common;

use common::{fast_config, rgb_artwork, track, FakeArtwork, FakeBridge, FakePlayback, Harness, Poll};
use halo_core::Color;
use halo_sync::{SyncEvent, SyncSession, TickOutcome};

#[tokio::test]
async fn each_track_change_syncs_exactly_once() {
    let harness = Harness::new(
        FakePlayback::new([
            Poll::Playing(track("a")),
            Poll::Playing(track("a")),
            Poll::Playing(track("b")),
        ]),
        FakeArtwork::serving(rgb_artwork()),
        FakeBridge::default(),
    );
    let mut session = SyncSession::new(harness.collaborators());
    let config = fast_config();

    let first = session.tick(&config).await.unwrap();
    let second = session.tick(&config).await.unwrap();
    let third = session.tick(&config).await.unwrap();

    assert!(matches!(first, TickOutcome::Synced(_)));
    assert_eq!(second, TickOutcome::Unchanged);
    assert!(matches!(third, TickOutcome::Synced(_)));
    assert_eq!(harness.artwork.fetch_count(), 2);
    assert_eq!(harness.bridge.sent().len(), 6);
    assert_eq!(session.state().last_seen_track_id(), Some("b"));
}

#[tokio::test]
async fn palette_follows_artwork_and_covers_every_light() {
    let harness = Harness::new(
        FakePlayback::new([Poll::Playing(track("a"))]),
        FakeArtwork::serving(rgb_artwork()),
        FakeBridge::default(),
    );
    let mut session = SyncSession::new(harness.collaborators());

    let TickOutcome::Synced(cycle) = session.tick(&fast_config()).await.unwrap() else {
        panic!("expected a sync");
    };

    assert_eq!(cycle.palette, vec![Color::RED, Color::GREEN, Color::BLUE]);
    assert_eq!(
        cycle.assignment.iter().collect::<Vec<_>>(),
        vec![(11, Color::RED), (12, Color::GREEN), (13, Color::BLUE)]
    );
    assert_eq!(session.state().palette, cycle.palette);
    assert_eq!(session.state().assignment, cycle.assignment);
}

#[tokio::test]
async fn failed_artwork_download_uses_fallback_palette() {
    let harness = Harness::new(
        FakePlayback::new([Poll::Playing(track("a"))]),
        FakeArtwork::failing(),
        FakeBridge::default(),
    );
    let mut session = SyncSession::new(harness.collaborators());

    let TickOutcome::Synced(cycle) = session.tick(&fast_config()).await.unwrap() else {
        panic!("expected a sync");
    };

    assert_eq!(cycle.palette, vec![Color::RED, Color::GREEN, Color::BLUE]);
    let report = cycle.outcome.report().unwrap();
    assert_eq!(report.succeeded, vec![11, 12, 13]);
    assert!(report.is_complete());
}

#[tokio::test]
async fn one_failing_light_is_reported_by_id() {
    let harness = Harness::new(
        FakePlayback::new([Poll::Playing(track("a")), Poll::Playing(track("b"))]),
        FakeArtwork::serving(rgb_artwork()),
        FakeBridge::failing(&[12]),
    );
    let mut session = SyncSession::new(harness.collaborators());
    let config = fast_config();

    let TickOutcome::Synced(cycle) = session.tick(&config).await.unwrap() else {
        panic!("expected a sync");
    };
    let report = cycle.outcome.report().unwrap();
    assert_eq!(report.succeeded, vec![11, 13]);
    assert_eq!(report.failed.keys().copied().collect::<Vec<_>>(), vec![12]);
    assert!(report.failed[&12].contains("201"));
    assert_eq!(session.state().last_report.as_ref(), Some(report));

    // The next track still goes out.
    assert!(matches!(
        session.tick(&config).await.unwrap(),
        TickOutcome::Synced(_)
    ));
}

#[tokio::test]
async fn playback_ending_clears_tracking_and_notifies() {
    let harness = Harness::new(
        FakePlayback::new([Poll::Playing(track("a")), Poll::Nothing]),
        FakeArtwork::serving(rgb_artwork()),
        FakeBridge::default(),
    );
    let mut session = SyncSession::new(harness.collaborators());
    let mut events = session.subscribe();
    let config = fast_config();

    session.tick(&config).await.unwrap();
    assert_eq!(session.tick(&config).await.unwrap(), TickOutcome::PlaybackStopped);
    assert_eq!(session.tick(&config).await.unwrap(), TickOutcome::Idle);
    assert_eq!(session.state().last_seen_track_id(), None);

    match events.recv().await.unwrap() {
        SyncEvent::TrackChanged { track, palette, .. } => {
            assert_eq!(track.id, "a");
            assert_eq!(palette.len(), 3);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(events.recv().await.unwrap(), SyncEvent::PlaybackStopped);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn same_track_after_a_pause_is_synced_again() {
    let harness = Harness::new(
        FakePlayback::new([
            Poll::Playing(track("a")),
            Poll::Nothing,
            Poll::Playing(track("a")),
        ]),
        FakeArtwork::serving(rgb_artwork()),
        FakeBridge::default(),
    );
    let mut session = SyncSession::new(harness.collaborators());
    let config = fast_config();

    session.tick(&config).await.unwrap();
    session.tick(&config).await.unwrap();
    assert!(matches!(
        session.tick(&config).await.unwrap(),
        TickOutcome::Synced(_)
    ));
    assert_eq!(harness.artwork.fetch_count(), 2);
}

#[tokio::test]
async fn playback_errors_surface_without_touching_state() {
    let harness = Harness::new(
        FakePlayback::new([
            Poll::Playing(track("a")),
            Poll::Fail("service unavailable"),
            Poll::Playing(track("a")),
        ]),
        FakeArtwork::serving(rgb_artwork()),
        FakeBridge::default(),
    );
    let mut session = SyncSession::new(harness.collaborators());
    let config = fast_config();

    session.tick(&config).await.unwrap();
    let err = session.tick(&config).await.unwrap_err();
    assert_eq!(err.to_string(), "service unavailable");
    assert_eq!(session.state().last_seen_track_id(), Some("a"));

    assert_eq!(session.tick(&config).await.unwrap(), TickOutcome::Unchanged);
    assert_eq!(harness.artwork.fetch_count(), 1);
}

#[tokio::test]
async fn track_without_artwork_leaves_lights_alone() {
    let mut silent = track("a");
    silent.artwork_url = None;
    let harness = Harness::new(
        FakePlayback::new([Poll::Playing(silent)]),
        FakeArtwork::serving(rgb_artwork()),
        FakeBridge::default(),
    );
    let mut session = SyncSession::new(harness.collaborators());

    let TickOutcome::Synced(cycle) = session.tick(&fast_config()).await.unwrap() else {
        panic!("expected a sync");
    };

    assert!(cycle.palette.is_empty());
    assert_eq!(cycle.outcome, halo_hue::DispatchOutcome::Skipped);
    assert!(harness.bridge.sent().is_empty());
    assert_eq!(harness.artwork.fetch_count(), 0);
}
