use crate::events::SyncEvent;
use crate::pipeline::{run_cycle, Collaborators, SyncCycle};
use halo_core::{DynError, LightAssignment, Palette, SyncConfig, Track};
use halo_hue::DispatchReport;
use log::{debug, error, info};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// Capacity of the notification channel; lagging subscribers lose old events.
pub(crate) const EVENT_CAPACITY: usize = 64;

/// What the loop has observed and pushed so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub last_seen_track: Option<Track>,
    pub palette: Palette,
    pub assignment: LightAssignment,
    pub last_report: Option<DispatchReport>,
}

impl SessionState {
    pub fn last_seen_track_id(&self) -> Option<&str> {
        self.last_seen_track.as_ref().map(|track| track.id.as_str())
    }
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing playing and nothing tracked.
    Idle,
    /// The tracked track is still playing.
    Unchanged,
    /// Playback ended; tracking was cleared.
    PlaybackStopped,
    /// A new track was synced to the lights.
    Synced(SyncCycle),
}

/// The loop's exclusively owned state plus the channels it publishes on.
///
/// Only the session mutates its state; readers get snapshots through the
/// watch channel.
pub struct SyncSession {
    collaborators: Collaborators,
    state: SessionState,
    published: Arc<watch::Sender<SessionState>>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncSession {
    pub fn new(collaborators: Collaborators) -> Self {
        let (published, _) = watch::channel(SessionState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self::attached(collaborators, Arc::new(published), events)
    }

    pub(crate) fn attached(
        collaborators: Collaborators,
        published: Arc<watch::Sender<SessionState>>,
        events: broadcast::Sender<SyncEvent>,
    ) -> Self {
        Self {
            collaborators,
            state: SessionState::default(),
            published,
            events,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Polls playback once and syncs the lights if the track changed.
    pub async fn tick(&mut self, config: &SyncConfig) -> Result<TickOutcome, DynError> {
        let snapshot = self.collaborators.playback.current_snapshot().await?;

        let track = match snapshot {
            None if self.state.last_seen_track.is_some() => {
                info!("Playback stopped");
                self.state.last_seen_track = None;
                self.publish();
                self.notify(SyncEvent::PlaybackStopped);
                return Ok(TickOutcome::PlaybackStopped);
            }
            None => return Ok(TickOutcome::Idle),
            Some(track) if self.state.last_seen_track_id() == Some(track.id.as_str()) => {
                return Ok(TickOutcome::Unchanged);
            }
            Some(track) => track,
        };

        self.state.last_seen_track = Some(track.clone());
        self.publish();

        let cycle = run_cycle(
            self.collaborators.artwork.as_ref(),
            self.collaborators.bridge.as_ref(),
            &track,
            config,
        )
        .await;

        self.state.palette = cycle.palette.clone();
        self.state.assignment = cycle.assignment.clone();
        if let Some(report) = cycle.outcome.report() {
            self.state.last_report = Some(report.clone());
        }
        self.publish();
        self.notify(SyncEvent::TrackChanged {
            track,
            palette: cycle.palette.clone(),
            outcome: cycle.outcome.clone(),
        });
        Ok(TickOutcome::Synced(cycle))
    }

    /// Ticks until `stop` is raised (or its sender dropped), then clears the
    /// tracked state. Lights keep their last color.
    ///
    /// The stop flag is checked between ticks only: a tick in flight always
    /// completes.
    pub(crate) async fn run(
        mut self,
        config: watch::Receiver<SyncConfig>,
        mut stop: watch::Receiver<bool>,
    ) {
        info!("Entering sync loop");
        while !stop_requested(&stop) {
            // One copy per tick; staged changes apply from the next tick on.
            let tick_config = config.borrow().clone();
            let pause = match self.tick(&tick_config).await {
                Ok(outcome) => {
                    debug!("Tick finished: {}", outcome_name(&outcome));
                    tick_config.poll_interval
                }
                Err(e) => {
                    error!("Sync error: {}", e);
                    self.notify(SyncEvent::TickFailed {
                        message: e.to_string(),
                    });
                    tick_config.backoff_interval
                }
            };
            sleep_unless_stopped(pause, &mut stop).await;
        }

        self.state = SessionState::default();
        self.publish();
        self.notify(SyncEvent::Stopped);
        info!("Sync loop stopped, lights remain in their current state");
    }

    fn publish(&self) {
        self.published.send_replace(self.state.clone());
    }

    fn notify(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn stop_requested(stop: &watch::Receiver<bool>) -> bool {
    *stop.borrow() || stop.has_changed().is_err()
}

async fn sleep_unless_stopped(pause: Duration, stop: &mut watch::Receiver<bool>) {
    tokio::select! {
        _ = tokio::time::sleep(pause) => {}
        _ = stop.changed() => {}
    }
}

fn outcome_name(outcome: &TickOutcome) -> &'static str {
    match outcome {
        TickOutcome::Idle => "idle",
        TickOutcome::Unchanged => "unchanged",
        TickOutcome::PlaybackStopped => "playback stopped",
        TickOutcome::Synced(_) => "synced",
    }
}
