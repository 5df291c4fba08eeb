//! Operator-facing handle over the background sync loop.

use crate::events::{SyncEvent, SyncStatus};
use crate::pipeline::{run_cycle, Collaborators, SyncCycle};
use crate::session::{SessionState, SyncSession, EVENT_CAPACITY};
use halo_core::{ConfigError, ConfigUpdate, DynError, LightGroup, LightInfo, SyncConfig};
use log::{error, info, warn};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    Playback,
    Lighting,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::Playback => write!(f, "playback service"),
            Collaborator::Lighting => write!(f, "lighting bridge"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Sync already running")]
    AlreadyRunning,

    #[error("Sync not running")]
    NotRunning,

    #[error("{0} is not reachable")]
    Unreachable(Collaborator),

    #[error("{which} request failed: {message}")]
    Request {
        which: Collaborator,
        message: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ControlError {
    fn request(which: Collaborator, err: DynError) -> Self {
        Self::Request {
            which,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub playback: bool,
    pub lighting: bool,
}

impl ConnectionReport {
    pub fn all_reachable(&self) -> bool {
        self.playback && self.lighting
    }
}

struct RunningLoop {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Starts, stops and inspects the sync loop.
///
/// At most one loop runs at a time. The loop owns its session state; the
/// controller only sees the snapshots it publishes.
pub struct SyncController {
    collaborators: Collaborators,
    config: watch::Sender<SyncConfig>,
    session: Arc<watch::Sender<SessionState>>,
    events: broadcast::Sender<SyncEvent>,
    running: Mutex<Option<RunningLoop>>,
    active: AtomicBool,
}

impl SyncController {
    pub fn new(collaborators: Collaborators, config: SyncConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (config, _) = watch::channel(config);
        let (session, _) = watch::channel(SessionState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            collaborators,
            config,
            session: Arc::new(session),
            events,
            running: Mutex::new(None),
            active: AtomicBool::new(false),
        })
    }

    /// Checks both collaborators once, then spawns the loop.
    pub async fn start(&self) -> Result<(), ControlError> {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|l| !l.task.is_finished()) {
            return Err(ControlError::AlreadyRunning);
        }

        if !self.collaborators.playback.check_reachable().await {
            return Err(ControlError::Unreachable(Collaborator::Playback));
        }
        if !self.collaborators.bridge.check_reachable().await {
            return Err(ControlError::Unreachable(Collaborator::Lighting));
        }

        let (stop, stop_rx) = watch::channel(false);
        let session = SyncSession::attached(
            self.collaborators.clone(),
            Arc::clone(&self.session),
            self.events.clone(),
        );
        self.notify(SyncEvent::Started);
        let task = tokio::spawn(session.run(self.config.subscribe(), stop_rx));
        *running = Some(RunningLoop { stop, task });
        self.active.store(true, Ordering::SeqCst);
        info!("Sync started");
        Ok(())
    }

    /// Signals the loop and waits for it to exit. A tick in flight finishes
    /// first; the lights keep their current colors.
    pub async fn stop(&self) -> Result<(), ControlError> {
        let mut running = self.running.lock().await;
        let Some(RunningLoop { stop, task }) = running.take() else {
            return Err(ControlError::NotRunning);
        };

        // The loop may already be gone if it panicked.
        let _ = stop.send(true);
        if let Err(e) = task.await {
            error!("Sync loop ended abnormally: {}", e);
        }
        self.active.store(false, Ordering::SeqCst);
        info!("Sync stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SyncStatus {
        let session = self.session.borrow().clone();
        SyncStatus {
            active: self.is_running(),
            config: self.config(),
            current_track: session.last_seen_track,
            palette: session.palette,
            assignment: session.assignment,
            last_dispatch: session.last_report,
        }
    }

    pub fn config(&self) -> SyncConfig {
        self.config.borrow().clone()
    }

    /// Validates and stages a change. A running loop picks it up at its next
    /// tick.
    pub fn update_config(&self, update: ConfigUpdate) -> Result<SyncConfig, ControlError> {
        let mut rejected = None;
        self.config.send_if_modified(|current| match current.apply(update) {
            Ok(next) => {
                let changed = next != *current;
                *current = next;
                changed
            }
            Err(e) => {
                rejected = Some(e);
                false
            }
        });
        if let Some(e) = rejected {
            warn!("Rejected configuration change: {}", e);
            return Err(e.into());
        }
        let config = self.config();
        info!("Configuration updated: {:?}", config);
        Ok(config)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub async fn test_connection(&self) -> ConnectionReport {
        let (playback, lighting) = tokio::join!(
            self.collaborators.playback.check_reachable(),
            self.collaborators.bridge.check_reachable()
        );
        ConnectionReport { playback, lighting }
    }

    /// Bridge lights, each annotated with the color the sync last gave it.
    pub async fn list_lights(&self) -> Result<Vec<LightInfo>, ControlError> {
        let mut lights = self
            .collaborators
            .bridge
            .list_lights()
            .await
            .map_err(|e| ControlError::request(Collaborator::Lighting, e))?;
        let session = self.session.borrow();
        for light in &mut lights {
            light.current_color = session.assignment.get(light.id);
        }
        Ok(lights)
    }

    pub async fn list_groups(&self) -> Result<Vec<LightGroup>, ControlError> {
        self.collaborators
            .bridge
            .list_groups()
            .await
            .map_err(|e| ControlError::request(Collaborator::Lighting, e))
    }

    /// Runs the pipeline for whatever is playing right now, outside the loop.
    /// `None` when nothing is playing. The loop's session state is untouched.
    pub async fn sync_once(&self) -> Result<Option<SyncCycle>, ControlError> {
        let snapshot = self
            .collaborators
            .playback
            .current_snapshot()
            .await
            .map_err(|e| ControlError::request(Collaborator::Playback, e))?;
        let Some(track) = snapshot else {
            info!("Nothing playing, no sync performed");
            return Ok(None);
        };

        let config = self.config();
        let cycle = run_cycle(
            self.collaborators.artwork.as_ref(),
            self.collaborators.bridge.as_ref(),
            &track,
            &config,
        )
        .await;
        Ok(Some(cycle))
    }

    fn notify(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }
}
