//! In-memory collaborators for driving the sync loop.

#![allow(dead_code)]

use async_trait::async_trait;
use halo_core::{
    ArtworkSource, DynResult, LightId, LightInfo, LightState, LightingBridge, PlaybackSource,
    SyncConfig, Track,
};
use halo_sync::Collaborators;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A scripted poll result.
#[derive(Clone)]
pub enum Poll {
    Playing(Track),
    Nothing,
    Fail(&'static str),
}

/// Replays a script of poll results; the last entry repeats forever.
pub struct FakePlayback {
    script: Mutex<VecDeque<Poll>>,
    pub polls: AtomicUsize,
    pub reachable: AtomicBool,
}

impl FakePlayback {
    pub fn new(script: impl IntoIterator<Item = Poll>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            polls: AtomicUsize::new(0),
            reachable: AtomicBool::new(true),
        }
    }

    /// Queues another result after the current script.
    pub fn push(&self, poll: Poll) {
        self.script.lock().unwrap().push_back(poll);
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaybackSource for FakePlayback {
    async fn current_snapshot(&self) -> DynResult<Option<Track>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };
        match next.unwrap_or(Poll::Nothing) {
            Poll::Playing(track) => Ok(Some(track)),
            Poll::Nothing => Ok(None),
            Poll::Fail(message) => Err(message.into()),
        }
    }

    async fn check_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

/// Serves the same artwork for every URL, or fails every download.
pub struct FakeArtwork {
    bytes: Option<Vec<u8>>,
    delay: Duration,
    pub fetched: Mutex<Vec<String>>,
}

impl FakeArtwork {
    pub fn serving(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Some(bytes),
            delay: Duration::ZERO,
            fetched: Mutex::new(Vec::new()),
        }
    }

    /// Like `serving`, but each download takes `delay`.
    pub fn slow(bytes: Vec<u8>, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::serving(bytes)
        }
    }

    pub fn failing() -> Self {
        Self {
            bytes: None,
            delay: Duration::ZERO,
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtworkSource for FakeArtwork {
    async fn fetch_bytes(&self, url: &str) -> DynResult<Vec<u8>> {
        self.fetched.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.bytes {
            Some(bytes) => Ok(bytes.clone()),
            None => Err("connection reset by peer".into()),
        }
    }
}

/// Records every state command; lights in `failing` reject theirs.
#[derive(Default)]
pub struct FakeBridge {
    pub failing: Vec<LightId>,
    pub unreachable: AtomicBool,
    pub sent: Mutex<Vec<(LightId, LightState)>>,
}

impl FakeBridge {
    pub fn failing(lights: &[LightId]) -> Self {
        Self {
            failing: lights.to_vec(),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(LightId, LightState)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl LightingBridge for FakeBridge {
    async fn list_lights(&self) -> DynResult<Vec<LightInfo>> {
        Ok(vec![
            LightInfo::new(11, "Living room".into(), "Extended color light".into(), true, true),
            LightInfo::new(14, "Hallway".into(), "Dimmable light".into(), true, true),
        ])
    }

    async fn set_state(&self, light: LightId, state: &LightState) -> DynResult<()> {
        self.sent.lock().unwrap().push((light, *state));
        if self.failing.contains(&light) {
            return Err(format!("bridge error 201 at /lights/{light}/state").into());
        }
        Ok(())
    }

    async fn check_reachable(&self) -> bool {
        !self.unreachable.load(Ordering::SeqCst)
    }
}

pub struct Harness {
    pub playback: Arc<FakePlayback>,
    pub artwork: Arc<FakeArtwork>,
    pub bridge: Arc<FakeBridge>,
}

impl Harness {
    pub fn new(playback: FakePlayback, artwork: FakeArtwork, bridge: FakeBridge) -> Self {
        Self {
            playback: Arc::new(playback),
            artwork: Arc::new(artwork),
            bridge: Arc::new(bridge),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            playback: self.playback.clone(),
            artwork: self.artwork.clone(),
            bridge: self.bridge.clone(),
        }
    }
}

pub fn track(id: &str) -> Track {
    Track {
        id: id.to_string(),
        name: format!("Song {id}"),
        artist: "Artist".into(),
        album: format!("Album {id}"),
        artwork_url: Some(format!("https://images.example/{id}.png")),
        duration_ms: 180_000,
        progress_ms: 1_000,
        is_playing: true,
    }
}

/// Artwork that is half red, 30% green and 20% blue.
pub fn rgb_artwork() -> Vec<u8> {
    let img = RgbImage::from_fn(10, 10, |_, y| match y {
        0..=4 => Rgb([255, 0, 0]),
        5..=7 => Rgb([0, 255, 0]),
        _ => Rgb([0, 0, 255]),
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// Three lights and intervals short enough for tests.
pub fn fast_config() -> SyncConfig {
    SyncConfig {
        light_ids: vec![11, 12, 13],
        poll_interval: Duration::from_millis(10),
        backoff_interval: Duration::from_millis(30),
        ..SyncConfig::default()
    }
}
