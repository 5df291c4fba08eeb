use halo_core::Track;
use serde::Deserialize;

/// Body of `GET /me/player`.
#[derive(Debug, Deserialize)]
pub(crate) struct PlaybackState {
    #[serde(default)]
    is_playing: bool,
    #[serde(default)]
    progress_ms: Option<u64>,
    /// Null during ads and for some podcast episodes.
    item: Option<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    /// Null for local files.
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<Artist>,
    /// Missing or null for some episodes and local files.
    #[serde(default)]
    album: Option<Album>,
    #[serde(default)]
    duration_ms: u64,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Album {
    #[serde(default)]
    name: String,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

/// The authorized account, from `GET /me`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
}

impl PlaybackState {
    /// The playing track, or `None` when paused or nothing identifiable plays.
    pub(crate) fn into_track(self) -> Option<Track> {
        if !self.is_playing {
            return None;
        }
        let item = self.item?;
        let id = item.id?;
        let artist = item
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let album = item.album.unwrap_or_default();
        // Images are listed largest first.
        let artwork_url = album.images.into_iter().next().map(|image| image.url);

        Some(Track {
            id,
            name: item.name,
            artist,
            album: album.name,
            artwork_url,
            duration_ms: item.duration_ms,
            progress_ms: self.progress_ms.unwrap_or(0),
            is_playing: true,
        })
    }
}
