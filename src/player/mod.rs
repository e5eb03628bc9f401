// Player side - everything the bot needs from the Mopidy daemon
// The relay only talks to the PlayerClient trait, the websocket details live in mopidy.rs

pub mod mopidy;

pub use mopidy::MopidyClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub name: String,
}

/// A playable item as reported by the daemon.
///
/// Mopidy omits fields it has no value for, so both `name` and `artists`
/// fall back to empty when missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

impl Track {
    pub fn new(name: impl Into<String>, artists: &[&str]) -> Self {
        Self {
            name: name.into(),
            artists: artists
                .iter()
                .map(|a| Artist { name: a.to_string() })
                .collect(),
        }
    }

    pub fn first_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }
}

/// Tracklist entry: a track plus the id the daemon gave it in the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlTrack {
    #[serde(default)]
    pub tlid: u64,
    pub track: Track,
}

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    Online,
    Offline,
    TrackPlaybackStarted(TlTrack),
    // Anything else the daemon broadcasts - only logged
    Other {
        name: String,
        payload: serde_json::Value,
    },
}

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("connection to player failed: {0}")]
    Connect(String),

    #[error("player connection closed")]
    Disconnected,

    #[error("player returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected player response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type PlayerResult<T> = std::result::Result<T, PlayerError>;

/// Request/response surface of the media-player daemon
#[async_trait]
pub trait PlayerClient: Send + Sync {
    async fn current_track(&self) -> PlayerResult<Option<Track>>;

    async fn tracks(&self) -> PlayerResult<Vec<Track>>;

    /// Position of the playing track in the tracklist, `None` when nothing plays
    async fn index(&self) -> PlayerResult<Option<usize>>;

    async fn next(&self) -> PlayerResult<()>;
}
