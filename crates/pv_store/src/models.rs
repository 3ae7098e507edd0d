//! Record shapes for the three collections, mapped to and from SQL rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Listing shape of a video: everything except the raw media payload.
///
/// Payloads can run to hundreds of megabytes, so bulk reads never select
/// the payload column; a grid of dozens of videos stays cheap regardless
/// of file sizes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VideoRecord {
    /// `{filename}-{lastModifiedEpochMs}`; deterministic, so re-importing
    /// the same unmodified file overwrites instead of duplicating.
    pub id: String,
    pub name: String,
    /// Probed duration in seconds.
    pub duration: f64,
    /// Source file size in bytes.
    pub size: i64,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub last_played: Option<DateTime<Utc>>,
    /// Playback offset in seconds, for resume.
    pub position_secs: Option<f64>,
    /// Watched percentage, 0-100.
    pub progress: Option<f64>,
    pub completed: bool,
    pub favorited: bool,
    /// Partition flag: true = vault view, false = library view.
    pub is_vaulted: bool,
    /// JPEG frame sampled at import time.
    pub thumbnail: Option<Vec<u8>>,
}

/// Full storage record: the listing fields plus the raw media payload.
/// Only a single-video fetch ever loads the payload.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredVideo {
    #[sqlx(flatten)]
    pub meta: VideoRecord,
    pub payload: Option<Vec<u8>>,
}

/// Capability reference to the originally imported file, keyed by the
/// owning video id. Lets a later session re-read the source from disk
/// instead of relying on the embedded payload.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileHandle {
    pub id: String,
    pub path: String,
}

/// User-ordered collection. `video_ids` is the playback sequence; entries
/// may dangle (the referenced video was deleted out from under an old
/// database) and are filtered at read time rather than rejected at write
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    /// `playlist-{creationEpochMs}`.
    pub id: String,
    pub name: String,
    pub description: String,
    pub video_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Result of a single-video fetch: the full record plus any file handle.
#[derive(Debug, Clone)]
pub struct VideoDetail {
    pub video: StoredVideo,
    pub handle: Option<FileHandle>,
}
