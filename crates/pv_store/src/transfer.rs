//! Backup export/import.
//!
//! The document is a versioned envelope; the format tag gates decoding,
//! and the whole document is decoded before anything is wiped, so a
//! corrupt backup aborts with the existing data untouched. Raw media
//! payloads and file handles do not round-trip: restored records are
//! metadata-only until the user re-imports or re-links the source files.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{self, Store};
use crate::error::StoreError;
use crate::models::{Playlist, StoredVideo, VideoRecord};

const THUMBNAIL_MIME: &str = "image/jpeg";

/// Portable backup document. New format revisions get their own variant
/// with an explicit migration, never a silently reinterpreted shape.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "format")]
pub enum BackupDocument {
    #[serde(rename = "playvault-backup-v1")]
    V1(BackupV1),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupV1 {
    pub videos: Vec<VideoEntry>,
    pub playlists: Vec<PlaylistEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    pub id: String,
    pub name: String,
    pub duration: f64,
    pub size: i64,
    #[serde(rename = "type")]
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,
    #[serde(default)]
    pub position_secs: Option<f64>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub favorited: bool,
    #[serde(default)]
    pub is_vaulted: bool,
    /// `data:image/jpeg;base64,<...>` when a thumbnail exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub video_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Parse a backup from JSON text. An unknown format tag or any shape
/// mismatch is [`StoreError::MalformedPayload`].
pub fn parse_document(json: &str) -> Result<BackupDocument, StoreError> {
    serde_json::from_str(json).map_err(|e| StoreError::MalformedPayload(e.to_string()))
}

/// Serialize a backup to pretty JSON for a user-visible file.
pub fn to_json(document: &BackupDocument) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Snapshot every video (payload already stripped by the bulk read) and
/// every playlist into a portable document.
pub async fn export_all(store: &Store) -> Result<BackupDocument, StoreError> {
    let videos = store
        .get_all_videos(true)
        .await?
        .into_iter()
        .map(video_entry)
        .collect();
    let playlists = store
        .get_all_playlists()
        .await?
        .into_iter()
        .map(playlist_entry)
        .collect();
    Ok(BackupDocument::V1(BackupV1 { videos, playlists }))
}

/// Restore a backup: decode everything first, then wipe the video and
/// playlist collections and write the records back in one transaction.
/// File handles are left alone; they are not round-trippable and keeping
/// them lets a re-linked library pick them up again.
pub async fn import_all(store: &Store, document: BackupDocument) -> Result<(), StoreError> {
    let BackupDocument::V1(doc) = document;

    let mut videos = Vec::with_capacity(doc.videos.len());
    for entry in doc.videos {
        videos.push(restore_video(entry)?);
    }
    let playlists: Vec<Playlist> = doc.playlists.into_iter().map(restore_playlist).collect();

    let mut tx = store.pool.begin().await?;
    sqlx::query("DELETE FROM videos").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM playlists")
        .execute(&mut *tx)
        .await?;
    for video in &videos {
        db::put_video_tx(&mut tx, video).await?;
    }
    for playlist in &playlists {
        db::put_playlist_tx(&mut tx, playlist).await?;
    }
    tx.commit().await?;

    info!(
        videos = videos.len(),
        playlists = playlists.len(),
        "backup imported"
    );
    Ok(())
}

fn video_entry(v: VideoRecord) -> VideoEntry {
    VideoEntry {
        thumbnail: v
            .thumbnail
            .as_ref()
            .map(|bytes| format!("data:{THUMBNAIL_MIME};base64,{}", BASE64.encode(bytes))),
        id: v.id,
        name: v.name,
        duration: v.duration,
        size: v.size,
        content_type: v.content_type,
        created_at: v.created_at,
        last_played: v.last_played,
        position_secs: v.position_secs,
        progress: v.progress,
        completed: v.completed,
        favorited: v.favorited,
        is_vaulted: v.is_vaulted,
    }
}

fn playlist_entry(p: Playlist) -> PlaylistEntry {
    PlaylistEntry {
        id: p.id,
        name: p.name,
        description: p.description,
        video_ids: p.video_ids,
        created_at: p.created_at,
    }
}

fn restore_video(entry: VideoEntry) -> Result<StoredVideo, StoreError> {
    let thumbnail = entry
        .thumbnail
        .as_deref()
        .map(decode_data_url)
        .transpose()?;
    Ok(StoredVideo {
        meta: VideoRecord {
            id: entry.id,
            name: entry.name,
            duration: entry.duration,
            size: entry.size,
            content_type: entry.content_type,
            created_at: entry.created_at,
            last_played: entry.last_played,
            position_secs: entry.position_secs,
            progress: entry.progress,
            completed: entry.completed,
            favorited: entry.favorited,
            is_vaulted: entry.is_vaulted,
            thumbnail,
        },
        // Raw media does not round-trip through a backup.
        payload: None,
    })
}

fn restore_playlist(entry: PlaylistEntry) -> Playlist {
    Playlist {
        id: entry.id,
        name: entry.name,
        description: entry.description,
        video_ids: entry.video_ids,
        created_at: entry.created_at,
    }
}

fn decode_data_url(url: &str) -> Result<Vec<u8>, StoreError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| StoreError::MalformedPayload("thumbnail is not a data URL".into()))?;
    let (_mime, b64) = rest
        .split_once(";base64,")
        .ok_or_else(|| StoreError::MalformedPayload("thumbnail data URL is not base64".into()))?;
    BASE64
        .decode(b64)
        .map_err(|e| StoreError::MalformedPayload(format!("thumbnail base64: {e}")))
}
