//! Library access layer: the cross-entity rules the store does not enforce.
//!
//! The store is injected, not ambient; construct one `Library` at process
//! start and hand it to whatever drives it.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::{self, Store};
use crate::error::StoreError;
use crate::models::{FileHandle, Playlist, StoredVideo, VideoDetail, VideoRecord};

/// Media inspection result from the probe collaborator.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub duration_secs: f64,
    /// JPEG frame sampled from the video, when one could be captured.
    pub thumbnail: Option<Vec<u8>>,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProbeError(pub String);

/// Duration probing + thumbnail capture. Decoding lives outside this
/// crate; implementations wrap whatever media pipeline the host has.
/// Probing a file that is not decodable media is expected to fail.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, bytes: &[u8], content_type: &str) -> Result<MediaInfo, ProbeError>;
}

/// One file picked for import.
#[derive(Debug, Clone)]
pub struct ImportFile {
    pub name: String,
    /// Source file mtime in epoch milliseconds. Part of the record id, so
    /// re-importing an unmodified file overwrites instead of duplicating.
    pub last_modified_ms: i64,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Present only when the picker granted a persistent handle.
    pub source_path: Option<PathBuf>,
}

/// Query and mutation surface over an injected [`Store`].
pub struct Library<P> {
    store: Store,
    probe: P,
}

impl<P: MediaProbe> Library<P> {
    pub fn new(store: Store, probe: P) -> Self {
        Self { store, probe }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Deterministic record id for an imported file.
    pub fn video_id(name: &str, last_modified_ms: i64) -> String {
        format!("{name}-{last_modified_ms}")
    }

    /// Probe the file and write the video record plus the optional file
    /// handle as one transaction. Undecodable media surfaces as
    /// [`StoreError::MediaDecodeFailure`] and writes nothing.
    pub async fn import_video(&self, file: ImportFile) -> Result<VideoRecord, StoreError> {
        let ImportFile {
            name,
            last_modified_ms,
            content_type,
            bytes,
            source_path,
        } = file;

        let info = self
            .probe
            .probe(&bytes, &content_type)
            .await
            .map_err(|e| StoreError::MediaDecodeFailure(e.to_string()))?;

        let id = Self::video_id(&name, last_modified_ms);
        let video = StoredVideo {
            meta: VideoRecord {
                id: id.clone(),
                name,
                duration: info.duration_secs,
                size: bytes.len() as i64,
                content_type,
                created_at: Utc::now(),
                last_played: None,
                position_secs: None,
                progress: None,
                completed: false,
                favorited: false,
                is_vaulted: false,
                thumbnail: info.thumbnail,
            },
            payload: Some(bytes),
        };

        let mut tx = self.store.pool.begin().await?;
        db::put_video_tx(&mut tx, &video).await?;
        if let Some(path) = source_path {
            let handle = FileHandle {
                id: id.clone(),
                path: path.display().to_string(),
            };
            db::put_file_handle_tx(&mut tx, &handle).await?;
        }
        tx.commit().await?;
        debug!(%id, "video imported");
        Ok(video.meta)
    }

    /// Import a batch sequentially. A file that fails to decode is
    /// reported in the result list and does not abort the rest.
    pub async fn import_batch(
        &self,
        files: Vec<ImportFile>,
    ) -> Vec<(String, Result<VideoRecord, StoreError>)> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let name = file.name.clone();
            let result = self.import_video(file).await;
            if let Err(err) = &result {
                warn!(file = %name, %err, "import failed; continuing batch");
            }
            results.push((name, result));
        }
        results
    }

    /// Delete a video, its file handle, and every playlist membership
    /// entry referencing it, in one transaction: either the whole cascade
    /// lands or none of it does.
    pub async fn delete_video(&self, id: &str) -> Result<(), StoreError> {
        let mut tx = self.store.pool.begin().await?;
        let playlists = db::all_playlists_tx(&mut tx).await?;
        for mut playlist in playlists {
            if playlist.video_ids.iter().any(|v| v == id) {
                playlist.video_ids.retain(|v| v != id);
                db::put_playlist_tx(&mut tx, &playlist).await?;
            }
        }
        sqlx::query("DELETE FROM videos WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM file_handles WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        debug!(%id, "video deleted with playlist cascade");
        Ok(())
    }

    // ── Playlists ────────────────────────────────────────────────────────────

    pub async fn create_playlist(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Playlist, StoreError> {
        let now = Utc::now();
        let playlist = Playlist {
            id: format!("playlist-{}", now.timestamp_millis()),
            name: name.to_string(),
            description: description.to_string(),
            video_ids: Vec::new(),
            created_at: now,
        };
        self.store.put_playlist(&playlist).await?;
        Ok(playlist)
    }

    /// Append a video id; already-present ids are left alone (no
    /// duplicate membership entries). A missing playlist is nothing to do.
    pub async fn add_video_to_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), StoreError> {
        let Some(mut playlist) = self.store.get_playlist(playlist_id).await? else {
            return Ok(());
        };
        if !playlist.video_ids.iter().any(|v| v == video_id) {
            playlist.video_ids.push(video_id.to_string());
            self.store.put_playlist(&playlist).await?;
        }
        Ok(())
    }

    /// Remove a video id; a no-op when it is not present.
    pub async fn remove_video_from_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), StoreError> {
        let Some(mut playlist) = self.store.get_playlist(playlist_id).await? else {
            return Ok(());
        };
        playlist.video_ids.retain(|v| v != video_id);
        self.store.put_playlist(&playlist).await?;
        Ok(())
    }

    /// Replace the membership sequence wholesale. Deliberately permissive:
    /// the new sequence is not checked against the old one, and dangling
    /// ids degrade gracefully at read time.
    pub async fn reorder_playlist(
        &self,
        playlist_id: &str,
        video_ids: Vec<String>,
    ) -> Result<(), StoreError> {
        let Some(mut playlist) = self.store.get_playlist(playlist_id).await? else {
            return Ok(());
        };
        playlist.video_ids = video_ids;
        self.store.put_playlist(&playlist).await?;
        Ok(())
    }

    /// Resolve a playlist's membership to records, in playback order.
    /// Dangling ids are silently omitted.
    pub async fn playlist_videos(&self, playlist_id: &str) -> Result<Vec<VideoRecord>, StoreError> {
        let playlist = self
            .store
            .get_playlist(playlist_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(playlist_id.to_string()))?;
        self.store.get_videos_by_ids(&playlist.video_ids).await
    }

    // ── Video field updates ──────────────────────────────────────────────────

    /// Move a video between the library and vault views.
    pub async fn toggle_vault(&self, id: &str, vaulted: bool) -> Result<(), StoreError> {
        self.store.set_vaulted(id, vaulted).await
    }

    pub async fn rename(&self, id: &str, name: &str) -> Result<(), StoreError> {
        self.store.rename_video(id, name).await
    }

    /// Swap in a new thumbnail, e.g. one captured at the current playback
    /// position.
    pub async fn replace_thumbnail(&self, id: &str, thumbnail: &[u8]) -> Result<(), StoreError> {
        self.store.set_thumbnail(id, thumbnail).await
    }

    pub async fn set_favorited(&self, id: &str, favorited: bool) -> Result<(), StoreError> {
        self.store.set_favorited(id, favorited).await
    }

    pub async fn update_progress(
        &self,
        id: &str,
        position_secs: f64,
        progress: f64,
        completed: bool,
    ) -> Result<(), StoreError> {
        self.store
            .update_progress(id, position_secs, progress, completed)
            .await
    }

    /// Full record for playback, payload and handle included.
    pub async fn video_for_playback(&self, id: &str) -> Result<Option<VideoDetail>, StoreError> {
        self.store.get_video(id).await
    }
}
