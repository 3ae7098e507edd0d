//! SQLite-backed persistent store.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool},
    Sqlite, Transaction,
};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::{FileHandle, Playlist, StoredVideo, VideoDetail, VideoRecord};

const VIDEO_META_COLUMNS: &str = "id, name, duration, size, content_type, created_at, \
     last_played, position_secs, progress, completed, favorited, is_vaulted, thumbnail";

const UPSERT_VIDEO: &str = "\
    INSERT INTO videos (id, name, duration, size, content_type, created_at, last_played, \
                        position_secs, progress, completed, favorited, is_vaulted, thumbnail, payload) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14) \
    ON CONFLICT(id) DO UPDATE SET \
        name = excluded.name, duration = excluded.duration, size = excluded.size, \
        content_type = excluded.content_type, created_at = excluded.created_at, \
        last_played = excluded.last_played, position_secs = excluded.position_secs, \
        progress = excluded.progress, completed = excluded.completed, \
        favorited = excluded.favorited, is_vaulted = excluded.is_vaulted, \
        thumbnail = excluded.thumbnail, payload = excluded.payload";

const UPSERT_PLAYLIST: &str = "\
    INSERT INTO playlists (id, name, description, video_ids, created_at) \
    VALUES (?1, ?2, ?3, ?4, ?5) \
    ON CONFLICT(id) DO UPDATE SET \
        name = excluded.name, description = excluded.description, \
        video_ids = excluded.video_ids, created_at = excluded.created_at";

const SELECT_PLAYLISTS: &str =
    "SELECT id, name, description, video_ids, created_at FROM playlists ORDER BY created_at DESC";

/// Handle on the library database; cheap to clone, the pool is shared.
///
/// Constructed once at process start and injected into collaborators;
/// `open`/`close` are the explicit lifecycle.
#[derive(Clone)]
pub struct Store {
    pub pool: SqlitePool,
}

impl Store {
    /// Open (or create) the SQLite database at `db_path` and run all
    /// pending migrations. Idempotent in effect: re-running migrations on
    /// an up-to-date database is a no-op, so opening an existing library
    /// only applies whatever schema steps it is missing.
    ///
    /// A host with no usable persistent storage surfaces here as
    /// [`StoreError::StorageUnavailable`]; every later operation would
    /// fail, so this is checked once at startup.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(opts)
            .await
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        info!(path = %db_path.display(), "library store opened");
        Ok(Self { pool })
    }

    /// Close the pool. Outstanding operations finish first.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ── Videos ───────────────────────────────────────────────────────────────

    /// Upsert by id: importing the same unmodified file again overwrites
    /// the existing record rather than adding a second one.
    pub async fn put_video(&self, video: &StoredVideo) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        put_video_tx(&mut tx, video).await?;
        tx.commit().await?;
        debug!(id = %video.meta.id, "video stored");
        Ok(())
    }

    /// All videos, payload stripped, newest first. `include_vaulted = false`
    /// is the library view; `true` includes the vault partition as well.
    pub async fn get_all_videos(&self, include_vaulted: bool) -> Result<Vec<VideoRecord>, StoreError> {
        let sql = if include_vaulted {
            format!("SELECT {VIDEO_META_COLUMNS} FROM videos ORDER BY created_at DESC")
        } else {
            format!(
                "SELECT {VIDEO_META_COLUMNS} FROM videos WHERE is_vaulted = 0 \
                 ORDER BY created_at DESC"
            )
        };
        let videos = sqlx::query_as::<_, VideoRecord>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(videos)
    }

    /// Fetch by id set, payload stripped, re-ordered to match the input
    /// sequence (playlist membership order IS the playback order). Ids with
    /// no matching record are silently dropped.
    pub async fn get_videos_by_ids(&self, ids: &[String]) -> Result<Vec<VideoRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = sqlx::QueryBuilder::<Sqlite>::new(format!(
            "SELECT {VIDEO_META_COLUMNS} FROM videos WHERE id IN ("
        ));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let rows: Vec<VideoRecord> = qb.build_query_as().fetch_all(&self.pool).await?;
        let by_id: HashMap<String, VideoRecord> =
            rows.into_iter().map(|v| (v.id.clone(), v)).collect();
        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    /// Full record including the raw payload and any file handle, fetched
    /// under one transaction. `None` when the id is unknown.
    pub async fn get_video(&self, id: &str) -> Result<Option<VideoDetail>, StoreError> {
        let sql = format!("SELECT {VIDEO_META_COLUMNS}, payload FROM videos WHERE id = ?1");
        let mut tx = self.pool.begin().await?;
        let video: Option<StoredVideo> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(video) = video else {
            tx.commit().await?;
            return Ok(None);
        };
        let handle: Option<FileHandle> =
            sqlx::query_as("SELECT id, path FROM file_handles WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        tx.commit().await?;
        Ok(Some(VideoDetail { video, handle }))
    }

    /// Record a playback position. Stamps `last_played`; `completed` is
    /// whatever the player decided (it knows about credits and loops).
    pub async fn update_progress(
        &self,
        id: &str,
        position_secs: f64,
        progress: f64,
        completed: bool,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE videos SET position_secs = ?2, progress = ?3, completed = ?4, \
             last_played = ?5 WHERE id = ?1",
        )
        .bind(id)
        .bind(position_secs)
        .bind(progress)
        .bind(completed)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        ensure_found(result.rows_affected(), id)
    }

    pub async fn set_thumbnail(&self, id: &str, thumbnail: &[u8]) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE videos SET thumbnail = ?2 WHERE id = ?1")
            .bind(id)
            .bind(thumbnail)
            .execute(&self.pool)
            .await?;
        ensure_found(result.rows_affected(), id)
    }

    pub async fn rename_video(&self, id: &str, name: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE videos SET name = ?2 WHERE id = ?1")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        ensure_found(result.rows_affected(), id)
    }

    /// Move a video between the library and vault views. Callers re-query
    /// with the matching `include_vaulted` to see it move.
    pub async fn set_vaulted(&self, id: &str, vaulted: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE videos SET is_vaulted = ?2 WHERE id = ?1")
            .bind(id)
            .bind(vaulted)
            .execute(&self.pool)
            .await?;
        ensure_found(result.rows_affected(), id)
    }

    pub async fn set_favorited(&self, id: &str, favorited: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE videos SET favorited = ?2 WHERE id = ?1")
            .bind(id)
            .bind(favorited)
            .execute(&self.pool)
            .await?;
        ensure_found(result.rows_affected(), id)
    }

    /// Remove the video and its file-handle record. The playlist-membership
    /// cascade lives in the access layer, which runs it together with this
    /// delete in one transaction.
    pub async fn delete_video(&self, id: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM videos WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM file_handles WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        debug!(%id, "video deleted");
        Ok(())
    }

    // ── Playlists ────────────────────────────────────────────────────────────

    pub async fn put_playlist(&self, playlist: &Playlist) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        put_playlist_tx(&mut tx, playlist).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_playlist(&self, id: &str) -> Result<Option<Playlist>, StoreError> {
        let row: Option<PlaylistRow> = sqlx::query_as(
            "SELECT id, name, description, video_ids, created_at FROM playlists WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(PlaylistRow::into_playlist).transpose()
    }

    /// All playlists, newest first.
    pub async fn get_all_playlists(&self) -> Result<Vec<Playlist>, StoreError> {
        let rows: Vec<PlaylistRow> = sqlx::query_as(SELECT_PLAYLISTS)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(PlaylistRow::into_playlist).collect()
    }

    pub async fn delete_playlist(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM playlists WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ── Reset ────────────────────────────────────────────────────────────────

    /// Wipe every collection. Factory reset.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM videos").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM file_handles")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM playlists")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!("storage reset: all collections cleared");
        Ok(())
    }
}

fn ensure_found(rows_affected: u64, id: &str) -> Result<(), StoreError> {
    if rows_affected == 0 {
        return Err(StoreError::NotFound(id.to_string()));
    }
    Ok(())
}

// ── Transaction helpers ──────────────────────────────────────────────────────
// Shared by the pool-level methods above and the access layer's multi-step
// transactions.

pub(crate) async fn put_video_tx(
    tx: &mut Transaction<'_, Sqlite>,
    video: &StoredVideo,
) -> Result<(), StoreError> {
    sqlx::query(UPSERT_VIDEO)
        .bind(&video.meta.id)
        .bind(&video.meta.name)
        .bind(video.meta.duration)
        .bind(video.meta.size)
        .bind(&video.meta.content_type)
        .bind(video.meta.created_at)
        .bind(video.meta.last_played)
        .bind(video.meta.position_secs)
        .bind(video.meta.progress)
        .bind(video.meta.completed)
        .bind(video.meta.favorited)
        .bind(video.meta.is_vaulted)
        .bind(&video.meta.thumbnail)
        .bind(&video.payload)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub(crate) async fn put_file_handle_tx(
    tx: &mut Transaction<'_, Sqlite>,
    handle: &FileHandle,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO file_handles (id, path) VALUES (?1, ?2) \
         ON CONFLICT(id) DO UPDATE SET path = excluded.path",
    )
    .bind(&handle.id)
    .bind(&handle.path)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub(crate) async fn put_playlist_tx(
    tx: &mut Transaction<'_, Sqlite>,
    playlist: &Playlist,
) -> Result<(), StoreError> {
    let video_ids = serde_json::to_string(&playlist.video_ids)?;
    sqlx::query(UPSERT_PLAYLIST)
        .bind(&playlist.id)
        .bind(&playlist.name)
        .bind(&playlist.description)
        .bind(video_ids)
        .bind(playlist.created_at)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub(crate) async fn all_playlists_tx(
    tx: &mut Transaction<'_, Sqlite>,
) -> Result<Vec<Playlist>, StoreError> {
    let rows: Vec<PlaylistRow> = sqlx::query_as(SELECT_PLAYLISTS)
        .fetch_all(&mut **tx)
        .await?;
    rows.into_iter().map(PlaylistRow::into_playlist).collect()
}

/// Raw playlist row; `video_ids` is a JSON array in one TEXT column.
#[derive(sqlx::FromRow)]
struct PlaylistRow {
    id: String,
    name: String,
    description: String,
    video_ids: String,
    created_at: chrono::DateTime<Utc>,
}

impl PlaylistRow {
    fn into_playlist(self) -> Result<Playlist, StoreError> {
        let video_ids = serde_json::from_str(&self.video_ids)?;
        Ok(Playlist {
            id: self.id,
            name: self.name,
            description: self.description,
            video_ids,
            created_at: self.created_at,
        })
    }
}
