//! Access-layer behavior against a real on-disk store.

use async_trait::async_trait;
use tempfile::TempDir;

use pv_store::{ImportFile, Library, MediaInfo, MediaProbe, ProbeError, Store, StoreError};

struct StubProbe;

#[async_trait]
impl MediaProbe for StubProbe {
    async fn probe(&self, bytes: &[u8], _content_type: &str) -> Result<MediaInfo, ProbeError> {
        if bytes.starts_with(b"not-media") {
            return Err(ProbeError("no decodable video stream".into()));
        }
        Ok(MediaInfo {
            duration_secs: 42.0,
            thumbnail: Some(vec![0xFF, 0xD8, 0xFF, 0xE0]),
        })
    }
}

async fn open_library() -> (TempDir, Library<StubProbe>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&dir.path().join("library.db")).await.unwrap();
    (dir, Library::new(store, StubProbe))
}

fn file(name: &str, mtime: i64, bytes: &[u8]) -> ImportFile {
    ImportFile {
        name: name.to_string(),
        last_modified_ms: mtime,
        content_type: "video/mp4".to_string(),
        bytes: bytes.to_vec(),
        source_path: None,
    }
}

#[tokio::test]
async fn reimporting_an_unmodified_file_is_idempotent() {
    let (_dir, library) = open_library().await;
    library.import_video(file("trip.mp4", 1000, b"aaaa")).await.unwrap();
    library.import_video(file("trip.mp4", 1000, b"aaaa")).await.unwrap();

    let all = library.store().get_all_videos(true).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, "trip.mp4-1000");

    // A modified mtime is a different file as far as the library knows.
    library.import_video(file("trip.mp4", 2000, b"aaaa")).await.unwrap();
    assert_eq!(library.store().get_all_videos(true).await.unwrap().len(), 2);
}

#[tokio::test]
async fn bulk_reads_strip_the_payload_but_playback_fetch_keeps_it() {
    let (_dir, library) = open_library().await;
    library.import_video(file("clip.mp4", 1, b"payload-bytes")).await.unwrap();

    let all = library.store().get_all_videos(true).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].thumbnail.is_some());

    let detail = library.video_for_playback("clip.mp4-1").await.unwrap().unwrap();
    assert_eq!(detail.video.payload.as_deref(), Some(&b"payload-bytes"[..]));
}

#[tokio::test]
async fn vault_flag_partitions_the_listing() {
    let (_dir, library) = open_library().await;
    library.import_video(file("public.mp4", 1, b"aa")).await.unwrap();
    library.import_video(file("private.mp4", 2, b"bb")).await.unwrap();
    library.toggle_vault("private.mp4-2", true).await.unwrap();

    let library_view = library.store().get_all_videos(false).await.unwrap();
    assert!(library_view.iter().all(|v| !v.is_vaulted));
    assert_eq!(library_view.len(), 1);
    assert_eq!(library_view[0].id, "public.mp4-1");

    let full_view = library.store().get_all_videos(true).await.unwrap();
    assert_eq!(full_view.len(), 2);

    // And back out of the vault.
    library.toggle_vault("private.mp4-2", false).await.unwrap();
    assert_eq!(library.store().get_all_videos(false).await.unwrap().len(), 2);
}

#[tokio::test]
async fn get_videos_by_ids_preserves_the_requested_order() {
    let (_dir, library) = open_library().await;
    for (name, mtime) in [("a.mp4", 1), ("b.mp4", 2), ("c.mp4", 3)] {
        library.import_video(file(name, mtime, b"xx")).await.unwrap();
    }

    let ids = vec![
        "c.mp4-3".to_string(),
        "a.mp4-1".to_string(),
        "b.mp4-2".to_string(),
    ];
    let videos = library.store().get_videos_by_ids(&ids).await.unwrap();
    let got: Vec<&str> = videos.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(got, ["c.mp4-3", "a.mp4-1", "b.mp4-2"]);

    // Unknown ids are dropped, not errors.
    let ids = vec!["ghost".to_string(), "b.mp4-2".to_string()];
    let videos = library.store().get_videos_by_ids(&ids).await.unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].id, "b.mp4-2");
}

#[tokio::test]
async fn deleting_a_video_cascades_through_playlists_and_handles() {
    let (dir, library) = open_library().await;
    let mut with_handle = file("keep.mp4", 1, b"aa");
    with_handle.source_path = Some(dir.path().join("keep.mp4"));
    library.import_video(with_handle).await.unwrap();
    library.import_video(file("gone.mp4", 2, b"bb")).await.unwrap();

    let playlist = library.create_playlist("Trip", "summer").await.unwrap();
    library.add_video_to_playlist(&playlist.id, "keep.mp4-1").await.unwrap();
    library.add_video_to_playlist(&playlist.id, "gone.mp4-2").await.unwrap();

    library.delete_video("gone.mp4-2").await.unwrap();

    let after = library.store().get_playlist(&playlist.id).await.unwrap().unwrap();
    assert_eq!(after.video_ids, ["keep.mp4-1"]);
    assert!(library.video_for_playback("gone.mp4-2").await.unwrap().is_none());

    // Resolving membership never errors on what is gone.
    let resolved = library.playlist_videos(&playlist.id).await.unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].id, "keep.mp4-1");
}

#[tokio::test]
async fn dangling_playlist_ids_are_filtered_at_read_time() {
    let (_dir, library) = open_library().await;
    library.import_video(file("real.mp4", 1, b"aa")).await.unwrap();

    let playlist = library.create_playlist("Mixed", "").await.unwrap();
    library.add_video_to_playlist(&playlist.id, "real.mp4-1").await.unwrap();
    // Membership is not a hard foreign key; a dangling id is tolerated.
    library
        .reorder_playlist(&playlist.id, vec!["ghost".to_string(), "real.mp4-1".to_string()])
        .await
        .unwrap();

    let resolved = library.playlist_videos(&playlist.id).await.unwrap();
    let got: Vec<&str> = resolved.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(got, ["real.mp4-1"]);
}

#[tokio::test]
async fn playlist_membership_add_reorder_scenario() {
    let (_dir, library) = open_library().await;
    library.import_video(file("v1.mp4", 1, b"aa")).await.unwrap();
    library.import_video(file("v2.mp4", 2, b"bb")).await.unwrap();

    let playlist = library.create_playlist("Trip", "").await.unwrap();
    assert!(playlist.video_ids.is_empty());

    library.add_video_to_playlist(&playlist.id, "v1.mp4-1").await.unwrap();
    library.add_video_to_playlist(&playlist.id, "v2.mp4-2").await.unwrap();
    // Adding an existing member is a no-op.
    library.add_video_to_playlist(&playlist.id, "v1.mp4-1").await.unwrap();

    let got = library.store().get_playlist(&playlist.id).await.unwrap().unwrap();
    assert_eq!(got.video_ids, ["v1.mp4-1", "v2.mp4-2"]);

    library
        .reorder_playlist(&playlist.id, vec!["v2.mp4-2".to_string(), "v1.mp4-1".to_string()])
        .await
        .unwrap();
    let got = library.store().get_playlist(&playlist.id).await.unwrap().unwrap();
    assert_eq!(got.video_ids, ["v2.mp4-2", "v1.mp4-1"]);

    // Removing something absent is a no-op, not an error.
    library.remove_video_from_playlist(&playlist.id, "ghost").await.unwrap();
    let got = library.store().get_playlist(&playlist.id).await.unwrap().unwrap();
    assert_eq!(got.video_ids, ["v2.mp4-2", "v1.mp4-1"]);
}

#[tokio::test]
async fn undecodable_files_fail_alone_and_the_batch_continues() {
    let (_dir, library) = open_library().await;
    let results = library
        .import_batch(vec![
            file("ok.mp4", 1, b"fine"),
            file("broken.bin", 2, b"not-media at all"),
            file("also-ok.mp4", 3, b"fine too"),
        ])
        .await;

    assert_eq!(results.len(), 3);
    assert!(results[0].1.is_ok());
    assert!(matches!(
        results[1].1,
        Err(StoreError::MediaDecodeFailure(_))
    ));
    assert!(results[2].1.is_ok());

    assert_eq!(library.store().get_all_videos(true).await.unwrap().len(), 2);
}

#[tokio::test]
async fn field_updates_on_a_missing_id_report_not_found() {
    let (_dir, library) = open_library().await;
    assert!(matches!(
        library.rename("ghost", "anything").await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        library.update_progress("ghost", 1.0, 10.0, false).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn renaming_and_replacing_the_thumbnail_touch_only_those_fields() {
    let (_dir, library) = open_library().await;
    library.import_video(file("clip.mp4", 1, b"aa")).await.unwrap();

    library.rename("clip.mp4-1", "holiday.mp4").await.unwrap();
    library.replace_thumbnail("clip.mp4-1", &[9, 9, 9]).await.unwrap();

    let all = library.store().get_all_videos(true).await.unwrap();
    assert_eq!(all[0].name, "holiday.mp4");
    assert_eq!(all[0].thumbnail.as_deref(), Some(&[9u8, 9, 9][..]));
    // The id is fixed at import; renaming the display name does not move it.
    assert_eq!(all[0].id, "clip.mp4-1");
}

#[tokio::test]
async fn clear_wipes_every_collection() {
    let (_dir, library) = open_library().await;
    library.import_video(file("clip.mp4", 1, b"aa")).await.unwrap();
    let playlist = library.create_playlist("Trip", "").await.unwrap();
    library.add_video_to_playlist(&playlist.id, "clip.mp4-1").await.unwrap();

    library.store().clear().await.unwrap();

    assert!(library.store().get_all_videos(true).await.unwrap().is_empty());
    assert!(library.store().get_all_playlists().await.unwrap().is_empty());
    assert!(library.video_for_playback("clip.mp4-1").await.unwrap().is_none());
}

#[tokio::test]
async fn progress_updates_stamp_last_played() {
    let (_dir, library) = open_library().await;
    library.import_video(file("clip.mp4", 1, b"aa")).await.unwrap();

    library.update_progress("clip.mp4-1", 30.5, 50.0, false).await.unwrap();
    let all = library.store().get_all_videos(true).await.unwrap();
    assert_eq!(all[0].position_secs, Some(30.5));
    assert_eq!(all[0].progress, Some(50.0));
    assert!(all[0].last_played.is_some());
    assert!(!all[0].completed);

    library.update_progress("clip.mp4-1", 42.0, 100.0, true).await.unwrap();
    let all = library.store().get_all_videos(true).await.unwrap();
    assert!(all[0].completed);
}
