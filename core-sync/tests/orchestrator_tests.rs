//! End-to-end sync passes against in-memory stores.

mod common;

use bridge_traits::RemoteStoreError;
use common::*;
use core_library::{FavoritePlaylist, LocalLibrary, SYSTEM_PLAYLIST_NAME};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, LibraryEvent, SyncEvent};
use core_sync::{
    ConflictResolution, SyncError, SyncFavoritePlaylist, SyncOrchestrator, SyncPlaylist,
    SyncRecentPlay, SyncReport, SyncSnapshot,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn remote_snapshot(playlists: &[core_library::LocalPlaylist]) -> SyncSnapshot {
    SyncSnapshot {
        device_id: "phone".to_string(),
        device_name: "Phone".to_string(),
        last_modified: 5,
        playlists: playlists.iter().map(SyncPlaylist::from).collect(),
        ..SyncSnapshot::default()
    }
}

fn json(snapshot: &SyncSnapshot) -> String {
    snapshot.to_json().unwrap()
}

fn favorite(id: i64, source: &str, name: &str, added_time: i64) -> FavoritePlaylist {
    FavoritePlaylist {
        id,
        source: source.to_string(),
        name: name.to_string(),
        cover_url: String::new(),
        track_count: 10,
        creator_name: "someone".to_string(),
        added_time,
    }
}

fn drain(receiver: &mut tokio::sync::broadcast::Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

// ============================================================================
// First sync
// ============================================================================

#[tokio::test]
async fn test_first_sync_uploads_local_snapshot() {
    let local = vec![
        playlist(1, SYSTEM_PLAYLIST_NAME, &[1, 2], 10),
        playlist(2, "Gym", &[3], 20),
    ];
    let harness = Harness::with_local(
        MemoryConfigStore::configured(),
        MemoryRemote::default(),
        local.clone(),
    );

    let report = harness.orchestrator.perform_sync().await.unwrap();

    match &report {
        SyncReport::InitialUpload {
            version_token,
            playlists,
        } => {
            assert_eq!(version_token, "sha-1");
            assert_eq!(*playlists, 2);
        }
        other => panic!("expected initial upload, got {:?}", other),
    }

    let state = harness.remote.state.lock().unwrap();
    assert_eq!(state.uploads.len(), 1);
    assert!(state.uploads[0].expected.is_none());
    let uploaded = SyncSnapshot::from_json(&state.uploads[0].content).unwrap();
    assert_eq!(uploaded.device_id, DEVICE_ID);
    assert_eq!(uploaded.last_modified, NOW);
    assert_eq!(uploaded.playlists, remote_snapshot(&local).playlists);
    drop(state);

    let config = harness.config.state.lock().unwrap();
    assert_eq!(config.last_token.as_deref(), Some("sha-1"));
    assert_eq!(config.last_sync_time, Some(NOW));
    assert_eq!(harness.local_writes(), 0);
}

#[tokio::test]
async fn test_empty_remote_document_is_overwritten_with_its_token() {
    let harness = Harness::with_local(
        MemoryConfigStore::configured(),
        MemoryRemote::with_document("  \n", "sha-empty"),
        vec![playlist(1, SYSTEM_PLAYLIST_NAME, &[], 1)],
    );

    let report = harness.orchestrator.perform_sync().await.unwrap();

    assert!(matches!(report, SyncReport::InitialUpload { .. }));
    let state = harness.remote.state.lock().unwrap();
    assert_eq!(state.uploads[0].expected.as_deref(), Some("sha-empty"));
}

// ============================================================================
// Merge passes
// ============================================================================

#[tokio::test]
async fn test_rename_conflict_newer_remote_wins() {
    let system = playlist(9, SYSTEM_PLAYLIST_NAME, &[], 1);
    let remote = remote_snapshot(&[system.clone(), playlist(1, "Focus", &[1], 200)]);
    let harness = Harness::with_local(
        MemoryConfigStore::configured().with_last_token("sha-old"),
        MemoryRemote::with_document(json(&remote), "sha-r"),
        vec![system, playlist(1, "Chill", &[1], 100)],
    );

    let report = harness.orchestrator.perform_sync().await.unwrap();

    let outcome = report.outcome().unwrap();
    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].resolution, ConflictResolution::RemoteWins);
    assert_eq!(outcome.conflicts[0].playlist_id, 1);
    assert!(report.uploaded());

    let local = harness.local_playlists();
    assert_eq!(local[1].name, "Focus");
    assert_eq!(local[1].modified_at, 200);

    let state = harness.remote.state.lock().unwrap();
    assert_eq!(state.uploads[0].expected.as_deref(), Some("sha-r"));
    let uploaded = SyncSnapshot::from_json(&state.uploads[0].content).unwrap();
    assert_eq!(uploaded.playlists[1].name, "Focus");
}

#[tokio::test]
async fn test_equivalent_remote_skips_upload_but_records_sync() {
    let local = vec![
        playlist(1, SYSTEM_PLAYLIST_NAME, &[4, 5], 10),
        playlist(2, "Gym", &[6], 10),
    ];
    let remote = remote_snapshot(&local);
    let harness = Harness::with_local(
        MemoryConfigStore::configured().with_last_token("sha-same"),
        MemoryRemote::with_document(json(&remote), "sha-same"),
        local,
    );

    let report = harness.orchestrator.perform_sync().await.unwrap();

    assert!(!report.uploaded());
    assert!(!report.outcome().unwrap().has_changes());
    assert_eq!(report.message(), "Everything is already up to date");
    assert_eq!(harness.remote.upload_count(), 0);
    assert_eq!(harness.local_writes(), 0);

    let config = harness.config.state.lock().unwrap();
    assert_eq!(config.commits, 1);
    assert_eq!(config.last_token.as_deref(), Some("sha-same"));
    assert_eq!(config.last_sync_time, Some(NOW));
}

#[tokio::test]
async fn test_unknown_remote_token_forces_upload_and_history_restore() {
    let local = vec![playlist(1, SYSTEM_PLAYLIST_NAME, &[4], 10)];
    let mut remote = remote_snapshot(&local);
    remote.recent_plays = vec![
        SyncRecentPlay::from(&played(8, 300)),
        SyncRecentPlay::from(&played(9, 200)),
    ];
    let harness = Harness::with_local(
        MemoryConfigStore::configured(),
        MemoryRemote::with_document(json(&remote), "sha-new"),
        local,
    );
    harness.history.items.lock().unwrap().push(played(1, 100));

    let report = harness.orchestrator.perform_sync().await.unwrap();

    assert!(report.uploaded());
    let history = harness.history.items.lock().unwrap().clone();
    let identities: Vec<(i64, i64)> = history.iter().map(|e| e.identity()).collect();
    assert_eq!(identities, vec![(8, 300), (9, 200), (1, 100)]);
}

#[tokio::test]
async fn test_unchanged_remote_leaves_history_alone() {
    let local = vec![playlist(1, SYSTEM_PLAYLIST_NAME, &[4], 10)];
    let mut remote = remote_snapshot(&local);
    remote.recent_plays = vec![SyncRecentPlay::from(&played(8, 300))];
    let harness = Harness::with_local(
        MemoryConfigStore::configured().with_last_token("sha-r"),
        MemoryRemote::with_document(json(&remote), "sha-r"),
        local,
    );
    harness.history.items.lock().unwrap().push(played(1, 100));

    harness.orchestrator.perform_sync().await.unwrap();

    assert_eq!(harness.history.writes.load(Ordering::SeqCst), 0);

    // The merged snapshot still carries both entries remotely.
    let uploaded = SyncSnapshot::from_json(&harness.remote.current_content().unwrap()).unwrap();
    assert_eq!(uploaded.recent_plays.len(), 2);
}

#[tokio::test]
async fn test_pending_deletion_removes_playlist_remotely() {
    let system = playlist(1, SYSTEM_PLAYLIST_NAME, &[], 1);
    let remote = remote_snapshot(&[system.clone(), playlist(7, "Old", &[1], 5)]);
    let harness = Harness::with_local(
        MemoryConfigStore::configured().with_last_token("sha-r"),
        MemoryRemote::with_document(json(&remote), "sha-r"),
        vec![system],
    );
    harness.pending.ids.lock().unwrap().insert(7);

    let report = harness.orchestrator.perform_sync().await.unwrap();

    assert_eq!(report.outcome().unwrap().playlists_deleted, 1);
    let uploaded = SyncSnapshot::from_json(&harness.remote.current_content().unwrap()).unwrap();
    assert!(uploaded.playlists.iter().all(|p| p.id != 7));
    assert!(harness.pending.ids.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_playlist_deleted_during_sync_stays_deleted() {
    let local = vec![
        playlist(1, SYSTEM_PLAYLIST_NAME, &[], 1),
        playlist(5, "Gym", &[2], 5),
    ];
    let remote = MemoryRemote::with_document(json(&remote_snapshot(&local)), "sha-r");
    remote.gated.store(true, Ordering::SeqCst);
    let harness = Harness::with_local(
        MemoryConfigStore::configured().with_last_token("sha-r"),
        remote,
        local,
    );

    let orchestrator = Arc::clone(&harness.orchestrator);
    let sync = tokio::spawn(async move { orchestrator.perform_sync().await });

    harness.remote.entered.notified().await;
    assert!(harness.library.delete_playlist(5).await.unwrap());
    harness.remote.release.notify_one();
    sync.await.unwrap().unwrap();

    let names: Vec<String> = harness.local_playlists().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec![SYSTEM_PLAYLIST_NAME.to_string()]);
    assert!(harness.pending.ids.lock().unwrap().contains(&5));

    // The next pass carries the tombstone and only then forgets the id.
    harness.remote.gated.store(false, Ordering::SeqCst);
    let report = harness.orchestrator.perform_sync().await.unwrap();

    assert!(report.uploaded());
    let uploaded = SyncSnapshot::from_json(&harness.remote.current_content().unwrap()).unwrap();
    assert!(uploaded.playlists.iter().all(|p| p.id != 5));
    assert!(harness.pending.ids.lock().unwrap().is_empty());
    assert!(harness.local_playlists().iter().all(|p| p.id != 5));
}

#[tokio::test]
async fn test_nameless_remote_playlist_does_not_block_sync() {
    let dir = tempfile::tempdir().unwrap();
    let library = LocalLibrary::open(dir.path());
    library.ensure_system_playlist(1).await.unwrap();
    let document = r#"{"deviceId":"phone","deviceName":"Phone","lastModified":5,
        "playlists":[{"id":7,"songs":[{"id":3}],"createdAt":1,"modifiedAt":2}]}"#;
    let remote = Arc::new(MemoryRemote::with_document(document, "sha-r"));
    let orchestrator = SyncOrchestrator::new(
        Arc::new(MemoryConfigStore::configured()),
        remote.clone(),
        library.clone(),
        EventBus::new(16),
        "Test laptop",
    )
    .with_clock(Arc::new(FixedClock(NOW)));

    let first = orchestrator.perform_sync().await.unwrap();
    assert!(first.uploaded());

    let stored = library.playlists.read_all().await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].name, SYSTEM_PLAYLIST_NAME);
    assert_eq!(stored[1].id, 7);
    assert_eq!(stored[1].name, "Playlist 7");
    assert_eq!(stored[1].songs[0].id, 3);

    // The following pass repairs the remote copy with the local name.
    let second = orchestrator.perform_sync().await.unwrap();
    assert!(second.uploaded());
    let uploaded = SyncSnapshot::from_json(&remote.current_content().unwrap()).unwrap();
    let repaired = uploaded.playlists.iter().find(|p| p.id == 7).unwrap();
    assert_eq!(repaired.name, "Playlist 7");
    assert_eq!(remote.upload_count(), 2);
}

#[tokio::test]
async fn test_remote_favorites_upsert_only_new_or_newer() {
    let local = vec![playlist(1, SYSTEM_PLAYLIST_NAME, &[], 1)];
    let mut remote = remote_snapshot(&local);
    remote.favorite_playlists = vec![
        SyncFavoritePlaylist::from(&favorite(1, "netease", "Renamed", 200)),
        SyncFavoritePlaylist::from(&favorite(2, "bilibili", "New", 50)),
        SyncFavoritePlaylist::from(&favorite(3, "netease", "Stale", 300)),
    ];
    let harness = Harness::with_local(
        MemoryConfigStore::configured().with_last_token("sha-r"),
        MemoryRemote::with_document(json(&remote), "sha-r"),
        local,
    );
    *harness.favorites.items.lock().unwrap() = vec![
        favorite(1, "netease", "Original", 100),
        favorite(3, "netease", "Kept", 500),
    ];
    let mut events = harness.events.subscribe();

    harness.orchestrator.perform_sync().await.unwrap();

    let favorites = harness.favorites.items.lock().unwrap().clone();
    let summary: Vec<(i64, &str, i64)> = favorites
        .iter()
        .map(|f| (f.id, f.name.as_str(), f.added_time))
        .collect();
    assert_eq!(
        summary,
        vec![(1, "Renamed", 200), (3, "Kept", 500), (2, "New", 50)]
    );
    assert_eq!(harness.favorites.writes.load(Ordering::SeqCst), 2);
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        CoreEvent::Library(LibraryEvent::FavoritesUpserted { count: 2 })
    )));
}

#[tokio::test]
async fn test_empty_local_history_is_restored_from_unchanged_remote() {
    let local = vec![playlist(1, SYSTEM_PLAYLIST_NAME, &[4], 10)];
    let mut remote = remote_snapshot(&local);
    remote.recent_plays = vec![
        SyncRecentPlay::from(&played(8, 300)),
        SyncRecentPlay::from(&played(9, 200)),
    ];
    let harness = Harness::with_local(
        MemoryConfigStore::configured().with_last_token("sha-r"),
        MemoryRemote::with_document(json(&remote), "sha-r"),
        local,
    );

    harness.orchestrator.perform_sync().await.unwrap();

    let history = harness.history.items.lock().unwrap().clone();
    let identities: Vec<(i64, i64)> = history.iter().map(|e| e.identity()).collect();
    assert_eq!(identities, vec![(8, 300), (9, 200)]);
    assert_eq!(harness.history.writes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_upload_appends_change_log_entry() {
    let remote = remote_snapshot(&[playlist(1, SYSTEM_PLAYLIST_NAME, &[], 1)]);
    let harness = Harness::with_local(
        MemoryConfigStore::configured().with_last_token("sha-r"),
        MemoryRemote::with_document(json(&remote), "sha-r"),
        vec![
            playlist(1, SYSTEM_PLAYLIST_NAME, &[], 1),
            playlist(2, "New here", &[3], 50),
        ],
    );

    harness.orchestrator.perform_sync().await.unwrap();

    let uploaded = SyncSnapshot::from_json(&harness.remote.current_content().unwrap()).unwrap();
    let entry = &uploaded.change_log[0];
    assert_eq!(entry.timestamp, NOW);
    assert_eq!(entry.fields["action"], "sync");
    assert_eq!(entry.fields["deviceId"], DEVICE_ID);
    assert_eq!(entry.fields["summary"], "1 playlist added");
}

#[tokio::test]
async fn test_missing_system_playlist_is_recreated_first() {
    let remote = remote_snapshot(&[playlist(3, "Gym", &[1], 5)]);
    let harness = Harness::with_local(
        MemoryConfigStore::configured().with_last_token("sha-r"),
        MemoryRemote::with_document(json(&remote), "sha-r"),
        Vec::new(),
    );

    harness.orchestrator.perform_sync().await.unwrap();

    let local = harness.local_playlists();
    assert_eq!(local[0].name, SYSTEM_PLAYLIST_NAME);
    assert_eq!(local[1].name, "Gym");
    assert_eq!(local[0].id, 4);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_credential_expiry_clears_credential_once() {
    let remote = MemoryRemote::default();
    remote.state.lock().unwrap().fail_fetch =
        Some(RemoteStoreError::CredentialExpired("401 Bad credentials".into()));
    let harness = Harness::with_local(
        MemoryConfigStore::configured(),
        remote,
        vec![playlist(1, SYSTEM_PLAYLIST_NAME, &[], 1)],
    );
    let mut events = harness.events.subscribe();

    let result = harness.orchestrator.perform_sync().await;

    assert!(matches!(result, Err(SyncError::CredentialExpired(_))));
    {
        let config = harness.config.state.lock().unwrap();
        assert_eq!(config.clear_calls, 1);
        assert!(config.credential.is_none());
        assert!(config.last_token.is_none());
    }
    assert_eq!(harness.local_writes(), 0);
    assert_eq!(harness.remote.upload_count(), 0);

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::Auth(AuthEvent::CredentialCleared { reason }) if reason == "expired"
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::Sync(SyncEvent::Failed { kind, recoverable: false, .. }) if kind == "credential_expired"
    )));

    // Next attempt fails fast without touching the remote.
    let again = harness.orchestrator.perform_sync().await;
    assert!(matches!(again, Err(SyncError::NotConfigured(_))));
    assert_eq!(harness.remote.state.lock().unwrap().fetch_calls, 1);
    assert_eq!(harness.config.state.lock().unwrap().clear_calls, 1);
}

#[tokio::test]
async fn test_credential_expiry_during_upload_clears_credential() {
    let remote = MemoryRemote::default();
    remote.state.lock().unwrap().fail_upload =
        Some(RemoteStoreError::CredentialExpired("401".into()));
    let harness = Harness::new(MemoryConfigStore::configured(), remote);

    let result = harness.orchestrator.perform_sync().await;

    assert!(matches!(result, Err(SyncError::CredentialExpired(_))));
    assert_eq!(harness.config.state.lock().unwrap().clear_calls, 1);
}

#[tokio::test]
async fn test_unconfigured_sync_does_nothing() {
    let harness = Harness::new(MemoryConfigStore::default(), MemoryRemote::default());

    let result = harness.orchestrator.perform_sync().await;

    match result {
        Err(error @ SyncError::NotConfigured(_)) => assert!(!error.is_recoverable()),
        other => panic!("expected NotConfigured, got {:?}", other),
    }
    assert_eq!(harness.remote.state.lock().unwrap().fetch_calls, 0);
}

#[tokio::test]
async fn test_corrupt_remote_never_touches_local_data() {
    let harness = Harness::with_local(
        MemoryConfigStore::configured().with_last_token("sha-old"),
        MemoryRemote::with_document("{\"playlists\": [oops", "sha-bad"),
        vec![playlist(1, SYSTEM_PLAYLIST_NAME, &[1], 1)],
    );

    let result = harness.orchestrator.perform_sync().await;

    match result {
        Err(error @ SyncError::RemoteContentCorrupt { .. }) => assert!(error.is_recoverable()),
        other => panic!("expected RemoteContentCorrupt, got {:?}", other),
    }
    assert_eq!(harness.local_writes(), 0);
    assert_eq!(harness.remote.upload_count(), 0);
    let config = harness.config.state.lock().unwrap();
    assert_eq!(config.commits, 0);
    assert_eq!(config.last_token.as_deref(), Some("sha-old"));
}

#[tokio::test]
async fn test_transport_error_is_recoverable_and_mutates_nothing() {
    let remote = MemoryRemote::default();
    remote.state.lock().unwrap().fail_fetch = Some(RemoteStoreError::Transport("timeout".into()));
    let harness = Harness::new(MemoryConfigStore::configured(), remote);

    let result = harness.orchestrator.perform_sync().await;

    assert!(matches!(result, Err(SyncError::RemoteUnreachable(_))));
    let config = harness.config.state.lock().unwrap();
    assert_eq!(config.clear_calls, 0);
    assert!(config.credential.is_some());
    assert_eq!(harness.local_writes(), 0);
}

#[tokio::test]
async fn test_version_conflict_keeps_local_changes_but_not_token() {
    let remote_doc = remote_snapshot(&[
        playlist(1, SYSTEM_PLAYLIST_NAME, &[], 1),
        playlist(2, "From phone", &[5], 5),
    ]);
    let remote = MemoryRemote::with_document(json(&remote_doc), "sha-r");
    remote.state.lock().unwrap().fail_upload = Some(RemoteStoreError::VersionConflict {
        expected: Some("sha-r".into()),
    });
    let harness = Harness::with_local(
        MemoryConfigStore::configured().with_last_token("sha-previous"),
        remote,
        vec![playlist(1, SYSTEM_PLAYLIST_NAME, &[], 1)],
    );
    harness.pending.ids.lock().unwrap().insert(42);

    let result = harness.orchestrator.perform_sync().await;

    assert!(matches!(result, Err(SyncError::VersionConflict)));
    assert!(harness
        .local_playlists()
        .iter()
        .any(|p| p.name == "From phone"));
    let config = harness.config.state.lock().unwrap();
    assert_eq!(config.last_token.as_deref(), Some("sha-previous"));
    assert_eq!(config.commits, 0);
    assert!(harness.pending.ids.lock().unwrap().contains(&42));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_sync_is_skipped() {
    let remote = MemoryRemote::default();
    remote.gated.store(true, Ordering::SeqCst);
    let harness = Harness::new(MemoryConfigStore::configured(), remote);
    let mut events = harness.events.subscribe();

    let orchestrator = Arc::clone(&harness.orchestrator);
    let first = tokio::spawn(async move { orchestrator.perform_sync().await });

    harness.remote.entered.notified().await;
    assert!(harness.orchestrator.is_syncing());

    let second = harness.orchestrator.perform_sync().await.unwrap();
    assert_eq!(second, SyncReport::AlreadyInProgress);
    assert_eq!(second.message(), "A sync is already in progress");

    harness.remote.release.notify_one();
    let first = first.await.unwrap().unwrap();
    assert!(matches!(first, SyncReport::InitialUpload { .. }));
    assert!(!harness.orchestrator.is_syncing());
    assert_eq!(harness.remote.state.lock().unwrap().fetch_calls, 1);

    let events = drain(&mut events);
    assert!(events
        .iter()
        .any(|e| matches!(e, CoreEvent::Sync(SyncEvent::Skipped { .. }))));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, CoreEvent::Sync(SyncEvent::Completed { .. })))
            .count(),
        1
    );
}
