// SPDX-License-Identifier: MIT

//! Reconciliation sweeps end to end against the in-memory store and the
//! Spotify mock.

mod common;

use common::{link, record_store, seed_user, MockSpotify};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tunemash::db::{KeyValueStore, MemoryStore, PlaylistRecordStore};
use tunemash::error::AppError;
use tunemash::services::batch::CheckOptions;
use tunemash::services::spotify::PlaylistSummary;
use tunemash::services::{
    CanonicalPlaylistResolver, PlaylistGenerator, ReconciliationEngine, TokenCache,
};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn engine(spotify: Arc<MockSpotify>, records: PlaylistRecordStore) -> ReconciliationEngine {
    let tokens = TokenCache::new(spotify.clone(), records.clone());
    let generator = PlaylistGenerator::new(spotify.clone());
    let resolver = CanonicalPlaylistResolver::new(spotify.clone());
    ReconciliationEngine::new(spotify, records, tokens, generator, resolver)
}

async fn backdate(store: &MemoryStore, user_id: &str, playlist_id: &str, updated: i64) {
    store
        .update_field(
            "users",
            user_id,
            &["playlists", playlist_id],
            json!({ "updated": updated }),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn refresh_sweep_regenerates_due_records_only() {
    let (store, records) = record_store();
    seed_user(&records, "u1").await;
    let spotify = Arc::new(MockSpotify::new());
    spotify.add_source("src-a", "a", 10);

    let links = [link("a1", "Adele", "src-a", 3)];
    records.add_playlist("p-due", "u1", &links, true, 7).await.unwrap();
    records.add_playlist("p-fresh", "u1", &links, true, 7).await.unwrap();
    let now = tunemash::time_utils::now_millis();
    backdate(&store, "u1", "p-due", now - 8 * DAY_MS).await;

    let engine = engine(spotify.clone(), records.clone());
    let report = engine.refresh_all().await.unwrap();

    assert_eq!(report.refreshed, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(spotify.written_tracks("p-due").unwrap().len(), 3);
    assert!(spotify.written_tracks("p-fresh").is_none());
    // the due record's clock was reset
    let updated = records.playlist("u1", "p-due").await.unwrap().metadata.updated;
    assert!(updated >= now);
}

#[tokio::test]
async fn refresh_sweep_continues_past_failures() {
    let (store, records) = record_store();
    seed_user(&records, "u1").await;
    let spotify = Arc::new(MockSpotify::new());
    spotify.add_source("src-a", "a", 10);
    spotify.fail_writes.lock().unwrap().insert("p-broken".to_string());

    let links = [link("a1", "Adele", "src-a", 3)];
    records.add_playlist("p-broken", "u1", &links, true, 7).await.unwrap();
    records.add_playlist("p-ok", "u1", &links, true, 7).await.unwrap();
    let now = tunemash::time_utils::now_millis();
    backdate(&store, "u1", "p-broken", now - 8 * DAY_MS).await;
    backdate(&store, "u1", "p-ok", now - 8 * DAY_MS).await;

    let engine = engine(spotify.clone(), records.clone());
    let report = engine.refresh_all().await.unwrap();

    assert_eq!(report.refreshed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(spotify.written_tracks("p-ok").unwrap().len(), 3);
    // the failed record stays due for the next sweep
    let updated = records.playlist("u1", "p-broken").await.unwrap().metadata.updated;
    assert_eq!(updated, now - 8 * DAY_MS);
}

#[tokio::test]
async fn check_sweep_removes_unfollowed_playlists() {
    let (_, records) = record_store();
    seed_user(&records, "u1").await;
    let spotify = Arc::new(MockSpotify::new());

    let links = [link("a1", "Adele", "src-a", 3)];
    records.add_playlist("p-kept", "u1", &links, true, 7).await.unwrap();
    records.add_playlist("p-gone", "u1", &links, true, 7).await.unwrap();
    spotify.unfollowed.lock().unwrap().insert("p-gone".to_string());

    let engine = engine(spotify.clone(), records.clone());
    let report = engine
        .check_all(CheckOptions::default())
        .await
        .unwrap();

    assert_eq!(report.checked, 2);
    assert_eq!(report.removed, 1);
    let err = records.playlist("u1", "p-gone").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(records.playlist("u1", "p-kept").await.is_ok());
}

#[tokio::test]
async fn check_sweep_repairs_missing_descriptions() {
    let (_, records) = record_store();
    seed_user(&records, "u1").await;
    let spotify = Arc::new(MockSpotify::new());
    spotify.add_artist("a1", "Adele");
    spotify.add_artist("a2", "Bonobo");

    let links = [
        link("a1", "Adele", "src-a", 3),
        link("a2", "Bonobo", "src-b", 3),
    ];
    records.add_playlist("p1", "u1", &links, true, 7).await.unwrap();
    // Spotify lost the description
    spotify.set_details("p1", "These are Adele and Bonobo", "");

    let engine = engine(spotify.clone(), records.clone());
    let report = engine
        .check_all(CheckOptions {
            details: true,
            artists: false,
            force: false,
        })
        .await
        .unwrap();

    assert_eq!(report.repaired, 1);
    let updates = spotify.detail_updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    let (id, name, description) = &updates[0];
    assert_eq!(id, "p1");
    // without force the title is left alone
    assert!(name.is_none());
    assert_eq!(
        description.as_deref(),
        Some("This Playlist was auto-generated! Artists are Adele and Bonobo.")
    );
}

#[tokio::test]
async fn check_sweep_leaves_intact_details_alone() {
    let (_, records) = record_store();
    seed_user(&records, "u1").await;
    let spotify = Arc::new(MockSpotify::new());
    spotify.add_artist("a1", "Adele");

    let links = [link("a1", "Adele", "src-a", 3)];
    records.add_playlist("p1", "u1", &links, true, 7).await.unwrap();
    spotify.set_details(
        "p1",
        "These are Adele",
        "This Playlist was auto-generated! Artists are Adele.",
    );

    let engine = engine(spotify.clone(), records.clone());
    let report = engine
        .check_all(CheckOptions {
            details: true,
            artists: false,
            force: false,
        })
        .await
        .unwrap();

    assert_eq!(report.repaired, 0);
    assert!(spotify.detail_updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn check_sweep_relinks_dead_canonical_playlists() {
    let (_, records) = record_store();
    seed_user(&records, "u1").await;
    let spotify = Arc::new(MockSpotify::new());

    let links = [link("a1", "Adele", "dead-src", 3)];
    records.add_playlist("p1", "u1", &links, true, 7).await.unwrap();

    // the replacement canonical playlist, found by title search and
    // passing the deep artist-credit check
    spotify.playlist_search.lock().unwrap().insert(
        "This is Adele".to_string(),
        vec![PlaylistSummary {
            id: "new-canonical".to_string(),
            name: "This is Adele".to_string(),
            owner_id: "spotify".to_string(),
        }],
    );
    let tracks = spotify.add_source("new-canonical", "adele", 3);
    {
        let mut credits = spotify.track_artists.lock().unwrap();
        for uri in &tracks {
            credits.insert(uri.clone(), vec!["spotify:artist:a1".to_string()]);
        }
    }

    let engine = engine(spotify.clone(), records.clone());
    let report = engine
        .check_all(CheckOptions {
            details: false,
            artists: true,
            force: false,
        })
        .await
        .unwrap();

    assert_eq!(report.repaired, 1);
    let artists = records.playlist_artists("p1", "u1").await.unwrap();
    assert_eq!(artists[0].playlist, "new-canonical");
}

#[tokio::test]
async fn check_sweep_keeps_unresolvable_links_untouched() {
    let (_, records) = record_store();
    seed_user(&records, "u1").await;
    let spotify = Arc::new(MockSpotify::new());

    let links = [link("a1", "Adele", "dead-src", 3)];
    records.add_playlist("p1", "u1", &links, true, 7).await.unwrap();
    // no search results registered, re-resolution finds nothing

    let engine = engine(spotify.clone(), records.clone());
    let report = engine
        .check_all(CheckOptions {
            details: false,
            artists: true,
            force: false,
        })
        .await
        .unwrap();

    assert_eq!(report.repaired, 0);
    let artists = records.playlist_artists("p1", "u1").await.unwrap();
    assert_eq!(artists[0].playlist, "dead-src");
}

#[tokio::test]
async fn track_fetch_pages_past_unplayable_entries() {
    let spotify = Arc::new(MockSpotify::new());
    // 250 tracks over three pages; the whole first page is unplayable,
    // so the fetched pages come back shorter than their window
    let tracks = spotify.add_source("src-holes", "t", 250);
    spotify
        .unplayable
        .lock()
        .unwrap()
        .extend(tracks[..100].iter().cloned());
    let generator = PlaylistGenerator::new(spotify.clone());

    let links = [link("a1", "Adele", "src-holes", 150)];
    let built = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        generator.build_track_list("token", &links),
    )
    .await
    .expect("track fetch must terminate")
    .unwrap();

    assert_eq!(built.len(), 150);
    let unique: HashSet<_> = built.iter().collect();
    assert_eq!(unique.len(), 150);
    let unplayable = spotify.unplayable.lock().unwrap();
    assert!(built.iter().all(|t| !unplayable.contains(t)));
}

#[tokio::test]
async fn large_track_lists_are_written_in_batches() {
    let spotify = Arc::new(MockSpotify::new());
    let source: HashSet<String> = spotify.add_source("src-big", "t", 120).into_iter().collect();
    let generator = PlaylistGenerator::new(spotify.clone());

    let links = [link("a1", "Adele", "src-big", 120)];
    let id = generator
        .create_playlist("token", "mock-user", &links)
        .await
        .unwrap();

    // one replacing write for the first hundred, one append for the rest
    let replaces: Vec<usize> = spotify
        .replace_ops
        .lock()
        .unwrap()
        .iter()
        .filter(|(p, _)| p == &id)
        .map(|(_, n)| *n)
        .collect();
    let appends: Vec<usize> = spotify
        .append_ops
        .lock()
        .unwrap()
        .iter()
        .filter(|(p, _)| p == &id)
        .map(|(_, n)| *n)
        .collect();
    assert_eq!(replaces, vec![100]);
    assert_eq!(appends, vec![20]);

    let written = spotify.written_tracks(&id).unwrap();
    assert_eq!(written.len(), 120);
    assert!(written.iter().all(|t| source.contains(t)));
    let unique: HashSet<_> = written.iter().collect();
    assert_eq!(unique.len(), 120);
}

#[tokio::test]
async fn deep_check_rejects_uncredited_candidates() {
    let spotify = Arc::new(MockSpotify::new());
    spotify.playlist_search.lock().unwrap().insert(
        "This is Adele".to_string(),
        vec![PlaylistSummary {
            id: "suspect".to_string(),
            name: "This is Adele".to_string(),
            owner_id: "spotify".to_string(),
        }],
    );
    // one sampled track credits a different artist
    let tracks = spotify.add_source("suspect", "adele", 5);
    {
        let mut credits = spotify.track_artists.lock().unwrap();
        for uri in &tracks[..4] {
            credits.insert(uri.clone(), vec!["spotify:artist:a1".to_string()]);
        }
        credits.insert(tracks[4].clone(), vec!["spotify:artist:impostor".to_string()]);
    }
    let resolver = CanonicalPlaylistResolver::new(spotify.clone());

    let deep = resolver
        .find_canonical_playlist("token", "Adele", "spotify:artist:a1", true)
        .await
        .unwrap();
    assert_eq!(deep, None);

    // the shallow lookup still takes the candidate on title alone
    let shallow = resolver
        .find_canonical_playlist("token", "Adele", "spotify:artist:a1", false)
        .await
        .unwrap();
    assert_eq!(shallow.as_deref(), Some("suspect"));
}

#[tokio::test]
async fn generated_playlist_combines_sources() {
    let spotify = Arc::new(MockSpotify::new());
    let source_a: HashSet<String> = spotify.add_source("src-a", "a", 10).into_iter().collect();
    let source_b: HashSet<String> = spotify.add_source("src-b", "b", 10).into_iter().collect();
    let generator = PlaylistGenerator::new(spotify.clone());

    let links = [
        link("a1", "Adele", "src-a", 3),
        link("a2", "Bonobo", "src-b", 3),
    ];
    let id = generator
        .create_playlist("token", "mock-user", &links)
        .await
        .unwrap();

    let written = spotify.written_tracks(&id).unwrap();
    assert_eq!(written.len(), 6);
    let unique: HashSet<_> = written.iter().cloned().collect();
    assert_eq!(unique.len(), 6);
    assert_eq!(written.iter().filter(|t| source_a.contains(*t)).count(), 3);
    assert_eq!(written.iter().filter(|t| source_b.contains(*t)).count(), 3);
    // every entry's first pick leads the list, one per artist
    assert!(source_a.contains(&written[0]));
    assert!(source_b.contains(&written[1]));
}
