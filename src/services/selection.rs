// SPDX-License-Identifier: MIT

//! Track selection and playlist text generation.
//!
//! The selection algorithm turns an arbitrarily long source playlist into
//! a bounded, pleasantly shuffled pick: tracks near the head of a
//! canonical playlist are usually the better-known ones, so they are
//! drawn with higher weight while the tail still gets a chance.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Marker prefix of generated playlist titles.
const TITLE_PREFIX: &str = "These are ";
/// Marker prefix of generated playlist descriptions.
const DESCRIPTION_PREFIX: &str = "This Playlist was auto-generated! ";

/// Trim a track list down to `count` entries using stratified weighted
/// sampling.
///
/// Lists that already fit are returned unchanged (order preserved).
/// Otherwise the list is split by position into three strata — hot (first
/// sixth), medium (next quarter), cold (the remainder) — each shuffled
/// once, and `count` tracks are drawn without replacement with 3:2:1
/// weight per remaining track in the respective stratum.
pub fn trim_track_selection(tracks: &[String], count: usize) -> Vec<String> {
    if tracks.len() <= count {
        return tracks.to_vec();
    }

    let hot_len = tracks.len() / 6;
    let medium_len = tracks.len() / 4;

    let mut hot: Vec<String> = tracks[..hot_len].to_vec();
    let mut medium: Vec<String> = tracks[hot_len..hot_len + medium_len].to_vec();
    let mut cold: Vec<String> = tracks[hot_len + medium_len..].to_vec();

    let mut rng = rand::thread_rng();
    hot.shuffle(&mut rng);
    medium.shuffle(&mut rng);
    cold.shuffle(&mut rng);

    let mut trimmed = Vec::with_capacity(count);
    for _ in 0..count {
        let realm = 3 * hot.len() + 2 * medium.len() + cold.len();
        if realm == 0 {
            break;
        }
        let selection = rng.gen_range(0..realm);

        let picked = if selection < 3 * hot.len() {
            hot.pop()
        } else if selection < 3 * hot.len() + 2 * medium.len() {
            medium.pop()
        } else {
            cold.pop()
        };
        if let Some(track) = picked {
            trimmed.push(track);
        }
    }

    trimmed
}

/// Uniform Fisher–Yates shuffle.
pub fn shuffle_tracks(mut tracks: Vec<String>) -> Vec<String> {
    tracks.shuffle(&mut rand::thread_rng());
    tracks
}

/// Remove duplicates, keeping the first occurrence of each track.
pub fn dedup_tracks(tracks: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|track| seen.insert(track.clone()))
        .collect()
}

/// Title for a generated playlist.
pub fn playlist_title(artists: &[String]) -> String {
    let names = match artists {
        [] => String::new(),
        [a] => a.clone(),
        [a, b] => format!("{} and {}", a, b),
        [a, b, c] => format!("{}, {} and {}", a, b, c),
        [a, b, ..] => format!("{}, {} and others", a, b),
    };
    format!("{}{}", TITLE_PREFIX, names)
}

/// Description for a generated playlist.
pub fn playlist_description(artists: &[String]) -> String {
    let sanitized: Vec<String> = artists.iter().map(|a| sanitize_artist(a)).collect();

    let names = match sanitized.as_slice() {
        [] => String::new(),
        [a] => format!("{}.", a),
        [rest @ .., last] => format!("{} and {}.", rest.join(", "), last),
    };
    format!("{}Artists are {}", DESCRIPTION_PREFIX, names)
}

/// Commas and "and" inside a name would garble the generated sentences.
fn sanitize_artist(artist: &str) -> String {
    artist.replace(',', "").replace(" and ", " & ")
}

/// True for titles this service generated itself.
pub fn looks_generated_title(title: &str) -> bool {
    title.to_lowercase().contains("these are ")
}

/// True for descriptions this service generated itself.
pub fn looks_generated_description(description: &str) -> bool {
    description.to_lowercase().contains("this playlist was ")
}
