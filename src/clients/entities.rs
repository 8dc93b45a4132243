use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Stored timestamps keep microseconds, so records are stamped at that precision.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A catalog track as exposed by this API. Never persisted as a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    pub preview_url: Option<String>,
    pub image_url: Option<String>,
    pub external_url: String,
    pub duration_ms: u64,
    pub popularity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub spotify_id: String,
    pub display_name: String,
    pub email: String,
    pub favorite_genres: Vec<String>,
    pub favorite_artists: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh user record from an already validated registration.
    pub fn register(new_user: NewUser) -> Self {
        User {
            id: Uuid::new_v4().to_string(),
            spotify_id: new_user.spotify_id,
            display_name: new_user.display_name,
            email: new_user.email,
            favorite_genres: Vec::new(),
            favorite_artists: Vec::new(),
            created_at: now(),
        }
    }
}

/// Validated registration data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub display_name: String,
    pub email: String,
    pub spotify_id: String,
}

/// Validated favourite genres and artists, deduplicated in the order given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub genres: Vec<String>,
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTrack {
    pub id: String,
    pub user_id: String,
    pub track_id: String,
    pub track_name: String,
    pub artists: Vec<String>,
    pub image_url: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl SavedTrack {
    pub fn for_user(user_id: &str, track: NewSavedTrack) -> Self {
        SavedTrack {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            track_id: track.track_id,
            track_name: track.track_name,
            artists: track.artists,
            image_url: track.image_url,
            saved_at: now(),
        }
    }
}

/// Validated track reference to store in a user's saved list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSavedTrack {
    pub track_id: String,
    pub track_name: String,
    pub artists: Vec<String>,
    pub image_url: Option<String>,
}

/// Outcome of saving a track, so callers can tell a fresh save from a repeat.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Created(SavedTrack),
    AlreadySaved(SavedTrack),
}
