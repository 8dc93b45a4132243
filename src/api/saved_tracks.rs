use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, extract::ApiJson};
use crate::clients::{
    entities::{NewSavedTrack, SaveOutcome, SavedTrack},
    errors::{Error, Result},
};

#[derive(Debug, Deserialize)]
pub struct SaveTrackRequest {
    #[serde(default)]
    pub track_id: String,
    #[serde(default)]
    pub track_name: String,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl SaveTrackRequest {
    pub fn validate(self) -> Result<NewSavedTrack> {
        let track_id = self.track_id.trim().to_string();
        if track_id.is_empty() {
            return Err(Error::ValidationError("track_id is required".into()));
        }
        let track_name = self.track_name.trim().to_string();
        if track_name.is_empty() {
            return Err(Error::ValidationError("track_name is required".into()));
        }
        Ok(NewSavedTrack {
            track_id,
            track_name,
            artists: self.artists,
            image_url: self.image_url.filter(|url| !url.trim().is_empty()),
        })
    }
}

async fn ensure_user(state: &AppState, user_id: &str) -> Result<()> {
    match state.storage.get_user(user_id).await? {
        Some(_) => Ok(()),
        None => Err(Error::NotFound(format!("User {user_id}"))),
    }
}

/// POST /api/users/{user_id}/saved-tracks
///
/// 201 with the new entry, or 200 with the existing one when the track was
/// already saved.
pub async fn save_track(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(request): ApiJson<SaveTrackRequest>,
) -> Result<(StatusCode, Json<SavedTrack>)> {
    let track = request.validate()?;
    ensure_user(&state, &user_id).await?;
    match state.storage.save_track(&user_id, track).await? {
        SaveOutcome::Created(saved) => Ok((StatusCode::CREATED, Json(saved))),
        SaveOutcome::AlreadySaved(saved) => Ok((StatusCode::OK, Json(saved))),
    }
}

/// GET /api/users/{user_id}/saved-tracks
pub async fn list_saved_tracks(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    ensure_user(&state, &user_id).await?;
    let saved_tracks = state.storage.saved_tracks(&user_id).await?;
    Ok(Json(json!({ "saved_tracks": saved_tracks })))
}

/// DELETE /api/users/{user_id}/saved-tracks/{track_id}
///
/// Removing a track that is not saved succeeds and changes nothing.
pub async fn remove_saved_track(
    State(state): State<AppState>,
    Path((user_id, track_id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    ensure_user(&state, &user_id).await?;
    state.storage.remove_saved_track(&user_id, &track_id).await?;
    Ok(Json(json!({ "message": "Track removed successfully" })))
}
