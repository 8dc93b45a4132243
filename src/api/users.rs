use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use log::info;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, extract::ApiJson};
use crate::clients::{
    entities::{NewUser, Preferences, User},
    errors::{Error, Result},
};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub spotify_id: String,
}

impl CreateUserRequest {
    /// Trim the fields, lower-case the email and reject blank or malformed values.
    pub fn validate(self) -> Result<NewUser> {
        let display_name = self.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(Error::ValidationError("display_name is required".into()));
        }
        let email = self.email.trim().to_lowercase();
        let well_formed = email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        });
        if !well_formed || email.contains(char::is_whitespace) {
            return Err(Error::ValidationError(format!("{:?} is not a valid email", self.email)));
        }
        Ok(NewUser {
            display_name,
            email,
            spotify_id: self.spotify_id.trim().to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PreferencesRequest {
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub artists: Vec<String>,
}

fn normalize(field: &str, values: Vec<String>) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if value.is_empty() {
            return Err(Error::ValidationError(format!("{field} must not contain blank entries")));
        }
        if !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    Ok(out)
}

impl PreferencesRequest {
    pub fn validate(self) -> Result<Preferences> {
        Ok(Preferences {
            genres: normalize("genres", self.genres)?,
            artists: normalize("artists", self.artists)?,
        })
    }
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let new_user = request.validate()?;
    let user = state.storage.create_user(new_user).await?;
    info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>> {
    state
        .storage
        .get_user(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("User {user_id}")))
}

/// PUT /api/users/{user_id}/preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(request): ApiJson<PreferencesRequest>,
) -> Result<Json<Value>> {
    let preferences = request.validate()?;
    if !state.storage.update_preferences(&user_id, &preferences).await? {
        return Err(Error::NotFound(format!("User {user_id}")));
    }
    info!("Updated preferences for user {user_id}");
    Ok(Json(json!({ "message": "Preferences updated successfully" })))
}
