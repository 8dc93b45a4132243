use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    AppState,
    extract::{ApiQuery, LimitQuery, validate_limit},
};
use crate::{
    clients::errors::{Error, Result},
    recommender::Recommendations,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<u32>,
}

/// GET /api/genres
pub async fn genres(State(state): State<AppState>) -> Result<Json<Value>> {
    let genres = state.recommender.genres().await?;
    Ok(Json(json!({ "genres": genres })))
}

/// GET /api/search?q=&limit=
pub async fn search(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Value>> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| Error::ValidationError("query parameter q is required".into()))?;
    let limit = validate_limit(query.limit)?;

    let tracks = state.recommender.search(q, limit).await?;
    Ok(Json(json!({ "tracks": tracks })))
}

/// GET /api/recommendations/{user_id}?limit=
pub async fn recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<Json<Recommendations>> {
    let limit = query.limit()?;
    Ok(Json(state.recommender.recommend(&user_id, limit).await?))
}

/// GET /api/trending?limit=
pub async fn trending(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<Json<Value>> {
    let tracks = state.recommender.trending(query.limit()?).await?;
    Ok(Json(json!({ "trending_tracks": tracks })))
}
