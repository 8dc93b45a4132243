//! HTTP surface: routing, handlers and the mapping of errors to responses.

use axum::{
    Json, Router,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
};
use log::info;
use serde_json::{Value, json};
use std::{sync::Arc, time::Instant};
use tower_http::cors::CorsLayer;

use crate::{clients::LocalStorage, config::Config, recommender::Recommender};

mod catalog;
mod error;
mod extract;
mod saved_tracks;
mod users;

pub use extract::{ApiJson, ApiQuery, LimitQuery};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub storage: Arc<LocalStorage>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            recommender: Arc::new(Recommender::new(config.catalog, config.storage.clone())),
            storage: config.storage,
        }
    }
}

/// Build the `/api` router with request logging and permissive CORS.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/genres", get(catalog::genres))
        .route("/users", post(users::create_user))
        .route("/users/{user_id}", get(users::get_user))
        .route("/users/{user_id}/preferences", put(users::update_preferences))
        .route(
            "/users/{user_id}/saved-tracks",
            post(saved_tracks::save_track).get(saved_tracks::list_saved_tracks),
        )
        .route(
            "/users/{user_id}/saved-tracks/{track_id}",
            delete(saved_tracks::remove_saved_track),
        )
        .route("/search", get(catalog::search))
        .route("/recommendations/{user_id}", get(catalog::recommendations))
        .route("/trending", get(catalog::trending));

    // the banner answers with and without the trailing slash
    Router::new()
        .route("/api", get(root))
        .route("/api/", get(root))
        .nest("/api", api)
        .layer(middleware::from_fn(log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Music Recommender API" }))
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "{method} {path} -> {} in {:?}",
        response.status().as_u16(),
        started.elapsed()
    );
    response
}
