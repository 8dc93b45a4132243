//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use tower::util::ServiceExt; // for `oneshot`
use tuneseed::{
    api::{AppState, build_router},
    clients::{
        Catalog, LocalStorage, RecommendationQuery, RetryPolicy,
        entities::Track,
        errors::{Error, Result},
    },
    config::{ConfigBuilder, Settings},
};

/// Stand-in catalog that returns canned tracks and records every query.
#[derive(Default)]
pub struct RecordingCatalog {
    pub tracks: Mutex<Vec<Track>>,
    pub genres: Vec<String>,
    pub failing: AtomicBool,
    pub recommendation_queries: Mutex<Vec<RecommendationQuery>>,
    pub search_queries: Mutex<Vec<(String, u32)>>,
}

impl RecordingCatalog {
    pub fn returning(tracks: Vec<Track>) -> Self {
        RecordingCatalog {
            tracks: Mutex::new(tracks),
            genres: vec!["jazz".into(), "pop".into(), "rock".into()],
            ..Default::default()
        }
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn last_recommendation_query(&self) -> RecommendationQuery {
        self.recommendation_queries
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no recommendation query recorded")
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::UpstreamError("catalog unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Catalog for RecordingCatalog {
    async fn genre_seeds(&self) -> Result<Vec<String>> {
        self.check()?;
        Ok(self.genres.clone())
    }

    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        self.search_queries
            .lock()
            .unwrap()
            .push((query.to_string(), limit));
        self.check()?;
        Ok(self.tracks.lock().unwrap().clone())
    }

    async fn recommendations(&self, query: &RecommendationQuery) -> Result<Vec<Track>> {
        self.recommendation_queries
            .lock()
            .unwrap()
            .push(query.clone());
        self.check()?;
        Ok(self.tracks.lock().unwrap().clone())
    }
}

pub fn track(id: &str, name: &str, popularity: u32) -> Track {
    Track {
        id: id.into(),
        name: name.into(),
        artists: vec!["Miles Davis".into()],
        album: "Kind of Blue".into(),
        preview_url: None,
        image_url: Some(format!("https://i.scdn.co/image/{id}")),
        external_url: format!("https://open.spotify.com/track/{id}"),
        duration_ms: 200_000,
        popularity,
    }
}

fn test_settings() -> Settings {
    Settings {
        store_url: ":memory:".into(),
        db_name: "test".into(),
        spotify_client_id: "unused".into(),
        spotify_client_secret: "unused".into(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        catalog_retry: RetryPolicy::default(),
    }
}

/// Test helper: router over a fresh in-memory store and the given catalog
pub async fn setup_app(catalog: Arc<RecordingCatalog>) -> Router {
    let storage = Arc::new(LocalStorage::in_memory().await.unwrap());
    let config = ConfigBuilder::new()
        .catalog(catalog)
        .storage(storage)
        .build(&test_settings())
        .await
        .expect("Should build test config");
    build_router(AppState::new(config))
}

/// Test helper: send one request, return status and parsed JSON body
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, json)
}

/// Test helper: register a user and return its id
pub async fn create_user(app: &Router, name: &str, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/users",
        Some(serde_json::json!({ "display_name": name, "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {body}");
    body["id"].as_str().unwrap().to_string()
}
