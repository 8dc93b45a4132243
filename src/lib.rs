//! Tuneseed - music recommendations over the Spotify Web API
//!
//! Users register, pick favourite genres and artists, and get track
//! recommendations seeded from those preferences. Profiles and saved tracks
//! live in an embedded `DuckDB` database; catalog data is always fetched from
//! Spotify and never stored as a source of truth.

/// HTTP routes and handlers
pub mod api;
/// Client modules for the external catalog and local storage
pub mod clients;
/// Settings and collaborator wiring
pub mod config;
/// Recommendation, search and trending pipelines
pub mod recommender;
