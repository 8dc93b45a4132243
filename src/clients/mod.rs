/// The external catalog seam
pub mod catalog;
/// Domain records: users, saved tracks and catalog tracks
pub mod entities;
/// Error types and result aliases
pub mod errors;
/// User and saved-track storage using `DuckDB`
pub mod local_storage;
/// Bounded retry with jittered backoff for outbound calls
pub mod retry;
/// Spotify Web API client
pub mod spotify;

pub use catalog::{Catalog, RecommendationQuery};
pub use local_storage::LocalStorage;
pub use retry::RetryPolicy;
pub use spotify::SpotifyClient;
