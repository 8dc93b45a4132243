use async_trait::async_trait;

use crate::clients::{entities::Track, errors::Result};

/// Seeds and tuning attributes for a single recommendation request.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationQuery {
    pub seed_genres: Vec<String>,
    pub seed_artists: Vec<String>,
    pub limit: u32,
    pub min_popularity: i32,
    pub target_energy: f32,
    pub target_danceability: f32,
}

impl RecommendationQuery {
    pub fn new(seed_genres: Vec<String>, seed_artists: Vec<String>, limit: u32) -> Self {
        RecommendationQuery {
            seed_genres,
            seed_artists,
            limit,
            min_popularity: 30,
            target_energy: 0.7,
            target_danceability: 0.6,
        }
    }
}

/// The external music catalog. Every method is a single outbound request
/// whose results are returned in the order the catalog produced them.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Genre names accepted as recommendation seeds.
    async fn genre_seeds(&self) -> Result<Vec<String>>;

    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>>;

    async fn recommendations(&self, query: &RecommendationQuery) -> Result<Vec<Track>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_query_carries_default_tuning() {
        let query = RecommendationQuery::new(vec!["pop".into()], vec![], 20);
        assert_eq!(query.min_popularity, 30);
        assert_eq!(query.target_energy, 0.7);
        assert_eq!(query.target_danceability, 0.6);
        assert_eq!(query.limit, 20);
    }
}
