use chrono::{Datelike, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::clients::{
    Catalog, LocalStorage, RecommendationQuery,
    entities::Track,
    errors::{Error, Result},
    spotify::is_artist_id,
};

/// Genres used when a user has not picked any genre or artist.
pub const DEFAULT_SEED_GENRES: [&str; 3] = ["pop", "rock", "indie"];
/// The catalog accepts five seeds in total; genres get three of them.
pub const MAX_SEED_GENRES: usize = 3;
pub const MAX_SEED_ARTISTS: usize = 2;

/// Seeds derived from stored preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seeds {
    pub genres: Vec<String>,
    pub artists: Vec<String>,
}

impl Seeds {
    /// Artist preferences that are not catalog ids (plain names, say) are
    /// skipped before the cap, so they neither take a seed slot nor suppress
    /// the default genres.
    pub fn from_preferences(genres: &[String], artists: &[String]) -> Self {
        let genres: Vec<String> = genres.iter().take(MAX_SEED_GENRES).cloned().collect();
        let artists: Vec<String> = artists
            .iter()
            .filter(|artist| {
                let usable = is_artist_id(artist);
                if !usable {
                    warn!("Skipping artist seed {artist:?}: not a Spotify artist id");
                }
                usable
            })
            .take(MAX_SEED_ARTISTS)
            .cloned()
            .collect();
        if genres.is_empty() && artists.is_empty() {
            return Seeds {
                genres: DEFAULT_SEED_GENRES.iter().map(ToString::to_string).collect(),
                artists,
            };
        }
        Seeds { genres, artists }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    pub recommendations: Vec<Track>,
    pub seed_genres: Vec<String>,
    pub seed_artists: Vec<String>,
}

/// Request pipelines that combine stored user data with the catalog.
pub struct Recommender {
    catalog: Arc<dyn Catalog>,
    storage: Arc<LocalStorage>,
}

impl Recommender {
    pub fn new(catalog: Arc<dyn Catalog>, storage: Arc<LocalStorage>) -> Self {
        Recommender { catalog, storage }
    }

    /// Recommendations seeded from the user's current preferences, in the
    /// order the catalog returned them.
    pub async fn recommend(&self, user_id: &str, limit: u32) -> Result<Recommendations> {
        let user = self
            .storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {user_id}")))?;

        let seeds = Seeds::from_preferences(&user.favorite_genres, &user.favorite_artists);
        debug!(
            "Requesting {limit} recommendations for user {user_id} with seeds {:?} / {:?}",
            seeds.genres, seeds.artists
        );
        let query = RecommendationQuery::new(seeds.genres, seeds.artists, limit);
        let tracks = self.catalog.recommendations(&query).await?;

        info!("Fetched {} recommendations for user {user_id}", tracks.len());
        Ok(Recommendations {
            recommendations: tracks,
            seed_genres: query.seed_genres,
            seed_artists: query.seed_artists,
        })
    }

    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        let tracks = self.catalog.search_tracks(query, limit).await?;
        debug!("Search {query:?} returned {} tracks", tracks.len());
        Ok(tracks)
    }

    /// Popular tracks released this year, most popular first.
    pub async fn trending(&self, limit: u32) -> Result<Vec<Track>> {
        let query = format!("year:{}", Utc::now().year());
        let mut tracks = self.catalog.search_tracks(&query, limit).await?;
        // stable: equally popular tracks keep the catalog's order
        tracks.sort_by(|a, b| b.popularity.cmp(&a.popularity));
        Ok(tracks)
    }

    pub async fn genres(&self) -> Result<Vec<String>> {
        self.catalog.genre_seeds().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn empty_preferences_fall_back_to_default_genres() {
        let seeds = Seeds::from_preferences(&[], &[]);
        assert_eq!(seeds.genres, strings(&["pop", "rock", "indie"]));
        assert!(seeds.artists.is_empty());
    }

    #[test]
    fn seeds_are_capped_at_five() {
        let seeds = Seeds::from_preferences(
            &strings(&["jazz", "soul", "funk", "blues"]),
            &strings(&[
                "0TnOYISbd1XYRBk9myaseg",
                "1vCWHaC5f2uS3yhpwWbIA6",
                "3TVXtAsR1Inumwj472S9r4",
            ]),
        );
        assert_eq!(seeds.genres, strings(&["jazz", "soul", "funk"]));
        assert_eq!(
            seeds.artists,
            strings(&["0TnOYISbd1XYRBk9myaseg", "1vCWHaC5f2uS3yhpwWbIA6"])
        );
    }

    #[test]
    fn artists_alone_do_not_trigger_the_fallback() {
        let seeds = Seeds::from_preferences(&[], &strings(&["0TnOYISbd1XYRBk9myaseg"]));
        assert!(seeds.genres.is_empty());
        assert_eq!(seeds.artists, strings(&["0TnOYISbd1XYRBk9myaseg"]));
    }

    #[test]
    fn artist_names_fall_back_to_default_genres() {
        let seeds = Seeds::from_preferences(&[], &strings(&["Miles Davis"]));
        assert_eq!(seeds.genres, strings(&["pop", "rock", "indie"]));
        assert!(seeds.artists.is_empty());
    }

    #[test]
    fn skipped_artists_do_not_take_a_seed_slot() {
        let seeds = Seeds::from_preferences(
            &strings(&["jazz"]),
            &strings(&[
                "Miles Davis",
                "0TnOYISbd1XYRBk9myaseg",
                "not an id",
                "1vCWHaC5f2uS3yhpwWbIA6",
            ]),
        );
        assert_eq!(
            seeds.artists,
            strings(&["0TnOYISbd1XYRBk9myaseg", "1vCWHaC5f2uS3yhpwWbIA6"])
        );
    }
}
