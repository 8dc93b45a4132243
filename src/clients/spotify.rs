use async_trait::async_trait;
use log::{debug, warn};
use rspotify::{
    ClientCredsSpotify, Config, Credentials,
    http::Query,
    model::{
        ArtistId, FullTrack, RecommendationsAttribute, SearchResult, SearchType, SimplifiedAlbum,
        SimplifiedArtist, SimplifiedTrack, TrackId,
    },
    prelude::*,
};
use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::clients::{
    catalog::{Catalog, RecommendationQuery},
    entities::Track,
    errors::{Error, Result},
    retry::RetryPolicy,
};

#[derive(Deserialize, Debug)]
struct GenreSeedsResponse {
    genres: Vec<String>,
}

/// Whether `value` is a Spotify artist id, the only artist seed the
/// recommendations endpoint accepts.
pub fn is_artist_id(value: &str) -> bool {
    !value.is_empty() && ArtistId::from_id(value).is_ok()
}

fn artist_names(artists: &[SimplifiedArtist]) -> Vec<String> {
    artists.iter().map(|a| a.name.clone()).collect()
}

fn album_image(album: &SimplifiedAlbum) -> Option<String> {
    album.images.first().map(|image| image.url.clone())
}

fn duration_ms(duration: chrono::TimeDelta) -> u64 {
    u64::try_from(duration.num_milliseconds()).unwrap_or(0)
}

impl From<FullTrack> for Track {
    fn from(f: FullTrack) -> Track {
        Track {
            id: f.id.map(|id| id.id().to_string()).unwrap_or_default(),
            artists: artist_names(&f.artists),
            image_url: album_image(&f.album),
            album: f.album.name,
            preview_url: f.preview_url,
            external_url: f.external_urls.get("spotify").cloned().unwrap_or_default(),
            duration_ms: duration_ms(f.duration),
            popularity: f.popularity,
            name: f.name,
        }
    }
}

// Recommendation results are simplified tracks and carry no popularity.
impl From<SimplifiedTrack> for Track {
    fn from(f: SimplifiedTrack) -> Track {
        Track {
            id: f.id.map(|id| id.id().to_string()).unwrap_or_default(),
            artists: artist_names(&f.artists),
            image_url: f.album.as_ref().and_then(album_image),
            album: f.album.map(|a| a.name).unwrap_or_default(),
            preview_url: f.preview_url,
            external_url: f.external_urls.get("spotify").cloned().unwrap_or_default(),
            duration_ms: duration_ms(f.duration),
            popularity: 0,
            name: f.name,
        }
    }
}

/// Spotify Web API catalog using the client-credentials flow.
pub struct SpotifyClient {
    spotify: ClientCredsSpotify,
    retry: RetryPolicy,
    authorized: OnceCell<()>,
}

impl SpotifyClient {
    pub fn new(spotify: ClientCredsSpotify, retry: RetryPolicy) -> Self {
        SpotifyClient {
            spotify,
            retry,
            authorized: OnceCell::new(),
        }
    }

    pub fn with_credentials(client_id: &str, client_secret: &str, retry: RetryPolicy) -> Self {
        let creds = Credentials::new(client_id, client_secret);
        let spotify = ClientCredsSpotify::with_config(
            creds,
            Config {
                token_refreshing: true,
                ..Default::default()
            },
        );
        SpotifyClient::new(spotify, retry)
    }

    // Fetch the first access token on demand. Later expiry is handled by
    // rspotify's token refreshing. A failed fetch is retried on the next call.
    async fn authorize_client(&self) -> Result<()> {
        self.authorized
            .get_or_try_init(|| async {
                debug!("Requesting Spotify client credentials token ...");
                self.spotify.request_token().await.map_err(|e| {
                    warn!("Failed to get Spotify token: {e}");
                    Error::UpstreamError(format!("failed to get Spotify token: {e}"))
                })
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Catalog for SpotifyClient {
    async fn genre_seeds(&self) -> Result<Vec<String>> {
        self.retry
            .run("genre seeds", || async {
                self.authorize_client().await?;
                let body = self
                    .spotify
                    .api_get("recommendations/available-genre-seeds", &Query::new())
                    .await?;
                let response: GenreSeedsResponse = serde_json::from_str(&body)?;
                Ok(response.genres)
            })
            .await
    }

    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        self.retry
            .run("track search", || async {
                self.authorize_client().await?;
                let result = self
                    .spotify
                    .search(query, SearchType::Track, None, None, Some(limit), None)
                    .await?;
                match result {
                    SearchResult::Tracks(page) => {
                        Ok(page.items.into_iter().map(Track::from).collect())
                    }
                    other => Err(Error::UnexpectedResponse(format!(
                        "expected tracks from search, got {other:?}"
                    ))),
                }
            })
            .await
    }

    async fn recommendations(&self, query: &RecommendationQuery) -> Result<Vec<Track>> {
        let seed_artists: Vec<ArtistId<'_>> = query
            .seed_artists
            .iter()
            .filter_map(|artist| {
                ArtistId::from_id(artist.as_str())
                    .map_err(|e| warn!("Skipping artist seed {artist:?}: {e}"))
                    .ok()
            })
            .collect();

        self.retry
            .run("recommendations", || async {
                self.authorize_client().await?;
                let attributes = [
                    RecommendationsAttribute::MinPopularity(query.min_popularity),
                    RecommendationsAttribute::TargetEnergy(query.target_energy),
                    RecommendationsAttribute::TargetDanceability(query.target_danceability),
                ];
                let artists = (!seed_artists.is_empty()).then(|| seed_artists.clone());
                let genres = (!query.seed_genres.is_empty())
                    .then(|| query.seed_genres.iter().map(String::as_str));
                let recommendations = self
                    .spotify
                    .recommendations(
                        attributes,
                        artists,
                        genres,
                        None::<Vec<TrackId<'_>>>,
                        None,
                        Some(query.limit),
                    )
                    .await?;
                Ok(recommendations
                    .tracks
                    .into_iter()
                    .map(Track::from)
                    .collect())
            })
            .await
    }
}
