use log::{debug, info};
use std::{net::SocketAddr, str::FromStr, sync::Arc, time::Duration};

use crate::clients::{
    Catalog, LocalStorage, RetryPolicy, SpotifyClient,
    errors::{Error, Result},
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8001";

/// Process settings, read once at startup and handed to constructors.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub store_url: String,
    pub db_name: String,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub bind_addr: SocketAddr,
    pub catalog_retry: RetryPolicy,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::ConfigurationError(format!("missing environment variable {key}")))
        };

        let defaults = RetryPolicy::default();
        let catalog_retry = RetryPolicy {
            max_attempts: parse_or(&lookup, "CATALOG_MAX_ATTEMPTS", defaults.max_attempts)?,
            base_delay: Duration::from_millis(parse_or(
                &lookup,
                "CATALOG_RETRY_BASE_MS",
                u64::try_from(defaults.base_delay.as_millis()).unwrap_or(u64::MAX),
            )?),
            max_delay: Duration::from_millis(parse_or(
                &lookup,
                "CATALOG_RETRY_MAX_MS",
                u64::try_from(defaults.max_delay.as_millis()).unwrap_or(u64::MAX),
            )?),
        };
        if catalog_retry.max_attempts == 0 {
            return Err(Error::ConfigurationError(
                "CATALOG_MAX_ATTEMPTS must be at least 1".into(),
            ));
        }

        let default_bind: SocketAddr = DEFAULT_BIND_ADDR
            .parse()
            .map_err(|e| Error::ConfigurationError(format!("invalid default bind address: {e}")))?;

        Ok(Settings {
            store_url: required("STORE_URL")?,
            db_name: required("DB_NAME")?,
            spotify_client_id: required("SPOTIFY_CLIENT_ID")?,
            spotify_client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            bind_addr: parse_or(&lookup, "BIND_ADDR", default_bind)?,
            catalog_retry,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::ConfigurationError(format!("invalid {key} value {raw:?}: {e}"))),
        None => {
            debug!("{key} not set, using default");
            Ok(default)
        }
    }
}

/// Collaborators shared by every request.
pub struct Config {
    pub catalog: Arc<dyn Catalog>,
    pub storage: Arc<LocalStorage>,
}

pub struct ConfigBuilder {
    catalog: Option<Arc<dyn Catalog>>,
    storage: Option<Arc<LocalStorage>>,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            catalog: None,
            storage: None,
        }
    }

    pub fn catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn storage(mut self, storage: Arc<LocalStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Fill in whatever was not supplied from `settings`, and make sure the
    /// storage tables exist.
    pub async fn build(self, settings: &Settings) -> Result<Config> {
        let catalog = match self.catalog {
            Some(c) => c,
            None => Arc::new(SpotifyClient::with_credentials(
                &settings.spotify_client_id,
                &settings.spotify_client_secret,
                settings.catalog_retry,
            )),
        };
        let storage = match self.storage {
            Some(s) => s,
            None => Arc::new(LocalStorage::open(&settings.store_url, &settings.db_name).await?),
        };
        storage.init_db().await?;
        info!("Storage ready ({} / {})", settings.store_url, settings.db_name);
        Ok(Config { catalog, storage })
    }
}
