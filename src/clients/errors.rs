use rspotify::ClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    ValidationError(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Spotify error: {0}")]
    SpotifyError(#[from] ClientError),

    #[error("Spotify request failed: {0}")]
    UpstreamError(String),

    #[error("Spotify API unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Spotify deserialization error: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] async_duckdb::Error),

    #[error("Corrupt stored record: {0}")]
    CorruptRecord(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Failures of the external catalog, as opposed to bad input or local storage.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::SpotifyError(_)
                | Error::UpstreamError(_)
                | Error::UnexpectedResponse(_)
                | Error::DeserializationError(_)
        )
    }

    /// Upstream failures worth another attempt. A response we could not
    /// understand will not improve on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::SpotifyError(_) | Error::UpstreamError(_))
    }
}

impl From<async_duckdb::duckdb::Error> for Error {
    fn from(err: async_duckdb::duckdb::Error) -> Self {
        Error::StorageError(async_duckdb::Error::Duckdb(err))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
