use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::{error, warn};
use serde_json::json;

use crate::clients::errors::Error;

impl Error {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Error::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            e if e.is_upstream() => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Error::StorageError(_) | Error::CorruptRecord(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status == StatusCode::BAD_GATEWAY {
            warn!("Upstream failure: {self}");
        } else if status.is_server_error() {
            error!("Request failed: {self}");
        }

        let body = Json(json!({
            "detail": self.to_string(),
            "code": code,
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_statuses() {
        let cases = [
            (Error::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (Error::NotFound("User 1".into()), StatusCode::NOT_FOUND),
            (Error::Conflict("x".into()), StatusCode::CONFLICT),
            (Error::UpstreamError("x".into()), StatusCode::BAD_GATEWAY),
            (Error::UnexpectedResponse("x".into()), StatusCode::BAD_GATEWAY),
            (Error::CorruptRecord("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::ConfigurationError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
