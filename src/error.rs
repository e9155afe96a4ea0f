// Error taxonomy for the export pipeline, plus the HTTP-facing error type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Longest slice of an error response body kept in a [`TransportError::Status`].
pub const BODY_SNIPPET_CHARS: usize = 200;

/// Failure talking to one of the remote endpoints.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status} @ {url} :: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("network error @ {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed JSON @ {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Fatal pipeline error. Any of these aborts the run and no file is produced.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The response does not have the shape the list endpoint promises.
    #[error("unexpected response shape: {0}")]
    Protocol(String),

    #[error("transport error: {0}")]
    Transport(TransportError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<TransportError> for ScrapeError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Decode { url, source } => {
                ScrapeError::Protocol(format!("malformed JSON from {}: {}", url, source))
            }
            other => ScrapeError::Transport(other),
        }
    }
}

/// A single detail lookup failed. Logged and swallowed by the detail fetcher.
#[derive(Debug, Error)]
#[error("detail fetch failed for {uuid}: {source}")]
pub struct DetailFetchError {
    pub uuid: String,
    #[source]
    pub source: TransportError,
}

// Errors surfaced by the axum handlers
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Upstream(ScrapeError),
    InternalServerError(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::InternalServerError(error)
    }
}

impl From<ScrapeError> for AppError {
    fn from(error: ScrapeError) -> Self {
        AppError::Upstream(error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(message) => {
                tracing::warn!("Rejected export request: {}", message);
                (StatusCode::BAD_REQUEST, message)
            }
            AppError::Upstream(e) => {
                tracing::error!("Export failed: {}", e);
                (StatusCode::BAD_GATEWAY, format!("Export failed: {}", e))
            }
            AppError::InternalServerError(e) => {
                tracing::error!("Internal server error: {:?}", e);
                // Don't expose internal details to the client
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        (status, error_message).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failures_become_protocol_errors() {
        let source = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let err: ScrapeError = TransportError::Decode {
            url: "http://example.test/list".to_string(),
            source,
        }
        .into();

        assert!(matches!(err, ScrapeError::Protocol(ref msg) if msg.contains("http://example.test/list")));
    }

    #[test]
    fn status_failures_stay_transport_errors() {
        let err: ScrapeError = TransportError::Status {
            status: 503,
            url: "http://example.test/list".to_string(),
            body: "busy".to_string(),
        }
        .into();

        assert!(matches!(err, ScrapeError::Transport(TransportError::Status { status: 503, .. })));
        assert_eq!(
            err.to_string(),
            "transport error: HTTP 503 @ http://example.test/list :: busy"
        );
    }

    #[test]
    fn upstream_errors_map_to_bad_gateway() {
        let response = AppError::Upstream(ScrapeError::Protocol("no itemList".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = AppError::BadRequest("pageSize must be positive".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
