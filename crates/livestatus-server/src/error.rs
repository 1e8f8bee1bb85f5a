//! Error types: the HTTP-facing [`Error`] with its `IntoResponse`
//! implementation, and [`ClientError`] for the outbound REST clients.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

// ─── Router ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  /// Signature or timestamp check failed.
  #[error("forbidden: {0}")]
  Forbidden(&'static str),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = match &self {
      Error::Forbidden(_) => StatusCode::FORBIDDEN,
      Error::BadRequest(_) => StatusCode::BAD_REQUEST,
      Error::NotFound(_) => StatusCode::NOT_FOUND,
    };
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

// ─── Outbound clients ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{endpoint} returned {status}: {body}")]
  Status {
    endpoint: String,
    status:   StatusCode,
    body:     String,
  },

  /// The app token was rejected and has been refreshed; try again.
  #[error("access token expired")]
  TokenExpired,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Turn a non-2xx response into [`ClientError::Status`].
pub(crate) async fn ensure_success(
  endpoint: &str,
  resp: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  Err(ClientError::Status { endpoint: endpoint.to_owned(), status, body })
}
