//! Error taxonomy shared by the core and the HTTP layer.
//!
//! Every variant maps to one HTTP status; the body is always `{"error": "..."}`.

use axum::{
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("invalid request: {0}")]
  Validation(String),
  #[error("unauthorized: {0}")]
  Auth(String),
  #[error("not found: {0}")]
  NotFound(String),
  #[error("no suitable tasks found")]
  NoEligibleTasks,
  #[error("{0}")]
  InsufficientResource(String),
  #[error("dependency unavailable: {0}")]
  DependencyUnavailable(String),
  #[error("storage failure: {0}")]
  Persistence(String),
}

impl AppError {
  pub fn status(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::NotFound(_) | AppError::NoEligibleTasks => StatusCode::NOT_FOUND,
      AppError::InsufficientResource(_) => StatusCode::FORBIDDEN,
      AppError::DependencyUnavailable(_) => StatusCode::BAD_GATEWAY,
      AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(target: "vocab_trainer", error = %self, "Request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

impl From<JsonRejection> for AppError {
  fn from(rej: JsonRejection) -> Self {
    AppError::Validation(rej.body_text())
  }
}

impl From<QueryRejection> for AppError {
  fn from(rej: QueryRejection) -> Self {
    AppError::Validation(rej.body_text())
  }
}
