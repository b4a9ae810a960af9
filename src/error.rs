//! Error taxonomy shared by services and stores, plus the HTTP mapping.
//!
//! Services return [`CoreError`]; handlers return [`AppResult`] so a service
//! error turns into a consistent JSON body `{ "error": ..., "code": ... }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// Domain-level failures. Persistence errors are never retried by the core.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
  #[error("{entity} {id} not found")]
  NotFound { entity: &'static str, id: String },

  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Conflict(String),

  #[error("persistence failure: {0}")]
  Persistence(String),

  #[error("configuration error: {0}")]
  Configuration(String),
}

impl CoreError {
  pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
    CoreError::NotFound { entity, id: id.to_string() }
  }

  /// Stable machine-readable code used in HTTP bodies and WS error frames.
  pub fn code(&self) -> &'static str {
    match self {
      CoreError::NotFound { .. } => "NOT_FOUND",
      CoreError::Validation(_) => "VALIDATION_ERROR",
      CoreError::Conflict(_) => "CONFLICT",
      CoreError::Persistence(_) => "PERSISTENCE_ERROR",
      CoreError::Configuration(_) => "CONFIGURATION_ERROR",
    }
  }
}

impl From<sqlx::Error> for CoreError {
  fn from(err: sqlx::Error) -> Self {
    if let sqlx::Error::Database(db_err) = &err {
      // PostgreSQL unique violation
      if db_err.code().as_deref() == Some("23505") {
        let constraint = db_err.constraint().unwrap_or("unknown");
        return CoreError::Conflict(format!("Duplicate value violates unique constraint: {constraint}"));
      }
    }
    CoreError::Persistence(err.to_string())
  }
}

impl From<sqlx::migrate::MigrateError> for CoreError {
  fn from(err: sqlx::migrate::MigrateError) -> Self {
    CoreError::Persistence(format!("migration failed: {err}"))
  }
}

/// Handler-level error: a service error or a malformed request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("Bad request: {0}")]
  BadRequest(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let (status, code, message) = match &self {
      AppError::Core(core) => match core {
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, core.code(), core.to_string()),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, core.code(), msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, core.code(), msg.clone()),
        CoreError::Persistence(msg) => {
          error!(target: "lingvo_backend", error = %msg, "Persistence error");
          (StatusCode::INTERNAL_SERVER_ERROR, core.code(), "The data store is unavailable".to_string())
        }
        CoreError::Configuration(msg) => {
          error!(target: "lingvo_backend", error = %msg, "Configuration error");
          (StatusCode::INTERNAL_SERVER_ERROR, core.code(), "The server is misconfigured".to_string())
        }
      },
      AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
    };

    (status, axum::Json(json!({ "error": message, "code": code }))).into_response()
  }
}
