use std::collections::BTreeMap;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use thiserror::Error;

use crate::repositories::RepoError;
use crate::services::media_services::MediaError;

/// Field name -> messages, rendered as-is in 400 bodies.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("permission denied")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("repository error: {0}")]
    Repo(RepoError),
    #[error("media error: {0}")]
    Media(#[from] MediaError),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        ApiError::Validation(errors)
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        Self::field(NON_FIELD_ERRORS, message)
    }

    /// Media failures caused by the upload itself become a field error,
    /// storage failures stay 500s.
    pub fn from_media(field: &str, err: MediaError) -> Self {
        if err.is_client_error() {
            Self::field(field, err.to_string())
        } else {
            ApiError::Media(err)
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => ApiError::NotFound,
            other => ApiError::Repo(other),
        }
    }
}

/// Collects several field errors before failing, like a form validator.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: FieldErrors,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn finish(self) -> ApiResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a FieldErrors>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Repo(RepoError::Conflict(_)) => StatusCode::BAD_REQUEST,
            ApiError::Repo(_) | ApiError::Media(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let (message, errors) = match self {
            ApiError::Validation(errors) => ("Validation failed".to_string(), Some(errors)),
            ApiError::BadRequest(msg) | ApiError::Unauthorized(msg) => (msg.clone(), None),
            ApiError::Forbidden => (
                "You do not have permission to perform this action.".to_string(),
                None,
            ),
            ApiError::NotFound => ("Not found.".to_string(), None),
            ApiError::Repo(RepoError::Conflict(constraint)) => {
                (format!("Duplicate value violates `{}`", constraint), None)
            }
            other => {
                error!("request failed: {}", other);
                ("Internal server error".to_string(), None)
            }
        };

        HttpResponse::build(status).json(ErrorBody {
            status: "error",
            message,
            errors,
        })
    }
}
