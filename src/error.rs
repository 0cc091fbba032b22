use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use utoipa::ToSchema;

use crate::lifecycle::LifecycleError;
use crate::repo::RepoError;
use crate::validate::ValidationError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] Validation(#[from] ValidationError),
    #[error("unauthorized")] Unauthorized,
    #[error("forbidden")] Forbidden,
    #[error("{0}")] NotFound(String),
    #[error("{0}")] Conflict(String),
    #[error("too many requests, try again shortly")] RateLimited,
    /// Details stay in the logs and the alert.
    #[error("storage unavailable, please try again later")] StorageUnavailable(String),
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound("not found".into()),
            RepoError::Conflict | RepoError::DuplicateId => ApiError::Conflict(e.to_string()),
            RepoError::StorageUnavailable(msg) => ApiError::StorageUnavailable(msg),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::Validation(v) => ApiError::Validation(v),
            LifecycleError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            LifecycleError::AlreadyBlacklisted { .. } | LifecycleError::InvalidTransition { .. } => {
                ApiError::Conflict(e.to_string())
            }
            LifecycleError::StorageUnavailable(msg) => ApiError::StorageUnavailable(msg),
            // handlers answer duplicates with 202 before reaching here
            LifecycleError::DuplicateTrigger => ApiError::Conflict(e.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiErrorBody { error: self.to_string() })
    }
}
