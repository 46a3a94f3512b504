use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Machine-readable error codes carried in the `error.code` field of every failed response.
/// Clients branch on these, never on `message`.
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const AUTH_ERROR: &str = "AUTH_ERROR";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_OPENED: &str = "ALREADY_OPENED";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const EXTERNAL_API_ERROR: &str = "EXTERNAL_API_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Magic box {0} has already been opened")]
    AlreadyOpened(i64),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => codes::VALIDATION_ERROR,
            AppError::AuthError(_) | AppError::JwtError(_) => codes::AUTH_ERROR,
            AppError::PermissionDenied => codes::PERMISSION_DENIED,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::AlreadyOpened(_) => codes::ALREADY_OPENED,
            AppError::DatabaseError(_) => codes::DATABASE_ERROR,
            AppError::ReqwestError(_) => codes::EXTERNAL_API_ERROR,
            _ => codes::INTERNAL_ERROR,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyOpened(_) => StatusCode::CONFLICT,
            // 数据库故障视为暂时性错误
            AppError::DatabaseError(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ReqwestError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                msg.clone()
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                msg.clone()
            }
            AppError::JwtError(err) => {
                log::warn!("JWT error: {err}");
                "Invalid access token".to_string()
            }
            AppError::PermissionDenied => {
                log::warn!("Permission denied");
                "Permission denied".to_string()
            }
            AppError::NotFound(msg) => msg.clone(),
            AppError::AlreadyOpened(_) => "You have already opened this magic box".to_string(),
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                "Something went wrong, please try again".to_string()
            }
            AppError::ReqwestError(err) => {
                log::error!("Upstream request failed: {err}");
                "Upstream service unavailable".to_string()
            }
            _ => {
                log::error!("Internal error: {self}");
                "Internal server error".to_string()
            }
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_already_opened_is_conflict_with_tagged_code() {
        let err = AppError::AlreadyOpened(7);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), codes::ALREADY_OPENED);
    }

    #[test]
    fn test_database_error_is_transient() {
        let err = AppError::DatabaseError(DbErr::Custom("connection reset".into()));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), codes::DATABASE_ERROR);
    }

    #[test]
    fn test_validation_error_is_bad_request() {
        let err = AppError::ValidationError("weight must be >= 1".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), codes::VALIDATION_ERROR);
    }
}
