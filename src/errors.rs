use actix_identity::error::{GetIdentityError, LoginError};
use actix_multipart::MultipartError;
use actix_web::{
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use sqlx::Error as SqlxError;
use std::env::VarError;
use thiserror::Error;

use crate::{diagnosis::DiagnosisError, geo::GeoError, storage::StorageError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Template error: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("Identity error: {0}")]
    IdentityError(#[from] GetIdentityError),

    #[error("Login error: {0}")]
    LoginError(#[from] LoginError),

    #[error("Password error: {0}")]
    PasswordError(String),

    #[error("Upload error: {0}")]
    MultipartError(#[from] MultipartError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Geocoding error: {0}")]
    GeoError(#[from] GeoError),

    #[error("Diagnosis error: {0}")]
    DiagnosisError(#[from] DiagnosisError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] VarError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Upload exceeds the maximum size of {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Not found")]
    NotFound,

    #[error("Sign in required")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthenticated => StatusCode::SEE_OTHER,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::StorageError(StorageError::AlreadyExists(_)) => StatusCode::CONFLICT,
            AppError::GeoError(_) | AppError::DiagnosisError(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_)
            | AppError::MigrationError(_)
            | AppError::TemplateError(_)
            | AppError::IdentityError(_)
            | AppError::LoginError(_)
            | AppError::PasswordError(_)
            | AppError::MultipartError(_)
            | AppError::StorageError(_)
            | AppError::ConfigError(_)
            | AppError::IoError(_)
            | AppError::EnvVarError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        }
        match self {
            AppError::Unauthenticated => HttpResponse::SeeOther()
                .append_header((header::LOCATION, "/sign-in"))
                .finish(),
            // internals stay in the log
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                HttpResponse::build(status).body("Internal server error")
            }
            _ => HttpResponse::build(status).body(self.to_string()),
        }
    }
}

impl From<AppError> for std::io::Error {
    fn from(err: AppError) -> Self {
        std::io::Error::other(err.to_string())
    }
}

/// True when the error is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &SqlxError) -> bool {
    matches!(err, SqlxError::Database(db) if db.is_unique_violation())
}
