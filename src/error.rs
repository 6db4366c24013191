use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::error::Error;
use std::fmt;

use crate::featured::FeaturedError;
use crate::tmdb::TmdbError;

/// The primary error type for the application.
///
/// This enum consolidates all possible errors that can occur within the application,
/// providing a unified way to handle and respond to failures.
#[derive(Debug)]
pub enum AppError {
    /// For internal server errors that are not expected to be handled by the client.
    Internal(anyhow::Error),
    /// For client errors due to invalid requests.
    BadRequest(String),
    /// For when a requested resource is not found.
    NotFound(String),
    /// For when a service is temporarily unavailable.
    ServiceUnavailable(String),
    /// For errors related to database operations.
    Database(String),
    /// For when user input is invalid.
    InvalidInput(String),
    /// For when a request is not authorized.
    Unauthorized(String),
    /// For when a client has sent too many requests in a given amount of time.
    RateLimited {
        /// The number of seconds to wait before retrying the request.
        retry_after_seconds: u64,
    },
    /// For when a specific field in a request fails validation.
    ValidationError {
        /// The name of the field that failed validation.
        field: String,
        /// A message describing the validation error.
        message: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::RateLimited { retry_after_seconds } => {
                write!(f, "Rate limited. Retry after {} seconds", retry_after_seconds)
            }
            AppError::ValidationError { field, message } => {
                write!(f, "Validation error on field '{}': {}", field, message)
            }
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Internal(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message, details) = match self {
            AppError::Internal(e) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    Some(json!({ "error_id": error_id.to_string() })),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg, None)
            }
            AppError::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    Some(json!({ "details": msg })),
                )
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg, None),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            AppError::RateLimited { retry_after_seconds } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Too many requests. Please retry after {} seconds", retry_after_seconds),
                Some(json!({ "retry_after_seconds": retry_after_seconds })),
            ),
            AppError::ValidationError { field, message } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("Validation failed for field '{}'", field),
                Some(json!({ "field": field, "message": message })),
            ),
        };

        let mut body = json!({
            "error": {
                "code": error_code,
                "message": error_message,
            },
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let Some(details) = details {
            body["error"]["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
            sqlx::Error::PoolTimedOut => {
                AppError::ServiceUnavailable("Database connection pool timed out".to_string())
            }
            _ => AppError::Database(format!("Database error: {}", err)),
        }
    }
}

impl From<FeaturedError> for AppError {
    fn from(err: FeaturedError) -> Self {
        match err {
            FeaturedError::InvalidLimit(_) => AppError::ValidationError {
                field: "limit".to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl From<TmdbError> for AppError {
    fn from(err: TmdbError) -> Self {
        match err {
            TmdbError::MissingApiKey => AppError::ServiceUnavailable(err.to_string()),
            TmdbError::Decode(_) => AppError::Internal(err.into()),
            _ => AppError::ServiceUnavailable(format!("TMDB unavailable: {}", err)),
        }
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// An extension trait for `Option` that provides a convenient way to convert
/// an `Option` to a `Result` with a `NotFound` error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, AppError>`.
    ///
    /// * `Ok(T)` if the `Option` is `Some(T)`.
    /// * `Err(AppError::NotFound)` if the `Option` is `None`.
    fn ok_or_not_found(self, entity: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(format!("{} not found", entity)))
    }
}

/// Field validators shared by the request DTOs.
pub mod validation {
    use super::*;

    fn invalid(field: &str, message: String) -> AppError {
        AppError::ValidationError { field: field.to_string(), message }
    }

    /// Validates that a number is positive.
    pub fn validate_positive_number(value: Option<i64>, field: &str) -> AppResult<()> {
        if let Some(v) = value {
            if v <= 0 {
                return Err(invalid(field, format!("Value must be positive, got {}", v)));
            }
        }
        Ok(())
    }

    /// Rejects an explicit `null` for a column that cannot be cleared.
    pub fn reject_null<T>(value: &Option<Option<T>>, field: &str) -> AppResult<()> {
        if matches!(value, Some(None)) {
            return Err(invalid(field, format!("{} must not be null", field)));
        }
        Ok(())
    }

    /// Validates the character length of a string field.
    pub fn validate_length(value: &str, field: &str, min: usize, max: usize) -> AppResult<()> {
        let len = value.chars().count();
        if len < min || len > max {
            return Err(invalid(
                field,
                format!(
                    "{} must be longer than or equal to {} and shorter than or equal to {} \
                     characters",
                    field, min, max
                ),
            ));
        }
        Ok(())
    }

    /// Validates an inclusive numeric range.
    pub fn validate_range<T>(value: T, field: &str, min: T, max: T) -> AppResult<()>
    where
        T: PartialOrd + fmt::Display + Copy,
    {
        if value < min {
            return Err(invalid(field, format!("{} must not be less than {}", field, min)));
        }
        if value > max {
            return Err(invalid(field, format!("{} must not be greater than {}", field, max)));
        }
        Ok(())
    }

    /// Validates an absolute http(s) URL of bounded length.
    pub fn validate_url(value: &str, field: &str) -> AppResult<()> {
        let rest = value
            .strip_prefix("https://")
            .or_else(|| value.strip_prefix("http://"))
            .ok_or_else(|| invalid(field, format!("{} must be a URL address", field)))?;
        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() || (!host.contains('.') && !host.starts_with("localhost")) {
            return Err(invalid(field, format!("{} must be a URL address", field)));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(invalid(field, format!("{} must be a URL address", field)));
        }
        validate_length(value, field, 1, 500)
    }

    /// Validates that a score carries at most one decimal place.
    pub fn validate_one_decimal(value: f64, field: &str) -> AppResult<()> {
        let scaled = value * 10.0;
        if (scaled - scaled.round()).abs() > 1e-9 {
            return Err(invalid(
                field,
                format!("{} must be a number conforming to the specified constraints", field),
            ));
        }
        Ok(())
    }

    /// Validates an ISO-8601 date (`YYYY-MM-DD`) or RFC 3339 timestamp and returns its date.
    pub fn validate_iso_date(value: &str, field: &str) -> AppResult<chrono::NaiveDate> {
        chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .or_else(|_| chrono::DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
            .map_err(|_| invalid(field, format!("{} must be a valid ISO 8601 date string", field)))
    }
}
