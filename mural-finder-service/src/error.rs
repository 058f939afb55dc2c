use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Image file missing for {image_id}")]
    MissingImageFile { image_id: String },

    #[error("Failed to decode image {image_id}")]
    ImageDecode {
        image_id: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode annotated image {image_id}")]
    Encode {
        image_id: String,
        #[source]
        source: image::ImageError,
    },

    #[error("No match for the query on image {image_id}")]
    NoMatchOnImage { image_id: String },

    #[error("Word store unavailable")]
    StoreUnavailable(#[from] StoreError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Word store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cannot create database directory {}", path.display())]
    Directory {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database connection failed")]
    Connection(#[source] rusqlite::Error),

    #[error("Query failed")]
    Query(#[source] rusqlite::Error),

    #[error("Migration failed: {message}")]
    Migration { message: String },
}

/// API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ServiceError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ServiceError::InvalidInput {
            message: message.into(),
        }
    }

    /// Per-image failures are isolated: the rest of a batch keeps going.
    pub fn is_per_image(&self) -> bool {
        matches!(
            self,
            ServiceError::MissingImageFile { .. } | ServiceError::ImageDecode { .. }
        )
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            ServiceError::MissingImageFile { .. } | ServiceError::NoMatchOnImage { .. } => {
                StatusCode::NOT_FOUND
            }
            ServiceError::ImageDecode { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Encode { .. } | ServiceError::Config { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::InvalidInput { .. } => "invalid_input",
            ServiceError::MissingImageFile { .. } => "missing_image_file",
            ServiceError::ImageDecode { .. } => "image_decode_error",
            ServiceError::Encode { .. } => "encode_error",
            ServiceError::NoMatchOnImage { .. } => "no_match_on_image",
            ServiceError::StoreUnavailable(_) => "store_unavailable",
            ServiceError::Config { .. } => "config_error",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %format_error_chain(&self), "Request failed");
        }

        let response = ErrorResponse {
            message: self.to_string(),
            code: Some(self.error_code().to_string()),
        };

        (status, Json(response)).into_response()
    }
}

/// Render an error and all of its sources on one line.
pub fn format_error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServiceError::invalid_input("empty").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::MissingImageFile {
                image_id: "wall1.png".to_string()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::StoreUnavailable(StoreError::Migration {
                message: "locked".to_string()
            })
            .status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_per_image_classification() {
        assert!(
            ServiceError::MissingImageFile {
                image_id: "a.png".to_string()
            }
            .is_per_image()
        );
        assert!(!ServiceError::invalid_input("bad").is_per_image());
        assert!(
            !ServiceError::StoreUnavailable(StoreError::Migration {
                message: "x".to_string()
            })
            .is_per_image()
        );
    }

    #[test]
    fn test_format_error_chain() {
        let error = ServiceError::StoreUnavailable(StoreError::Migration {
            message: "disk full".to_string(),
        });
        assert_eq!(
            format_error_chain(&error),
            "Word store unavailable: Migration failed: disk full"
        );
    }
}
