use std::{error::Error as StdError, sync::Arc};

use actix_web::{http::StatusCode, ResponseError};
use thiserror::Error;

/// Boxed error produced by a body source.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Why a multipart parse failed.
#[derive(Error, Debug, Clone)]
pub enum ErrorCause {
    #[error("Request content type is not multipart")]
    NotMultipart,
    #[error("Multipart content type has no boundary parameter")]
    MissingBoundary,
    #[error("Part header block was too large (max size: {limit} bytes)")]
    HeaderTooLarge { limit: usize },
    #[error("Part body was too large (max size: {limit} bytes)")]
    PartTooLarge { limit: usize },
    #[error("Multipart body ended before the final boundary")]
    Unterminated,
    #[error("Boundary delimiter was followed by unexpected bytes")]
    MalformedDelimiter,
    #[error("Error while reading request body: {0}")]
    Source(#[source] Arc<dyn StdError + Send + Sync>),
    #[error("Multipart parse was aborted")]
    Aborted,
}

/// Error type for multipart parsing.
///
/// Every failure is terminal: once returned, the parser keeps returning the
/// same cause for any further part or body request.
#[derive(Error, Debug, Clone)]
#[error(transparent)]
pub struct MultipartParseError(#[from] ErrorCause);

impl MultipartParseError {
    /// The reason parsing stopped.
    pub fn cause(&self) -> &ErrorCause {
        &self.0
    }

    /// Human readable description of the failure.
    pub fn message(&self) -> String {
        self.0.to_string()
    }

    pub fn into_cause(self) -> ErrorCause {
        self.0
    }
}

impl From<BoxError> for ErrorCause {
    fn from(error: BoxError) -> Self {
        ErrorCause::Source(Arc::from(error))
    }
}

impl ResponseError for MultipartParseError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            ErrorCause::NotMultipart => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorCause::HeaderTooLarge { .. } => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            ErrorCause::PartTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
