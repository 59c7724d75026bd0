//! HTTP-facing error type
//!
//! Every handler error ends up here and is rendered as `{"message": ...}`.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::auth::AuthError;
use crate::services::v1::note::NoteError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    BadGateway { message: String },

    #[error("{message}")]
    ServiceUnavailable { message: String },

    #[error("{message}")]
    InternalServerError { message: String },
}

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

impl Error {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            Error::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            message: self.to_string(),
        })
    }
}

impl From<AuthError> for Error {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Unavailable { .. } => Error::ServiceUnavailable {
                message: error.to_string(),
            },
            AuthError::Transport(_) => Error::BadGateway {
                message: error.to_string(),
            },
        }
    }
}

impl From<NoteError> for Error {
    fn from(error: NoteError) -> Self {
        match error {
            NoteError::EmptyTitle => Error::BadRequest {
                message: error.to_string(),
            },
            NoteError::Storage { .. } | NoteError::Outbox(_) => {
                tracing::error!(error = %error, "Note operation failed");
                Error::InternalServerError {
                    message: "Internal server error".to_string(),
                }
            }
        }
    }
}
