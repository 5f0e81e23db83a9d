use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::certificate::ValidationError;
use crate::cipher::CipherError;
use crate::pdf::RenderError;

/// Everything a handler can fail with, mapped onto the JSON error envelope.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to decrypt certificate data")]
    Decryption(#[from] CipherError),

    #[error("Failed to decode decrypted certificate data")]
    PayloadDecoding(#[source] serde_json::Error),

    #[error("Failed to generate certificate")]
    Render(#[from] RenderError),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) | AppError::Decryption(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::PayloadDecoding(_) | AppError::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) => None,
            AppError::Decryption(e) => Some(e.to_string()),
            AppError::PayloadDecoding(e) => Some(e.to_string()),
            AppError::Render(e) => Some(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}: {:?}", self, self.details());
        } else {
            tracing::warn!("Rejected certificate request: {}", self);
        }

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}
