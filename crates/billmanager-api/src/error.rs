use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use billmanager_core::BillError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub details: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, uri: &Uri) -> Self {
        Self {
            status,
            message: message.into(),
            details: format!("uri={}", uri.path()),
        }
    }

    pub fn bad_request(message: impl Into<String>, uri: &Uri) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, uri)
    }

    pub fn from_bill_error(err: BillError, uri: &Uri) -> Self {
        Self::new(status_for(&err), err.to_string(), uri)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(err: &BillError) -> StatusCode {
    match err {
        BillError::Validation(_)
        | BillError::InvalidBillStatus(_)
        | BillError::BillAlreadyPaid
        | BillError::PaymentDate
        | BillError::UserAlreadyExists(_)
        | BillError::WrongFileType(_) => StatusCode::BAD_REQUEST,
        BillError::UserNotFound(_) | BillError::BillNotFound(_) => StatusCode::NOT_FOUND,
        BillError::ImportAborted { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        BillError::StreamRead(_) | BillError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), details = %self.details, "{}", self.message);
        } else {
            warn!(status = self.status.as_u16(), details = %self.details, "{}", self.message);
        }

        let body = ErrorDetails {
            timestamp: Utc::now(),
            message: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}
