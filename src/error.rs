use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use team_stats::{ErrorKind, HandlerError};
use thiserror::Error;

/// Startup failures.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store client error: {0}")]
    Store(#[from] postgrest_client::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// `{ data, error }` envelope wrapping every response body.
#[derive(Serialize, Debug)]
pub struct Envelope<T: Serialize> {
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

pub fn success<T: Serialize>(status: StatusCode, data: T) -> Response {
    let envelope = Envelope {
        data: Some(data),
        error: None,
    };
    (status, Json(envelope)).into_response()
}

pub fn failure(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Response {
    let envelope: Envelope<()> = Envelope {
        data: None,
        error: Some(ErrorBody {
            code: code.into(),
            message: message.into(),
        }),
    };
    (status, Json(envelope)).into_response()
}

/// Failure of one operation. Unexpected failures answer with `generic_message` only.
pub struct ApiError {
    error: HandlerError,
    generic_message: &'static str,
}

impl ApiError {
    pub fn new(error: HandlerError, generic_message: &'static str) -> Self {
        ApiError { error, generic_message }
    }

    fn status(&self) -> StatusCode {
        match self.error.kind() {
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::DuplicateRegistration => StatusCode::CONFLICT,
            ErrorKind::UnexpectedFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match self.error {
            HandlerError::UnexpectedFailure(_) => self.generic_message.to_string(),
            ref error => error.to_string(),
        };
        failure(self.status(), self.error.kind().to_string(), message)
    }
}

#[test]
fn status_test() {
    let status = |error| ApiError::new(error, "boom").status();
    assert_eq!(status(HandlerError::Unauthorized), StatusCode::UNAUTHORIZED);
    assert_eq!(status(HandlerError::StorageUnavailable), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(status(HandlerError::DuplicateRegistration("a".into())), StatusCode::CONFLICT);
    assert_eq!(
        status(HandlerError::UnexpectedFailure("relation secret_table".into())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
