//! Firebase callable wire format.
//!
//! Requests are `{"data": ...}`; replies are `{"result": ...}` on success or
//! `{"error": {"status", "message", "details"}}` on failure.

use crate::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    data: Option<T>,
}

/// Unwrap the `data` member of a callable request body. An empty body or a
/// missing `data` yields `T::default()`.
pub fn parse_data<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, CallableError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let envelope: Envelope<T> = serde_json::from_slice(body)
        .map_err(|e| CallableError::invalid_argument(format!("Invalid request body: {}", e)))?;
    Ok(envelope.data.unwrap_or_default())
}

#[derive(Debug, Serialize)]
struct ResultBody<T> {
    result: T,
}

pub struct CallableResult<T>(pub T);

impl<T: Serialize> IntoResponse for CallableResult<T> {
    fn into_response(self) -> Response {
        Json(ResultBody { result: self.0 }).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallableStatus {
    InvalidArgument,
    Internal,
}

impl CallableStatus {
    fn http_status(self) -> StatusCode {
        match self {
            Self::InvalidArgument => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CallableError {
    pub status: CallableStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CallableError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            status: CallableStatus::InvalidArgument,
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status: CallableStatus::Internal,
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Map a pipeline error; anything but bad input becomes `internal` with
    /// `internal_message` and the error text as details.
    pub fn from_error(err: &Error, internal_message: &str) -> Self {
        match err {
            Error::InvalidArgument(message) => Self::invalid_argument(message.clone()),
            other => Self::internal(internal_message, other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a CallableError,
}

impl IntoResponse for CallableError {
    fn into_response(self) -> Response {
        (self.status.http_status(), Json(ErrorBody { error: &self })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionsRequest;

    #[test]
    fn test_parse_data_unwraps_envelope() {
        let request: QuestionsRequest = parse_data(br#"{"data": {"numberOfPlayers": 4}}"#).unwrap();
        assert_eq!(request.players().unwrap(), Some(4));
    }

    #[test]
    fn test_parse_data_defaults_when_absent() {
        let empty: QuestionsRequest = parse_data(b"").unwrap();
        assert_eq!(empty.players().unwrap(), None);

        let no_data: QuestionsRequest = parse_data(b"{}").unwrap();
        assert_eq!(no_data.players().unwrap(), None);

        let null_data: QuestionsRequest = parse_data(br#"{"data": null}"#).unwrap();
        assert_eq!(null_data.players().unwrap(), None);
    }

    #[test]
    fn test_parse_data_rejects_malformed_json() {
        let err = parse_data::<QuestionsRequest>(b"{not json").unwrap_err();
        assert_eq!(err.status, CallableStatus::InvalidArgument);
    }

    #[test]
    fn test_error_mapping() {
        let bad = CallableError::from_error(
            &Error::InvalidArgument("email and questionsAndAnswers are required".to_string()),
            "Failed to generate character portrait",
        );
        assert_eq!(bad.status, CallableStatus::InvalidArgument);
        assert_eq!(bad.message, "email and questionsAndAnswers are required");
        assert_eq!(bad.details, None);

        let internal = CallableError::from_error(
            &Error::Directory("users_not_found".to_string()),
            "Failed to generate character portrait",
        );
        assert_eq!(internal.status, CallableStatus::Internal);
        assert_eq!(internal.message, "Failed to generate character portrait");
        assert!(internal.details.unwrap().contains("users_not_found"));
    }

    #[test]
    fn test_error_serializes_firebase_status_names() {
        let json = serde_json::to_value(ErrorBody {
            error: &CallableError::internal("Failed to generate questions", "boom"),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "error": {
                    "status": "INTERNAL",
                    "message": "Failed to generate questions",
                    "details": "boom"
                }
            })
        );
    }
}
