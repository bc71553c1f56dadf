use super::callable::{parse_data, CallableError, CallableResult};
use crate::app::App;
use crate::auth::bearer_token;
use crate::models::{PortraitRequest, PortraitResponse, QuestionsRequest, QuestionsResponse};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

const QUESTIONS_FAILED: &str = "Failed to generate questions";
const PORTRAIT_FAILED: &str = "Failed to generate character portrait";

pub async fn generate_player_questions(
    State(app): State<Arc<App>>,
    body: Bytes,
) -> Result<CallableResult<QuestionsResponse>, CallableError> {
    let request: QuestionsRequest = parse_data(&body)?;
    app.generate_player_questions(&request)
        .await
        .map(CallableResult)
        .map_err(|e| {
            error!("Error generating questions: {}", e);
            CallableError::from_error(&e, QUESTIONS_FAILED)
        })
}

pub async fn generate_character_portrait(
    State(app): State<Arc<App>>,
    body: Bytes,
) -> Result<CallableResult<PortraitResponse>, CallableError> {
    let request: PortraitRequest = parse_data(&body)?;
    app.generate_character_portrait(&request)
        .await
        .map(CallableResult)
        .map_err(|e| {
            error!("Error generating character portrait: {}", e);
            CallableError::from_error(&e, PORTRAIT_FAILED)
        })
}

/// Question generator for callers outside the Firebase SDK, authenticated
/// with a Google identity token or a Firebase ID token.
pub async fn generate_player_questions_http(
    State(app): State<Arc<App>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut response = if method == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        questions_http(&app, &headers, &body).await
    };
    let cors = response.headers_mut();
    cors.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    cors.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    cors.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    response
}

async fn questions_http(app: &App, headers: &HeaderMap, body: &[u8]) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let Some(token) = bearer_token(authorization) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Missing or invalid Authorization header" })),
        )
            .into_response();
    };

    if let Err(e) = app.verify_token(token).await {
        warn!("Rejected bearer token: {}", e);
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "Invalid or unverifiable token",
                "message": "Token must be either a valid GCP identity token or Firebase ID token"
            })),
        )
            .into_response();
    }

    let request = if body.iter().all(u8::is_ascii_whitespace) {
        QuestionsRequest::default()
    } else {
        match serde_json::from_slice::<QuestionsRequest>(body) {
            Ok(request) => request,
            Err(e) => return invalid_request(e.to_string()),
        }
    };

    match app.generate_player_questions(&request).await {
        Ok(result) => Json(result).into_response(),
        Err(e) if e.is_invalid_argument() => invalid_request(e.to_string()),
        Err(e) => {
            error!("Error generating questions: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": QUESTIONS_FAILED, "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn invalid_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Invalid request", "message": message })),
    )
        .into_response()
}

pub async fn healthz() -> &'static str {
    "ok"
}
