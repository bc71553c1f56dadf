//! HTTP surface: Firebase-callable endpoints plus the token-protected
//! plain HTTP variant of the question generator.

pub mod callable;
pub mod handlers;

use crate::app::App;
use crate::Result;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(app: Arc<App>) -> Router {
    let callables = Router::new()
        .route(
            "/generatePlayerQuestions",
            post(handlers::generate_player_questions),
        )
        .route(
            "/generateCharacterPortrait",
            post(handlers::generate_character_portrait),
        )
        .layer(CorsLayer::permissive());

    // The HTTP variant sets its own CORS headers, including on 401s.
    Router::new()
        .merge(callables)
        .route(
            "/generatePlayerQuestionsHttp",
            get(handlers::generate_player_questions_http)
                .post(handlers::generate_player_questions_http)
                .options(handlers::generate_player_questions_http),
        )
        .route("/healthz", get(handlers::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

/// Serve until Ctrl-C.
pub async fn serve(app: Arc<App>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(app))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    info!("Server shut down");
    Ok(())
}
