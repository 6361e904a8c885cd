//! HTTP server hosting the bracket and slot endpoints

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::routes::{
    bracket_events, confirm_slot, create_bracket, decline_slot, delete_bracket, get_bracket,
    health, join_slot, leave_slot, list_brackets, list_slots, AppState,
};

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/brackets", get(list_brackets).post(create_bracket))
        .route("/brackets/:id", get(get_bracket).delete(delete_bracket))
        .route("/brackets/:id/slots", get(list_slots))
        .route("/brackets/:id/slots/:slot_id/join", post(join_slot))
        .route("/brackets/:id/slots/:slot_id/confirm", post(confirm_slot))
        .route("/brackets/:id/slots/:slot_id/leave", post(leave_slot))
        .route("/brackets/:id/slots/:slot_id/decline", post(decline_slot))
        .route("/brackets/:id/events", get(bracket_events))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until the process stops
pub async fn start_web_server(port: u16, state: AppState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

    info!("Web server listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;

    Ok(())
}
