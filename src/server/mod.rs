mod handlers;
mod state;

use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/cities", get(handlers::cities))
        .route("/api/districts", get(handlers::districts))
        .route("/api/district/{id}", get(handlers::district_detail))
        .route("/api/district/{id}/details", post(handlers::update_district_detail))
        .route("/api/districts/{id}/places", get(handlers::district_places))
        .route("/api/register", post(handlers::register))
        .route("/api/login", post(handlers::login))
        .route("/api/verify", get(handlers::verify))
        .route("/api/routes", get(handlers::list_routes).post(handlers::create_route))
        .route("/api/routes/{id}", delete(handlers::delete_route))
        .route("/api/routes/{id}/join", post(handlers::join_route))
        .route("/api/routes/{id}/leave", delete(handlers::leave_route))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, state: Arc<AppState>) {
    let app = build_router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: Cannot bind to {}: {}", addr, e);
            std::process::exit(1);
        });

    eprintln!("  Gezgin server listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Server error: {}", e);
            std::process::exit(1);
        });
}
