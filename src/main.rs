mod api;
mod auth;
mod planner;
mod store;

use auth::{AppState, SharedState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

#[tokio::main]
async fn main() {
    // ── Open the store ─────────────────────────────────────────
    let store = store::ScheduleStore::open("schedulearn.redb")
        .expect("Failed to open store");

    if store.ensure_default_user()
        .expect("Failed to seed user")
    {
        println!("Created default admin user (admin / admin)");
    }

    // ── Shared state ───────────────────────────────────────────
    let state: SharedState = Arc::new(AppState { store });

    // ── Router ─────────────────────────────────────────────────
    let app = Router::new()
        // Calendar API (owner resolved by the auth middleware)
        .route("/api/tasks", post(api::create_schedule))
        .route("/api/events", get(api::list_events))
        .route("/api/move-task", post(api::move_event))
        .route("/api/complete-task", post(api::complete_event))
        .route("/api/delete-task", post(api::delete_event))
        .route("/api/delete-schedule", post(api::delete_schedule))
        .route("/api/user", get(api::current_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        // Auth (no token required)
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        // Static pages
        .fallback_service(ServeDir::new("public").append_index_html_on_directories(true))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // ── Start ──────────────────────────────────────────────────
    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    println!("Schedulearn server running on http://localhost:8080");
    println!("  Calendar: GET  http://localhost:8080/api/events");
    println!("  Login:    POST http://localhost:8080/api/auth/login");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
