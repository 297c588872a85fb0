//! HTTP surface: public, authenticated and admin-only routes.
//!
//! Downstream resource routers (CRUD, analytics) are protected the same way
//! `/auth/me` is: `route_layer(from_fn_with_state(state, auth_middleware))`.

use crate::auth::{api as auth_api, admin_middleware, auth_middleware, AuthState};
use crate::middleware::request_logging;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

pub const SERVICE_NAME: &str = "retail-insights-api";

pub fn router(state: AuthState) -> Router {
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/auth/register", post(auth_api::register))
        .route("/auth/login", post(auth_api::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth_api::get_current_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route(
            "/auth/users",
            get(auth_api::list_users).post(auth_api::create_user),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Retail Insights API!",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
    }))
}
