pub mod auth;
pub mod error;
mod items;
pub mod metrics;
mod validation;


use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::CorsConfig;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout));

    // Item routes authenticate through the CurrentUser extractor
    let item_routes = Router::new()
        .route("/items", get(items::list_items).post(items::create_item))
        .route(
            "/items/:id",
            get(items::get_item)
                .put(items::update_item)
                .patch(items::partial_update_item)
                .delete(items::delete_item),
        );

    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_endpoint))
        .nest("/api/auth", auth_routes)
        .nest("/api", item_routes)
        .layer(middleware::from_fn(metrics::metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the CORS layer. No configured origins means any origin.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::very_permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn health_check() -> &'static str {
    "OK"
}
