#![allow(dead_code)]

use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to specific origins in production

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        // Coordination API (requires a bearer token from the identity provider)
        .nest(
            "/api/v1",
            api_routes(app_state.clone()).layer(cors),
        )
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn api_routes(
    app_state: std::sync::Arc<services::AppState>,
) -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        // Representative registry
        .route(
            "/representatives",
            post(handlers::representatives::assign_representative),
        )
        .route(
            "/representatives/mine",
            get(handlers::representatives::list_my_courses),
        )
        .route(
            "/representatives/{course_code}",
            get(handlers::representatives::get_active_representative),
        )
        // Request workflow
        .route("/requests", post(handlers::requests::create_request))
        .route("/requests/mine", get(handlers::requests::list_my_requests))
        .route("/requests/inbox", get(handlers::requests::list_inbox))
        .route("/requests/stream", get(handlers::sse::request_stream))
        .route(
            "/requests/{id}/responses",
            post(handlers::requests::respond_to_request),
        )
        // Announcements
        .route(
            "/announcements",
            post(handlers::announcements::send_announcement),
        )
        .route(
            "/announcements/{id}/views",
            post(handlers::announcements::record_view),
        )
        .route(
            "/announcements/{id}/acks",
            post(handlers::announcements::record_acknowledgment),
        )
        .route(
            "/courses/{course_code}/announcements",
            get(handlers::announcements::list_announcements),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ))
}
