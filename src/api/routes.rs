use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{audit_middleware, make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let audit_log = state.audit_log.clone();

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        // Request id must be assigned before the trace span and audit entry read it
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(middleware::from_fn_with_state(audit_log, audit_middleware)),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/categories/resolve", post(handlers::resolve_categories))
        .route("/discover", post(handlers::discover))
        // Users
        .route("/users/register", post(handlers::register_user))
        .route("/users/:phone_number", get(handlers::get_user))
        .route("/users/:phone_number/discover", post(handlers::personalized_discover))
        .route("/users/:phone_number/preferences", put(handlers::update_preferences))
        // Audit log
        .route("/logs", get(handlers::get_logs).delete(handlers::clear_logs))
}
