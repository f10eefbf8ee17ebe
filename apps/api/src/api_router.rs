mod cors;

#[cfg(test)]
mod tests;

use axum::Router;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use campus_core::AppError;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let cors_layer = cors::build_cors_layer(frontend_url)?;

    let record_routes = Router::new()
        .route(
            "/api/entities/{entity_type}/records",
            get(handlers::records::list_records_handler)
                .post(handlers::records::create_record_handler),
        )
        .route(
            "/api/entities/{entity_type}/records/update-matching",
            post(handlers::records::update_matching_records_handler),
        )
        .route(
            "/api/entities/{entity_type}/records/{entity_id}",
            get(handlers::records::get_record_handler)
                .put(handlers::records::update_record_handler),
        )
        .route(
            "/api/entities/{entity_type}/records/{entity_id}/archive",
            post(handlers::records::archive_record_handler),
        )
        .route(
            "/api/entities/{entity_type}/archive",
            get(handlers::records::list_archived_records_handler),
        )
        .route(
            "/api/entities/{entity_type}/archive/{entity_id}/restore",
            post(handlers::records::restore_record_handler),
        )
        .route_layer(from_fn(middleware::resolve_write_scope));

    let audit_routes = Router::new()
        .route(
            "/api/audit-log",
            get(handlers::audit::list_audit_log_handler),
        )
        .route(
            "/api/audit-log/records/{audit_id}",
            get(handlers::audit::get_audit_record_handler),
        )
        .route(
            "/api/audit-log/{entity_type}/{entity_id}",
            get(handlers::audit::entity_audit_history_handler),
        );

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(record_routes)
        .merge(audit_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state))
}
