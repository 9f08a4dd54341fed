use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{apply_security_headers, create_cors_layer};
use crate::handlers::{
    admission::scan_ticket,
    events::{create_event, get_availability, get_event, propose_bulk_allocation},
    health_check,
    sales::sell_ticket,
    stats::{event_stats, overall_stats},
    tickets::import_tickets,
    AppState,
};

pub fn create_routes(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/events", post(create_event))
        .route("/events/:id", get(get_event))
        .route("/events/:id/bulk-allocation", post(propose_bulk_allocation))
        .route("/events/:id/availability", get(get_availability))
        .route("/events/:id/tickets/import", post(import_tickets))
        .route("/events/:id/sales", post(sell_ticket))
        .route("/events/:id/scan", post(scan_ticket))
        .route("/events/:id/stats", get(event_stats))
        .route("/stats", get(overall_stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer()),
        )
        .with_state(state);

    apply_security_headers(router)
}
