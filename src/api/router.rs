use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, Method, header},
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{admin_event, admin_guest, guest, health, spreadsheet, ws};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Admin: events
        .route("/api/v1/admin/events", post(admin_event::create_event).get(admin_event::list_events))
        .route("/api/v1/admin/events/{id}", get(admin_event::get_event).delete(admin_event::delete_event))
        .route("/api/v1/admin/create-event-with-excel", post(spreadsheet::create_event_with_excel))
        .route("/api/v1/admin/ws/stats", get(admin_event::connection_stats))

        // Admin: spreadsheets
        .route("/api/v1/admin/events/{id}/upload", post(spreadsheet::upload_seating))
        .route("/api/v1/admin/events/{id}/export/original.xlsx", get(spreadsheet::export_original))
        .route("/api/v1/admin/events/{id}/export/updated.xlsx", get(spreadsheet::export_updated))

        // Admin: guests
        .route("/api/v1/admin/events/{id}/guests", get(admin_guest::list_guests))
        .route("/api/v1/admin/events/{id}/guests/{guest_id}", patch(admin_guest::update_guest))

        // Public
        .route("/api/v1/events/{public_code}/template.xlsx", get(spreadsheet::event_template))
        .route("/api/v1/template/wedding_seating_template.xlsx", get(spreadsheet::general_template))
        .route("/api/v1/events/{public_code}/seating", get(guest::seating_summary))

        // Guest portal
        .route("/api/v1/guest/lookup", post(guest::lookup_guest))
        .route("/api/v1/guest/checkin", post(guest::check_in_guest))
        .route("/api/v1/guest/portal", get(guest::portal))
        .route("/api/v1/ws/events/{public_code}", get(ws::portal_socket))

        .layer(DefaultBodyLimit::max(state.config.max_upload_size))
        .layer(cors_layer(&state.config.allow_origins))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
