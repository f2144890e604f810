use axum::{extract::{State, Path, Query}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::client_ip::RateLimited;
use crate::api::dtos::{
    requests::{GuestNameRequest, PortalQuery, SeatingQuery},
    responses::{CheckInResponse, CheckedInGuest, PortalResponse},
};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

fn required_name(payload: &GuestNameRequest) -> Result<&str, AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }
    Ok(name)
}

pub async fn seating_summary(
    State(state): State<Arc<AppState>>,
    _limit: RateLimited,
    Path(public_code): Path<String>,
    Query(query): Query<SeatingQuery>,
) -> Result<impl IntoResponse, AppError> {
    let include_names = query.include_names
        && query.admin_token.as_deref() == Some(state.config.admin_token.as_str());

    let summary = state.seating_service.summary(&public_code, include_names).await?;
    Ok(Json(summary))
}

pub async fn lookup_guest(
    State(state): State<Arc<AppState>>,
    RateLimited(client_ip): RateLimited,
    Json(payload): Json<GuestNameRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!(event_code = %payload.public_code, %client_ip, "guest lookup");
    let name = required_name(&payload)?;
    let info = state.seating_service.lookup(&payload.public_code, name).await?;
    Ok(Json(info))
}

pub async fn check_in_guest(
    State(state): State<Arc<AppState>>,
    RateLimited(client_ip): RateLimited,
    Json(payload): Json<GuestNameRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!(event_code = %payload.public_code, %client_ip, "guest check-in");
    let name = required_name(&payload)?;
    let outcome = state.checkin_service.check_in(&payload.public_code, name).await?;

    let message = if outcome.was_already_checked_in {
        "You were already checked in!"
    } else {
        "Successfully checked in!"
    };

    let guest = outcome.guest;
    Ok(Json(CheckInResponse {
        message: message.to_string(),
        guest: CheckedInGuest {
            name: guest.name,
            table_name: guest.table_name,
            seat_no: guest.seat_no,
            dietary: guest.dietary,
            checked_in: guest.checked_in,
        },
        was_already_checked_in: outcome.was_already_checked_in,
    }))
}

pub async fn portal(Query(query): Query<PortalQuery>) -> Result<impl IntoResponse, AppError> {
    let event_code = query.event
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or(AppError::Validation("Event code is required".into()))?;

    Ok(Json(PortalResponse {
        instructions: "Use the lookup endpoint to find your seating information".to_string(),
        lookup_url: "/api/v1/guest/lookup".to_string(),
        checkin_url: "/api/v1/guest/checkin".to_string(),
        websocket_url: format!("/api/v1/ws/events/{}", event_code),
        event_code,
    }))
}
