use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use crate::state::AppState;
use crate::api::extractors::admin::AdminToken;
use crate::api::dtos::{requests::CreateEventRequest, responses::{ConnectionStatsResponse, EventDetailResponse}};
use crate::domain::models::event::{generate_public_code, Event};
use crate::error::AppError;
use std::sync::Arc;
use tracing::{info, warn};

const PUBLIC_CODE_ATTEMPTS: usize = 5;

pub fn validate_event_fields(name: &str, organizer_email: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Event name is required".into()));
    }
    let email = organizer_email.trim();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.ends_with('.'));
    if !valid_email {
        return Err(AppError::Validation("Invalid organizer email".into()));
    }
    Ok(())
}

/// Inserts the event, drawing a fresh public code whenever one is already taken.
pub async fn insert_event(
    state: &AppState,
    name: &str,
    date: DateTime<Utc>,
    organizer_email: &str,
) -> Result<Event, AppError> {
    let mut event = Event::new(name.trim().to_string(), date, organizer_email.trim().to_string());

    for _ in 0..PUBLIC_CODE_ATTEMPTS {
        if state.event_repo.find_by_public_code(&event.public_code).await?.is_none() {
            let created = state.event_repo.create(&event).await?;
            info!(event_id = %created.id, public_code = %created.public_code, "event created");
            return Ok(created);
        }
        warn!(public_code = %event.public_code, "public code collision, regenerating");
        event.public_code = generate_public_code();
    }

    Err(AppError::Conflict("Could not allocate a unique public code, please retry".into()))
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    _admin: AdminToken,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_event_fields(&payload.name, &payload.organizer_email)?;
    let event = insert_event(&state, &payload.name, payload.date, &payload.organizer_email).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    _admin: AdminToken,
) -> Result<impl IntoResponse, AppError> {
    let events = state.event_repo.list().await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    _admin: AdminToken,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = state.event_repo.find_by_id(&id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    let guests = state.guest_repo.list_by_event(&event.id).await?;
    let tables = state.guest_repo.list_tables(&event.id).await?;

    Ok(Json(EventDetailResponse {
        total_guests: guests.len(),
        total_tables: tables.len(),
        checked_in_count: guests.iter().filter(|g| g.checked_in).count(),
        event,
    }))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    _admin: AdminToken,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    info!("Deleting event: {}", id);
    state.event_repo.delete(&id).await?;
    state.upload_store.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn connection_stats(
    State(state): State<Arc<AppState>>,
    _admin: AdminToken,
) -> impl IntoResponse {
    let events = state.broadcaster.all_counts();
    Json(ConnectionStatsResponse {
        total_connections: events.values().sum(),
        events,
        timestamp: Utc::now(),
    })
}
