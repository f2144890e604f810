use axum::{extract::{State, Path, Query}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::admin::AdminToken;
use crate::api::dtos::{
    requests::{GuestSearchQuery, UpdateGuestRequest},
    responses::{GuestListResponse, Pagination},
};
use crate::domain::models::guest::Dietary;
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

const DEFAULT_PER_PAGE: i64 = 50;
const MAX_PER_PAGE: i64 = 100;

pub async fn list_guests(
    State(state): State<Arc<AppState>>,
    _admin: AdminToken,
    Path(event_id): Path<String>,
    Query(query): Query<GuestSearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);
    if page < 1 {
        return Err(AppError::Validation("page must be at least 1".into()));
    }
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(AppError::Validation(format!("per_page must be between 1 and {}", MAX_PER_PAGE)));
    }

    let offset = (page - 1)
        .checked_mul(per_page)
        .ok_or(AppError::Validation("page is out of range".into()))?;

    let event = state.event_repo.find_by_id(&event_id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let guests = state.guest_repo.search(&event.id, search, per_page, offset).await?;
    let total = state.guest_repo.count(&event.id, search).await?;

    Ok(Json(GuestListResponse {
        guests,
        pagination: Pagination {
            page,
            per_page,
            total,
            pages: (total + per_page - 1) / per_page,
        },
    }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn update_guest(
    State(state): State<Arc<AppState>>,
    _admin: AdminToken,
    Path((event_id, guest_id)): Path<(String, String)>,
    Json(payload): Json<UpdateGuestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let event = state.event_repo.find_by_id(&event_id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;
    let mut guest = state.guest_repo.find_by_id(&event.id, &guest_id).await?
        .ok_or(AppError::NotFound("Guest not found".into()))?;

    let new_name = non_blank(payload.name);
    let new_table = non_blank(payload.table_name);

    let errors = state.seating_service
        .check_move(&guest, new_table.as_deref(), payload.seat_no)
        .await?;
    if !errors.is_empty() {
        return Err(AppError::unprocessable("Validation failed", errors));
    }

    if let Some(name) = new_name {
        guest.name = name;
    }
    if let Some(table_name) = new_table {
        guest.table_name = table_name;
    }
    if let Some(seat_no) = payload.seat_no {
        guest.seat_no = seat_no;
    }
    if let Some(dietary) = payload.dietary {
        guest.dietary = Dietary::normalize(&dietary).to_string();
    }
    if let Some(checked_in) = payload.checked_in {
        guest.checked_in = checked_in;
    }

    let updated = state.guest_repo.update(&guest).await?;
    info!(event_id = %event.id, guest_id = %updated.id, "guest updated");

    state.checkin_service.broadcast_guest_update(&event.public_code, &updated);
    Ok(Json(updated))
}
