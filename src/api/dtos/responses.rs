use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::models::{event::Event, guest::Guest};

#[derive(Serialize)]
pub struct EventDetailResponse {
    #[serde(flatten)]
    pub event: Event,
    pub total_guests: usize,
    pub total_tables: usize,
    pub checked_in_count: usize,
}

#[derive(Serialize)]
pub struct ImportResponse {
    pub message: String,
    pub processed_count: usize,
}

#[derive(Serialize)]
pub struct EventWithImportResponse {
    #[serde(flatten)]
    pub event: Event,
    pub processed_count: usize,
}

#[derive(Serialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Serialize)]
pub struct GuestListResponse {
    pub guests: Vec<Guest>,
    pub pagination: Pagination,
}

#[derive(Serialize)]
pub struct CheckedInGuest {
    pub name: String,
    pub table_name: String,
    pub seat_no: i64,
    pub dietary: String,
    pub checked_in: bool,
}

#[derive(Serialize)]
pub struct CheckInResponse {
    pub message: String,
    pub guest: CheckedInGuest,
    pub was_already_checked_in: bool,
}

#[derive(Serialize)]
pub struct PortalResponse {
    pub event_code: String,
    pub instructions: String,
    pub lookup_url: String,
    pub checkin_url: String,
    pub websocket_url: String,
}

#[derive(Serialize)]
pub struct ConnectionStatsResponse {
    pub total_connections: usize,
    pub events: std::collections::HashMap<String, usize>,
    pub timestamp: DateTime<Utc>,
}
