use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub date: DateTime<Utc>,
    pub organizer_email: String,
}

/// Body of both lookup and check-in.
#[derive(Deserialize)]
pub struct GuestNameRequest {
    pub public_code: String,
    pub name: String,
}

#[derive(Deserialize, Default)]
pub struct UpdateGuestRequest {
    pub name: Option<String>,
    pub table_name: Option<String>,
    pub seat_no: Option<i64>,
    pub dietary: Option<String>,
    pub checked_in: Option<bool>,
}

#[derive(Deserialize)]
pub struct GuestSearchQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    pub include_checkin: Option<bool>,
}

#[derive(Deserialize)]
pub struct SeatingQuery {
    #[serde(default)]
    pub include_names: bool,
    pub admin_token: Option<String>,
}

#[derive(Deserialize)]
pub struct PortalQuery {
    pub event: Option<String>,
}
