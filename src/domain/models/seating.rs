use serde::Serialize;
use chrono::{DateTime, Utc};

use super::guest::Guest;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TableMate {
    pub name: String,
    pub seat_no: i64,
    pub checked_in: bool,
    pub dietary: String,
}

impl From<&Guest> for TableMate {
    fn from(guest: &Guest) -> Self {
        Self {
            name: guest.name.clone(),
            seat_no: guest.seat_no,
            checked_in: guest.checked_in,
            dietary: guest.dietary.clone(),
        }
    }
}

/// What a guest sees after looking themselves up.
#[derive(Debug, Serialize, Clone)]
pub struct SeatingInfo {
    pub guest_name: String,
    pub table_name: String,
    pub seat_no: i64,
    pub dietary: String,
    pub checked_in: bool,
    pub table_mates: Vec<TableMate>,
}

#[derive(Debug, Serialize, Clone)]
pub struct TableSummary {
    pub table_name: String,
    pub total_guests: usize,
    pub checked_in: usize,
    pub available_seats: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guests: Option<Vec<TableMate>>,
}

#[derive(Debug, Serialize, Clone)]
pub struct SeatingSummary {
    pub event_name: String,
    pub event_date: DateTime<Utc>,
    pub total_guests: usize,
    pub checked_in_guests: usize,
    pub total_tables: usize,
    pub tables: Vec<TableSummary>,
}

#[derive(Debug, Clone)]
pub struct CheckInOutcome {
    pub guest: Guest,
    pub was_already_checked_in: bool,
}
