use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{
    models::{
        event::Event,
        guest::{Guest, MAX_TABLE_SIZE},
        seating::{SeatingInfo, SeatingSummary, TableMate, TableSummary},
    },
    ports::{EventRepository, GuestRepository},
};
use crate::error::AppError;

pub struct SeatingService {
    event_repo: Arc<dyn EventRepository>,
    guest_repo: Arc<dyn GuestRepository>,
}

impl SeatingService {
    pub fn new(event_repo: Arc<dyn EventRepository>, guest_repo: Arc<dyn GuestRepository>) -> Self {
        Self { event_repo, guest_repo }
    }

    async fn event_by_code(&self, public_code: &str) -> Result<Event, AppError> {
        self.event_repo.find_by_public_code(public_code).await?
            .ok_or(AppError::NotFound("Event not found".into()))
    }

    /// Finds a guest by case-insensitive name fragment, plus everyone else at their table.
    pub async fn lookup(&self, public_code: &str, name: &str) -> Result<SeatingInfo, AppError> {
        let event = self.event_by_code(public_code).await?;
        let guest = self.guest_repo.find_first_by_name(&event.id, name).await?
            .ok_or(AppError::NotFound(
                "Guest not found. Please check your name spelling or contact the organizer.".into(),
            ))?;

        let table_mates = self.guest_repo.list_by_table(&event.id, &guest.table_name).await?
            .iter()
            .filter(|g| g.id != guest.id)
            .map(TableMate::from)
            .collect();

        Ok(SeatingInfo {
            guest_name: guest.name,
            table_name: guest.table_name,
            seat_no: guest.seat_no,
            dietary: guest.dietary,
            checked_in: guest.checked_in,
            table_mates,
        })
    }

    pub async fn summary(&self, public_code: &str, include_names: bool) -> Result<SeatingSummary, AppError> {
        let event = self.event_by_code(public_code).await?;
        let guests = self.guest_repo.list_by_event(&event.id).await?;
        Ok(summarize(&event, &guests, include_names))
    }

    /// Checks a prospective move of `guest` to another table and/or seat.
    /// Returns one message per violated rule; empty means the move is allowed.
    pub async fn check_move(
        &self,
        guest: &Guest,
        new_table: Option<&str>,
        new_seat: Option<i64>,
    ) -> Result<Vec<String>, AppError> {
        let mut errors = Vec::new();
        let table = new_table.unwrap_or(&guest.table_name);
        let seat = new_seat.unwrap_or(guest.seat_no);

        if table != guest.table_name {
            let others = self.guest_repo.count_in_table(&guest.event_id, table, Some(&guest.id)).await?;
            if others >= MAX_TABLE_SIZE as i64 {
                errors.push(format!(
                    "Table '{}' would exceed maximum capacity of {} guests",
                    table, MAX_TABLE_SIZE
                ));
            }
        }

        if (table != guest.table_name || seat != guest.seat_no)
            && self.guest_repo.seat_taken(&guest.event_id, table, seat, Some(&guest.id)).await?
        {
            errors.push(format!("Seat {} is already taken in table '{}'", seat, table));
        }

        Ok(errors)
    }
}

/// Per-table occupancy. Tables are ordered by name, guests by seat.
pub fn summarize(event: &Event, guests: &[Guest], include_names: bool) -> SeatingSummary {
    let mut by_table: BTreeMap<&str, Vec<&Guest>> = BTreeMap::new();
    for guest in guests {
        by_table.entry(guest.table_name.as_str()).or_default().push(guest);
    }

    let tables: Vec<TableSummary> = by_table
        .into_iter()
        .map(|(table_name, mut members)| {
            members.sort_by_key(|g| g.seat_no);
            let total = members.len();
            TableSummary {
                table_name: table_name.to_string(),
                total_guests: total,
                checked_in: members.iter().filter(|g| g.checked_in).count(),
                available_seats: MAX_TABLE_SIZE as i64 - total as i64,
                guests: include_names.then(|| members.iter().map(|g| TableMate::from(*g)).collect()),
            }
        })
        .collect();

    SeatingSummary {
        event_name: event.name.clone(),
        event_date: event.date,
        total_guests: guests.len(),
        checked_in_guests: guests.iter().filter(|g| g.checked_in).count(),
        total_tables: tables.len(),
        tables,
    }
}
