use crate::domain::models::{event::Event, guest::{Guest, Table}};
use crate::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: &Event) -> Result<Event, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError>;
    async fn find_by_public_code(&self, public_code: &str) -> Result<Option<Event>, AppError>;
    async fn list(&self) -> Result<Vec<Event>, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait GuestRepository: Send + Sync {
    /// Deletes every table and guest of the event and inserts the given ones
    /// in a single transaction. Returns the number of guests inserted.
    async fn replace_seating(&self, event_id: &str, tables: &[Table], guests: &[Guest]) -> Result<usize, AppError>;
    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Guest>, AppError>;
    async fn list_tables(&self, event_id: &str) -> Result<Vec<Table>, AppError>;
    async fn list_by_table(&self, event_id: &str, table_name: &str) -> Result<Vec<Guest>, AppError>;
    async fn find_by_id(&self, event_id: &str, id: &str) -> Result<Option<Guest>, AppError>;
    /// Case-insensitive substring match on the guest name. Returns the first hit.
    async fn find_first_by_name(&self, event_id: &str, fragment: &str) -> Result<Option<Guest>, AppError>;
    async fn search(&self, event_id: &str, search: Option<&str>, limit: i64, offset: i64) -> Result<Vec<Guest>, AppError>;
    async fn count(&self, event_id: &str, search: Option<&str>) -> Result<i64, AppError>;
    async fn count_in_table(&self, event_id: &str, table_name: &str, exclude_guest_id: Option<&str>) -> Result<i64, AppError>;
    async fn seat_taken(&self, event_id: &str, table_name: &str, seat_no: i64, exclude_guest_id: Option<&str>) -> Result<bool, AppError>;
    async fn update(&self, guest: &Guest) -> Result<Guest, AppError>;
    async fn mark_checked_in(&self, event_id: &str, id: &str) -> Result<Guest, AppError>;
}

/// Keeps the raw bytes of the last upload per event.
#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn save_original(&self, event_id: &str, content: &[u8]) -> Result<(), AppError>;
    async fn load_original(&self, event_id: &str) -> Result<Option<Vec<u8>>, AppError>;
    async fn remove(&self, event_id: &str) -> Result<(), AppError>;
}

/// Builds a `LIKE` pattern for a case-insensitive contains match.
pub fn contains_pattern(fragment: &str) -> String {
    let escaped = fragment
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
