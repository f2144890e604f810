use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::ports::GuestRepository;
use crate::domain::services::spreadsheet::{self, ImportError, Sheet};
use crate::error::AppError;

/// Runs validated guest-list imports and renders exports.
///
/// Imports for the same event are serialized in-process; different events
/// import concurrently.
pub struct SeatingImporter {
    guest_repo: Arc<dyn GuestRepository>,
    locks: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SeatingImporter {
    pub fn new(guest_repo: Arc<dyn GuestRepository>) -> Self {
        Self {
            guest_repo,
            locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, event_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(event_id.to_string())
            .or_default()
            .clone()
    }

    /// Forgets the event's lock unless another import still holds or awaits it.
    fn release_lock(&self, event_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock();
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(event_id);
        }
    }

    /// Number of events with an import in flight.
    pub fn active_imports(&self) -> usize {
        self.locks.lock().len()
    }

    /// Validates the whole sheet, then replaces the event's tables and guests.
    /// Returns the number of guests created.
    pub async fn import(&self, event_id: &str, sheet: &Sheet) -> Result<usize, ImportError> {
        let map = spreadsheet::validate(sheet).inspect_err(|e| {
            warn!(event_id, details = ?e.details(), "guest list rejected");
        })?;
        let plan = spreadsheet::plan_import(sheet, &map, event_id)?;

        let lock = self.lock_for(event_id);
        let replaced = {
            let _guard = lock.lock().await;
            self.guest_repo
                .replace_seating(event_id, &plan.tables, &plan.guests)
                .await
        };
        self.release_lock(event_id, lock);

        let processed_count = replaced.map_err(|e| {
            error!(event_id, error = %e, "seating replacement failed");
            ImportError::Processing(e.to_string())
        })?;

        info!(event_id, processed_count, tables = plan.tables.len(), "guest list imported");
        Ok(processed_count)
    }

    pub async fn export(&self, event_id: &str, include_checkin: bool) -> Result<Sheet, AppError> {
        let guests = self.guest_repo.list_by_event(event_id).await?;
        Ok(spreadsheet::export_sheet(&guests, include_checkin))
    }
}
