use std::sync::Arc;

use tracing::info;

use crate::domain::{
    models::{
        guest::Guest,
        message::{PortalMessage, SeatingUpdateKind},
        seating::CheckInOutcome,
    },
    ports::{EventRepository, GuestRepository},
    services::broadcaster::Broadcaster,
};
use crate::error::AppError;

/// Guest check-in plus the live notifications that follow state changes.
pub struct CheckInService {
    event_repo: Arc<dyn EventRepository>,
    guest_repo: Arc<dyn GuestRepository>,
    broadcaster: Arc<Broadcaster>,
}

impl CheckInService {
    pub fn new(
        event_repo: Arc<dyn EventRepository>,
        guest_repo: Arc<dyn GuestRepository>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self { event_repo, guest_repo, broadcaster }
    }

    /// Marks the first guest matching `name` as checked in. Checking in twice
    /// succeeds and reports `was_already_checked_in`.
    pub async fn check_in(&self, public_code: &str, name: &str) -> Result<CheckInOutcome, AppError> {
        let event = self.event_repo.find_by_public_code(public_code).await?
            .ok_or(AppError::NotFound("Event not found".into()))?;

        let guest = self.guest_repo.find_first_by_name(&event.id, name).await?
            .ok_or(AppError::NotFound(
                "Guest not found. Please check your name spelling or contact the organizer.".into(),
            ))?;

        let was_already_checked_in = guest.checked_in;
        let guest = if was_already_checked_in {
            guest
        } else {
            self.guest_repo.mark_checked_in(&event.id, &guest.id).await?
        };

        let recipients = self.broadcaster.broadcast(
            public_code,
            &PortalMessage::checkin(&guest, was_already_checked_in),
        );
        info!(
            event_code = public_code,
            guest_id = %guest.id,
            was_already_checked_in,
            recipients,
            "guest checked in"
        );

        Ok(CheckInOutcome { guest, was_already_checked_in })
    }

    pub fn broadcast_seating_update(&self, public_code: &str, kind: SeatingUpdateKind) -> usize {
        let recipients = self.broadcaster.broadcast(public_code, &PortalMessage::seating_update(kind));
        info!(event_code = public_code, recipients, ?kind, "seating update broadcast");
        recipients
    }

    pub fn broadcast_guest_update(&self, public_code: &str, guest: &Guest) -> usize {
        self.broadcaster.broadcast(public_code, &PortalMessage::guest_updated(guest))
    }
}
