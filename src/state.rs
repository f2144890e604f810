use std::sync::Arc;
use governor::DefaultKeyedRateLimiter;
use crate::domain::ports::{EventRepository, GuestRepository, UploadStore};
use crate::domain::services::{
    broadcaster::Broadcaster, checkin_service::CheckInService,
    import_service::SeatingImporter, seating_service::SeatingService,
};
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub event_repo: Arc<dyn EventRepository>,
    pub guest_repo: Arc<dyn GuestRepository>,
    pub upload_store: Arc<dyn UploadStore>,
    pub broadcaster: Arc<Broadcaster>,
    pub importer: Arc<SeatingImporter>,
    pub seating_service: Arc<SeatingService>,
    pub checkin_service: Arc<CheckInService>,
    pub rate_limiter: Arc<DefaultKeyedRateLimiter<String>>,
}
