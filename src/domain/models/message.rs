use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::guest::Guest;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CheckInGuest {
    pub name: String,
    pub table_name: String,
    pub seat_no: i64,
    pub dietary: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct GuestSnapshot {
    pub name: String,
    pub table_name: String,
    pub seat_no: i64,
    pub dietary: String,
    pub checked_in: bool,
}

impl From<&Guest> for GuestSnapshot {
    fn from(guest: &Guest) -> Self {
        Self {
            name: guest.name.clone(),
            table_name: guest.table_name.clone(),
            seat_no: guest.seat_no,
            dietary: guest.dietary.clone(),
            checked_in: guest.checked_in,
        }
    }
}

/// Messages pushed to guest-portal sockets. Serialized as
/// `{"type": ..., "timestamp": ..., <payload>}`.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PortalMessage {
    Connection {
        message: String,
        event_code: String,
        connection_count: usize,
        timestamp: DateTime<Utc>,
    },
    SeatingUploaded {
        message: String,
        timestamp: DateTime<Utc>,
    },
    EventCreated {
        message: String,
        timestamp: DateTime<Utc>,
    },
    GuestUpdated {
        guest: GuestSnapshot,
        timestamp: DateTime<Utc>,
    },
    Checkin {
        guest: CheckInGuest,
        was_already_checked_in: bool,
        timestamp: DateTime<Utc>,
    },
    /// Heartbeat reply; echoes whatever timestamp the client sent.
    Pong {
        timestamp: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatingUpdateKind {
    Uploaded,
    EventCreated,
}

impl PortalMessage {
    pub fn seating_update(kind: SeatingUpdateKind) -> Self {
        let message = "Seating arrangement has been updated".to_string();
        let timestamp = Utc::now();
        match kind {
            SeatingUpdateKind::Uploaded => PortalMessage::SeatingUploaded { message, timestamp },
            SeatingUpdateKind::EventCreated => PortalMessage::EventCreated { message, timestamp },
        }
    }

    pub fn guest_updated(guest: &Guest) -> Self {
        PortalMessage::GuestUpdated {
            guest: GuestSnapshot::from(guest),
            timestamp: Utc::now(),
        }
    }

    pub fn checkin(guest: &Guest, was_already_checked_in: bool) -> Self {
        PortalMessage::Checkin {
            guest: CheckInGuest {
                name: guest.name.clone(),
                table_name: guest.table_name.clone(),
                seat_no: guest.seat_no,
                dietary: guest.dietary.clone(),
            },
            was_already_checked_in,
            timestamp: Utc::now(),
        }
    }
}

/// Inbound frames from a portal socket. Anything other than a ping is ignored.
#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub timestamp: Value,
}
