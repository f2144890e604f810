use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use rand::{distributions::Alphanumeric, Rng};

/// Length of the public event code. 11 alphanumeric characters carry ~65 bits.
pub const PUBLIC_CODE_LEN: usize = 11;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub date: DateTime<Utc>,
    pub organizer_email: String,
    pub public_code: String,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(name: String, date: DateTime<Utc>, organizer_email: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            date,
            organizer_email,
            public_code: generate_public_code(),
            created_at: Utc::now(),
        }
    }
}

pub fn generate_public_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PUBLIC_CODE_LEN)
        .map(char::from)
        .collect()
}
