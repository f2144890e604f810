use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;

/// Seats per table. Enforced on import and on admin edits, never stored.
pub const MAX_TABLE_SIZE: usize = 12;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Table {
    pub id: String,
    pub event_id: String,
    pub table_name: String,
}

impl Table {
    pub fn new(event_id: String, table_name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id,
            table_name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Guest {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub table_name: String,
    pub seat_no: i64,
    pub dietary: String,
    pub checked_in: bool,
    pub updated_at: DateTime<Utc>,
}

impl Guest {
    pub fn new(event_id: String, name: String, table_name: String, seat_no: i64, dietary: Dietary) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id,
            name,
            table_name,
            seat_no,
            dietary: dietary.to_string(),
            checked_in: false,
            updated_at: Utc::now(),
        }
    }
}

/// Dietary classification as stored on a guest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dietary {
    None,
    Vegetarian,
    Halal,
    /// Free-text allergy note, stored as `allergies:<text>`.
    Allergies(String),
    Other(String),
}

impl Dietary {
    /// Normalizes a raw spreadsheet or form value.
    ///
    /// Already-normalized tags map to themselves, so exporting and
    /// re-importing a guest list leaves the classification unchanged.
    pub fn normalize(raw: &str) -> Self {
        let value = raw.trim().to_lowercase();
        match value.as_str() {
            "" | "nan" | "none" => Dietary::None,
            "vegetarian" | "veg" => Dietary::Vegetarian,
            "halal" => Dietary::Halal,
            _ => {
                if let Some(note) = value.strip_prefix("allergies:") {
                    Dietary::Allergies(note.to_string())
                } else if value.contains("allerg") {
                    Dietary::Allergies(value)
                } else {
                    Dietary::Other(value)
                }
            }
        }
    }
}

impl fmt::Display for Dietary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dietary::None => write!(f, "none"),
            Dietary::Vegetarian => write!(f, "vegetarian"),
            Dietary::Halal => write!(f, "halal"),
            Dietary::Allergies(note) => write!(f, "allergies:{}", note),
            Dietary::Other(value) => write!(f, "{}", value),
        }
    }
}
