pub mod admin_event;
pub mod admin_guest;
pub mod guest;
pub mod health;
pub mod spreadsheet;
pub mod ws;
