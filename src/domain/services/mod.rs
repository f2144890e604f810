pub mod broadcaster;
pub mod checkin_service;
pub mod import_service;
pub mod seating_service;
pub mod spreadsheet;
