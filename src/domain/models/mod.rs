pub mod event;
pub mod guest;
pub mod message;
pub mod seating;
