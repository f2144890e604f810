pub mod factory;
pub mod repositories;
pub mod upload_store;
pub mod xlsx;
