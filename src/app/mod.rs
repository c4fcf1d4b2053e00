pub mod dashboard;
pub mod models;
