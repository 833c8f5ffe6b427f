pub mod api;
pub mod config;
pub mod db;
pub mod emails;
pub mod mailer;
pub mod reservations;
pub mod telemetry;
