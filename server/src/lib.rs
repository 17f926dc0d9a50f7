pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod raw_sql;
pub mod schema;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod validation;
