pub mod auth;
pub mod config;
pub mod error;
pub mod graph;
pub mod locale;
pub mod models;
pub mod openapi;
pub mod rate_limit;
pub mod repo;
pub mod resolver;
pub mod routes;
pub mod storage;
pub mod validation;
pub mod validity;
pub mod views;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
