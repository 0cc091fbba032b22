pub mod alert;
pub mod app_config;
pub mod auth;
pub mod error;
pub mod guard;
pub mod ids;
pub mod lifecycle;
pub mod models;
pub mod openapi;
pub mod rate_limit; // in-memory rate limiting
pub mod render;
pub mod repo;
pub mod routes;
pub mod settings;
pub mod validate;

// Re-export commonly used items for tests / external users
pub use lifecycle::{Lifecycle, LifecycleError};
pub use routes::{config, AppState};
