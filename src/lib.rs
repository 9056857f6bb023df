pub mod config;
pub mod domain;
pub mod errors;
pub mod models;
pub mod openapi;
pub mod services;
pub mod store;
pub mod utils;

// Re-export commonly used items
pub use config::AppConfig;
pub use errors::*;
pub use models::*;
pub use services::Clock;
