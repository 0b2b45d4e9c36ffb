//! Fact-check Common Library
//!
//! Shared code for the public news reader including:
//! - Database entities and the store accessor
//! - Response cache (Redis or in-process) and its JSON wrapper
//! - The news read path: timeline, search, and article detail
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod news;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use db::{NewsStore, Repository};
pub use cache::ResponseCache;
pub use news::NewsService;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
