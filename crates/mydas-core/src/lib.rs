//! Core utilities and types shared across all MyDas crates

pub mod cache;
pub mod config;
pub mod status;

// Re-export commonly used types
pub use cache::{CacheCoordinator, CacheGroupHandle, CachedValue};
pub use config::{
    ConfigError, Coordinates, DataSourceConfig, GlobalConfig, Maintainer, ServerConfig,
    SourceCapability, SourceVersion,
};
pub use status::DasStatus;
