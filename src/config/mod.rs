//! Configuration module for cms-sync.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - CLI argument merging
//! - Configuration validation

pub mod loader;
pub mod modes;
pub mod validation;

pub use loader::{AccountConfig, Config, StorageConfig, SyncConfig};
pub use modes::BackendKind;
pub use validation::validate_config;
