//! Audio Gateway configuration management
//!
//! This crate provides configuration loading and parsing for the AG stack:
//! - TOML configuration file parsing
//! - Protocol timer configuration (overridable for tests)
//! - The shared, validated configuration handle

pub mod ag_config;
pub mod toml_config;

pub use ag_config::*;
pub use toml_config::*;
