//! Core utilities for the HFP Audio Gateway stack
//!
//! This crate provides fundamental types and utilities used across the AG stack

/// Git version string, set at compile time
pub const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");
/// Stack version followed by git version string, e.g., "0.4.2-aabbccdd"
pub const STACK_VERSION: &str = const_format::formatcp!("{}-{}", env!("CARGO_PKG_VERSION"), GIT_VERSION);

pub mod address;
pub mod debug;
pub mod parse_error;
pub mod states;
pub mod telephony;

// Re-export commonly used items
pub use address::BdAddr;
pub use parse_error::AtParseErr;
pub use states::{AudioState, ConnectionState};
pub use telephony::{CallInfo, DeviceState, HfpCallState, VolumeType};

/// Speaker and microphone gain range per HFP (AT+VGS / AT+VGM)
pub const VOLUME_MIN: i32 = 0;
pub const VOLUME_MAX: i32 = 15;
