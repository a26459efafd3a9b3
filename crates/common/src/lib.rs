//! Cinecut Common Utilities
//!
//! Shared infrastructure for all Cinecut crates:
//! - Error types and result aliases
//! - Rational-time and timecode arithmetic
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use config::*;
pub use error::*;
pub use time::*;
