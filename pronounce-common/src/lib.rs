//! # Pronounce Common Library
//!
//! Shared code for the pronunciation assessment service:
//! - Error and result types
//! - Configuration loading (TOML bootstrap, environment secrets, defaults)
//! - Tick-based timing conversions for service-reported offsets

pub mod config;
pub mod error;
pub mod timing;

pub use error::{Error, Result};
