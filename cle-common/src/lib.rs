//! # Contract Leakage Engine Common Library
//!
//! Shared code for the Contract Leakage Engine services:
//! - Error type and result alias
//! - TOML configuration loading with environment overrides
//! - Upload event types and the broadcast EventBus
//! - Server-Sent Events streaming of bus events
//! - Human-readable time display

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod sse;

pub use error::{Error, Result};
