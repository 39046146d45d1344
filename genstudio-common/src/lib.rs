//! # GenStudio Common Library
//!
//! Shared code for the GenStudio service crates:
//! - Error type and result alias
//! - TOML configuration and root folder resolution
//! - Event types (`GenStudioEvent`) and the broadcast `EventBus`
//! - SSE helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
