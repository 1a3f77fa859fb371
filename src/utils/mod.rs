//! Shared utilities.
//!
//! - [`app_data`] - Settings file and application data directory
//! - [`encoding`] - Length-prefixed strings and fixed-width integers
//! - [`progress`] - Progress bars, no-op without the `progress` feature

pub mod app_data;
pub mod encoding;
pub mod progress;

pub use app_data::*;
pub use encoding::*;
