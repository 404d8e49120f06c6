//! Shared infrastructure: errors, configuration and input contracts.
//!
//! Nothing here depends on the painting modules.

pub mod config;
pub mod contracts;
pub mod errors;

pub use config::PaintConfig;
pub use errors::PaintError;
