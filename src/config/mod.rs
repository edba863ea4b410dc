//! Configuration module for the spritesheet build tool
//!
//! Provides types and parsing for `spritesheet.toml` task configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
