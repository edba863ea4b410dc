//! Spritesheet - Library for packing image groups into sprite sheets
//!
//! This library provides functionality to:
//! - Resolve image groups from glob patterns and split them into standard
//!   and `@2x` (double-resolution) subsets
//! - Pack each subset into a sheet image and write it to disk
//! - Normalize packer coordinates so both densities share one coordinate system
//! - Render a manifest (CSS, JSON, or a custom template) describing every sprite

pub mod build;
pub mod cli;
pub mod config;
pub mod manifest;
pub mod pack;
pub mod render;
