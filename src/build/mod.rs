//! Build pipeline for sprite sheet tasks
//!
//! Turns a task from `spritesheet.toml` into packed sheet images and a
//! rendered manifest.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Discovery**: Expand each group's glob patterns into source files
//! - **Grouping**: Split every group into standard and `@2x` subsets
//! - **Packing**: Pack each non-empty subset concurrently and write its sheet
//! - **Assembly**: Wait on the completion barrier, then assemble, render and
//!   write the manifest
//!
//! # Example
//!
//! ```ignore
//! use spritesheet::build::{BuildContext, BuildPipeline};
//! use spritesheet::config::load_config;
//!
//! let loaded = load_config(None)?;
//! let task = loaded.config.tasks["web"].clone();
//! let context = BuildContext::new("web", task, loaded.root)?;
//! let pipeline = BuildPipeline::new(context);
//!
//! let result = pipeline.run().await?;
//! println!("Wrote {} sheets", result.sheets.len());
//! ```

pub mod barrier;
pub mod context;
pub mod discovery;
pub mod group;
pub mod pipeline;
pub mod result;

pub use barrier::*;
pub use context::*;
pub use discovery::*;
pub use group::*;
pub use pipeline::*;
pub use result::*;
