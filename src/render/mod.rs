//! Manifest renderers.
//!
//! A renderer turns the finished [`Manifest`] into the text written to the
//! manifest output path.
//!
//! # Supported Formats
//!
//! - **CSS**: one rule per standard sprite, plus a high-density media query
//!   for `@2x` sprites
//! - **JSON**: the manifest payload as pretty-printed JSON
//! - **Template**: a user-supplied mustache-style template
//!
//! # Example
//!
//! ```ignore
//! use spritesheet::render::{renderer_for, RendererKind};
//!
//! let renderer = renderer_for(RendererKind::Css, None)?;
//! let text = renderer.render(&manifest)?;
//! ```

pub mod css;
pub mod json;
pub mod template;

pub use css::*;
pub use json::*;
pub use template::*;

use crate::manifest::Manifest;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error produced while loading a template or rendering a manifest
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
    /// The template file could not be read
    #[error("failed to read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The manifest could not be serialized
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Text output could not be formatted
    #[error("failed to format output: {0}")]
    Format(#[from] std::fmt::Error),
    /// A `{{` without a matching `}}`
    #[error("unclosed tag at byte {0}")]
    UnclosedTag(usize),
    /// A section opened but never closed
    #[error("unclosed section '{0}'")]
    UnclosedSection(String),
    /// A closing tag that does not match the open section
    #[error("unexpected closing tag '{found}' (open section: {})", .expected.as_deref().unwrap_or("none"))]
    UnexpectedClose { expected: Option<String>, found: String },
}

/// Built-in renderer selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// CSS rules
    #[default]
    Css,
    /// JSON payload
    Json,
}

/// Turns a manifest into text.
pub trait Renderer: Send + Sync {
    /// Render the manifest.
    fn render(&self, manifest: &Manifest) -> Result<String, RenderError>;

    /// Get the format name for this renderer.
    fn format_name(&self) -> &'static str;
}

/// Pick a renderer: a template file wins over the built-in kind.
pub fn renderer_for(
    kind: RendererKind,
    template: Option<&Path>,
) -> Result<Box<dyn Renderer>, RenderError> {
    if let Some(path) = template {
        return Ok(Box::new(TemplateRenderer::from_file(path)?));
    }

    Ok(match kind {
        RendererKind::Css => Box::new(CssRenderer::new()),
        RendererKind::Json => Box::new(JsonRenderer::new()),
    })
}

/// Format a coordinate without a trailing `.0` when it is integral.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
