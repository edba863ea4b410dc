//! JSON renderer: the manifest payload as-is.

use super::{RenderError, Renderer};
use crate::manifest::Manifest;

/// JSON renderer.
#[derive(Debug)]
pub struct JsonRenderer {
    /// Pretty print output (with indentation)
    pub pretty: bool,
}

impl JsonRenderer {
    /// Create a pretty-printing JSON renderer.
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Create a compact JSON renderer.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for JsonRenderer {
    fn render(&self, manifest: &Manifest) -> Result<String, RenderError> {
        let mut json = if self.pretty {
            serde_json::to_string_pretty(manifest)?
        } else {
            serde_json::to_string(manifest)?
        };
        json.push('\n');
        Ok(json)
    }

    fn format_name(&self) -> &'static str {
        "json"
    }
}
