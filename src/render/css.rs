//! CSS renderer.
//!
//! Emits one class per standard sprite. When `@2x` sprites exist, a
//! high-density media query overrides the image, position and
//! `background-size` for each of them.
//!
//! # Example Output
//!
//! ```css
//! .icon-a {
//!   background: url(../img/icons.png) 0 -16px no-repeat;
//!   width: 16px;
//!   height: 16px;
//! }
//!
//! @media (-webkit-min-device-pixel-ratio: 2), (min-resolution: 192dpi) {
//!   .icon-a {
//!     background-image: url(../img/icons@2x.png);
//!     background-position: 0 -16px;
//!     background-size: 16px 32px;
//!   }
//! }
//! ```

use super::{format_number, RenderError, Renderer};
use crate::manifest::Manifest;
use std::fmt::{self, Write};

/// High-density media query used for `@2x` rules
pub const HIGH_DENSITY_QUERY: &str =
    "@media (-webkit-min-device-pixel-ratio: 2), (min-resolution: 192dpi)";

/// CSS renderer.
#[derive(Debug, Default)]
pub struct CssRenderer;

impl CssRenderer {
    /// Create a new CSS renderer.
    pub fn new() -> Self {
        Self
    }
}

/// Background offset: `0` or a negative pixel value.
fn offset(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("-{}px", format_number(value))
    }
}

/// Write the stylesheet for `manifest` to `out`.
fn write_css<W: Write>(manifest: &Manifest, out: &mut W) -> fmt::Result {
    for record in &manifest.standard {
        writeln!(out, ".{} {{", record.name)?;
        writeln!(
            out,
            "  background: url({}) {} {} no-repeat;",
            record.sheet_reference,
            offset(record.x),
            offset(record.y)
        )?;
        writeln!(out, "  width: {}px;", format_number(record.width))?;
        writeln!(out, "  height: {}px;", format_number(record.height))?;
        writeln!(out, "}}")?;
        writeln!(out)?;
    }

    if manifest.double.is_empty() {
        return Ok(());
    }

    writeln!(out, "{} {{", HIGH_DENSITY_QUERY)?;
    for record in &manifest.double {
        writeln!(out, "  .{} {{", record.name)?;
        writeln!(out, "    background-image: url({});", record.sheet_reference)?;
        writeln!(out, "    background-position: {} {};", offset(record.x), offset(record.y))?;
        if let (Some(w), Some(h)) = (record.sheet_width, record.sheet_height) {
            writeln!(
                out,
                "    background-size: {}px {}px;",
                format_number(w),
                format_number(h)
            )?;
        }
        writeln!(out, "  }}")?;
    }
    writeln!(out, "}}")
}

impl Renderer for CssRenderer {
    fn render(&self, manifest: &Manifest) -> Result<String, RenderError> {
        let mut output = String::new();
        write_css(manifest, &mut output)?;
        Ok(output)
    }

    fn format_name(&self) -> &'static str {
        "css"
    }
}
