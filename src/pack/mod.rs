//! Packing boundary: turns a list of image files into one sheet image.
//!
//! The [`Packer`] trait is the seam between the orchestration in
//! [`crate::build`] and whatever decides where each image sits in a sheet.
//! [`ShelfPacker`] is the built-in implementation. The [`DimensionProbe`]
//! trait measures sheets after they are written.
//!
//! # Example
//!
//! ```ignore
//! use spritesheet::pack::{PackOptions, Packer, ShelfPacker, SheetFormat};
//!
//! let options = PackOptions::new(SheetFormat::Png).with_padding(Some(2));
//! let packed = ShelfPacker::new().pack(&files, &options).await?;
//! std::fs::write("icons.png", &packed.image)?;
//! ```

pub mod probe;
pub mod shelf;

pub use probe::*;
pub use shelf::*;

use async_trait::async_trait;
use image::ImageOutputFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Sheet image encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetFormat {
    /// PNG (lossless, keeps alpha)
    Png,
    /// JPEG (alpha is dropped)
    #[serde(alias = "jpg")]
    Jpeg,
    /// GIF
    Gif,
    /// Windows bitmap
    Bmp,
}

impl SheetFormat {
    /// Parse a format from a file extension (case-insensitive, no dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_extension)
    }

    /// Canonical name of the format.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
        }
    }

    pub(crate) fn output_format(&self) -> ImageOutputFormat {
        match self {
            Self::Png => ImageOutputFormat::Png,
            Self::Jpeg => ImageOutputFormat::Jpeg(90),
            Self::Gif => ImageOutputFormat::Gif,
            Self::Bmp => ImageOutputFormat::Bmp,
        }
    }
}

impl std::fmt::Display for SheetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How sprites are arranged in a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutAlgorithm {
    /// Shelf packing, tallest sprites first, aiming for a roughly square sheet
    #[default]
    BinaryTree,
    /// One column, in input order
    TopDown,
    /// One row, in input order
    LeftRight,
}

/// Options handed to a [`Packer`] for one subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOptions {
    /// Output encoding
    pub format: SheetFormat,
    /// Padding between sprites in pixels
    pub padding: Option<u32>,
    /// Layout algorithm
    pub algorithm: LayoutAlgorithm,
    /// Maximum sheet dimensions (width, height)
    pub max_size: (u32, u32),
    /// Round sheet dimensions up to powers of two
    pub power_of_two: bool,
}

impl PackOptions {
    /// Create options with defaults for everything but the format.
    pub fn new(format: SheetFormat) -> Self {
        Self {
            format,
            padding: None,
            algorithm: LayoutAlgorithm::default(),
            max_size: (4096, 4096),
            power_of_two: false,
        }
    }

    /// Set the padding.
    pub fn with_padding(mut self, padding: Option<u32>) -> Self {
        self.padding = padding;
        self
    }

    /// Set the layout algorithm.
    pub fn with_algorithm(mut self, algorithm: LayoutAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the maximum sheet size.
    pub fn with_max_size(mut self, max_size: (u32, u32)) -> Self {
        self.max_size = max_size;
        self
    }

    /// Options for the `@2x` subset: padding doubled so it survives halving.
    pub fn for_double(&self) -> Self {
        Self { padding: self.padding.map(|p| p.saturating_mul(2)), ..self.clone() }
    }
}

/// A sprite's raw bounding box as reported by the packer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RawBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Output of one packing operation.
#[derive(Debug, Clone)]
pub struct PackedSheet {
    /// Encoded sheet image
    pub image: Vec<u8>,
    /// Box for every input, keyed by the input path as given to the packer
    pub coordinates: BTreeMap<String, RawBox>,
    /// Sheet width in pixels
    pub width: u32,
    /// Sheet height in pixels
    pub height: u32,
}

/// Error reported by a packer
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PackError {
    /// Packing was requested with no inputs
    #[error("no images to pack")]
    Empty,
    /// A source image could not be read or decoded
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// The layout does not fit in the configured maximum size
    #[error("sheet of {width}x{height} exceeds maximum size {max_width}x{max_height}")]
    TooLarge { width: u32, height: u32, max_width: u32, max_height: u32 },
    /// The sheet could not be encoded
    #[error("failed to encode sheet: {0}")]
    Encode(#[source] image::ImageError),
    /// The blocking worker panicked or was cancelled
    #[error("packing task failed: {0}")]
    Task(String),
    /// Failure reported by a custom packer
    #[error("{0}")]
    Failed(String),
}

/// Decides where every image sits in a sheet and produces the sheet image.
#[async_trait]
pub trait Packer: Send + Sync {
    /// Pack `files` into a single sheet.
    async fn pack(&self, files: &[PathBuf], options: &PackOptions)
        -> Result<PackedSheet, PackError>;
}

/// Write an encoded sheet, creating parent directories as needed.
pub fn write_sheet(path: &Path, image: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, image)
}
