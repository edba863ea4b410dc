//! Sheet dimension probing.
//!
//! Packers are not required to report the total size of the sheet they
//! produce, so `@2x` sheets are measured after they hit the disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error measuring an image
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProbeError {
    /// The image header could not be read
    #[error("failed to read dimensions of {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// The blocking worker panicked or was cancelled
    #[error("probe task failed: {0}")]
    Task(String),
}

/// Measures the pixel size of a written image.
#[async_trait]
pub trait DimensionProbe: Send + Sync {
    /// Return `(width, height)` of the image at `path`.
    async fn dimensions(&self, path: &Path) -> Result<(u32, u32), ProbeError>;
}

/// Reads dimensions from the image header without decoding pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageProbe;

impl ImageProbe {
    /// Create a new probe.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DimensionProbe for ImageProbe {
    async fn dimensions(&self, path: &Path) -> Result<(u32, u32), ProbeError> {
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            image::image_dimensions(&path).map_err(|source| ProbeError::Image { path, source })
        })
        .await
        .map_err(|e| ProbeError::Task(e.to_string()))?
    }
}
