//! Coordinate normalization.
//!
//! Converts raw packer boxes into [`SpriteRecord`]s. Double-resolution boxes
//! are halved so both densities share the standard coordinate space.

use super::{Resolution, SpriteRecord, DOUBLE_MARKER};
use crate::pack::RawBox;
use std::collections::BTreeMap;
use std::path::Path;

/// Derive a sprite name from a packer key.
///
/// The basename loses its extension and, for double resolution, a trailing
/// `@2x`; the result is joined to the prefix with `-`.
pub fn sprite_name(key: &str, resolution: Resolution, prefix: &str) -> String {
    let path = Path::new(key);
    let stem = path
        .file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| key.to_string());

    let stem = match resolution {
        Resolution::Standard => stem.as_str(),
        Resolution::Double => stem.strip_suffix(DOUBLE_MARKER).unwrap_or(&stem),
    };

    format!("{}-{}", prefix, stem)
}

/// Normalize a standard-resolution mapping; coordinates are copied unchanged.
///
/// Records come out ordered by packer key.
pub fn normalize_standard(
    coordinates: &BTreeMap<String, RawBox>,
    prefix: &str,
    sheet_reference: &str,
) -> Vec<SpriteRecord> {
    coordinates
        .iter()
        .map(|(key, b)| SpriteRecord {
            name: sprite_name(key, Resolution::Standard, prefix),
            x: f64::from(b.x),
            y: f64::from(b.y),
            width: f64::from(b.width),
            height: f64::from(b.height),
            sheet_reference: sheet_reference.to_string(),
            sheet_width: None,
            sheet_height: None,
        })
        .collect()
}

/// Normalize a double-resolution mapping.
///
/// Every box component and the probed sheet size are halved. Odd values
/// produce fractional coordinates, which are kept as is.
pub fn normalize_double(
    coordinates: &BTreeMap<String, RawBox>,
    prefix: &str,
    sheet_reference: &str,
    sheet_size: (u32, u32),
) -> Vec<SpriteRecord> {
    let half = |v: u32| f64::from(v) / 2.0;
    let (sheet_width, sheet_height) = (half(sheet_size.0), half(sheet_size.1));

    coordinates
        .iter()
        .map(|(key, b)| SpriteRecord {
            name: sprite_name(key, Resolution::Double, prefix),
            x: half(b.x),
            y: half(b.y),
            width: half(b.width),
            height: half(b.height),
            sheet_reference: sheet_reference.to_string(),
            sheet_width: Some(sheet_width),
            sheet_height: Some(sheet_height),
        })
        .collect()
}
