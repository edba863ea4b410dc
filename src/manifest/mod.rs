//! Manifest model and assembly.
//!
//! A [`Manifest`] holds two ordered collections of [`SpriteRecord`]s, one per
//! pixel density. Each group contributes its records (already ordered by
//! packer key); groups are concatenated in declaration order.
//!
//! # Output Format
//!
//! Serialized as JSON the manifest looks like:
//!
//! ```json
//! {
//!   "standard": [
//!     { "name": "icon-a", "x": 0, "y": 0, "width": 10, "height": 10,
//!       "sheetReference": "../img/icons.png" }
//!   ],
//!   "double": [
//!     { "name": "icon-a", "x": 0, "y": 0, "width": 10, "height": 10,
//!       "sheetReference": "../img/icons@2x.png",
//!       "sheetWidth": 20, "sheetHeight": 10.5 }
//!   ]
//! }
//! ```

pub mod normalize;
pub mod reference;

pub use normalize::*;
pub use reference::*;

use serde::{Serialize, Serializer};
use std::collections::HashSet;
use thiserror::Error;

/// Filename marker identifying double-resolution sources
pub const DOUBLE_MARKER: &str = "@2x";

/// Pixel density of a subset, sheet, or record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resolution {
    /// 1x assets
    Standard,
    /// 2x assets, marked with `@2x`
    Double,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Standard => write!(f, "standard"),
            Resolution::Double => write!(f, "double"),
        }
    }
}

/// One sprite's position inside its sheet, in standard-resolution units.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteRecord {
    pub name: String,
    #[serde(serialize_with = "serialize_coord")]
    pub x: f64,
    #[serde(serialize_with = "serialize_coord")]
    pub y: f64,
    #[serde(serialize_with = "serialize_coord")]
    pub width: f64,
    #[serde(serialize_with = "serialize_coord")]
    pub height: f64,
    pub sheet_reference: String,
    /// Half the measured `@2x` sheet width (double records only)
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_opt_coord")]
    pub sheet_width: Option<f64>,
    /// Half the measured `@2x` sheet height (double records only)
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_opt_coord")]
    pub sheet_height: Option<f64>,
}

/// Integral coordinates serialize as integers so `8.0` renders as `8`.
fn serialize_coord<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn serialize_opt_coord<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serialize_coord(v, serializer),
        None => serializer.serialize_none(),
    }
}

/// Records produced by one operation for one group and resolution.
#[derive(Debug, Clone)]
pub struct Contribution {
    /// Declaration index of the group
    pub group: usize,
    /// Density of the records
    pub resolution: Resolution,
    /// Records ordered by packer key
    pub records: Vec<SpriteRecord>,
}

/// Two sprites in one collection ended up with the same name.
#[derive(Debug, Clone, Error)]
#[error("duplicate {resolution} sprite name '{name}'")]
pub struct DuplicateNameError {
    pub name: String,
    pub resolution: Resolution,
}

/// The finished payload handed to a renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Manifest {
    /// Standard-resolution records
    pub standard: Vec<SpriteRecord>,
    /// Double-resolution records
    pub double: Vec<SpriteRecord>,
}

impl Manifest {
    /// Merge contributions into a manifest.
    ///
    /// Contributions may arrive in any completion order; they are placed by
    /// group declaration index and never re-sorted across groups.
    pub fn assemble(mut contributions: Vec<Contribution>) -> Result<Self, DuplicateNameError> {
        contributions.sort_by_key(|c| (c.group, c.resolution));

        let mut manifest = Manifest::default();
        for contribution in contributions {
            let target = match contribution.resolution {
                Resolution::Standard => &mut manifest.standard,
                Resolution::Double => &mut manifest.double,
            };
            target.extend(contribution.records);
        }

        check_unique(&manifest.standard, Resolution::Standard)?;
        check_unique(&manifest.double, Resolution::Double)?;

        Ok(manifest)
    }

    /// Total number of records across both collections.
    pub fn len(&self) -> usize {
        self.standard.len() + self.double.len()
    }

    /// Whether the manifest has no records at all.
    pub fn is_empty(&self) -> bool {
        self.standard.is_empty() && self.double.is_empty()
    }
}

fn check_unique(records: &[SpriteRecord], resolution: Resolution) -> Result<(), DuplicateNameError> {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.name.as_str()) {
            return Err(DuplicateNameError { name: record.name.clone(), resolution });
        }
    }
    Ok(())
}
