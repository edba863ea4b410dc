//! Sprite groups and their resolution subsets.
//!
//! A group is one configured sheet image plus the files matched by its glob
//! patterns. Resolving a group splits those files by the `@2x` marker and
//! settles the prefix used to name its sprites.

use crate::manifest::DOUBLE_MARKER;
use crate::pack::PackOptions;
use std::path::{Path, PathBuf};

/// A configured sprite group with its sources already discovered.
#[derive(Debug, Clone)]
pub struct SpriteGroup {
    /// Declaration index within the task
    pub index: usize,
    /// Identifier (the sheet image path as written in the config)
    pub id: String,
    /// Source files, in discovery order
    pub files: Vec<PathBuf>,
    /// Directory the source patterns were expanded from
    pub root: PathBuf,
    /// Standard sheet image path (resolved)
    pub sheet: PathBuf,
    /// Explicit sheet reference prefix
    pub reference_prefix: Option<String>,
    /// Explicit sprite name prefix
    pub name_prefix: Option<String>,
    /// Packing options for the standard subset
    pub options: PackOptions,
}

/// A group's files split by pixel density. Either side may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionSubset {
    /// Files without the `@2x` marker
    pub standard: Vec<PathBuf>,
    /// Files with the `@2x` marker
    pub double: Vec<PathBuf>,
}

impl ResolutionSubset {
    /// Number of packing operations this subset needs.
    pub fn operation_count(&self) -> usize {
        usize::from(!self.standard.is_empty()) + usize::from(!self.double.is_empty())
    }

    /// Whether neither side has files.
    pub fn is_empty(&self) -> bool {
        self.standard.is_empty() && self.double.is_empty()
    }
}

/// Output of the group resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGroup {
    /// Files split by density
    pub subset: ResolutionSubset,
    /// Prefix for sprite names
    pub prefix: String,
}

/// Whether a path belongs to the double-resolution subset.
///
/// The marker is matched anywhere in the given path, so a directory named
/// `icons@2x/` classifies every file below it as double resolution. Pass
/// paths relative to the project root; see [`partition`].
pub fn is_double(path: &Path) -> bool {
    path.to_string_lossy().contains(DOUBLE_MARKER)
}

/// Split files into standard and double subsets, keeping their order.
///
/// Only the part of each path below `root` is checked for the marker, so a
/// project living in `site@2x/` still has standard sprites.
pub fn partition(files: &[PathBuf], root: &Path) -> ResolutionSubset {
    let (double, standard) =
        files.iter().cloned().partition(|f| is_double(f.strip_prefix(root).unwrap_or(f)));
    ResolutionSubset { standard, double }
}

/// Default name prefix: the sheet's file name without extension.
pub fn default_prefix(sheet: &Path) -> String {
    sheet
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Path of the `@2x` sheet: the marker goes right before the extension.
pub fn double_sheet_path(sheet: &Path) -> PathBuf {
    let stem = default_prefix(sheet);
    let name = match sheet.extension() {
        Some(ext) => format!("{}{}.{}", stem, DOUBLE_MARKER, ext.to_string_lossy()),
        None => format!("{}{}", stem, DOUBLE_MARKER),
    };
    sheet.with_file_name(name)
}

/// Resolve a group into its subsets and name prefix. No side effects.
pub fn resolve_group(group: &SpriteGroup) -> ResolvedGroup {
    ResolvedGroup {
        subset: partition(&group.files, &group.root),
        prefix: group.name_prefix.clone().unwrap_or_else(|| default_prefix(&group.sheet)),
    }
}
