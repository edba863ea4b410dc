//! Source file discovery for the build system.
//!
//! Expands a group's glob patterns into an ordered list of files. Patterns
//! are applied in order: a plain pattern appends its matches (skipping files
//! already present) and a `!pattern` removes matching files found so far.

use glob::{glob, Pattern};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Error during source discovery.
#[derive(Debug)]
pub enum DiscoveryError {
    /// Invalid glob pattern
    InvalidPattern(String, glob::PatternError),
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryError::InvalidPattern(pattern, err) => {
                write!(f, "Invalid glob pattern '{}': {}", pattern, err)
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiscoveryError::InvalidPattern(_, err) => Some(err),
        }
    }
}

/// Discover files matching a single glob pattern, sorted.
///
/// # Arguments
/// - `base_dir` - Base directory to resolve patterns from
/// - `pattern` - Glob pattern to match
pub fn discover_files(base_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let full_pattern = base_dir.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let paths =
        glob(&pattern_str).map_err(|e| DiscoveryError::InvalidPattern(pattern.to_string(), e))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    files.push(path);
                }
            }
            Err(e) => {
                // Log but continue on glob errors
                tracing::warn!("error reading path: {}", e);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Expand an ordered list of patterns, honouring `!` exclusions.
pub fn expand_patterns(
    base_dir: &Path,
    patterns: &[String],
) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for pattern in patterns {
        if let Some(excluded) = pattern.strip_prefix('!') {
            let full = base_dir.join(excluded);
            let matcher = Pattern::new(&full.to_string_lossy())
                .map_err(|e| DiscoveryError::InvalidPattern(pattern.clone(), e))?;

            files.retain(|f| !matcher.matches_path(f));
            seen.retain(|f| !matcher.matches_path(f));
            continue;
        }

        for file in discover_files(base_dir, pattern)? {
            if seen.insert(file.clone()) {
                files.push(file);
            }
        }
    }

    Ok(files)
}
