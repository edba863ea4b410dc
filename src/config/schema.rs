//! Configuration schema types for `spritesheet.toml`
//!
//! Defines the structure and validation rules for sprite sheet tasks.

use crate::pack::{LayoutAlgorithm, SheetFormat};
use crate::render::RendererKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Root of a `spritesheet.toml` file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpritesheetConfig {
    /// Named tasks, each producing one manifest
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskConfig>,
}

/// One task: a manifest plus the sprite groups it describes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Manifest output path (required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<PathBuf>,
    /// Sprite groups, in declaration order
    #[serde(default)]
    pub sprites: Vec<GroupConfig>,
    /// Prefix used instead of a relative path when referencing sheet images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite_img_prefix: Option<String>,
    /// Name prefix shared by every group (defaults to each sheet's file stem)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_prefix: Option<String>,
    /// Built-in renderer for the manifest
    #[serde(default)]
    pub renderer: RendererKind,
    /// Custom template file; takes precedence over `renderer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
    /// Options passed through to the packer
    #[serde(default)]
    pub packing: PackingConfig,
}

/// A sprite group: one sheet image built from a set of glob patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Sheet image path; its extension selects the image format
    pub image: PathBuf,
    /// Glob patterns for source images (`!pattern` excludes)
    #[serde(default)]
    pub src: Vec<String>,
}

/// Packer passthrough options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingConfig {
    /// Padding between sprites in pixels (doubled for `@2x` sheets)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
    /// Layout algorithm
    #[serde(default)]
    pub algorithm: LayoutAlgorithm,
    /// Output format, overriding the sheet's extension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<SheetFormat>,
    /// Maximum sheet dimensions [width, height]
    #[serde(default = "default_max_size")]
    pub max_size: [u32; 2],
    /// Constrain to power-of-two dimensions
    #[serde(default)]
    pub power_of_two: bool,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            padding: None,
            algorithm: LayoutAlgorithm::default(),
            format: None,
            max_size: default_max_size(),
            power_of_two: false,
        }
    }
}

fn default_max_size() -> [u32; 2] {
    [4096, 4096]
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "tasks.web.sheet")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spritesheet.toml: '{}' {}", self.field, self.message)
    }
}

impl SpritesheetConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.tasks.is_empty() {
            errors.push(ConfigValidationError {
                field: "tasks".to_string(),
                message: "must define at least one task".to_string(),
            });
        }

        for (name, task) in &self.tasks {
            errors.extend(task.validate(name));
        }

        errors
    }
}

impl TaskConfig {
    /// Validate a single task, reporting fields under `tasks.<name>`
    pub fn validate(&self, name: &str) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let field = |suffix: &str| format!("tasks.{}.{}", name, suffix);

        if self.sheet.is_none() {
            errors.push(ConfigValidationError {
                field: field("sheet"),
                message: "is required (manifest output path)".to_string(),
            });
        }

        if self.sprites.is_empty() {
            errors.push(ConfigValidationError {
                field: field("sprites"),
                message: "must contain at least one sprite group".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for (i, group) in self.sprites.iter().enumerate() {
            if group.src.is_empty() {
                errors.push(ConfigValidationError {
                    field: field(&format!("sprites[{}].src", i)),
                    message: "must contain at least one glob pattern".to_string(),
                });
            }

            if !seen.insert(&group.image) {
                errors.push(ConfigValidationError {
                    field: field(&format!("sprites[{}].image", i)),
                    message: format!("'{}' is used by more than one group", group.image.display()),
                });
            }

            if self.packing.format.is_none() && SheetFormat::from_path(&group.image).is_none() {
                errors.push(ConfigValidationError {
                    field: field(&format!("sprites[{}].image", i)),
                    message: format!(
                        "'{}' has no recognised image extension (png, jpg, jpeg, gif, bmp); set packing.format",
                        group.image.display()
                    ),
                });
            }
        }

        if self.packing.max_size[0] == 0 || self.packing.max_size[1] == 0 {
            errors.push(ConfigValidationError {
                field: field("packing.max_size"),
                message: "dimensions must be positive".to_string(),
            });
        }

        let limit = self.packing.max_size[0].min(self.packing.max_size[1]);
        if let Some(padding) = self.packing.padding.filter(|&p| p > limit) {
            errors.push(ConfigValidationError {
                field: field("packing.padding"),
                message: format!("{} exceeds the maximum sheet dimension {}", padding, limit),
            });
        }

        errors
    }
}
