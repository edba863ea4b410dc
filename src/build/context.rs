//! Build context containing configuration and paths for one task.

use crate::config::{ConfigError, TaskConfig};
use crate::pack::{PackOptions, SheetFormat};
use std::path::{Path, PathBuf};

/// Build context for a single task.
///
/// The context carries the validated task configuration and the project
/// root that every relative path in it resolves against.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Task name (key under `[tasks]`)
    task_name: String,
    /// The validated task configuration
    task: TaskConfig,
    /// Project root directory (where spritesheet.toml is located)
    project_root: PathBuf,
    /// Resolved manifest output path
    manifest_path: PathBuf,
    /// Whether to run in verbose mode
    verbose: bool,
}

impl BuildContext {
    /// Create a new build context, validating the task.
    ///
    /// # Arguments
    /// - `task_name` - Name used in log lines and error messages
    /// - `task` - The task configuration
    /// - `project_root` - The project root directory
    pub fn new(
        task_name: impl Into<String>,
        task: TaskConfig,
        project_root: PathBuf,
    ) -> Result<Self, ConfigError> {
        let task_name = task_name.into();
        let errors = task.validate(&task_name);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors.iter().map(|e| e.to_string()).collect()));
        }

        let manifest_path = match &task.sheet {
            Some(sheet) => resolve(&project_root, sheet),
            None => {
                let message = format!("tasks.{}.sheet is required", task_name);
                return Err(ConfigError::Validation(vec![message]));
            }
        };

        Ok(Self { task_name, task, project_root, manifest_path, verbose: false })
    }

    /// Get the task name.
    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// Get the task configuration.
    pub fn task(&self) -> &TaskConfig {
        &self.task
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Path the rendered manifest is written to.
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Template file, if the task configures one.
    pub fn template_path(&self) -> Option<PathBuf> {
        self.task.template.as_deref().map(|t| self.resolve_path(t))
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    /// If relative, joins it with the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        resolve(&self.project_root, path)
    }

    /// Packing options for the standard sheet at `sheet`.
    ///
    /// An explicit `packing.format` wins over the sheet's extension.
    pub fn pack_options(&self, sheet: &Path) -> PackOptions {
        let packing = &self.task.packing;
        let format = packing
            .format
            .or_else(|| SheetFormat::from_path(sheet))
            .unwrap_or(SheetFormat::Png);

        let mut options = PackOptions::new(format)
            .with_padding(packing.padding)
            .with_algorithm(packing.algorithm)
            .with_max_size((packing.max_size[0], packing.max_size[1]));
        options.power_of_two = packing.power_of_two;
        options
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
