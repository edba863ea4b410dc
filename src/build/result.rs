//! Build result types.
//!
//! Contains types for representing the outcome of build operations.

use std::path::PathBuf;
use std::time::Duration;

/// Result of building a single task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Task name that was built
    pub task: String,
    /// Sheet images written, in completion order
    pub sheets: Vec<PathBuf>,
    /// Manifest written
    pub manifest_path: PathBuf,
    /// Number of standard sprite records
    pub standard_count: usize,
    /// Number of double sprite records
    pub double_count: usize,
    /// Build duration
    pub duration: Duration,
}

impl TaskResult {
    /// Every file this task produced.
    pub fn outputs(&self) -> Vec<&PathBuf> {
        self.sheets.iter().chain(std::iter::once(&self.manifest_path)).collect()
    }

    /// Total sprite records in the manifest.
    pub fn sprite_count(&self) -> usize {
        self.standard_count + self.double_count
    }
}

/// Result of a complete build run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Results for each task
    pub tasks: Vec<TaskResult>,
    /// Total build duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create a new empty build result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task result.
    pub fn add_result(&mut self, result: TaskResult) {
        self.tasks.push(result);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Get all outputs produced.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.tasks.iter().flat_map(|r| r.outputs()).collect()
    }

    /// Format a summary of the build result.
    pub fn summary(&self) -> String {
        let sheets: usize = self.tasks.iter().map(|t| t.sheets.len()).sum();
        let sprites: usize = self.tasks.iter().map(|t| t.sprite_count()).sum();

        format!(
            "Build succeeded: {} task(s), {} sheet(s), {} sprite(s) in {:?}",
            self.tasks.len(),
            sheets,
            sprites,
            self.total_duration
        )
    }
}
