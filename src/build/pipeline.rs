//! Build pipeline orchestration.
//!
//! One pipeline builds one task. Each sprite group is resolved into its
//! standard and `@2x` subsets, every non-empty subset is packed on its own
//! tokio task, and a [`CompletionBarrier`] gates manifest assembly until all
//! of them (including the dimension probes the `@2x` packs register for
//! themselves) have reported.

use crate::build::{
    double_sheet_path, expand_patterns, resolve_group, BuildContext, CompletionBarrier,
    DiscoveryError, Registration, ResolvedGroup, SpriteGroup, TaskResult, WaitError,
};
use crate::config::ConfigError;
use crate::manifest::{
    normalize_double, normalize_standard, sheet_reference, Contribution, DuplicateNameError,
    Manifest, Resolution,
};
use crate::pack::{
    write_sheet, DimensionProbe, ImageProbe, PackError, PackOptions, Packer, ProbeError, RawBox,
    ShelfPacker,
};
use crate::render::{renderer_for, RenderError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Error during build execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// Invalid or unreadable configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Glob expansion failed
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// A packing operation failed
    #[error("failed to pack {}: {source}", sheet.display())]
    Packing {
        sheet: PathBuf,
        #[source]
        source: PackError,
    },
    /// A `@2x` sheet could not be measured
    #[error("failed to measure {}: {source}", sheet.display())]
    Probe {
        sheet: PathBuf,
        #[source]
        source: ProbeError,
    },
    /// A sheet or manifest could not be written
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Template loading or rendering failed
    #[error(transparent)]
    Render(#[from] RenderError),
    /// Two sprites of the same density share a name
    #[error(transparent)]
    DuplicateName(#[from] DuplicateNameError),
    /// An operation ended without reporting
    #[error("operation '{0}' ended without reporting")]
    Abandoned(String),
}

impl From<WaitError<BuildError>> for BuildError {
    fn from(e: WaitError<BuildError>) -> Self {
        match e {
            WaitError::Failed(e) => e,
            WaitError::Abandoned(label) => BuildError::Abandoned(label),
        }
    }
}

/// What one operation hands to the barrier.
#[derive(Debug, Default)]
struct Outcome {
    /// Sheet written by a packing operation
    sheet: Option<PathBuf>,
    /// Records produced for the manifest
    contribution: Option<Contribution>,
}

type OperationRegistration = Registration<Outcome, BuildError>;

/// Everything a packing operation needs, owned so it can move into a task.
#[derive(Debug, Clone)]
struct SheetJob {
    group: usize,
    files: Vec<PathBuf>,
    sheet: PathBuf,
    options: PackOptions,
    prefix: String,
    reference: String,
}

/// Build pipeline for a single task.
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
    /// Packs subsets into sheets
    packer: Arc<dyn Packer>,
    /// Measures written `@2x` sheets
    probe: Arc<dyn DimensionProbe>,
}

impl BuildPipeline {
    /// Create a pipeline using the built-in shelf packer and image probe.
    pub fn new(context: BuildContext) -> Self {
        Self { context, packer: Arc::new(ShelfPacker::new()), probe: Arc::new(ImageProbe::new()) }
    }

    /// Use a different packer.
    pub fn with_packer(mut self, packer: Arc<dyn Packer>) -> Self {
        self.packer = packer;
        self
    }

    /// Use a different dimension probe.
    pub fn with_probe(mut self, probe: Arc<dyn DimensionProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Discover sources and build the task's sprite groups, in declaration order.
    ///
    /// Nothing is packed or written.
    pub fn plan(&self) -> Result<Vec<SpriteGroup>, BuildError> {
        let task = self.context.task();

        task.sprites
            .iter()
            .enumerate()
            .map(|(index, group)| -> Result<SpriteGroup, BuildError> {
                let sheet = self.context.resolve_path(&group.image);
                let files = expand_patterns(self.context.project_root(), &group.src)?;

                if files.is_empty() {
                    tracing::warn!(
                        task = self.context.task_name(),
                        group = %group.image.display(),
                        "no source files matched"
                    );
                } else if self.context.is_verbose() {
                    for file in &files {
                        tracing::info!("  {} <- {}", group.image.display(), file.display());
                    }
                }

                Ok(SpriteGroup {
                    index,
                    id: group.image.display().to_string(),
                    files,
                    root: self.context.project_root().to_path_buf(),
                    options: self.context.pack_options(&sheet),
                    sheet,
                    reference_prefix: task.sprite_img_prefix.clone(),
                    name_prefix: task.class_prefix.clone(),
                })
            })
            .collect()
    }

    /// Run the task: pack every subset, then assemble, render and write the manifest.
    ///
    /// The first failing operation aborts the task. Sheets already written by
    /// other operations are left in place and no manifest is written.
    pub async fn run(&self) -> Result<TaskResult, BuildError> {
        let start = Instant::now();
        let task = self.context.task();
        let manifest_path = self.context.manifest_path();

        // Template errors must surface before anything is packed
        let renderer = renderer_for(task.renderer, self.context.template_path().as_deref())?;
        let groups = self.plan()?;

        let barrier = CompletionBarrier::<Outcome, BuildError>::new();
        for group in &groups {
            let ResolvedGroup { subset, prefix } = resolve_group(group);
            tracing::debug!(
                group = %group.id,
                standard = subset.standard.len(),
                double = subset.double.len(),
                operations = subset.operation_count(),
                "resolved group"
            );

            if !subset.standard.is_empty() {
                let job = SheetJob {
                    group: group.index,
                    files: subset.standard,
                    sheet: group.sheet.clone(),
                    options: group.options.clone(),
                    prefix: prefix.clone(),
                    reference: sheet_reference(
                        &group.sheet,
                        manifest_path,
                        group.reference_prefix.as_deref(),
                    ),
                };
                let registration = barrier.register(format!("pack {}", job.sheet.display()));
                tokio::spawn(standard_operation(job, Arc::clone(&self.packer), registration));
            }

            if !subset.double.is_empty() {
                let sheet = double_sheet_path(&group.sheet);
                let job = SheetJob {
                    group: group.index,
                    files: subset.double,
                    reference: sheet_reference(
                        &sheet,
                        manifest_path,
                        group.reference_prefix.as_deref(),
                    ),
                    sheet,
                    options: group.options.for_double(),
                    prefix,
                };
                let registration = barrier.register(format!("pack {}", job.sheet.display()));
                tokio::spawn(double_operation(
                    job,
                    Arc::clone(&self.packer),
                    Arc::clone(&self.probe),
                    registration,
                ));
            }
        }

        tracing::debug!(
            task = self.context.task_name(),
            groups = groups.len(),
            operations = barrier.registered(),
            "waiting for packing operations"
        );
        let outcomes = barrier.wait().await?;

        let mut sheets = Vec::new();
        let mut contributions = Vec::new();
        for outcome in outcomes {
            sheets.extend(outcome.sheet);
            contributions.extend(outcome.contribution);
        }

        let manifest = Manifest::assemble(contributions)?;
        let text = renderer.render(&manifest)?;
        write_output(manifest_path, text.as_bytes())?;
        tracing::info!("{} created.", manifest_path.display());

        Ok(TaskResult {
            task: self.context.task_name().to_string(),
            sheets,
            manifest_path: manifest_path.to_path_buf(),
            standard_count: manifest.standard.len(),
            double_count: manifest.double.len(),
            duration: start.elapsed(),
        })
    }
}

/// Pack a standard subset and report its records.
async fn standard_operation(
    job: SheetJob,
    packer: Arc<dyn Packer>,
    registration: OperationRegistration,
) {
    registration.finish(pack_standard(&job, packer.as_ref()).await);
}

async fn pack_standard(job: &SheetJob, packer: &dyn Packer) -> Result<Outcome, BuildError> {
    let coordinates = pack_and_write(packer, job).await?;
    let records = normalize_standard(&coordinates, &job.prefix, &job.reference);

    Ok(Outcome {
        sheet: Some(job.sheet.clone()),
        contribution: Some(Contribution {
            group: job.group,
            resolution: Resolution::Standard,
            records,
        }),
    })
}

/// Pack a `@2x` subset, then register and spawn the probe of its sheet.
///
/// The probe is registered before this operation reports, so the barrier
/// keeps waiting for it.
async fn double_operation(
    job: SheetJob,
    packer: Arc<dyn Packer>,
    probe: Arc<dyn DimensionProbe>,
    registration: OperationRegistration,
) {
    let coordinates = match pack_and_write(packer.as_ref(), &job).await {
        Ok(coordinates) => coordinates,
        Err(e) => return registration.fail(e),
    };

    let probe_registration = registration.register(format!("measure {}", job.sheet.display()));
    tracing::debug!(operation = probe_registration.label(), "registered");
    let sheet = job.sheet.clone();
    tokio::spawn(async move {
        let result = measure_double(&job, probe.as_ref(), &coordinates).await;
        probe_registration.finish(result);
    });

    registration.complete(Outcome { sheet: Some(sheet), contribution: None });
}

async fn measure_double(
    job: &SheetJob,
    probe: &dyn DimensionProbe,
    coordinates: &BTreeMap<String, RawBox>,
) -> Result<Outcome, BuildError> {
    let size = probe
        .dimensions(&job.sheet)
        .await
        .map_err(|source| BuildError::Probe { sheet: job.sheet.clone(), source })?;
    tracing::debug!(sheet = %job.sheet.display(), width = size.0, height = size.1, "measured");

    let records = normalize_double(coordinates, &job.prefix, &job.reference, size);
    Ok(Outcome {
        sheet: None,
        contribution: Some(Contribution { group: job.group, resolution: Resolution::Double, records }),
    })
}

async fn pack_and_write(
    packer: &dyn Packer,
    job: &SheetJob,
) -> Result<BTreeMap<String, RawBox>, BuildError> {
    tracing::debug!(
        sheet = %job.sheet.display(),
        files = job.files.len(),
        options = ?job.options,
        "packing"
    );

    let packed = packer
        .pack(&job.files, &job.options)
        .await
        .map_err(|source| BuildError::Packing { sheet: job.sheet.clone(), source })?;

    write_sheet(&job.sheet, &packed.image)
        .map_err(|source| BuildError::Write { path: job.sheet.clone(), source })?;
    tracing::info!("{} created.", job.sheet.display());

    Ok(packed.coordinates)
}

fn write_output(path: &Path, contents: &[u8]) -> Result<(), BuildError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    };
    write().map_err(|source| BuildError::Write { path: path.to_path_buf(), source })
}
