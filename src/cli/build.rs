//! Build and plan command implementations

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::build::{double_sheet_path, resolve_group, BuildContext, BuildPipeline, BuildResult};
use crate::config::{
    load_config, merge_cli_overrides, CliOverrides, LoadedConfig, SpritesheetConfig,
};
use crate::manifest::sheet_reference;

/// Pick the tasks to run.
///
/// No names selects every task in name order. Named tasks keep the order
/// given, without repeats. Returns the first unknown name as the error.
pub(crate) fn select_tasks(
    config: &SpritesheetConfig,
    names: &[String],
) -> Result<Vec<String>, String> {
    if names.is_empty() {
        return Ok(config.tasks.keys().cloned().collect());
    }

    let mut selected: Vec<String> = Vec::new();
    for name in names {
        if !config.tasks.contains_key(name) {
            return Err(name.clone());
        }
        if !selected.contains(name) {
            selected.push(name.clone());
        }
    }
    Ok(selected)
}

/// Load the config and resolve task names, reporting failures as exit codes.
fn prepare(
    config_path: Option<&Path>,
    names: &[String],
) -> Result<(LoadedConfig, Vec<String>), ExitCode> {
    let loaded = match load_config(config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };

    match select_tasks(&loaded.config, names) {
        Ok(selected) => Ok((loaded, selected)),
        Err(unknown) => {
            eprintln!("Error: Unknown task '{}'", unknown);
            let available: Vec<&str> = loaded.config.tasks.keys().map(String::as_str).collect();
            eprintln!("Available tasks: {}", available.join(", "));
            Err(ExitCode::from(EXIT_INVALID_ARGS))
        }
    }
}

fn context_for(loaded: &LoadedConfig, name: &str) -> Result<BuildContext, ExitCode> {
    let Some(task) = loaded.config.tasks.get(name) else {
        eprintln!("Error: Unknown task '{}'", name);
        return Err(ExitCode::from(EXIT_INVALID_ARGS));
    };

    BuildContext::new(name, task.clone(), loaded.root.clone()).map_err(|e| {
        eprintln!("Error in task '{}': {}", name, e);
        ExitCode::from(EXIT_ERROR)
    })
}

/// Run the build command
pub fn run_build(
    config_path: Option<&Path>,
    names: &[String],
    overrides: &CliOverrides,
    verbose: bool,
) -> ExitCode {
    use tokio::runtime::Runtime;

    let (mut loaded, selected) = match prepare(config_path, names) {
        Ok(prepared) => prepared,
        Err(code) => return code,
    };
    merge_cli_overrides(&mut loaded.config, overrides);

    if verbose {
        println!("Using config: {}", loaded.path.display());
    }

    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create async runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let start = Instant::now();
    let mut result = BuildResult::new();

    for name in &selected {
        let context = match context_for(&loaded, name) {
            Ok(context) => context.with_verbose(verbose),
            Err(code) => return code,
        };

        println!("Building task '{}'...", name);
        match rt.block_on(BuildPipeline::new(context).run()) {
            Ok(task_result) => {
                if verbose {
                    println!(
                        "  {} standard, {} double sprite(s) in {:?}",
                        task_result.standard_count, task_result.double_count, task_result.duration
                    );
                }
                result.add_result(task_result);
            }
            Err(e) => {
                eprintln!("Build error in task '{}': {}", name, e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }

    println!("{}", result.with_duration(start.elapsed()).summary());
    ExitCode::from(EXIT_SUCCESS)
}

/// Run the plan command: show how groups resolve without packing
pub fn run_plan(config_path: Option<&Path>, names: &[String]) -> ExitCode {
    let (loaded, selected) = match prepare(config_path, names) {
        Ok(prepared) => prepared,
        Err(code) => return code,
    };

    let display = |path: &Path| -> String {
        path.strip_prefix(&loaded.root).unwrap_or(path).display().to_string()
    };

    for name in &selected {
        let context = match context_for(&loaded, name) {
            Ok(context) => context,
            Err(code) => return code,
        };
        let manifest_path = context.manifest_path().to_path_buf();
        let pipeline = BuildPipeline::new(context);

        let groups = match pipeline.plan() {
            Ok(groups) => groups,
            Err(e) => {
                eprintln!("Error in task '{}': {}", name, e);
                return ExitCode::from(EXIT_ERROR);
            }
        };

        println!("Task '{}' -> {}", name, display(&manifest_path));
        for group in &groups {
            let resolved = resolve_group(group);
            println!("  Group {} (prefix '{}')", group.id, resolved.prefix);

            let sides = [
                ("standard", &resolved.subset.standard, group.sheet.clone()),
                ("double", &resolved.subset.double, double_sheet_path(&group.sheet)),
            ];
            for (label, files, sheet) in sides {
                if files.is_empty() {
                    println!("    {:<8} (none)", label);
                    continue;
                }
                let reference =
                    sheet_reference(&sheet, &manifest_path, group.reference_prefix.as_deref());
                println!(
                    "    {:<8} {} file(s) -> {} (url: {})",
                    label,
                    files.len(),
                    display(&sheet),
                    reference
                );
            }
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn config() -> SpritesheetConfig {
        parse_config(
            r#"
[tasks.web]
sheet = "css/web.css"
[[tasks.web.sprites]]
image = "img/web.png"
src = ["web/*.png"]

[tasks.admin]
sheet = "css/admin.css"
[[tasks.admin.sprites]]
image = "img/admin.png"
src = ["admin/*.png"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_select_all_tasks_in_name_order() {
        assert_eq!(select_tasks(&config(), &[]).unwrap(), vec!["admin", "web"]);
    }

    #[test]
    fn test_select_named_tasks_keeps_order() {
        let names = vec!["web".to_string(), "admin".to_string(), "web".to_string()];
        assert_eq!(select_tasks(&config(), &names).unwrap(), vec!["web", "admin"]);
    }

    #[test]
    fn test_select_unknown_task() {
        let names = vec!["web".to_string(), "mobile".to_string()];
        assert_eq!(select_tasks(&config(), &names).unwrap_err(), "mobile");
    }
}
