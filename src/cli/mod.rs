//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// spritesheet - Pack images into sprite sheets and write a stylesheet manifest
#[derive(Parser)]
#[command(name = "spritesheet")]
#[command(about = "Pack images into sprite sheets, with @2x variants, and render a manifest")]
#[command(version)]
pub struct Cli {
    /// Path to spritesheet.toml (default: search upward from the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build sprite sheets and manifests
    Build {
        /// Tasks to build (default: every task, in name order)
        tasks: Vec<String>,

        /// Override packing padding in pixels
        #[arg(long)]
        padding: Option<u32>,

        /// Override the sprite name prefix
        #[arg(long)]
        class_prefix: Option<String>,

        /// Override the sheet reference prefix
        #[arg(long)]
        sprite_img_prefix: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show how each task's groups resolve, without packing anything
    Plan {
        /// Tasks to show (default: every task, in name order)
        tasks: Vec<String>,
    },
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` when verbose.
fn init_tracing(verbose: bool) {
    let default = if verbose { "spritesheet=debug" } else { "spritesheet=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A global subscriber may already be installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Entry point for the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { tasks, padding, class_prefix, sprite_img_prefix, verbose } => {
            init_tracing(verbose);
            let overrides =
                crate::config::CliOverrides { padding, class_prefix, sprite_img_prefix };
            build::run_build(cli.config.as_deref(), &tasks, &overrides, verbose)
        }
        Commands::Plan { tasks } => {
            init_tracing(false);
            build::run_plan(cli.config.as_deref(), &tasks)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_arguments() {
        let cli = Cli::try_parse_from([
            "spritesheet",
            "build",
            "web",
            "mobile",
            "--padding",
            "2",
            "--class-prefix",
            "icon",
            "--config",
            "conf/spritesheet.toml",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("conf/spritesheet.toml")));
        match cli.command {
            Commands::Build { tasks, padding, class_prefix, sprite_img_prefix, verbose } => {
                assert_eq!(tasks, vec!["web", "mobile"]);
                assert_eq!(padding, Some(2));
                assert_eq!(class_prefix.as_deref(), Some("icon"));
                assert!(sprite_img_prefix.is_none());
                assert!(verbose);
            }
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn test_parse_plan_without_tasks() {
        let cli = Cli::try_parse_from(["spritesheet", "plan"]).unwrap();
        assert!(matches!(cli.command, Commands::Plan { tasks } if tasks.is_empty()));
    }
}
