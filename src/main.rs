//! Spritesheet - Command-line tool for building sprite sheets and their manifests

use std::process::ExitCode;

use spritesheet::cli;

fn main() -> ExitCode {
    cli::run()
}
