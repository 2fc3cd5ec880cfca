//! apicat-from-source - Command-line tool for compiling annotated service declarations.
//!
//! Reads a directory of Rust declarations (structs and `...Service` traits annotated with
//! `@group`, `@route`, `@code` and `@schema`) and writes two files into the output
//! directory: `routes.rs` with route registration functions and `apicat.json` describing
//! every endpoint.
//!
//! # Usage
//!
//! ```bash
//! apicat-from-source [OPTIONS] <IN_DIR> <OUT_DIR>
//! ```
//!
//! # Examples
//!
//! ```bash
//! apicat-from-source ./src/proto ./src/generated
//! apicat-from-source ./src/proto ./src/generated --proto-module crate::api -v
//! ```

use anyhow::Result;
use apicat_from_source::cli;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    // Parse once to read the verbose flag before the logger exists, validate afterwards
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("apicat-from-source starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;
    cli::run(args)?;

    info!("Generation finished successfully");

    Ok(())
}
