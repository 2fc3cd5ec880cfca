use crate::compiler::compile_dir;
use crate::route_template::{RouteTemplater, DEFAULT_PROTO_MODULE, DEFAULT_RUNTIME_CRATE};
use crate::serializer::{serialize_json, write_to_file};
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the generated route registration source.
pub const ROUTES_FILE: &str = "routes.rs";
/// File name of the generated apicat document.
pub const DOCUMENT_FILE: &str = "apicat.json";

/// apicat-from-source - Generate route bindings and an apicat document from annotated service declarations
#[derive(Parser, Debug)]
#[command(name = "apicat-from-source")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Directory containing the annotated declarations
    #[arg(value_name = "IN_DIR")]
    pub in_dir: PathBuf,

    /// Directory the generated files are written to
    #[arg(value_name = "OUT_DIR")]
    pub out_dir: PathBuf,

    /// Module path of the service traits in generated code (defaults to crate::<IN_DIR name>)
    #[arg(long = "proto-module", value_name = "PATH")]
    pub proto_module: Option<String>,

    /// Crate providing the `handle` adapter used by generated routes
    #[arg(long = "runtime-crate", value_name = "NAME", default_value = DEFAULT_RUNTIME_CRATE)]
    pub runtime_crate: String,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.in_dir.exists() {
        anyhow::bail!("Input directory does not exist: {}", args.in_dir.display());
    }
    if !args.in_dir.is_dir() {
        anyhow::bail!("Input path is not a directory: {}", args.in_dir.display());
    }

    info!("Input directory: {}", args.in_dir.display());
    info!("Output directory: {}", args.out_dir.display());
    Ok(args)
}

/// Module path used for the service traits when `--proto-module` is not given.
pub fn default_proto_module(in_dir: &Path) -> String {
    in_dir
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.replace(['-', '.', ' '], "_"))
        .filter(|name| !name.is_empty())
        .map(|name| format!("crate::{}", name))
        .unwrap_or_else(|| DEFAULT_PROTO_MODULE.to_string())
}

/// Run the main workflow
///
/// Both artifacts are rendered in memory first; nothing is written when compilation fails.
pub fn run(args: CliArgs) -> Result<()> {
    info!("Compiling declarations...");
    let compilation = compile_dir(&args.in_dir)
        .with_context(|| format!("Failed to compile declarations in {}", args.in_dir.display()))?;

    let proto_module = args
        .proto_module
        .clone()
        .unwrap_or_else(|| default_proto_module(&args.in_dir));
    debug!("Service traits resolved from module {}", proto_module);

    let routes = RouteTemplater::new(proto_module, args.runtime_crate.as_str())
        .render(&compilation.groups)
        .context("Failed to render route registration")?;
    let document =
        serialize_json(&compilation.document()).context("Failed to serialize apicat document")?;

    fs::create_dir_all(&args.out_dir).with_context(|| {
        format!("Failed to create output directory: {}", args.out_dir.display())
    })?;

    let routes_path = args.out_dir.join(ROUTES_FILE);
    write_to_file(&routes, &routes_path)
        .with_context(|| format!("Failed to write {}", routes_path.display()))?;
    let document_path = args.out_dir.join(DOCUMENT_FILE);
    write_to_file(&document, &document_path)
        .with_context(|| format!("Failed to write {}", document_path.display()))?;

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Structs collected: {}", compilation.catalog.len());
    info!("  - Schema definitions: {}", compilation.definitions.len());
    info!("  - Route groups: {}", compilation.groups.len());
    info!(
        "  - Routes: {}",
        compilation.groups.iter().map(|g| g.routes.len()).sum::<usize>()
    );

    Ok(())
}
