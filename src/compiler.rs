use crate::document::{ApiDocument, DocumentAssembler};
use crate::error::Result;
use crate::parser::{AstParser, ParsedFile};
use crate::route_collector::{RouteCollector, RouteGroup};
use crate::scanner::FileScanner;
use crate::schema_compiler::{SchemaCompiler, SchemaDefinition};
use crate::struct_collector::{StructCatalog, StructCollector};
use log::{info, warn};
use std::path::Path;

/// Everything one compiler run produces.
#[derive(Debug)]
pub struct Compilation {
    pub catalog: StructCatalog,
    pub definitions: Vec<SchemaDefinition>,
    pub groups: Vec<RouteGroup>,
}

impl Compilation {
    /// Assembles the apicat document.
    pub fn document(&self) -> ApiDocument {
        DocumentAssembler::assemble(&self.definitions, &self.groups)
    }
}

/// Compiles parsed declaration files.
///
/// Structs are collected and sealed first, then definitions are compiled, then routes; the
/// first fatal error aborts the run.
pub fn compile(files: &[ParsedFile]) -> Result<Compilation> {
    info!("Collecting structs from {} files...", files.len());
    let catalog = StructCollector::collect(files);

    let (definitions, groups) = {
        let mut compiler = SchemaCompiler::new(&catalog);
        let definitions = compiler.definitions()?;
        info!("Collecting routes...");
        let groups = RouteCollector::new(&mut compiler).collect(files)?;
        (definitions, groups)
    };

    Ok(Compilation {
        catalog,
        definitions,
        groups,
    })
}

/// Scans, parses and compiles a declaration directory.
pub fn compile_dir(dir: &Path) -> Result<Compilation> {
    info!("Scanning declaration directory {}...", dir.display());
    let scan_result = FileScanner::new(dir.to_path_buf()).scan()?;
    if scan_result.rust_files.is_empty() {
        warn!("No declaration files found in {}", dir.display());
    }

    let files = AstParser::parse_files(&scan_result.rust_files)?;
    compile(&files)
}
