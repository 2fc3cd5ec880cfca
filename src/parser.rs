use crate::error::{Error, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use syn::visit::Visit;
use syn::{ItemFn, ItemImpl, ItemStruct, ItemTrait};

/// Parser for declaration files.
///
/// The `AstParser` uses `syn` to turn each declaration file into a syntax tree. Unlike a
/// best-effort documentation scan, the compiler needs every declaration to be known before
/// schemas are derived, so a single unparsable file fails the whole run.
pub struct AstParser;

/// A successfully parsed declaration file.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The parsed syntax tree
    pub syntax_tree: syn::File,
}

/// The struct and trait declarations of one file, including those in inline `mod` blocks.
///
/// Items local to function bodies and impl blocks are not part of the declaration surface
/// and are not visited.
#[derive(Default)]
pub struct Declarations<'ast> {
    pub structs: Vec<&'ast ItemStruct>,
    pub traits: Vec<&'ast ItemTrait>,
}

impl<'ast> Visit<'ast> for Declarations<'ast> {
    fn visit_item_struct(&mut self, node: &'ast ItemStruct) {
        self.structs.push(node);
    }

    fn visit_item_trait(&mut self, node: &'ast ItemTrait) {
        self.traits.push(node);
    }

    fn visit_item_fn(&mut self, _node: &'ast ItemFn) {}

    fn visit_item_impl(&mut self, _node: &'ast ItemImpl) {}
}

impl ParsedFile {
    /// Collects the struct and trait declarations of this file in source order.
    pub fn declarations(&self) -> Declarations<'_> {
        let mut declarations = Declarations::default();
        declarations.visit_file(&self.syntax_tree);
        declarations
    }
}

impl AstParser {
    /// Reads and parses a single declaration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid Rust.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse_source(path, &content)
    }

    /// Parses declaration source that has already been read, reporting `path` in errors.
    pub fn parse_source(path: &Path, content: &str) -> Result<ParsedFile> {
        let syntax_tree = syn::parse_file(content).map_err(|e| {
            let start = e.span().start();
            Error::Parse {
                file: path.to_path_buf(),
                message: format!("{}:{}: {}", start.line, start.column + 1, e),
            }
        })?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            syntax_tree,
        })
    }

    /// Parses every file, stopping at the first failure.
    pub fn parse_files(paths: &[PathBuf]) -> Result<Vec<ParsedFile>> {
        debug!("Parsing {} files", paths.len());
        paths.iter().map(|path| Self::parse_file(path)).collect()
    }
}
