//! Serialization of the apicat document and writing of generated artifacts.

use crate::document::ApiDocument;
use crate::error::Result;
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes the document as JSON with two-space indentation and a trailing newline.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &ApiDocument) -> Result<String> {
    debug!("Serializing apicat document to JSON");
    let mut json = serde_json::to_string_pretty(doc)?;
    json.push('\n');
    Ok(json)
}

/// Writes string content to a file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;

    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
