use crate::error::{Error, Result};
use log::{debug, warn};
use std::path::PathBuf;
use walkdir::WalkDir;

/// File scanner for the declaration directory.
///
/// The `FileScanner` walks the declaration directory and collects every Rust source file
/// in it. Build output (`target`) and hidden directories are skipped. Files are returned
/// sorted by path so that every run sees declarations in the same order.
///
/// # Example
///
/// ```no_run
/// use apicat_from_source::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./proto"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} declaration files", result.rust_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a directory scan.
pub struct ScanResult {
    /// Paths of all discovered `.rs` files, sorted
    pub rust_files: Vec<PathBuf>,
    /// Warning messages for entries that could not be read
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a new `FileScanner` rooted at the declaration directory.
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all `.rs` files.
    ///
    /// Unreadable entries below the root are recorded as warnings and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is missing or is not a directory.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "declaration path is not a directory: {}",
                self.root_path.display()
            )));
        }

        let mut rust_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }

                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("rs") {
                        rust_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        rust_files.sort();
        debug!(
            "Scanned {}: {} declaration files",
            self.root_path.display(),
            rust_files.len()
        );

        Ok(ScanResult {
            rust_files,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_collects_sorted_rust_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("widget.rs"), "pub struct Widget;").unwrap();
        fs::write(root.join("account.rs"), "pub struct Account;").unwrap();
        fs::write(root.join("readme.md"), "# README").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(result.rust_files.len(), 2);
        assert!(result.warnings.is_empty());
        let names: Vec<String> = result
            .rust_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["account.rs", "widget.rs"]);
    }

    #[test]
    fn test_scan_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("billing/invoices")).unwrap();
        fs::write(root.join("mod.rs"), "").unwrap();
        fs::write(root.join("billing/mod.rs"), "").unwrap();
        fs::write(root.join("billing/invoices/invoice.rs"), "").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(result.rust_files.len(), 3);
    }

    #[test]
    fn test_scan_skips_target_and_hidden_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join("target")).unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join("target/build.rs"), "fn main() {}").unwrap();
        fs::write(root.join(".git/config.rs"), "// config").unwrap();
        fs::write(root.join("service.rs"), "").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(result.rust_files.len(), 1);
        assert_eq!(
            result.rust_files[0].file_name().unwrap().to_string_lossy(),
            "service.rs"
        );
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileScanner::new(temp_dir.path().to_path_buf()).scan().unwrap();
        assert!(result.rust_files.is_empty());
    }

    #[test]
    fn test_scan_missing_directory_fails() {
        let result = FileScanner::new(PathBuf::from("/nonexistent/proto")).scan();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
