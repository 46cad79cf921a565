use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collects the `.proto` files named on the command line.
///
/// Each input is either a proto file, taken as is, or a directory that is walked
/// recursively. Hidden directories (starting with `.`) and `target` are skipped.
///
/// # Example
///
/// ```no_run
/// use openapi_from_proto::scanner::ProtoScanner;
/// use std::path::PathBuf;
///
/// let scanner = ProtoScanner::new(vec![PathBuf::from("./protos")]);
/// let result = scanner.scan().unwrap();
/// println!("Found {} proto files", result.proto_files.len());
/// ```
pub struct ProtoScanner {
    inputs: Vec<PathBuf>,
}

/// Result of scanning the inputs.
pub struct ScanResult {
    /// Proto files in the order they were found, without duplicates
    pub proto_files: Vec<PathBuf>,
    /// Directories the files live in, used as protoc include paths
    pub include_dirs: Vec<PathBuf>,
    /// Warning messages for entries that could not be read
    pub warnings: Vec<String>,
}

impl ProtoScanner {
    pub fn new(inputs: Vec<PathBuf>) -> Self {
        Self { inputs }
    }

    /// Walks every input and collects the proto files.
    ///
    /// # Errors
    ///
    /// Returns an error if an input does not exist.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut result = ScanResult {
            proto_files: Vec::new(),
            include_dirs: Vec::new(),
            warnings: Vec::new(),
        };

        for input in &self.inputs {
            let metadata = input
                .metadata()
                .with_context(|| format!("Proto input does not exist: {}", input.display()))?;

            if metadata.is_dir() {
                debug!("Scanning directory {}", input.display());
                Self::walk(input, &mut result);
                push_unique(&mut result.include_dirs, input.clone());
            } else {
                push_unique(&mut result.proto_files, input.clone());
                // protoc resolves every file against an include path
                let parent = match input.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                push_unique(&mut result.include_dirs, parent);
            }
        }

        debug!(
            "Found {} proto files, {} include dirs",
            result.proto_files.len(),
            result.include_dirs.len()
        );
        Ok(result)
    }

    fn walk(root: &Path, result: &mut ScanResult) {
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == root {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("proto") {
                        push_unique(&mut result.proto_files, path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    result.warnings.push(warning);
                }
            }
        }
    }
}

fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}
