//! Recursive discovery of documentable source files.

use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::contract::SourceFile;
use crate::error::{Result, ZenError};

/// Extensions picked up when the configuration does not name any.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".ts"];

/// Walks `root` depth-first and returns every file whose name ends with one of
/// `extensions`, read fully into memory.
///
/// Entries are visited in the order the filesystem reports them. Content that
/// is not valid UTF-8 is decoded lossily; a file that cannot be read at all
/// aborts the whole discovery.
pub fn discover(root: &Path, extensions: &[String]) -> Result<Vec<SourceFile>> {
    if !root.is_dir() {
        error!(path = %root.display(), "Discovery root does not exist");
        return Err(ZenError::NotFound(root.display().to_string()));
    }
    info!(path = %root.display(), ?extensions, "Discovering source files");

    fn visit_dir(dir: &Path, extensions: &[String], results: &mut Vec<SourceFile>) -> Result<()> {
        let entries = std::fs::read_dir(dir).map_err(|e| ZenError::io(dir, e))?;
        for entry_res in entries {
            let entry = entry_res.map_err(|e| ZenError::io(dir, e))?;
            let path = entry.path();
            if path.is_dir() {
                visit_dir(&path, extensions, results)?;
            } else if path.is_file() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if !extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
                    continue;
                }
                let content = read_source(&path)?;
                debug!(path = %path.display(), size = content.len(), "Discovered file");
                results.push(SourceFile { path, content });
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    visit_dir(root, extensions, &mut files)?;
    info!(count = files.len(), "Completed source file discovery");
    Ok(files)
}

/// Reads a file as text. Invalid UTF-8 sequences become U+FFFD.
fn read_source(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| {
        error!(error = ?e, path = %path.display(), "Failed to read source file");
        ZenError::io(path, e)
    })?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!(path = %path.display(), "Source file is not valid UTF-8, decoding lossily");
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}
