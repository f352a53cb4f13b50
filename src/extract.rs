//! Unpacks an uploaded zip archive into a working directory.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use zip::ZipArchive;

use crate::error::{Result, ZenError};

/// Upper bound on the bytes one upload may expand to.
pub const MAX_EXTRACTED_BYTES: u64 = 256 * 1024 * 1024;

/// Extracts every entry of `archive` below `target`, returning the files written.
///
/// Entries whose names would land outside `target` are skipped.
pub fn extract_archive(archive: &Path, target: &Path) -> Result<Vec<PathBuf>> {
    extract_archive_within(archive, target, MAX_EXTRACTED_BYTES)
}

/// Like [`extract_archive`], but fails once the extracted content would exceed
/// `budget` bytes.
pub fn extract_archive_within(archive: &Path, target: &Path, budget: u64) -> Result<Vec<PathBuf>> {
    info!(archive = %archive.display(), target = %target.display(), "Extracting archive");
    fs::create_dir_all(target).map_err(|e| ZenError::io(target, e))?;

    let malformed = |message: String| ZenError::Archive {
        path: archive.to_path_buf(),
        message,
    };

    let reader = File::open(archive).map_err(|e| ZenError::io(archive, e))?;
    let mut zip = ZipArchive::new(reader).map_err(|e| {
        error!(error = ?e, archive = %archive.display(), "Upload is not a readable zip archive");
        malformed(e.to_string())
    })?;

    let mut remaining = budget;
    let mut written = Vec::new();
    for i in 0..zip.len() {
        let entry = zip.by_index(i).map_err(|e| malformed(e.to_string()))?;

        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "Skipping archive entry with unsafe path");
            continue;
        };
        let out_path = target.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| ZenError::io(&out_path, e))?;
            continue;
        }
        if entry.size() > remaining {
            warn!(entry = entry.name(), budget, "Archive expands beyond the extraction budget");
            return Err(malformed(format!("archive expands beyond {budget} bytes")));
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ZenError::io(parent, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| ZenError::io(&out_path, e))?;

        // Declared sizes can lie, so the copy itself is bounded too.
        let mut source = EntryReader {
            inner: entry.take(remaining + 1),
            failed: false,
        };
        let copied = match io::copy(&mut source, &mut out) {
            Ok(n) => n,
            Err(e) if source.failed => {
                error!(error = ?e, path = %out_path.display(), "Archive entry is corrupt");
                return Err(malformed(format!("corrupt entry {}: {e}", relative.display())));
            }
            Err(e) => return Err(ZenError::io(&out_path, e)),
        };
        if copied > remaining {
            warn!(
                path = %out_path.display(),
                budget,
                "Archive expands beyond the extraction budget"
            );
            return Err(malformed(format!("archive expands beyond {budget} bytes")));
        }
        remaining -= copied;
        debug!(path = %out_path.display(), size = copied, "Extracted entry");
        written.push(out_path);
    }

    info!(count = written.len(), "Archive extracted");
    Ok(written)
}

/// Remembers whether a read failed, to tell corrupt entries from write errors.
struct EntryReader<R> {
    inner: R,
    failed: bool,
}

impl<R: Read> Read for EntryReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).map_err(|e| {
            self.failed = true;
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn extracts_nested_entries() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("project.zip");
        write_zip(
            &archive,
            &[("index.js", "console.log(1)"), ("lib/util.ts", "export {}")],
        );

        let target = dir.path().join("out");
        let files = extract_archive(&archive, &target).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(
            fs::read_to_string(target.join("lib/util.ts")).unwrap(),
            "export {}"
        );
    }

    #[test]
    fn skips_entries_escaping_the_target() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        write_zip(&archive, &[("../escape.js", "bad"), ("ok.js", "good")]);

        let target = dir.path().join("out");
        let files = extract_archive(&archive, &target).unwrap();
        assert_eq!(files, vec![target.join("ok.js")]);
        assert!(!dir.path().join("escape.js").exists());
    }

    #[test]
    fn garbage_upload_is_an_archive_error() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("not-a.zip");
        fs::write(&archive, b"definitely not a zip").unwrap();

        let err = extract_archive(&archive, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, ZenError::Archive { .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn corrupt_entry_data_is_an_archive_error() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("corrupt.zip");
        let body = "const value = 42; // padding padding padding\n".repeat(2000);
        let file = File::create(&archive).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        zip.start_file("big.js", options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
        zip.finish().unwrap();

        // Overwrite part of the compressed stream behind the local file header.
        let mut bytes = fs::read(&archive).unwrap();
        let name_len = u16::from_le_bytes([bytes[26], bytes[27]]) as usize;
        let extra_len = u16::from_le_bytes([bytes[28], bytes[29]]) as usize;
        let data_start = 30 + name_len + extra_len;
        for b in &mut bytes[data_start + 2..data_start + 40] {
            *b = 0xff;
        }
        fs::write(&archive, &bytes).unwrap();

        let err = extract_archive(&archive, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, ZenError::Archive { .. }), "{err:?}");
        assert!(err.is_client_error());
    }

    #[test]
    fn oversized_archive_is_rejected() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("bomb.zip");
        write_zip(&archive, &[("a.js", &"a".repeat(600)), ("b.js", &"b".repeat(600))]);

        let err = extract_archive_within(&archive, &dir.path().join("out"), 1000).unwrap_err();
        assert!(matches!(err, ZenError::Archive { ref message, .. } if message.contains("1000")));
        assert!(err.is_client_error());

        let files = extract_archive_within(&archive, &dir.path().join("fits"), 1200).unwrap();
        assert_eq!(files.len(), 2);
    }
}
