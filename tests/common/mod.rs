#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zendocs::load_config::AppConfig;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Builds an in-memory zip from `(name, contents)` pairs.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let raw: Vec<(&str, &[u8])> = entries.iter().map(|(n, c)| (*n, c.as_bytes())).collect();
    zip_raw(&raw)
}

/// Builds an in-memory zip from `(name, bytes)` pairs.
pub fn zip_raw(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(contents).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Writes a zip with `entries` to `dir/name` and returns its path.
pub fn write_zip(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, zip_bytes(entries)).expect("write zip");
    path
}

/// Configuration rooted at `data_dir` with pacing disabled.
pub fn fast_config(data_dir: &Path) -> AppConfig {
    let mut config = AppConfig::with_data_dir(data_dir);
    config.pipeline.pacing_interval = Duration::ZERO;
    config
}

/// Number of entries in `dir`, zero when it does not exist.
pub fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
