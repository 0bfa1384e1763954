//! File I/O utilities with atomic writes
//!
//! Provides safe file operations that won't corrupt data on failure.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::LedgerError;

/// Read a JSON document, returning `None` if the file doesn't exist
///
/// A file that exists but is not JSON at all is reported as `InvalidShape`
/// so the caller can contain it like any other malformed document.
pub fn read_json_value<P: AsRef<Path>>(path: P) -> Result<Option<Value>, LedgerError> {
    let path = path.as_ref();

    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)
        .map_err(|e| LedgerError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map(Some).map_err(|e| {
        LedgerError::InvalidShape(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Write JSON to a file atomically (write to temp, then rename)
///
/// The file is either completely written or not modified at all.
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), LedgerError>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let temp_path = write_json_temp(path, data)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        LedgerError::Storage(format!("Failed to rename temp file: {}", e))
    })?;

    Ok(())
}

/// Write JSON next to `path` without replacing it, returning the temp path
///
/// The caller renames the temp file over `path` to publish it. On error no
/// temp file is left behind.
pub fn write_json_temp<T, P>(path: P, data: &T) -> Result<PathBuf, LedgerError>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            LedgerError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Temp file must live in the same directory for the rename to be atomic
    let temp_path = path.with_extension("json.tmp");

    let file = File::create(&temp_path)
        .map_err(|e| LedgerError::Storage(format!("Failed to create temp file: {}", e)))?;

    let written = write_and_sync(file, data);
    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written.map(|()| temp_path)
}

fn write_and_sync<T: Serialize + ?Sized>(file: File, data: &T) -> Result<(), LedgerError> {
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| LedgerError::Storage(format!("Failed to serialize data: {}", e)))?;

    writer
        .flush()
        .map_err(|e| LedgerError::Storage(format!("Failed to flush data: {}", e)))?;

    writer
        .get_ref()
        .sync_all()
        .map_err(|e| LedgerError::Storage(format!("Failed to sync data: {}", e)))
}

/// Rename a file to `<name>.invalid` (or `<name>.invalid.N` if taken)
///
/// Returns the new path, or `None` when there was no file to move.
pub fn move_aside<P: AsRef<Path>>(path: P) -> Result<Option<PathBuf>, LedgerError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }

    let base = path.with_extension("json.invalid");
    let mut target = base.clone();
    let mut n = 1;
    while target.exists() {
        target = PathBuf::from(format!("{}.{}", base.display(), n));
        n += 1;
    }

    fs::rename(path, &target).map_err(|e| {
        LedgerError::Storage(format!(
            "Failed to move {} aside: {}",
            path.display(),
            e
        ))
    })?;
    Ok(Some(target))
}
