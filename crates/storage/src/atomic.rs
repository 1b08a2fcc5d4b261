//! Crash-safe file replacement
//!
//! Every file the engine writes (record files, sidecars, saved archives)
//! goes through [`write_atomic`]:
//! 1. Write to a hidden temporary file next to the target (`.<name>.<n>.tmp`)
//! 2. Optionally fsync the temporary file
//! 3. Atomic rename onto the target
//! 4. Optionally fsync the parent directory
//!
//! Readers therefore see either the previous file or the new one, never a
//! partial write. On failure the temporary file is removed.

use marsdb_core::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Suffix shared by every temporary file
pub const TEMP_SUFFIX: &str = ".tmp";

fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| Error::InvalidOperation(format!("not a file path: {}", path.display())))?;
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    Ok(parent.join(format!(
        ".{}.{}.{}{}",
        name.to_string_lossy(),
        std::process::id(),
        n,
        TEMP_SUFFIX
    )))
}

/// Replace `path` with whatever `write` produces.
pub fn write_atomic<F>(path: &Path, sync: bool, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let temp_path = temp_path_for(path)?;
    let result: Result<()> = (|| {
        let file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)?;
        let mut writer = BufWriter::new(file);
        write(&mut writer)?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        if sync {
            file.sync_all()?;
        }
        drop(file);
        std::fs::rename(&temp_path, path)?;
        if sync {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                File::open(parent)?.sync_all()?;
            }
        }
        Ok(())
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

/// Remove temporary files left behind by an interrupted writer.
pub fn cleanup_temp_files(dir: &Path) -> Result<usize> {
    let mut count = 0;
    if !dir.exists() {
        return Ok(0);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') && name.ends_with(TEMP_SUFFIX) {
            std::fs::remove_file(entry.path())?;
            count += 1;
        }
    }
    Ok(count)
}
