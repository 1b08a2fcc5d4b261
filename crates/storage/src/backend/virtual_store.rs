//! File-per-record store
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/
//!   Molecules/<uid>.json | <uid>.mpk
//!   Metadata/<uid>.json  | <uid>.mpk
//!   indexes.json | indexes.mpk          (ArchiveIndex snapshot)
//!   properties.json | properties.mpk    (ArchiveProperties)
//! ```
//!
//! Records are decoded on every access; nothing but the UID list is ever
//! derived from the directory itself. Writes go through
//! [`write_atomic`](crate::atomic::write_atomic), so a record file is either
//! the old version or the new one. The configured format only decides how
//! new files are written: existing files of either encoding are read, and a
//! rewrite in the other encoding removes the stale file.

use super::RecordStore;
use crate::atomic::{cleanup_temp_files, write_atomic};
use crate::codec::{self, Format, SchemaRecord};
use marsdb_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Base name of the index sidecar
pub const INDEX_SIDECAR: &str = "indexes";

/// Base name of the properties sidecar
pub const PROPERTIES_SIDECAR: &str = "properties";

/// Record store keeping one file per record
#[derive(Debug)]
pub struct VirtualStore<R> {
    dir: PathBuf,
    format: Format,
    sync_writes: bool,
    _record: PhantomData<fn() -> R>,
}

fn valid_uid(uid: &str) -> bool {
    !uid.is_empty()
        && !uid.starts_with('.')
        && !uid.contains(|c| c == '/' || c == '\\' || c == '\0')
}

fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn open_if_exists(path: &Path) -> Result<Option<BufReader<File>>> {
    match File::open(path) {
        Ok(file) => Ok(Some(BufReader::new(file))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl<R: SchemaRecord> VirtualStore<R> {
    /// Open (creating if needed) the record directory under `root`.
    ///
    /// Temporary files left by an interrupted writer are removed.
    pub fn open(root: &Path, format: Format, sync_writes: bool) -> Result<Self> {
        let dir = root.join(R::KIND.as_str());
        std::fs::create_dir_all(&dir)?;
        let removed = cleanup_temp_files(&dir)?;
        if removed > 0 {
            warn!(
                target: "marsdb::virtual",
                dir = %dir.display(),
                removed,
                "Removed temporary files from interrupted writes"
            );
        }
        Ok(VirtualStore {
            dir,
            format,
            sync_writes,
            _record: PhantomData,
        })
    }

    /// Directory holding the record files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Encoding used for new files
    pub fn format(&self) -> Format {
        self.format
    }

    fn path_for(&self, uid: &str, format: Format) -> PathBuf {
        self.dir.join(format!("{}.{}", uid, format.extension()))
    }

    fn read(&self, uid: &str, header_only: bool) -> Result<Option<R>> {
        if !valid_uid(uid) {
            return Ok(None);
        }
        for format in [self.format, self.format.other()] {
            if let Some(reader) = open_if_exists(&self.path_for(uid, format))? {
                let record = if header_only {
                    codec::decode_header(reader)?
                } else {
                    codec::decode_record(reader)?
                };
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

impl<R: SchemaRecord> RecordStore<R> for VirtualStore<R> {
    fn load(&self, uid: &str) -> Result<Option<R>> {
        self.read(uid, false)
    }

    fn load_header(&self, uid: &str) -> Result<Option<R>> {
        self.read(uid, true)
    }

    fn store(&self, record: R) -> Result<()> {
        let uid = record.uid();
        if !valid_uid(uid) {
            return Err(Error::InvalidOperation(format!(
                "UID {:?} cannot be used as a file name",
                uid
            )));
        }
        let path = self.path_for(uid, self.format);
        write_atomic(&path, self.sync_writes, |w| {
            codec::encode_record(&record, self.format, w)
        })?;
        if remove_if_exists(&self.path_for(uid, self.format.other()))? {
            debug!(target: "marsdb::virtual", uid, format = %self.format, "Replaced record file encoding");
        }
        Ok(())
    }

    fn delete(&self, uid: &str) -> Result<bool> {
        if !valid_uid(uid) {
            return Ok(false);
        }
        let mut found = false;
        for format in [Format::Text, Format::Binary] {
            found |= remove_if_exists(&self.path_for(uid, format))?;
        }
        Ok(found)
    }

    fn contains(&self, uid: &str) -> bool {
        valid_uid(uid)
            && [Format::Text, Format::Binary]
                .iter()
                .any(|format| self.path_for(uid, *format).is_file())
    }

    fn list_uids(&self) -> Result<Vec<String>> {
        let mut uids = BTreeSet::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            let known = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| {
                    ext == Format::Text.extension() || ext == Format::Binary.extension()
                });
            if !known {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if valid_uid(stem) {
                    uids.insert(stem.to_string());
                }
            }
        }
        Ok(uids.into_iter().collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.list_uids()?.len())
    }

    fn inspect(&self, uid: &str, f: &mut dyn FnMut(&R)) -> Result<bool> {
        match self.load(uid)? {
            Some(record) => {
                f(&record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn is_virtual(&self) -> bool {
        true
    }
}

/// Write a sidecar (`<root>/<name>.<ext>`), removing any copy in the other
/// encoding.
pub fn write_sidecar<T: Serialize>(
    root: &Path,
    name: &str,
    format: Format,
    value: &T,
    sync: bool,
) -> Result<()> {
    let path = root.join(format!("{}.{}", name, format.extension()));
    write_atomic(&path, sync, |w| codec::write_value(value, format, w))?;
    remove_if_exists(&root.join(format!("{}.{}", name, format.other().extension())))?;
    Ok(())
}

/// Read a sidecar in whichever encoding it was written; `Ok(None)` when
/// absent.
pub fn read_sidecar<T: DeserializeOwned>(root: &Path, name: &str) -> Result<Option<T>> {
    for format in [Format::Binary, Format::Text] {
        let path = root.join(format!("{}.{}", name, format.extension()));
        if let Some(reader) = open_if_exists(&path)? {
            return codec::read_value(reader).map(Some);
        }
    }
    Ok(None)
}
