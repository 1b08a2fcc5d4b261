//! Archive facade
//!
//! An [`Archive`] is a named collection of molecule and metadata records of
//! one [`ArchiveKind`], held in one of two modes:
//!
//! - **memory**: every record resident (`MemoryStore`), loaded from or saved
//!   to a single archive file
//! - **virtual**: a directory with one file per record (`VirtualStore`);
//!   only the [`ArchiveIndex`] and the property unions live in memory
//!
//! Every `put` writes the record to the backend, grows the property unions
//! and refreshes the index entry. The index is a cache of header fields; it
//! is persisted as the `indexes` sidecar of a virtual store and rebuilt when
//! that sidecar is missing or unreadable. An index left stale by an external
//! edit of the store directory is not detected; call
//! [`Archive::rebuild_indexes`].
//!
//! Records handed out by `get` are owned copies. Mutations are not visible
//! until the record is `put` back. Puts for different UIDs may run
//! concurrently; puts for the same UID are last-write-wins, and the index
//! always describes the record that won.

use crate::config::ArchiveConfig;
use crate::workers::{CancelFlag, Observer, WorkerPool};
use marsdb_core::{
    uid, ArchiveKind, ArchiveProperties, Error, Metadata, Molecule, PropertySet, Record, Result,
    Table, Taggable,
};
use marsdb_storage::atomic::write_atomic;
use marsdb_storage::backend::{
    read_sidecar, write_sidecar, INDEX_SIDECAR, PROPERTIES_SIDECAR,
};
use marsdb_storage::codec;
use marsdb_storage::index::{MetadataEntry, MoleculeEntry};
use marsdb_storage::{
    read_document, ArchiveDocument, ArchiveIndex, DocumentSink, Format, IndexSnapshot,
    MemoryStore, RecordStore, StoreRecords, VirtualStore,
};
use parking_lot::{Mutex, MutexGuard, RwLock};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

/// Column whose value assigns table rows to molecules in [`Archive::from_table`]
pub const MOLECULE_COLUMN: &str = "molecule";

/// A molecule archive in memory or virtual-store mode.
pub struct Archive {
    name: RwLock<String>,
    kind: ArchiveKind,
    config: ArchiveConfig,
    /// File or directory the archive was opened from or last saved to,
    /// with the encoding used there
    source: RwLock<Option<(PathBuf, Format)>>,
    molecules: Box<dyn RecordStore<Molecule>>,
    metadata: Box<dyn RecordStore<Metadata>>,
    properties: PropertySet,
    index: ArchiveIndex,
    write_locks: WriteLocks,
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("name", &*self.name.read())
            .field("kind", &self.kind)
            .field("virtual", &self.is_virtual())
            .field("source", &*self.source.read())
            .finish()
    }
}

impl Archive {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Empty in-memory archive with the default config
    pub fn new(name: impl Into<String>, kind: ArchiveKind) -> Self {
        Self::with_config(name, kind, ArchiveConfig::default())
    }

    /// Empty in-memory archive
    pub fn with_config(name: impl Into<String>, kind: ArchiveKind, config: ArchiveConfig) -> Self {
        Self::assemble(
            name.into(),
            kind,
            config,
            Box::new(MemoryStore::<Molecule>::new()),
            Box::new(MemoryStore::<Metadata>::new()),
        )
    }

    fn assemble(
        name: String,
        kind: ArchiveKind,
        config: ArchiveConfig,
        molecules: Box<dyn RecordStore<Molecule>>,
        metadata: Box<dyn RecordStore<Metadata>>,
    ) -> Self {
        Archive {
            name: RwLock::new(name),
            kind,
            config,
            source: RwLock::new(None),
            molecules,
            metadata,
            properties: PropertySet::new(),
            index: ArchiveIndex::new(),
            write_locks: WriteLocks::new(),
        }
    }

    /// Build an in-memory archive from a flat table.
    ///
    /// Rows are grouped by the [`MOLECULE_COLUMN`] value; each group becomes
    /// one molecule with a fresh UID, in order of first appearance.
    ///
    /// # Errors
    ///
    /// `Error::InvalidOperation` when the table has no molecule column.
    pub fn from_table(name: impl Into<String>, kind: ArchiveKind, table: &Table) -> Result<Self> {
        let groups = table.group_by(MOLECULE_COLUMN).ok_or_else(|| {
            Error::InvalidOperation(format!(
                "Table '{}' has no '{}' column",
                table.name(),
                MOLECULE_COLUMN
            ))
        })?;
        let archive = Self::new(name, kind);
        for (_, rows) in groups {
            archive.put(Molecule::with_table(uid::generate(), rows))?;
        }
        Ok(archive)
    }

    /// Open an archive file or virtual store directory.
    ///
    /// A directory's own `marsdb.toml` is honored when present.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.is_dir() {
            ArchiveConfig::for_store(path)?
        } else {
            ArchiveConfig::default()
        };
        Self::open_with_config(path, config)
    }

    /// Open with an explicit config.
    ///
    /// A file is loaded into memory, its encoding sniffed from the first
    /// byte. A directory is opened as a virtual store.
    pub fn open_with_config(path: impl AsRef<Path>, config: ArchiveConfig) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::open_virtual(path, config)
        } else {
            Self::load_file(path, config)
        }
    }

    fn load_file(path: &Path, config: ArchiveConfig) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let format = Format::sniff(&mut reader)?;

        let mut archive = Self::with_config(display_name(path), ArchiveKind::default(), config);
        read_document(reader, &mut LoadSink { archive: &mut archive })?;
        *archive.source.get_mut() = Some((path.to_path_buf(), format));

        info!(
            target: "marsdb::archive",
            path = %path.display(),
            %format,
            molecules = archive.index.molecule_count(),
            metadata = archive.index.metadata_count(),
            "Loaded archive"
        );
        Ok(archive)
    }

    fn open_virtual(dir: &Path, config: ArchiveConfig) -> Result<Self> {
        let format = config.format()?;
        let molecules = VirtualStore::<Molecule>::open(dir, format, config.sync_writes)?;
        let metadata = VirtualStore::<Metadata>::open(dir, format, config.sync_writes)?;
        let mut archive = Self::assemble(
            display_name(dir),
            ArchiveKind::default(),
            config,
            Box::new(molecules),
            Box::new(metadata),
        );
        *archive.source.get_mut() = Some((dir.to_path_buf(), format));

        let mut rebuild = false;
        match read_sidecar::<ArchiveProperties>(dir, PROPERTIES_SIDECAR)? {
            Some(properties) => {
                archive.kind = properties.archive_type;
                archive.properties.absorb(&properties);
            }
            None => rebuild = true,
        }
        match read_sidecar::<IndexSnapshot>(dir, INDEX_SIDECAR) {
            Ok(Some(snapshot)) => archive.index.restore(snapshot),
            Ok(None) => {
                debug!(target: "marsdb::archive", dir = %dir.display(), "No index sidecar");
                rebuild = true;
            }
            Err(e) => {
                warn!(
                    target: "marsdb::archive",
                    dir = %dir.display(),
                    error = %e,
                    "Unreadable index sidecar, rebuilding"
                );
                rebuild = true;
            }
        }
        if rebuild {
            archive.rebuild_indexes()?;
        }

        info!(
            target: "marsdb::archive",
            dir = %dir.display(),
            molecules = archive.index.molecule_count(),
            metadata = archive.index.metadata_count(),
            "Opened virtual store"
        );
        Ok(archive)
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Insert or replace a molecule
    pub fn put(&self, molecule: Molecule) -> Result<()> {
        let uid = molecule.uid().to_string();
        let entry = MoleculeEntry::of(&molecule);
        self.properties.observe_molecule(&molecule);
        // Store and index updates for one UID happen in the same order
        let _guard = self.write_locks.lock(&uid);
        self.molecules.store(molecule)?;
        self.index.insert_molecule(uid, entry);
        Ok(())
    }

    /// Insert or replace a metadata record
    pub fn put_metadata(&self, metadata: Metadata) -> Result<()> {
        let uid = metadata.uid().to_string();
        let entry = MetadataEntry::of(&metadata);
        self.properties.observe(&metadata);
        let _guard = self.write_locks.lock(&uid);
        self.metadata.store(metadata)?;
        self.index.insert_metadata(uid, entry);
        Ok(())
    }

    /// Owned copy of a molecule
    pub fn get(&self, uid: &str) -> Result<Option<Molecule>> {
        self.molecules.load(uid)
    }

    /// Owned copy of a metadata record
    pub fn get_metadata(&self, uid: &str) -> Result<Option<Metadata>> {
        self.metadata.load(uid)
    }

    /// Delete a molecule; returns whether it existed. Property unions are
    /// not shrunk.
    pub fn remove(&self, uid: &str) -> Result<bool> {
        let _guard = self.write_locks.lock(uid);
        let existed = self.molecules.delete(uid)?;
        self.index.remove_molecule(uid);
        Ok(existed)
    }

    /// Delete a metadata record; returns whether it existed.
    pub fn remove_metadata(&self, uid: &str) -> Result<bool> {
        let _guard = self.write_locks.lock(uid);
        let existed = self.metadata.delete(uid)?;
        self.index.remove_metadata(uid);
        Ok(existed)
    }

    /// Whether a molecule is stored
    pub fn contains(&self, uid: &str) -> bool {
        self.molecules.contains(uid)
    }

    /// Whether a metadata record is stored
    pub fn contains_metadata(&self, uid: &str) -> bool {
        self.metadata.contains(uid)
    }

    /// Sorted molecule UIDs
    pub fn molecule_uids(&self) -> Result<Vec<String>> {
        sorted_uids(&*self.molecules)
    }

    /// Sorted metadata UIDs
    pub fn metadata_uids(&self) -> Result<Vec<String>> {
        sorted_uids(&*self.metadata)
    }

    /// Number of stored molecules
    pub fn molecule_count(&self) -> Result<usize> {
        self.molecules.len()
    }

    /// Number of stored metadata records
    pub fn metadata_count(&self) -> Result<usize> {
        self.metadata.len()
    }

    // ========================================================================
    // Index
    // ========================================================================

    /// Rebuild the index with the configured worker count
    pub fn rebuild_indexes(&self) -> Result<()> {
        self.rebuild_indexes_with(self.config.workers)
    }

    /// Rebuild the index by scanning every record.
    ///
    /// Virtual stores decode header fields only. The rebuilt index replaces
    /// the current one in a single swap when the scan completes, so queries
    /// running meanwhile keep seeing every entry. Puts and removes that race
    /// the scan are carried over. Property unions only grow.
    pub fn rebuild_indexes_with(&self, workers: usize) -> Result<()> {
        let pool = WorkerPool::new(workers, self.config.progress_interval())?;
        let mut counts = (0, 0);

        self.index.rebuild(|fresh| {
            let metadata_uids = self.metadata.list_uids()?;
            let molecule_uids = self.molecules.list_uids()?;
            pool.run(&metadata_uids, None, None, |uid| {
                if let Some(record) = self.metadata.load_header(uid)? {
                    self.properties.observe(&record);
                    fresh.update_metadata(&record);
                }
                Ok(())
            })?;
            pool.run(&molecule_uids, None, None, |uid| {
                if let Some(record) = self.molecules.load_header(uid)? {
                    self.properties.observe_molecule(&record);
                    fresh.update_molecule(&record);
                }
                Ok(())
            })?;
            counts = (molecule_uids.len(), metadata_uids.len());
            Ok(())
        })?;

        info!(
            target: "marsdb::archive",
            molecules = counts.0,
            metadata = counts.1,
            workers = pool.threads(),
            "Rebuilt archive index"
        );
        Ok(())
    }

    /// The header index
    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    // ========================================================================
    // Iteration and bulk processing
    // ========================================================================

    /// Sequential iterator over molecules in UID order
    pub fn molecules(&self) -> Result<Records<'_, Molecule>> {
        Records::new(&*self.molecules)
    }

    /// Sequential iterator over metadata records in UID order
    pub fn metadata(&self) -> Result<Records<'_, Metadata>> {
        Records::new(&*self.metadata)
    }

    /// Parallel iterator over molecules; no ordering guarantee
    pub fn par_molecules(&self) -> Result<impl ParallelIterator<Item = Result<Molecule>> + '_> {
        let store = &*self.molecules;
        let uids = store.list_uids()?;
        Ok(uids
            .into_par_iter()
            .filter_map(move |uid| store.load(&uid).transpose()))
    }

    /// Parallel iterator over metadata records; no ordering guarantee
    pub fn par_metadata(&self) -> Result<impl ParallelIterator<Item = Result<Metadata>> + '_> {
        let store = &*self.metadata;
        let uids = store.list_uids()?;
        Ok(uids
            .into_par_iter()
            .filter_map(move |uid| store.load(&uid).transpose()))
    }

    /// Load, mutate and put back every molecule on a worker pool.
    pub fn process_molecules<F>(
        &self,
        workers: usize,
        observer: Option<Observer<'_>>,
        f: F,
    ) -> Result<()>
    where
        F: Fn(&mut Molecule) -> Result<()> + Send + Sync,
    {
        self.process_molecules_cancellable(workers, &CancelFlag::new(), observer, f)
    }

    /// [`Archive::process_molecules`] that stops early once `cancel` is set,
    /// returning `Error::Cancelled`. Molecules already processed stay put.
    pub fn process_molecules_cancellable<F>(
        &self,
        workers: usize,
        cancel: &CancelFlag,
        observer: Option<Observer<'_>>,
        f: F,
    ) -> Result<()>
    where
        F: Fn(&mut Molecule) -> Result<()> + Send + Sync,
    {
        let pool = WorkerPool::new(workers, self.config.progress_interval())?;
        let uids = self.molecule_uids()?;
        pool.run(&uids, Some(cancel), observer, |uid| {
            if let Some(mut molecule) = self.get(uid)? {
                f(&mut molecule)?;
                self.put(molecule)?;
            }
            Ok(())
        })
    }

    // ========================================================================
    // Saving
    // ========================================================================

    /// Save back to where the archive came from.
    ///
    /// A file archive is rewritten in the encoding it was read in. A virtual
    /// store gets a fresh index and rewritten sidecars.
    pub fn save(&self) -> Result<()> {
        let source = self.source.read().clone();
        match source {
            Some((dir, format)) if self.is_virtual() => {
                self.rebuild_indexes()?;
                self.write_sidecars(&dir, format)
            }
            Some((path, format)) => self.write_file(&path, format),
            None => Err(Error::InvalidOperation(
                "Archive has no source file; use save_as".to_string(),
            )),
        }
    }

    /// Write a binary archive file
    pub fn save_as(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_file_as(path.as_ref(), Format::Binary)
    }

    /// Write a text (JSON) archive file
    pub fn save_as_json(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_file_as(path.as_ref(), Format::Text)
    }

    fn save_file_as(&self, path: &Path, format: Format) -> Result<()> {
        self.write_file(path, format)?;
        if !self.is_virtual() {
            *self.source.write() = Some((path.to_path_buf(), format));
            *self.name.write() = display_name(path);
        }
        Ok(())
    }

    fn write_file(&self, path: &Path, format: Format) -> Result<()> {
        let metadata = StoreRecords::<Metadata>::new(&*self.metadata)?;
        let molecules = StoreRecords::<Molecule>::new(&*self.molecules)?;
        let (molecule_count, metadata_count) = (molecules.len(), metadata.len());
        let properties =
            self.properties
                .snapshot(self.kind, molecule_count as u64, metadata_count as u64);
        let document = ArchiveDocument {
            properties: &properties,
            metadata,
            molecules,
        };
        write_atomic(path, self.config.sync_writes, |w| {
            codec::write_value(&document, format, w)
        })?;
        info!(
            target: "marsdb::archive",
            path = %path.display(),
            %format,
            molecules = molecule_count,
            metadata = metadata_count,
            "Saved archive"
        );
        Ok(())
    }

    /// Copy the archive into a virtual store directory with the configured
    /// worker count and encoding
    pub fn save_as_virtual_store(&self, dir: impl AsRef<Path>) -> Result<()> {
        self.save_as_virtual_store_with(dir, self.config.workers, self.config.format()?)
    }

    /// Copy the archive into a virtual store directory.
    ///
    /// Records are written in parallel, then the index and properties
    /// sidecars. Saving a virtual archive onto its own directory is a
    /// plain [`Archive::save`].
    pub fn save_as_virtual_store_with(
        &self,
        dir: impl AsRef<Path>,
        workers: usize,
        format: Format,
    ) -> Result<()> {
        let dir = dir.as_ref();
        if self.is_virtual() {
            let current = self.source.read().clone();
            if let Some((current, _)) = current {
                if same_location(&current, dir) {
                    return self.save();
                }
            }
            self.rebuild_indexes_with(workers)?;
        }

        let sync = self.config.sync_writes;
        let molecules = VirtualStore::<Molecule>::open(dir, format, sync)?;
        let metadata = VirtualStore::<Metadata>::open(dir, format, sync)?;
        let pool = WorkerPool::new(workers, self.config.progress_interval())?;

        let metadata_uids = self.metadata.list_uids()?;
        pool.run(&metadata_uids, None, None, |uid| {
            if let Some(record) = self.metadata.load(uid)? {
                metadata.store(record)?;
            }
            Ok(())
        })?;
        let molecule_uids = self.molecules.list_uids()?;
        pool.run(&molecule_uids, None, None, |uid| {
            if let Some(record) = self.molecules.load(uid)? {
                molecules.store(record)?;
            }
            Ok(())
        })?;

        self.write_sidecars(dir, format)?;
        info!(
            target: "marsdb::archive",
            dir = %dir.display(),
            %format,
            molecules = molecule_uids.len(),
            metadata = metadata_uids.len(),
            "Saved virtual store"
        );
        Ok(())
    }

    fn write_sidecars(&self, dir: &Path, format: Format) -> Result<()> {
        let sync = self.config.sync_writes;
        write_sidecar(dir, PROPERTIES_SIDECAR, format, &self.properties()?, sync)?;
        write_sidecar(dir, INDEX_SIDECAR, format, &self.index.snapshot(), sync)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Answer from the index in virtual mode, from the stored record in
    /// memory mode. `None` when the molecule is unknown.
    fn query_molecule<T>(
        &self,
        uid: &str,
        from_index: impl FnOnce(&MoleculeEntry) -> T,
        from_record: impl FnOnce(&Molecule) -> T,
    ) -> Option<T> {
        if self.is_virtual() {
            return self.index.with_molecule(uid, from_index);
        }
        inspect_once(&*self.molecules, uid, from_record)
    }

    fn query_metadata<T>(
        &self,
        uid: &str,
        from_index: impl FnOnce(&BTreeSet<String>) -> T,
        from_record: impl FnOnce(&Metadata) -> T,
    ) -> Option<T> {
        if self.is_virtual() {
            return self.index.with_metadata(uid, |entry| from_index(&entry.tags));
        }
        inspect_once(&*self.metadata, uid, from_record)
    }

    /// Whether a molecule carries `tag`
    pub fn molecule_has_tag(&self, uid: &str, tag: &str) -> bool {
        self.query_molecule(uid, |e| e.tags.contains(tag), |m| m.has_tag(tag))
            .unwrap_or(false)
    }

    /// Whether a molecule carries at least one tag
    pub fn molecule_has_tags(&self, uid: &str) -> bool {
        self.query_molecule(uid, |e| !e.tags.is_empty(), |m| !m.has_no_tags())
            .unwrap_or(false)
    }

    /// Whether a stored molecule carries no tags; false for unknown UIDs
    pub fn molecule_has_no_tags(&self, uid: &str) -> bool {
        self.query_molecule(uid, |e| e.tags.is_empty(), |m| m.has_no_tags())
            .unwrap_or(false)
    }

    /// Tags of a molecule (empty for unknown UIDs)
    pub fn molecule_tags(&self, uid: &str) -> BTreeSet<String> {
        self.query_molecule(uid, |e| e.tags.clone(), |m| m.tags().as_set().clone())
            .unwrap_or_default()
    }

    /// Tags of a molecule as `"a, b, c"`
    pub fn tag_list(&self, uid: &str) -> String {
        self.molecule_tags(uid)
            .into_iter()
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Metadata record a molecule belongs to
    pub fn metadata_uid_for_molecule(&self, uid: &str) -> Option<String> {
        self.query_molecule(
            uid,
            |e| e.metadata_uid.clone(),
            |m| m.metadata_uid().map(str::to_string),
        )
        .flatten()
    }

    /// Channel of a molecule
    pub fn channel(&self, uid: &str) -> Option<i32> {
        self.query_molecule(uid, |e| e.channel, |m| m.channel())
    }

    /// Image index of a molecule
    pub fn image(&self, uid: &str) -> Option<i32> {
        self.query_molecule(uid, |e| e.image, |m| m.image())
    }

    /// Whether a metadata record carries `tag`
    pub fn metadata_has_tag(&self, uid: &str, tag: &str) -> bool {
        self.query_metadata(uid, |tags| tags.contains(tag), |m| m.has_tag(tag))
            .unwrap_or(false)
    }

    /// Tags of a metadata record (empty for unknown UIDs)
    pub fn metadata_tags(&self, uid: &str) -> BTreeSet<String> {
        self.query_metadata(uid, |tags| tags.clone(), |m| m.tags().as_set().clone())
            .unwrap_or_default()
    }

    /// Sorted UIDs of molecules tagged `tag`, from the index
    pub fn molecule_uids_with_tag(&self, tag: &str) -> Vec<String> {
        let mut uids = self.index.molecules_where(|e| e.tags.contains(tag));
        uids.sort();
        uids
    }

    /// Sorted UIDs of molecules linked to a metadata record, from the index
    pub fn molecule_uids_for_metadata(&self, metadata_uid: &str) -> Vec<String> {
        let mut uids = self
            .index
            .molecules_where(|e| e.metadata_uid.as_deref() == Some(metadata_uid));
        uids.sort();
        uids
    }

    // ========================================================================
    // Bulk edits
    // ========================================================================

    /// Tag molecules from `(uid, tag)` pairs; returns how many were tagged.
    /// Unknown UIDs are skipped.
    pub fn add_molecule_tags<I, K, V>(&self, tags: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut tagged = 0;
        for (uid, tag) in tags {
            if let Some(mut molecule) = self.get(uid.as_ref())? {
                molecule.add_tag(tag.as_ref());
                self.put(molecule)?;
                tagged += 1;
            }
        }
        Ok(tagged)
    }

    /// Remove every molecule tagged `tag`; returns how many were removed
    pub fn delete_molecules_with_tag(&self, tag: &str) -> Result<usize> {
        let mut removed = 0;
        for uid in self.molecule_uids_with_tag(tag) {
            if self.remove(&uid)? {
                removed += 1;
            }
        }
        info!(target: "marsdb::archive", tag, removed, "Deleted tagged molecules");
        Ok(removed)
    }

    /// Remove every metadata record tagged `tag`; returns how many were
    /// removed. Molecules linked to them are kept.
    pub fn delete_metadata_with_tag(&self, tag: &str) -> Result<usize> {
        let mut uids = self.index.metadata_where(|e| e.tags.contains(tag));
        uids.sort();
        let mut removed = 0;
        for uid in uids {
            if self.remove_metadata(&uid)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Append `message` to the log of every metadata record
    pub fn log(&self, message: &str) -> Result<()> {
        self.edit_metadata(|m| m.log(message))
    }

    /// Append a line to the log of every metadata record
    pub fn logln(&self, message: &str) -> Result<()> {
        self.edit_metadata(|m| m.logln(message))
    }

    fn edit_metadata(&self, edit: impl Fn(&mut Metadata)) -> Result<()> {
        for uid in self.metadata_uids()? {
            if let Some(mut metadata) = self.get_metadata(&uid)? {
                edit(&mut metadata);
                self.put_metadata(metadata)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Archive name (file or directory name for opened archives)
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// Rename the archive
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write() = name.into();
    }

    /// Free-text archive comments
    pub fn comments(&self) -> String {
        self.properties.comments()
    }

    /// Replace the archive comments
    pub fn set_comments(&self, comments: &str) {
        self.properties.set_comments(comments);
    }

    /// Snapshot of the archive properties with current record counts
    pub fn properties(&self) -> Result<ArchiveProperties> {
        Ok(self.properties.snapshot(
            self.kind,
            self.molecules.len()? as u64,
            self.metadata.len()? as u64,
        ))
    }

    /// Whether records live in a virtual store directory
    pub fn is_virtual(&self) -> bool {
        self.molecules.is_virtual()
    }

    /// Archive kind
    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    /// File or directory the archive was opened from or last saved to
    pub fn source(&self) -> Option<PathBuf> {
        self.source.read().as_ref().map(|(path, _)| path.clone())
    }

    /// Active configuration
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }
}

/// Sequential record iterator returned by [`Archive::molecules`] and
/// [`Archive::metadata`].
///
/// UIDs are captured when the iterator is created; records removed since
/// are skipped.
pub struct Records<'a, R: Record> {
    store: &'a dyn RecordStore<R>,
    uids: std::vec::IntoIter<String>,
}

impl<'a, R: Record> Records<'a, R> {
    fn new(store: &'a dyn RecordStore<R>) -> Result<Self> {
        Ok(Records {
            store,
            uids: sorted_uids(store)?.into_iter(),
        })
    }
}

impl<R: Record> Iterator for Records<'_, R> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Result<R>> {
        for uid in self.uids.by_ref() {
            match self.store.load(&uid) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.uids.len()))
    }
}

/// Striped per-UID write locks.
///
/// Held from the backend write through the index update, so two puts of the
/// same UID leave the store and the index agreeing on the winner.
struct WriteLocks {
    stripes: Vec<Mutex<()>>,
}

impl WriteLocks {
    const STRIPES: usize = 64;

    fn new() -> Self {
        WriteLocks {
            stripes: (0..Self::STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    fn lock(&self, uid: &str) -> MutexGuard<'_, ()> {
        let stripe = xxh3_64(uid.as_bytes()) as usize % self.stripes.len();
        self.stripes[stripe].lock()
    }
}

struct LoadSink<'a> {
    archive: &'a mut Archive,
}

impl DocumentSink for LoadSink<'_> {
    fn properties(&mut self, properties: ArchiveProperties) -> Result<()> {
        self.archive.kind = properties.archive_type;
        self.archive.properties.absorb(&properties);
        Ok(())
    }

    fn metadata(&mut self, record: Metadata) -> Result<()> {
        self.archive.put_metadata(record)
    }

    fn molecule(&mut self, record: Molecule) -> Result<()> {
        self.archive.put(record)
    }
}

fn sorted_uids<R: Record>(store: &dyn RecordStore<R>) -> Result<Vec<String>> {
    let mut uids = store.list_uids()?;
    uids.sort();
    Ok(uids)
}

fn inspect_once<R: Record, T>(
    store: &dyn RecordStore<R>,
    uid: &str,
    f: impl FnOnce(&R) -> T,
) -> Option<T> {
    let mut f = Some(f);
    let mut answer = None;
    let inspected = store.inspect(uid, &mut |record| {
        if let Some(f) = f.take() {
            answer = Some(f(record));
        }
    });
    if let Err(e) = inspected {
        warn!(target: "marsdb::archive", uid, error = %e, "Record lookup failed");
    }
    answer
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
