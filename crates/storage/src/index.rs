//! Archive index
//!
//! A rebuildable cache of the header fields of every record, so tag and
//! metadata-link queries can be answered without decoding record files:
//! - molecules: UID → tags, metadata UID, channel, image
//! - metadata: UID → tags
//!
//! Both maps are `DashMap`s so workers putting different records never
//! contend with each other; they only share a read lock that a rebuild
//! takes exclusively for the final swap. The index is a cache: it may be rebuilt from
//! the backend at any time, and a [`IndexSnapshot`] of an unmodified store
//! is identical before and after a rebuild.

use dashmap::{DashMap, DashSet};
use marsdb_core::{Metadata, Molecule, Record, Result, Taggable};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

/// Indexed header of a molecule record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoleculeEntry {
    /// Tags
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Owning metadata record
    #[serde(rename = "metadataUID", default, skip_serializing_if = "Option::is_none")]
    pub metadata_uid: Option<String>,
    /// Channel index
    #[serde(default = "unset")]
    pub channel: i32,
    /// Image index
    #[serde(default = "unset")]
    pub image: i32,
}

fn unset() -> i32 {
    -1
}

impl MoleculeEntry {
    /// Index entry for a molecule
    pub fn of(molecule: &Molecule) -> Self {
        MoleculeEntry {
            tags: molecule.tags().as_set().clone(),
            metadata_uid: molecule.metadata_uid().map(str::to_string),
            channel: molecule.channel(),
            image: molecule.image(),
        }
    }
}

/// Indexed header of a metadata record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Tags
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

impl MetadataEntry {
    /// Index entry for a metadata record
    pub fn of(metadata: &Metadata) -> Self {
        MetadataEntry {
            tags: metadata.tags().as_set().clone(),
        }
    }
}

/// Sorted, comparable copy of an [`ArchiveIndex`]; also the sidecar format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Molecule entries by UID
    #[serde(rename = "molecules", alias = "MoleculeIndex", default)]
    pub molecules: BTreeMap<String, MoleculeEntry>,
    /// Metadata entries by UID
    #[serde(rename = "metadata", alias = "MetadataIndex", default)]
    pub metadata: BTreeMap<String, MetadataEntry>,
}

/// Entry maps behind the index's swap lock
#[derive(Debug, Default)]
struct Maps {
    molecules: DashMap<String, MoleculeEntry>,
    metadata: DashMap<String, MetadataEntry>,
}

impl Maps {
    fn from_snapshot(snapshot: IndexSnapshot) -> Self {
        Maps {
            molecules: snapshot.molecules.into_iter().collect(),
            metadata: snapshot.metadata.into_iter().collect(),
        }
    }
}

/// UIDs written while a rebuild scan is running
#[derive(Debug, Default)]
struct Journal {
    active: AtomicBool,
    molecules: DashSet<String>,
    metadata: DashSet<String>,
}

impl Journal {
    fn start(&self) {
        self.molecules.clear();
        self.metadata.clear();
        self.active.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Concurrent UID → header index
///
/// Writers and readers share the entry maps under a read lock; a rebuild or
/// restore takes the write lock only to swap in a complete set of maps, so
/// no reader ever observes a partially filled index.
#[derive(Debug, Default)]
pub struct ArchiveIndex {
    maps: RwLock<Maps>,
    journal: Journal,
    rebuilding: Mutex<()>,
}

impl ArchiveIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a molecule's entry
    pub fn update_molecule(&self, molecule: &Molecule) {
        self.insert_molecule(molecule.uid().to_string(), MoleculeEntry::of(molecule));
    }

    /// Insert or refresh a metadata record's entry
    pub fn update_metadata(&self, metadata: &Metadata) {
        self.insert_metadata(metadata.uid().to_string(), MetadataEntry::of(metadata));
    }

    /// Insert a prepared molecule entry
    pub fn insert_molecule(&self, uid: String, entry: MoleculeEntry) {
        let maps = self.maps.read();
        if self.journal.is_active() {
            self.journal.molecules.insert(uid.clone());
        }
        maps.molecules.insert(uid, entry);
    }

    /// Insert a prepared metadata entry
    pub fn insert_metadata(&self, uid: String, entry: MetadataEntry) {
        let maps = self.maps.read();
        if self.journal.is_active() {
            self.journal.metadata.insert(uid.clone());
        }
        maps.metadata.insert(uid, entry);
    }

    /// Drop a molecule's entry
    pub fn remove_molecule(&self, uid: &str) -> Option<MoleculeEntry> {
        let maps = self.maps.read();
        if self.journal.is_active() {
            self.journal.molecules.insert(uid.to_string());
        }
        maps.molecules.remove(uid).map(|(_, entry)| entry)
    }

    /// Drop a metadata record's entry
    pub fn remove_metadata(&self, uid: &str) -> Option<MetadataEntry> {
        let maps = self.maps.read();
        if self.journal.is_active() {
            self.journal.metadata.insert(uid.to_string());
        }
        maps.metadata.remove(uid).map(|(_, entry)| entry)
    }

    /// Copy of a molecule's entry
    pub fn molecule(&self, uid: &str) -> Option<MoleculeEntry> {
        self.with_molecule(uid, MoleculeEntry::clone)
    }

    /// Copy of a metadata record's entry
    pub fn metadata(&self, uid: &str) -> Option<MetadataEntry> {
        self.with_metadata(uid, MetadataEntry::clone)
    }

    /// Run `f` against a molecule entry without copying it
    pub fn with_molecule<T>(&self, uid: &str, f: impl FnOnce(&MoleculeEntry) -> T) -> Option<T> {
        let maps = self.maps.read();
        let answer = maps.molecules.get(uid).map(|entry| f(entry.value()));
        answer
    }

    /// Run `f` against a metadata entry without copying it
    pub fn with_metadata<T>(&self, uid: &str, f: impl FnOnce(&MetadataEntry) -> T) -> Option<T> {
        let maps = self.maps.read();
        let answer = maps.metadata.get(uid).map(|entry| f(entry.value()));
        answer
    }

    /// Molecule UIDs whose entry satisfies `pred`
    pub fn molecules_where(&self, pred: impl Fn(&MoleculeEntry) -> bool) -> Vec<String> {
        self.maps
            .read()
            .molecules
            .iter()
            .filter(|entry| pred(entry.value()))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Metadata UIDs whose entry satisfies `pred`
    pub fn metadata_where(&self, pred: impl Fn(&MetadataEntry) -> bool) -> Vec<String> {
        self.maps
            .read()
            .metadata
            .iter()
            .filter(|entry| pred(entry.value()))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of indexed molecules
    pub fn molecule_count(&self) -> usize {
        self.maps.read().molecules.len()
    }

    /// Number of indexed metadata records
    pub fn metadata_count(&self) -> usize {
        self.maps.read().metadata.len()
    }

    /// Remove every entry
    pub fn clear(&self) {
        *self.maps.write() = Maps::default();
    }

    /// Sorted copy of the whole index
    pub fn snapshot(&self) -> IndexSnapshot {
        let maps = self.maps.read();
        IndexSnapshot {
            molecules: maps
                .molecules
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect(),
            metadata: maps
                .metadata
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect(),
        }
    }

    /// Rebuild an index from a snapshot
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Self {
        ArchiveIndex {
            maps: RwLock::new(Maps::from_snapshot(snapshot)),
            ..Default::default()
        }
    }

    /// Replace every entry with the contents of a snapshot in one swap
    pub fn restore(&self, snapshot: IndexSnapshot) {
        let fresh = Maps::from_snapshot(snapshot);
        *self.maps.write() = fresh;
    }

    /// Replace the index with the result of a full scan.
    ///
    /// `scan` fills a fresh index while this one keeps serving reads and
    /// writes. Entries inserted or removed here during the scan override
    /// what the scan produced for those UIDs. The fresh entries are then
    /// swapped in at once. On error the current entries are kept.
    pub fn rebuild<F>(&self, scan: F) -> Result<()>
    where
        F: FnOnce(&ArchiveIndex) -> Result<()>,
    {
        let _rebuilding = self.rebuilding.lock();
        self.journal.start();
        let fresh = ArchiveIndex::new();
        let scanned = scan(&fresh);

        let mut maps = self.maps.write();
        self.journal.stop();
        scanned?;

        let fresh = fresh.maps.into_inner();
        for uid in self.journal.molecules.iter() {
            let uid = uid.key();
            match maps.molecules.get(uid) {
                Some(live) => {
                    fresh.molecules.insert(uid.clone(), live.value().clone());
                }
                None => {
                    fresh.molecules.remove(uid);
                }
            }
        }
        for uid in self.journal.metadata.iter() {
            let uid = uid.key();
            match maps.metadata.get(uid) {
                Some(live) => {
                    fresh.metadata.insert(uid.clone(), live.value().clone());
                }
                None => {
                    fresh.metadata.remove(uid);
                }
            }
        }
        *maps = fresh;
        Ok(())
    }
}
