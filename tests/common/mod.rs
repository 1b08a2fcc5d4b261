//! Shared test utilities for the integration suites.
//!
//! Import via `mod common;` from a suite's main.rs.

#![allow(dead_code)]

use marsdb::{
    Archive, ArchiveKind, Metadata, Molecule, Parameterized, Record, Region, RegionAnnotated,
    Table, Taggable,
};
use std::path::{Path, PathBuf};

// ============================================================================
// Records
// ============================================================================

/// Molecule with a small trace table and the given tags
pub fn molecule(uid: &str, tags: &[&str]) -> Molecule {
    let table = Table::new("trace")
        .with_column("T", vec![0.0, 1.0, 2.0, 3.0])
        .with_column("intensity", vec![10.0, 9.5, 4.0, 3.8]);
    let mut m = Molecule::with_table(uid, table);
    for tag in tags {
        m.add_tag(tag);
    }
    m
}

/// Molecule with parameters, a region and a metadata link
pub fn rich_molecule(uid: &str, metadata_uid: &str) -> Molecule {
    let mut m = molecule(uid, &["good"]);
    m.set_metadata_uid(metadata_uid);
    m.set_parameter("step_size", 1.25);
    m.put_region(Region::new("bleach", "T", 1.0, 2.0));
    m.set_notes("fit ok");
    m
}

/// Metadata record with one log line
pub fn metadata(uid: &str) -> Metadata {
    let mut meta = Metadata::with_uid(uid.to_string());
    meta.logln("acquired");
    meta
}

// ============================================================================
// Archives
// ============================================================================

/// In-memory archive with `count` molecules `m000..` linked to one metadata
/// record; every third molecule is tagged `good`.
pub fn populated_archive(count: usize) -> Archive {
    let archive = Archive::new("populated", ArchiveKind::SingleMolecule);
    archive.put_metadata(metadata("meta0")).unwrap();
    for i in 0..count {
        let tags: &[&str] = if i % 3 == 0 { &["good"] } else { &[] };
        let mut m = molecule(&format!("m{:03}", i), tags);
        m.set_metadata_uid("meta0");
        archive.put(m).unwrap();
    }
    archive
}

/// Write a binary archive file with one metadata record and the given
/// molecules
pub fn archive_file(
    path: &Path,
    kind: ArchiveKind,
    metadata_uid: &str,
    molecule_uids: &[&str],
) -> PathBuf {
    let archive = Archive::new("input", kind);
    archive.put_metadata(metadata(metadata_uid)).unwrap();
    for uid in molecule_uids {
        archive.put(rich_molecule(uid, metadata_uid)).unwrap();
    }
    archive.save_as(path).unwrap();
    path.to_path_buf()
}
