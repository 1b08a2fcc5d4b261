//! marsdb - storage and indexing engine for single-molecule archives
//!
//! An archive holds molecule records (per-molecule data tables with tags,
//! parameters and annotated regions) and the metadata records describing
//! the acquisitions they came from. Archives live either in memory, backed
//! by a single archive file, or in a virtual store directory with one file
//! per record.
//!
//! # Quick Start
//!
//! ```ignore
//! use marsdb::{Archive, ArchiveKind, Molecule, Record, Taggable};
//!
//! let archive = Archive::new("run1", ArchiveKind::SingleMolecule);
//! let mut m = Molecule::with_uid(marsdb::uid::generate());
//! m.add_tag("good");
//! archive.put(m)?;
//! archive.save_as("run1.yama")?;
//!
//! let reopened = Archive::open("run1.yama")?;
//! ```
//!
//! # Architecture
//!
//! - `marsdb-core`: records, tables, archive properties and errors
//! - `marsdb-storage`: text/binary codec, backends, index, archive documents
//! - `marsdb-engine`: the [`Archive`] facade, merging and worker pools

pub use marsdb_core::{
    uid, Annotations, ArchiveKind, ArchiveProperties, Error, HasCore, Metadata, Molecule,
    Parameterized, Parameters, Position, Record, RecordKind, Region, RegionAnnotated, Result,
    SegmentKey, Table, Taggable, Tags,
};
pub use marsdb_engine::{
    merge_archives, merge_directory, Archive, ArchiveConfig, CancelFlag, MergeReport, Progress,
    Records, WorkerPool, CONFIG_FILE_NAME, MOLECULE_COLUMN,
};
pub use marsdb_storage::{ArchiveIndex, Format, IndexSnapshot};
