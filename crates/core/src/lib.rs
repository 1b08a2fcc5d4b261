//! Core types for marsdb
//!
//! This crate defines the data model shared by the storage backends and the
//! archive engine:
//! - Table: named columns of floating-point values
//! - Molecule / Metadata: the two record types, built from small capability
//!   components (tags, parameters, regions and positions)
//! - ArchiveProperties / PropertySet: archive-wide counts and name unions
//! - ArchiveKind: registry of archive variants
//! - uid: base58 record identifiers
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod float;
pub mod kind;
pub mod properties;
pub mod record;
pub mod table;
pub mod uid;

pub use error::{Error, Result};
pub use kind::ArchiveKind;
pub use properties::{ArchiveProperties, PropertySet};
pub use record::{
    Annotations, HasCore, Metadata, Molecule, Parameterized, Parameters, Position, Record,
    RecordCore, RecordKind, Region, RegionAnnotated, SegmentKey, Taggable, Tags,
};
pub use table::{Column, Table};
