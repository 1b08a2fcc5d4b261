//! Storage layer for marsdb
//!
//! This crate implements everything between a record and the disk:
//! - codec: table-driven record encoding over JSON and MessagePack, with
//!   format sniffing and header-only decoding
//! - document: streaming read/write of single-file archives
//! - backend: the `RecordStore` trait with in-memory (`MemoryStore`) and
//!   file-per-record (`VirtualStore`) implementations
//! - index: `ArchiveIndex`, the concurrent header cache behind tag queries
//! - atomic: crash-safe temp-file + rename writes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod atomic;
pub mod backend;
pub mod codec;
pub mod document;
pub mod index;

pub use backend::{MemoryStore, RecordStore, VirtualStore};
pub use codec::{Format, SchemaRecord};
pub use document::{read_document, ArchiveDocument, DocumentSink, StoreRecords};
pub use index::{ArchiveIndex, IndexSnapshot, MetadataEntry, MoleculeEntry};
