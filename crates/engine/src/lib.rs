//! Archive engine for marsdb
//!
//! This crate orchestrates the storage layer:
//! - Archive: the facade over a memory or virtual-store backend, with
//!   property unions and the header index kept current on every put
//! - merge: combining archive files of the same kind into one
//! - workers: rayon worker pool with progress polling and cancellation
//! - config: `marsdb.toml` loading
//!
//! The engine is the only component that knows about:
//! - Which backend an archive uses
//! - Sidecar files of a virtual store
//! - Keeping records, index and property unions in agreement

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;
pub mod config;
pub mod merge;
pub mod workers;

pub use archive::{Archive, Records, MOLECULE_COLUMN};
pub use config::{ArchiveConfig, CONFIG_FILE_NAME};
pub use merge::{merge_archives, merge_directory, MergeReport};
pub use workers::{CancelFlag, Observer, Progress, WorkerPool};
