//! Record backends
//!
//! An archive keeps each of its two record collections (molecules and
//! metadata) in a [`RecordStore`]. Two implementations exist:
//!
//! - [`MemoryStore`]: every record resident in a `DashMap`
//! - [`VirtualStore`]: one file per record in a directory, decoded on every
//!   access, so only the index lives in memory
//!
//! The trait is object safe; the archive holds `Box<dyn RecordStore<_>>` and
//! never branches on the concrete backend except through
//! [`RecordStore::is_virtual`].

mod memory;
mod virtual_store;

pub use memory::MemoryStore;
pub use virtual_store::{read_sidecar, write_sidecar, VirtualStore, INDEX_SIDECAR, PROPERTIES_SIDECAR};

use marsdb_core::{Record, Result};

/// Storage for one record collection.
///
/// Implementations must be safe to call concurrently for different UIDs.
/// Concurrent writes to the same UID are last-write-wins.
pub trait RecordStore<R: Record>: Send + Sync {
    /// Fetch an owned copy of a record; `Ok(None)` when absent
    fn load(&self, uid: &str) -> Result<Option<R>>;

    /// Fetch a record's header fields. Backends that can skip payload
    /// fields do so; the default loads everything.
    fn load_header(&self, uid: &str) -> Result<Option<R>> {
        self.load(uid)
    }

    /// Insert or replace a record
    fn store(&self, record: R) -> Result<()>;

    /// Remove a record, returning whether it existed
    fn delete(&self, uid: &str) -> Result<bool>;

    /// Check for a record
    fn contains(&self, uid: &str) -> bool;

    /// Every stored UID, in no particular order
    fn list_uids(&self) -> Result<Vec<String>>;

    /// Number of stored records
    fn len(&self) -> Result<usize>;

    /// True when the store holds no records
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Run `f` against a record without handing out ownership. Returns
    /// whether the record was found.
    fn inspect(&self, uid: &str, f: &mut dyn FnMut(&R)) -> Result<bool>;

    /// True for file-per-record stores
    fn is_virtual(&self) -> bool;
}
