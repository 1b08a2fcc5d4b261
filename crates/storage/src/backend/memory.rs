//! In-memory record store
//!
//! - DashMap: sharded, so puts from different workers only lock their
//!   target shard
//! - `load` returns an owned clone; callers mutate it and `store` it back
//! - `inspect` reads in place for queries that only need a field or two

use super::RecordStore;
use dashmap::DashMap;
use marsdb_core::{Record, Result};

/// Record store holding every record in memory
#[derive(Debug)]
pub struct MemoryStore<R> {
    records: DashMap<String, R>,
}

impl<R> MemoryStore<R> {
    /// Create an empty store
    pub fn new() -> Self {
        MemoryStore {
            records: DashMap::new(),
        }
    }
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> RecordStore<R> for MemoryStore<R> {
    fn load(&self, uid: &str) -> Result<Option<R>> {
        Ok(self.records.get(uid).map(|entry| entry.value().clone()))
    }

    fn store(&self, record: R) -> Result<()> {
        self.records.insert(record.uid().to_string(), record);
        Ok(())
    }

    fn delete(&self, uid: &str) -> Result<bool> {
        Ok(self.records.remove(uid).is_some())
    }

    fn contains(&self, uid: &str) -> bool {
        self.records.contains_key(uid)
    }

    fn list_uids(&self) -> Result<Vec<String>> {
        Ok(self.records.iter().map(|entry| entry.key().clone()).collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.records.len())
    }

    fn inspect(&self, uid: &str, f: &mut dyn FnMut(&R)) -> Result<bool> {
        match self.records.get(uid) {
            Some(entry) => {
                f(entry.value());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn is_virtual(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsdb_core::{Molecule, Taggable};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_store_and_load_returns_copy() {
        let store = MemoryStore::<Molecule>::new();
        let mut m = Molecule::with_uid("m1".to_string());
        m.add_tag("good");
        store.store(m).unwrap();

        let mut copy = store.load("m1").unwrap().unwrap();
        copy.add_tag("bad");
        // not stored back, so the resident record is unchanged
        let resident = store.load("m1").unwrap().unwrap();
        assert!(!resident.has_tag("bad"));
    }

    #[test]
    fn test_missing_is_none() {
        let store: MemoryStore<Molecule> = MemoryStore::new();
        assert!(store.load("nope").unwrap().is_none());
        assert!(!store.delete("nope").unwrap());
        assert!(!store.inspect("nope", &mut |_| {}).unwrap());
    }

    #[test]
    fn test_inspect_reads_in_place() {
        let store = MemoryStore::<Molecule>::new();
        let mut m = Molecule::with_uid("m1".to_string());
        m.add_tag("good");
        store.store(m).unwrap();
        let mut seen = false;
        assert!(store.inspect("m1", &mut |m| seen = m.has_tag("good")).unwrap());
        assert!(seen);
    }

    #[test]
    fn test_concurrent_distinct_uids() {
        let store = Arc::new(MemoryStore::<Molecule>::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        store
                            .store(Molecule::with_uid(format!("m{}_{}", t, i)))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len().unwrap(), 800);
        assert_eq!(store.list_uids().unwrap().len(), 800);
    }
}
