//! Single-file archive document
//!
//! A saved archive is one map with three entries, in this order:
//!
//! ```text
//! { "ArchiveProperties": {...}, "Metadata": [ {...}, ... ], "Molecules": [ {...}, ... ] }
//! ```
//!
//! Neither direction materializes the record arrays. Writing pulls records
//! from a [`RecordStore`] one at a time ([`StoreRecords`]); reading pushes
//! each record to a [`DocumentSink`] as soon as it has been decoded. A sink
//! may decline a section, in which case it is skipped token by token (the
//! molecule array is still counted, which is what a merge needs to size its
//! output).

use crate::backend::RecordStore;
use crate::codec::{self, DecodeSeed, Encode, SchemaRecord};
use marsdb_core::{ArchiveProperties, Error, Metadata, Molecule, Record, Result};
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::ser::{self, SerializeMap, SerializeSeq};
use serde::{Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::BufRead;

/// Key of the properties entry
pub const PROPERTIES_KEY: &str = "ArchiveProperties";
/// Key of the metadata array
pub const METADATA_KEY: &str = "Metadata";
/// Key of the molecule array
pub const MOLECULES_KEY: &str = "Molecules";

enum Section {
    Properties,
    Metadata,
    Molecules,
}

fn section(key: &str) -> Option<Section> {
    match key {
        PROPERTIES_KEY | "MoleculeArchiveProperties" => Some(Section::Properties),
        METADATA_KEY | "ImageMetadata" | "ImageMetaData" => Some(Section::Metadata),
        MOLECULES_KEY => Some(Section::Molecules),
        _ => None,
    }
}

/// Serializable view of a whole archive.
///
/// `metadata` and `molecules` are any sequence serializers, typically
/// [`StoreRecords`].
pub struct ArchiveDocument<'a, D, M> {
    /// Archive properties
    pub properties: &'a ArchiveProperties,
    /// Metadata record sequence
    pub metadata: D,
    /// Molecule record sequence
    pub molecules: M,
}

impl<D: Serialize, M: Serialize> Serialize for ArchiveDocument<'_, D, M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry(PROPERTIES_KEY, self.properties)?;
        map.serialize_entry(METADATA_KEY, &self.metadata)?;
        map.serialize_entry(MOLECULES_KEY, &self.molecules)?;
        map.end()
    }
}

/// Serializes every record of a store as a sequence, loading one record at
/// a time. UIDs are captured up front and written in sorted order.
pub struct StoreRecords<'a, R: Record> {
    store: &'a dyn RecordStore<R>,
    uids: Vec<String>,
}

impl<'a, R: SchemaRecord> StoreRecords<'a, R> {
    /// Capture the current UID list of `store`
    pub fn new(store: &'a dyn RecordStore<R>) -> Result<Self> {
        let mut uids = store.list_uids()?;
        uids.sort();
        Ok(StoreRecords { store, uids })
    }

    /// Number of records that will be written
    pub fn len(&self) -> usize {
        self.uids.len()
    }

    /// True when no records will be written
    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }
}

impl<R: SchemaRecord> Serialize for StoreRecords<'_, R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.uids.len()))?;
        for uid in &self.uids {
            let mut written = Ok(());
            let found = self
                .store
                .inspect(uid, &mut |record| written = seq.serialize_element(&Encode(record)))
                .map_err(ser::Error::custom)?;
            written?;
            if !found {
                return Err(ser::Error::custom(format!(
                    "record {} disappeared while saving",
                    uid
                )));
            }
        }
        seq.end()
    }
}

/// Receiver of a streamed archive document.
pub trait DocumentSink {
    /// The properties entry
    fn properties(&mut self, properties: ArchiveProperties) -> Result<()>;

    /// One decoded metadata record
    fn metadata(&mut self, record: Metadata) -> Result<()>;

    /// One decoded molecule record
    fn molecule(&mut self, record: Molecule) -> Result<()>;

    /// When false the metadata array is skipped
    fn wants_metadata(&self) -> bool {
        true
    }

    /// When false the molecule array is skipped and only counted
    fn wants_molecules(&self) -> bool {
        true
    }

    /// Number of molecules in a skipped molecule array
    fn skipped_molecules(&mut self, _count: u64) {}
}

/// Stream a document of either format into `sink`.
///
/// Errors raised by the sink are returned as-is rather than flattened into
/// a format error.
pub fn read_document<Rd: BufRead, S: DocumentSink>(reader: Rd, sink: &mut S) -> Result<()> {
    let mut failure = None;
    let seed = DocumentSeed {
        sink,
        failure: &mut failure,
    };
    match codec::read_seed(seed, reader) {
        Ok(()) => Ok(()),
        Err(e) => Err(failure.take().unwrap_or(e)),
    }
}

fn fail<E: de::Error>(slot: &mut Option<Error>, err: Error) -> E {
    let wrapped = E::custom(&err);
    *slot = Some(err);
    wrapped
}

struct DocumentSeed<'a, S> {
    sink: &'a mut S,
    failure: &'a mut Option<Error>,
}

impl<'de, S: DocumentSink> DeserializeSeed<'de> for DocumentSeed<'_, S> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de, S: DocumentSink> Visitor<'de> for DocumentSeed<'_, S> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an archive document map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<(), A::Error> {
        let DocumentSeed { sink, failure } = self;
        let mut saw_properties = false;

        while let Some(key) = map.next_key::<String>()? {
            match section(&key) {
                Some(Section::Properties) => {
                    let properties: ArchiveProperties = map.next_value()?;
                    sink.properties(properties)
                        .map_err(|e| fail(&mut *failure, e))?;
                    saw_properties = true;
                }
                Some(Section::Metadata) if sink.wants_metadata() => {
                    map.next_value_seed(RecordSeqSeed {
                        sink: &mut *sink,
                        failure: &mut *failure,
                        deliver: S::metadata,
                    })?;
                }
                Some(Section::Molecules) if sink.wants_molecules() => {
                    map.next_value_seed(RecordSeqSeed {
                        sink: &mut *sink,
                        failure: &mut *failure,
                        deliver: S::molecule,
                    })?;
                }
                Some(Section::Molecules) => {
                    let count = map.next_value_seed(CountSeed)?;
                    sink.skipped_molecules(count);
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        if !saw_properties {
            return Err(de::Error::missing_field(PROPERTIES_KEY));
        }
        Ok(())
    }
}

struct RecordSeqSeed<'a, S, R> {
    sink: &'a mut S,
    failure: &'a mut Option<Error>,
    deliver: fn(&mut S, R) -> Result<()>,
}

impl<'de, S, R: SchemaRecord> DeserializeSeed<'de> for RecordSeqSeed<'_, S, R> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, S, R: SchemaRecord> Visitor<'de> for RecordSeqSeed<'_, S, R> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an array of {} records", R::KIND.as_str())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<(), A::Error> {
        let RecordSeqSeed {
            sink,
            failure,
            deliver,
        } = self;
        while let Some(record) = seq.next_element_seed(DecodeSeed::<R>::full())? {
            deliver(&mut *sink, record).map_err(|e| fail(&mut *failure, e))?;
        }
        Ok(())
    }
}

struct CountSeed;

impl<'de> DeserializeSeed<'de> for CountSeed {
    type Value = u64;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<u64, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for CountSeed {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<u64, A::Error> {
        let mut count = 0;
        while seq.next_element::<IgnoredAny>()?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}
