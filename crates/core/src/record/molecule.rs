use super::{HasCore, Record, RecordCore, RecordKind};
use crate::table::Table;
use crate::uid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of a segment table: the x and y columns a change-point fit was run
/// on, and the region it was restricted to (empty for the whole trace).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentKey {
    /// X column name
    #[serde(rename = "xColumnName")]
    pub x_column: String,
    /// Y column name
    #[serde(rename = "yColumnName")]
    pub y_column: String,
    /// Region name, empty for the whole trace
    #[serde(rename = "regionName", alias = "RegionName", default)]
    pub region: String,
}

impl SegmentKey {
    /// Key for a region-restricted fit
    pub fn new(x: impl Into<String>, y: impl Into<String>, region: impl Into<String>) -> Self {
        SegmentKey {
            x_column: x.into(),
            y_column: y.into(),
            region: region.into(),
        }
    }

    /// Key for a whole-trace fit
    pub fn whole(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self::new(x, y, "")
    }
}

/// A single-entity time-series record.
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    core: RecordCore,
    metadata_uid: Option<String>,
    channel: i32,
    image: i32,
    table: Table,
    segment_tables: BTreeMap<SegmentKey, Table>,
}

impl Molecule {
    /// New molecule with a freshly generated UID
    pub fn new() -> Self {
        Self::with_uid(uid::generate())
    }

    /// New molecule with a UID and primary table
    pub fn with_table(uid: impl Into<String>, table: Table) -> Self {
        let mut molecule = Self::with_uid(uid.into());
        molecule.table = table;
        molecule
    }

    /// UID of the owning metadata record
    pub fn metadata_uid(&self) -> Option<&str> {
        self.metadata_uid.as_deref()
    }

    /// Point this molecule at a metadata record. The reference is not
    /// validated and may dangle.
    pub fn set_metadata_uid(&mut self, uid: impl Into<String>) {
        self.metadata_uid = Some(uid.into());
    }

    /// Drop the metadata reference
    pub fn clear_metadata_uid(&mut self) {
        self.metadata_uid = None;
    }

    /// Channel index, -1 when unset
    pub fn channel(&self) -> i32 {
        self.channel
    }

    /// Set the channel index
    pub fn set_channel(&mut self, channel: i32) {
        self.channel = channel;
    }

    /// Image index, -1 when unset
    pub fn image(&self) -> i32 {
        self.image
    }

    /// Set the image index
    pub fn set_image(&mut self, image: i32) {
        self.image = image;
    }

    /// Replace the primary table
    pub fn set_table(&mut self, table: Table) {
        self.table = table;
    }

    /// Add or replace a segment table
    pub fn put_segment_table(&mut self, key: SegmentKey, table: Table) {
        self.segment_tables.insert(key, table);
    }

    /// Look up a segment table
    pub fn segment_table(&self, key: &SegmentKey) -> Option<&Table> {
        self.segment_tables.get(key)
    }

    /// Look up a whole-trace segment table
    pub fn whole_segment_table(&self, x: &str, y: &str) -> Option<&Table> {
        self.segment_tables.get(&SegmentKey::whole(x, y))
    }

    /// Check for a segment table
    pub fn has_segment_table(&self, key: &SegmentKey) -> bool {
        self.segment_tables.contains_key(key)
    }

    /// Remove a segment table
    pub fn remove_segment_table(&mut self, key: &SegmentKey) -> Option<Table> {
        self.segment_tables.remove(key)
    }

    /// Keys of all segment tables
    pub fn segment_table_keys(&self) -> impl Iterator<Item = &SegmentKey> {
        self.segment_tables.keys()
    }

    /// All segment tables
    pub fn segment_tables(&self) -> &BTreeMap<SegmentKey, Table> {
        &self.segment_tables
    }
}

impl Default for Molecule {
    fn default() -> Self {
        Self::new()
    }
}

impl HasCore for Molecule {
    fn core(&self) -> &RecordCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RecordCore {
        &mut self.core
    }
}

impl Record for Molecule {
    const KIND: RecordKind = RecordKind::Molecule;

    fn with_uid(uid: String) -> Self {
        Molecule {
            core: RecordCore::new(uid),
            metadata_uid: None,
            channel: -1,
            image: -1,
            table: Table::default(),
            segment_tables: BTreeMap::new(),
        }
    }

    fn table(&self) -> &Table {
        &self.table
    }

    fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }
}
