//! Archive-wide properties
//!
//! [`ArchiveProperties`] is the serialized aggregate written at the head of
//! every archive: record counts and the unions of every tag, parameter,
//! region, position, column and segment-table name ever seen.
//!
//! [`PropertySet`] is its live counterpart inside an open archive. Every
//! `put` from every worker folds the record's names into it, so each union
//! is an insert-only set behind its own `RwLock`. Inserts first check under
//! the read lock, which keeps the common case (name already known)
//! contention-free.
//!
//! Unions never shrink. Removing the last record that uses a tag leaves the
//! tag name in place.

use crate::kind::ArchiveKind;
use crate::record::{Molecule, Record, SegmentKey};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Serialized archive aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveProperties {
    /// Variant that produced the archive; required when reading
    #[serde(rename = "type", alias = "Type")]
    pub archive_type: ArchiveKind,
    /// Number of molecule records
    #[serde(rename = "numberOfMolecules", alias = "NumberOfMolecules", default)]
    pub molecule_count: u64,
    /// Number of metadata records
    #[serde(
        rename = "numberOfMetadata",
        alias = "numImageMetadata",
        alias = "NumImageMetadata",
        alias = "numberOfMetadatas",
        default
    )]
    pub metadata_count: u64,
    /// Every column name seen in a primary table
    #[serde(rename = "columnNames", alias = "ColumnSet", alias = "columnSet", default)]
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub column_names: BTreeSet<String>,
    /// Every tag seen
    #[serde(rename = "tagNames", alias = "TagSet", alias = "tagSet", default)]
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tag_names: BTreeSet<String>,
    /// Every parameter name seen
    #[serde(rename = "parameterNames", alias = "ParameterSet", alias = "parameterSet", default)]
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub parameter_names: BTreeSet<String>,
    /// Every region name seen
    #[serde(rename = "regionNames", alias = "RegionSet", alias = "regionSet", default)]
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub region_names: BTreeSet<String>,
    /// Every position name seen
    #[serde(rename = "positionNames", alias = "PositionSet", alias = "positionSet", default)]
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub position_names: BTreeSet<String>,
    /// Every segment-table key seen
    #[serde(rename = "segmentTableNames", alias = "SegmentTableNames", default)]
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub segment_table_names: BTreeSet<SegmentKey>,
    /// Free-form archive comments
    #[serde(rename = "comments", alias = "Comments", default)]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comments: String,
}

impl ArchiveProperties {
    /// Empty properties for an archive variant
    pub fn new(kind: ArchiveKind) -> Self {
        ArchiveProperties {
            archive_type: kind,
            ..Default::default()
        }
    }

    /// Fold another archive's properties into this one: counts are summed
    /// and every name set is unioned.
    pub fn merge(&mut self, other: &ArchiveProperties) {
        self.molecule_count += other.molecule_count;
        self.metadata_count += other.metadata_count;
        self.column_names.extend(other.column_names.iter().cloned());
        self.tag_names.extend(other.tag_names.iter().cloned());
        self.parameter_names.extend(other.parameter_names.iter().cloned());
        self.region_names.extend(other.region_names.iter().cloned());
        self.position_names.extend(other.position_names.iter().cloned());
        self.segment_table_names
            .extend(other.segment_table_names.iter().cloned());
    }
}

/// Thread-safe, insert-only accumulator of archive name unions.
#[derive(Debug, Default)]
pub struct PropertySet {
    column_names: RwLock<BTreeSet<String>>,
    tag_names: RwLock<BTreeSet<String>>,
    parameter_names: RwLock<BTreeSet<String>>,
    region_names: RwLock<BTreeSet<String>>,
    position_names: RwLock<BTreeSet<String>>,
    segment_table_names: RwLock<BTreeSet<SegmentKey>>,
    comments: RwLock<String>,
}

fn grow<'a, T, I>(set: &RwLock<BTreeSet<T>>, items: I)
where
    T: Ord + Clone + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let missing: Vec<&T> = {
        let guard = set.read();
        items.into_iter().filter(|item| !guard.contains(*item)).collect()
    };
    if !missing.is_empty() {
        set.write().extend(missing.into_iter().cloned());
    }
}

impl PropertySet {
    /// Empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the accumulator from stored properties
    pub fn absorb(&self, props: &ArchiveProperties) {
        grow(&self.column_names, &props.column_names);
        grow(&self.tag_names, &props.tag_names);
        grow(&self.parameter_names, &props.parameter_names);
        grow(&self.region_names, &props.region_names);
        grow(&self.position_names, &props.position_names);
        grow(&self.segment_table_names, &props.segment_table_names);
        if !props.comments.is_empty() {
            *self.comments.write() = props.comments.clone();
        }
    }

    /// Fold every name carried by a record into the unions
    pub fn observe<R: Record>(&self, record: &R) {
        grow(&self.tag_names, record.tags().iter());
        grow(&self.parameter_names, record.parameters().iter().map(|(k, _)| k));
        grow(&self.region_names, record.annotations().regions().keys());
        grow(&self.position_names, record.annotations().positions().keys());
        let columns: Vec<String> = record.table().column_names().map(str::to_string).collect();
        grow(&self.column_names, &columns);
    }

    /// [`PropertySet::observe`] plus segment-table keys
    pub fn observe_molecule(&self, molecule: &Molecule) {
        self.observe(molecule);
        grow(&self.segment_table_names, molecule.segment_table_keys());
    }

    /// Add a single tag name
    pub fn add_tag(&self, tag: &str) {
        let tag = tag.to_string();
        grow(&self.tag_names, std::iter::once(&tag));
    }

    /// Tag union
    pub fn tag_names(&self) -> BTreeSet<String> {
        self.tag_names.read().clone()
    }

    /// Parameter union
    pub fn parameter_names(&self) -> BTreeSet<String> {
        self.parameter_names.read().clone()
    }

    /// Column union
    pub fn column_names(&self) -> BTreeSet<String> {
        self.column_names.read().clone()
    }

    /// Segment-table key union
    pub fn segment_table_names(&self) -> BTreeSet<SegmentKey> {
        self.segment_table_names.read().clone()
    }

    /// Archive comments
    pub fn comments(&self) -> String {
        self.comments.read().clone()
    }

    /// Replace the archive comments
    pub fn set_comments(&self, comments: &str) {
        *self.comments.write() = comments.to_string();
    }

    /// Serializable snapshot with the given counts
    pub fn snapshot(
        &self,
        kind: ArchiveKind,
        molecule_count: u64,
        metadata_count: u64,
    ) -> ArchiveProperties {
        ArchiveProperties {
            archive_type: kind,
            molecule_count,
            metadata_count,
            column_names: self.column_names.read().clone(),
            tag_names: self.tag_names.read().clone(),
            parameter_names: self.parameter_names.read().clone(),
            region_names: self.region_names.read().clone(),
            position_names: self.position_names.read().clone(),
            segment_table_names: self.segment_table_names.read().clone(),
            comments: self.comments.read().clone(),
        }
    }
}
