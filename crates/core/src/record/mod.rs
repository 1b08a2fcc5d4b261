//! Record types
//!
//! Every record is a plain struct embedding a [`RecordCore`]: the UID plus
//! three small capability components (tags, parameters, annotations). The
//! components are exposed through the [`Taggable`], [`Parameterized`] and
//! [`RegionAnnotated`] traits, which are implemented once for anything that
//! can hand out its core ([`HasCore`]). [`Record`] ties the capabilities
//! together with the parts that differ per record type.
//!
//! Records never point back at the archive that holds them. Archive-wide
//! name unions grow when a record is `put`, not when it is mutated.

mod annotations;
mod metadata;
mod molecule;

pub use annotations::{Position, Region};
pub use metadata::Metadata;
pub use molecule::{Molecule, SegmentKey};

use crate::table::Table;
use std::collections::{BTreeMap, BTreeSet};

/// Discriminates the two record types stored in an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Per-entity time-series record
    Molecule,
    /// Per-collection-session record
    Metadata,
}

impl RecordKind {
    /// Name used for directories and diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Molecule => "Molecules",
            RecordKind::Metadata => "Metadata",
        }
    }
}

/// Tag set component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(BTreeSet<String>);

impl Tags {
    /// Insert a tag, returning true if it was new
    pub fn insert(&mut self, tag: String) -> bool {
        self.0.insert(tag)
    }

    /// Remove a tag
    pub fn remove(&mut self, tag: &str) -> bool {
        self.0.remove(tag)
    }

    /// Membership check
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no tags are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove every tag
    pub fn clear(&mut self) {
        self.0.clear()
    }

    /// Iterate tags in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Borrow the underlying set
    pub fn as_set(&self) -> &BTreeSet<String> {
        &self.0
    }
}

impl FromIterator<String> for Tags {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Tags(iter.into_iter().collect())
    }
}

/// Named scalar parameters component
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters(BTreeMap<String, f64>);

impl Parameters {
    /// Insert or replace a value
    pub fn insert(&mut self, name: String, value: f64) {
        self.0.insert(name, value);
    }

    /// Look up a value
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Remove a value
    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.0.remove(name)
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no parameters are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove all parameters
    pub fn clear(&mut self) {
        self.0.clear()
    }

    /// Iterate `(name, value)` in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.0
    }
}

impl FromIterator<(String, f64)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Parameters(iter.into_iter().collect())
    }
}

/// Regions and positions of interest component
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    regions: BTreeMap<String, Region>,
    positions: BTreeMap<String, Position>,
}

impl Annotations {
    /// Regions keyed by name
    pub fn regions(&self) -> &BTreeMap<String, Region> {
        &self.regions
    }

    /// Positions keyed by name
    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    /// Mutable regions
    pub fn regions_mut(&mut self) -> &mut BTreeMap<String, Region> {
        &mut self.regions
    }

    /// Mutable positions
    pub fn positions_mut(&mut self) -> &mut BTreeMap<String, Position> {
        &mut self.positions
    }
}

/// State shared by every record type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordCore {
    uid: String,
    notes: Option<String>,
    tags: Tags,
    parameters: Parameters,
    annotations: Annotations,
}

impl RecordCore {
    /// Empty core with the given UID
    pub fn new(uid: impl Into<String>) -> Self {
        RecordCore {
            uid: uid.into(),
            ..Default::default()
        }
    }

    /// Record UID
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Replace the UID. Only the codec uses this, while a record is being
    /// reconstructed from a stream.
    pub fn set_uid(&mut self, uid: String) {
        self.uid = uid;
    }

    /// Notes, if any
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Replace the notes
    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    /// Append to the notes
    pub fn add_note(&mut self, note: &str) {
        self.notes.get_or_insert_with(String::new).push_str(note);
    }
}

/// Access to the embedded [`RecordCore`].
pub trait HasCore {
    /// Shared record state
    fn core(&self) -> &RecordCore;
    /// Mutable shared record state
    fn core_mut(&mut self) -> &mut RecordCore;
}

impl HasCore for RecordCore {
    fn core(&self) -> &RecordCore {
        self
    }

    fn core_mut(&mut self) -> &mut RecordCore {
        self
    }
}

/// Records that carry a tag set.
pub trait Taggable {
    /// Tag component
    fn tags(&self) -> &Tags;
    /// Mutable tag component
    fn tags_mut(&mut self) -> &mut Tags;

    /// Add a tag
    fn add_tag(&mut self, tag: &str) {
        self.tags_mut().insert(tag.to_string());
    }

    /// Remove a tag
    fn remove_tag(&mut self, tag: &str) {
        self.tags_mut().remove(tag);
    }

    /// Check for a tag
    fn has_tag(&self, tag: &str) -> bool {
        self.tags().contains(tag)
    }

    /// True when the record has no tags
    fn has_no_tags(&self) -> bool {
        self.tags().is_empty()
    }

    /// Remove all tags
    fn remove_all_tags(&mut self) {
        self.tags_mut().clear();
    }
}

/// Records that carry named scalar parameters.
pub trait Parameterized {
    /// Parameter component
    fn parameters(&self) -> &Parameters;
    /// Mutable parameter component
    fn parameters_mut(&mut self) -> &mut Parameters;

    /// Add or update a parameter
    fn set_parameter(&mut self, name: &str, value: f64) {
        self.parameters_mut().insert(name.to_string(), value);
    }

    /// Parameter value, NaN when absent
    fn parameter(&self, name: &str) -> f64 {
        self.parameters().get(name).unwrap_or(f64::NAN)
    }

    /// Check for a parameter
    fn has_parameter(&self, name: &str) -> bool {
        self.parameters().get(name).is_some()
    }

    /// Remove a parameter
    fn remove_parameter(&mut self, name: &str) {
        self.parameters_mut().remove(name);
    }

    /// Remove all parameters
    fn remove_all_parameters(&mut self) {
        self.parameters_mut().clear();
    }
}

/// Records that carry regions and positions of interest.
pub trait RegionAnnotated {
    /// Annotation component
    fn annotations(&self) -> &Annotations;
    /// Mutable annotation component
    fn annotations_mut(&mut self) -> &mut Annotations;

    /// Add or replace a region (names are unique)
    fn put_region(&mut self, region: Region) {
        self.annotations_mut()
            .regions_mut()
            .insert(region.name.clone(), region);
    }

    /// Look up a region
    fn region(&self, name: &str) -> Option<&Region> {
        self.annotations().regions().get(name)
    }

    /// Check for a region
    fn has_region(&self, name: &str) -> bool {
        self.annotations().regions().contains_key(name)
    }

    /// Remove a region
    fn remove_region(&mut self, name: &str) {
        self.annotations_mut().regions_mut().remove(name);
    }

    /// Names of all regions
    fn region_names(&self) -> Vec<String> {
        self.annotations().regions().keys().cloned().collect()
    }

    /// Add or replace a position (names are unique)
    fn put_position(&mut self, position: Position) {
        self.annotations_mut()
            .positions_mut()
            .insert(position.name.clone(), position);
    }

    /// Look up a position
    fn position(&self, name: &str) -> Option<&Position> {
        self.annotations().positions().get(name)
    }

    /// Check for a position
    fn has_position(&self, name: &str) -> bool {
        self.annotations().positions().contains_key(name)
    }

    /// Remove a position
    fn remove_position(&mut self, name: &str) {
        self.annotations_mut().positions_mut().remove(name);
    }

    /// Names of all positions
    fn position_names(&self) -> Vec<String> {
        self.annotations().positions().keys().cloned().collect()
    }
}

impl<T: HasCore> Taggable for T {
    fn tags(&self) -> &Tags {
        &self.core().tags
    }

    fn tags_mut(&mut self) -> &mut Tags {
        &mut self.core_mut().tags
    }
}

impl<T: HasCore> Parameterized for T {
    fn parameters(&self) -> &Parameters {
        &self.core().parameters
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.core_mut().parameters
    }
}

impl<T: HasCore> RegionAnnotated for T {
    fn annotations(&self) -> &Annotations {
        &self.core().annotations
    }

    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.core_mut().annotations
    }
}

/// A storable archive record.
pub trait Record:
    HasCore + Taggable + Parameterized + RegionAnnotated + Clone + Send + Sync + 'static
{
    /// Which collection of the archive the record lives in
    const KIND: RecordKind;

    /// Empty record with the given UID
    fn with_uid(uid: String) -> Self;

    /// Primary table
    fn table(&self) -> &Table;

    /// Mutable primary table
    fn table_mut(&mut self) -> &mut Table;

    /// Record UID
    fn uid(&self) -> &str {
        self.core().uid()
    }

    /// Notes, if any
    fn notes(&self) -> Option<&str> {
        self.core().notes()
    }

    /// Replace the notes
    fn set_notes(&mut self, notes: &str) {
        self.core_mut().set_notes(Some(notes.to_string()));
    }

    /// Append to the notes
    fn add_note(&mut self, note: &str) {
        self.core_mut().add_note(note);
    }
}
