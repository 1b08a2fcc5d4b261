//! Declarative field tables and the generic codec that interprets them.
//!
//! A [`Schema`] lists, for one record type, every field that can appear in
//! its serialized map: the canonical name, legacy aliases accepted on read,
//! the value shape, whether the field is payload (skipped when only header
//! fields are wanted), and a pair of plain function pointers that move the
//! value in and out of the record.
//!
//! Encoding writes only fields whose encoder returns `Some`, under their
//! canonical names. Decoding resolves each key against names and aliases;
//! keys that resolve to nothing are skipped with [`IgnoredAny`], which
//! consumes an arbitrarily nested value without materializing it.

use super::fields::SchemaRecord;
use marsdb_core::float::Flexible;
use marsdb_core::{Parameters, Position, Region, SegmentKey, Table, Tags};
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;

/// Value shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// String scalar
    Str,
    /// 32-bit integer scalar
    Int,
    /// Array of strings
    Tags,
    /// Map of name to float
    Parameters,
    /// Array of region objects
    Regions,
    /// Array of position objects
    Positions,
    /// Table object
    Table,
    /// Array of segment-table entries
    SegmentTables,
}

/// Borrowed field value, produced by an encoder.
#[derive(Debug, Clone, Copy)]
pub enum FieldRef<'a> {
    /// String scalar
    Str(&'a str),
    /// Integer scalar
    Int(i32),
    /// Tag set
    Tags(&'a Tags),
    /// Parameter map
    Parameters(&'a Parameters),
    /// Regions by name
    Regions(&'a BTreeMap<String, Region>),
    /// Positions by name
    Positions(&'a BTreeMap<String, Position>),
    /// Table
    Table(&'a Table),
    /// Segment tables by key
    SegmentTables(&'a BTreeMap<SegmentKey, Table>),
}

/// Owned field value, handed to a decoder.
#[derive(Debug)]
pub enum FieldValue {
    /// String scalar
    Str(String),
    /// Integer scalar
    Int(i32),
    /// Tag set
    Tags(Tags),
    /// Parameter map
    Parameters(Parameters),
    /// Regions in stream order
    Regions(Vec<Region>),
    /// Positions in stream order
    Positions(Vec<Position>),
    /// Table
    Table(Table),
    /// Segment tables in stream order
    SegmentTables(Vec<(SegmentKey, Table)>),
}

/// One serialized field of a record type.
pub struct FieldSpec<R> {
    /// Canonical name, the only one ever written
    pub name: &'static str,
    /// Legacy names accepted on read
    pub aliases: &'static [&'static str],
    /// Value shape
    pub kind: FieldKind,
    /// Skipped in header-only decoding
    pub payload: bool,
    /// Extract the value; `None` omits the field
    pub encode: for<'a> fn(&'a R) -> Option<FieldRef<'a>>,
    /// Store a decoded value
    pub decode: fn(&mut R, FieldValue),
}

impl<R> fmt::Debug for FieldSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("kind", &self.kind)
            .field("payload", &self.payload)
            .finish()
    }
}

/// Ordered field table for one record type.
#[derive(Debug)]
pub struct Schema<R> {
    fields: Vec<FieldSpec<R>>,
    lookup: HashMap<&'static str, usize>,
}

impl<R> Schema<R> {
    /// Build a schema; fields are written in the order given.
    pub fn new(fields: Vec<FieldSpec<R>>) -> Self {
        let mut lookup = HashMap::new();
        for (i, field) in fields.iter().enumerate() {
            lookup.insert(field.name, i);
            for alias in field.aliases {
                lookup.insert(*alias, i);
            }
        }
        Schema { fields, lookup }
    }

    /// Resolve a stream key against canonical names and aliases
    pub fn resolve(&self, key: &str) -> Option<&FieldSpec<R>> {
        self.lookup.get(key).map(|&i| &self.fields[i])
    }

    /// Fields in write order
    pub fn fields(&self) -> &[FieldSpec<R>] {
        &self.fields
    }
}

impl Serialize for FieldRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            FieldRef::Str(value) => serializer.serialize_str(value),
            FieldRef::Int(value) => serializer.serialize_i32(value),
            FieldRef::Tags(tags) => serializer.collect_seq(tags.iter()),
            FieldRef::Parameters(params) => {
                serializer.collect_map(params.iter().map(|(name, v)| (name, Flexible(*v))))
            }
            FieldRef::Regions(regions) => serializer.collect_seq(regions.values()),
            FieldRef::Positions(positions) => serializer.collect_seq(positions.values()),
            FieldRef::Table(table) => table.serialize(serializer),
            FieldRef::SegmentTables(tables) => serializer.collect_seq(
                tables
                    .iter()
                    .map(|(key, table)| SegmentEntryRef { key, table }),
            ),
        }
    }
}

struct SegmentEntryRef<'a> {
    key: &'a SegmentKey,
    table: &'a Table,
}

impl Serialize for SegmentEntryRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("xColumnName", &self.key.x_column)?;
        map.serialize_entry("yColumnName", &self.key.y_column)?;
        map.serialize_entry("regionName", &self.key.region)?;
        map.serialize_entry("table", self.table)?;
        map.end()
    }
}

#[derive(Deserialize)]
struct SegmentEntry {
    #[serde(rename = "xColumnName", alias = "XColumnName")]
    x_column: String,
    #[serde(rename = "yColumnName", alias = "YColumnName")]
    y_column: String,
    #[serde(rename = "regionName", alias = "RegionName", default)]
    region: String,
    #[serde(rename = "table", alias = "Table", default)]
    table: Table,
}

/// Serialize a record through its schema.
pub struct Encode<'a, R>(pub &'a R);

impl<R: SchemaRecord> Serialize for Encode<'_, R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let present: Vec<(&'static str, FieldRef<'_>)> = R::schema()
            .fields()
            .iter()
            .filter_map(|spec| (spec.encode)(self.0).map(|value| (spec.name, value)))
            .collect();
        let mut map = serializer.serialize_map(Some(present.len()))?;
        for (name, value) in &present {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Deserialize a record through its schema, optionally skipping payload
/// fields.
pub struct DecodeSeed<R> {
    header_only: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R> DecodeSeed<R> {
    /// Decode every known field
    pub fn full() -> Self {
        DecodeSeed {
            header_only: false,
            _record: PhantomData,
        }
    }

    /// Decode header fields only
    pub fn header() -> Self {
        DecodeSeed {
            header_only: true,
            _record: PhantomData,
        }
    }

    /// True when payload fields are skipped
    pub fn is_header_only(&self) -> bool {
        self.header_only
    }
}

impl<R> Clone for DecodeSeed<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for DecodeSeed<R> {}

impl<'de, R: SchemaRecord> DeserializeSeed<'de> for DecodeSeed<R> {
    type Value = R;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<R, D::Error> {
        deserializer.deserialize_map(RecordVisitor::<R> {
            header_only: self.header_only,
            _record: PhantomData,
        })
    }
}

struct RecordVisitor<R> {
    header_only: bool,
    _record: PhantomData<fn() -> R>,
}

impl<'de, R: SchemaRecord> Visitor<'de> for RecordVisitor<R> {
    type Value = R;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a {} record map", R::KIND.as_str())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<R, A::Error> {
        let schema = R::schema();
        let mut record = R::with_uid(String::new());

        while let Some(key) = map.next_key::<String>()? {
            let spec = match schema.resolve(&key) {
                Some(spec) if !(self.header_only && spec.payload) => spec,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                    continue;
                }
            };
            let value = match spec.kind {
                FieldKind::Str => match map.next_value::<Option<String>>()? {
                    Some(s) => FieldValue::Str(s),
                    None => continue,
                },
                FieldKind::Int => FieldValue::Int(map.next_value()?),
                FieldKind::Tags => {
                    FieldValue::Tags(map.next_value::<Vec<String>>()?.into_iter().collect())
                }
                FieldKind::Parameters => FieldValue::Parameters(
                    map.next_value::<BTreeMap<String, Flexible>>()?
                        .into_iter()
                        .map(|(name, v)| (name, v.0))
                        .collect(),
                ),
                FieldKind::Regions => FieldValue::Regions(map.next_value()?),
                FieldKind::Positions => FieldValue::Positions(map.next_value()?),
                FieldKind::Table => FieldValue::Table(map.next_value()?),
                FieldKind::SegmentTables => FieldValue::SegmentTables(
                    map.next_value::<Vec<SegmentEntry>>()?
                        .into_iter()
                        .map(|e| (SegmentKey::new(e.x_column, e.y_column, e.region), e.table))
                        .collect(),
                ),
            };
            (spec.decode)(&mut record, value);
        }

        if record.uid().is_empty() {
            return Err(de::Error::missing_field("UID"));
        }
        Ok(record)
    }
}
