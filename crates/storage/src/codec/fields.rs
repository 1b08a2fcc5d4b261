//! Field tables for molecule and metadata records.
//!
//! Both record types share the base fields (UID, notes, tags, parameters,
//! regions, positions, table) and add their own. Legacy capitalized names
//! written by older archives are accepted as aliases but never written.

use super::schema::{FieldKind, FieldRef, FieldSpec, FieldValue, Schema};
use marsdb_core::{
    HasCore, Metadata, Molecule, Parameterized, Record, RegionAnnotated, Table, Taggable,
};
use once_cell::sync::Lazy;

/// A record type with a serialized field table.
pub trait SchemaRecord: Record {
    /// Field table for this record type
    fn schema() -> &'static Schema<Self>;
}

/// Name under which the UID is written
pub const UID_FIELD: &str = "UID";

fn table_present(table: &Table) -> bool {
    table.column_count() > 0 || !table.name().is_empty()
}

fn uid_field<R: Record>() -> FieldSpec<R> {
    FieldSpec::<R> {
        name: UID_FIELD,
        aliases: &["uid"],
        kind: FieldKind::Str,
        payload: false,
        encode: |r| Some(FieldRef::Str(r.uid())),
        decode: |r, v| {
            if let FieldValue::Str(uid) = v {
                r.core_mut().set_uid(uid);
            }
        },
    }
}

fn base_fields<R: Record>() -> Vec<FieldSpec<R>> {
    vec![
        FieldSpec::<R> {
            name: "notes",
            aliases: &["Notes"],
            kind: FieldKind::Str,
            payload: false,
            encode: |r| r.notes().map(FieldRef::Str),
            decode: |r, v| {
                if let FieldValue::Str(notes) = v {
                    r.core_mut().set_notes(Some(notes));
                }
            },
        },
        FieldSpec::<R> {
            name: "tags",
            aliases: &["Tags"],
            kind: FieldKind::Tags,
            payload: false,
            encode: |r| (!r.tags().is_empty()).then(|| FieldRef::Tags(r.tags())),
            decode: |r, v| {
                if let FieldValue::Tags(tags) = v {
                    *r.tags_mut() = tags;
                }
            },
        },
        FieldSpec::<R> {
            name: "parameters",
            aliases: &["Parameters"],
            kind: FieldKind::Parameters,
            payload: false,
            encode: |r| {
                (!r.parameters().is_empty()).then(|| FieldRef::Parameters(r.parameters()))
            },
            decode: |r, v| {
                if let FieldValue::Parameters(params) = v {
                    *r.parameters_mut() = params;
                }
            },
        },
        FieldSpec::<R> {
            name: "regionsOfInterest",
            aliases: &["RegionsOfInterest"],
            kind: FieldKind::Regions,
            payload: false,
            encode: |r| {
                let regions = r.annotations().regions();
                (!regions.is_empty()).then(|| FieldRef::Regions(regions))
            },
            decode: |r, v| {
                if let FieldValue::Regions(regions) = v {
                    for region in regions {
                        r.put_region(region);
                    }
                }
            },
        },
        FieldSpec::<R> {
            name: "positionsOfInterest",
            aliases: &["PositionsOfInterest"],
            kind: FieldKind::Positions,
            payload: false,
            encode: |r| {
                let positions = r.annotations().positions();
                (!positions.is_empty()).then(|| FieldRef::Positions(positions))
            },
            decode: |r, v| {
                if let FieldValue::Positions(positions) = v {
                    for position in positions {
                        r.put_position(position);
                    }
                }
            },
        },
        FieldSpec::<R> {
            name: "table",
            aliases: &["DataTable", "Table"],
            kind: FieldKind::Table,
            payload: true,
            encode: |r| table_present(r.table()).then(|| FieldRef::Table(r.table())),
            decode: |r, v| {
                if let FieldValue::Table(table) = v {
                    *r.table_mut() = table;
                }
            },
        },
    ]
}

static MOLECULE_SCHEMA: Lazy<Schema<Molecule>> = Lazy::new(|| {
    let mut fields = vec![
        uid_field(),
        FieldSpec::<Molecule> {
            name: "type",
            aliases: &[],
            kind: FieldKind::Str,
            payload: false,
            encode: |_| Some(FieldRef::Str("Molecule")),
            decode: |_, _| {},
        },
    ];
    fields.extend(base_fields());
    fields.extend([
        FieldSpec::<Molecule> {
            name: "metadataUID",
            aliases: &["ImageMetadataUID", "ImageMetaDataUID", "MetadataUID"],
            kind: FieldKind::Str,
            payload: false,
            encode: |m| m.metadata_uid().map(FieldRef::Str),
            decode: |m, v| {
                if let FieldValue::Str(uid) = v {
                    m.set_metadata_uid(uid);
                }
            },
        },
        FieldSpec::<Molecule> {
            name: "channel",
            aliases: &["Channel"],
            kind: FieldKind::Int,
            payload: false,
            encode: |m| (m.channel() != -1).then_some(FieldRef::Int(m.channel())),
            decode: |m, v| {
                if let FieldValue::Int(channel) = v {
                    m.set_channel(channel);
                }
            },
        },
        FieldSpec::<Molecule> {
            name: "image",
            aliases: &["Image"],
            kind: FieldKind::Int,
            payload: false,
            encode: |m| (m.image() != -1).then_some(FieldRef::Int(m.image())),
            decode: |m, v| {
                if let FieldValue::Int(image) = v {
                    m.set_image(image);
                }
            },
        },
        FieldSpec::<Molecule> {
            name: "segmentTables",
            aliases: &["SegmentTables"],
            kind: FieldKind::SegmentTables,
            payload: true,
            encode: |m| {
                let tables = m.segment_tables();
                (!tables.is_empty()).then(|| FieldRef::SegmentTables(tables))
            },
            decode: |m, v| {
                if let FieldValue::SegmentTables(tables) = v {
                    for (key, table) in tables {
                        m.put_segment_table(key, table);
                    }
                }
            },
        },
    ]);
    Schema::new(fields)
});

static METADATA_SCHEMA: Lazy<Schema<Metadata>> = Lazy::new(|| {
    let mut fields = vec![
        uid_field(),
        FieldSpec::<Metadata> {
            name: "type",
            aliases: &[],
            kind: FieldKind::Str,
            payload: false,
            encode: |_| Some(FieldRef::Str("Metadata")),
            decode: |_, _| {},
        },
    ];
    fields.extend(base_fields());
    fields.extend([
        FieldSpec::<Metadata> {
            name: "microscope",
            aliases: &["Microscope"],
            kind: FieldKind::Str,
            payload: false,
            encode: |m| m.microscope().map(FieldRef::Str),
            decode: |m, v| {
                if let FieldValue::Str(name) = v {
                    m.set_microscope(name);
                }
            },
        },
        FieldSpec::<Metadata> {
            name: "collectionDate",
            aliases: &["CollectionDate"],
            kind: FieldKind::Str,
            payload: false,
            encode: |m| m.collection_date().map(FieldRef::Str),
            decode: |m, v| {
                if let FieldValue::Str(date) = v {
                    m.set_collection_date(date);
                }
            },
        },
        FieldSpec::<Metadata> {
            name: "sourceDirectory",
            aliases: &["SourceDirectory"],
            kind: FieldKind::Str,
            payload: false,
            encode: |m| m.source_directory().map(FieldRef::Str),
            decode: |m, v| {
                if let FieldValue::Str(dir) = v {
                    m.set_source_directory(dir);
                }
            },
        },
        FieldSpec::<Metadata> {
            name: "log",
            aliases: &["Log"],
            kind: FieldKind::Str,
            payload: true,
            encode: |m| {
                let log = m.log_text();
                (!log.is_empty()).then_some(FieldRef::Str(log))
            },
            decode: |m, v| {
                if let FieldValue::Str(log) = v {
                    m.set_log(log);
                }
            },
        },
    ]);
    Schema::new(fields)
});

impl SchemaRecord for Molecule {
    fn schema() -> &'static Schema<Self> {
        &MOLECULE_SCHEMA
    }
}

impl SchemaRecord for Metadata {
    fn schema() -> &'static Schema<Self> {
        &METADATA_SCHEMA
    }
}
