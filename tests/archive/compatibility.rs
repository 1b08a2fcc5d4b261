//! Older archive layouts and table import

use marsdb::{Archive, ArchiveKind, Error, Parameterized, Record, Table, MOLECULE_COLUMN};
use tempfile::TempDir;

const LEGACY_ARCHIVE: &str = r#"{
  "MoleculeArchiveProperties": {
    "Type": "DnaMoleculeArchive",
    "numberOfMolecules": 2,
    "numImageMetadata": 1,
    "Comments": "imported"
  },
  "ImageMetaData": [
    {"UID": "meta1", "Microscope": "TIRF-2", "Log": "old log\n"}
  ],
  "Molecules": [
    {"UID": "mA", "ImageMetaDataUID": "meta1", "Tags": ["good"],
     "Parameters": {"rate": 0.25}, "Channel": 1, "someNewField": [1, {"x": null}]},
    {"UID": "mB", "ImageMetadataUID": "meta1",
     "DataTable": {"name": "t", "columns": [{"name": "T", "values": [0.0, 1.0]}]}}
  ],
  "FutureSection": {"ignored": true}
}"#;

#[test]
fn legacy_names_decode() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("legacy.yama");
    std::fs::write(&path, LEGACY_ARCHIVE).unwrap();

    let archive = Archive::open(&path).unwrap();
    assert_eq!(archive.kind(), ArchiveKind::DnaMolecule);
    assert_eq!(archive.comments(), "imported");
    assert_eq!(archive.molecule_count().unwrap(), 2);
    assert_eq!(archive.metadata_uid_for_molecule("mB").as_deref(), Some("meta1"));
    assert_eq!(archive.channel("mA"), Some(1));

    let a = archive.get("mA").unwrap().unwrap();
    assert_eq!(a.parameter("rate"), 0.25);
    let b = archive.get("mB").unwrap().unwrap();
    assert!(b.table().has_column("T"));
    let meta = archive.get_metadata("meta1").unwrap().unwrap();
    assert_eq!(meta.microscope(), Some("TIRF-2"));
}

#[test]
fn resave_writes_current_names_only() {
    let dir = TempDir::new().unwrap();
    let legacy = dir.path().join("legacy.yama");
    let current = dir.path().join("current.yama");
    std::fs::write(&legacy, LEGACY_ARCHIVE).unwrap();

    Archive::open(&legacy).unwrap().save_as_json(&current).unwrap();
    let text = std::fs::read_to_string(&current).unwrap();
    assert!(text.contains("\"ArchiveProperties\""));
    assert!(text.contains("\"metadataUID\""));
    assert!(!text.contains("ImageMetaData"));
    assert!(!text.contains("someNewField"));
    assert!(!text.contains("FutureSection"));
}

#[test]
fn garbage_is_a_format_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("junk.yama");
    std::fs::write(&path, "not an archive").unwrap();
    assert!(matches!(Archive::open(&path), Err(Error::Format(_))));

    std::fs::write(&path, "").unwrap();
    assert!(matches!(Archive::open(&path), Err(Error::Format(_))));
}

#[test]
fn unknown_archive_type_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("odd.yama");
    std::fs::write(
        &path,
        r#"{"ArchiveProperties": {"type": "KymographArchive"}, "Molecules": []}"#,
    )
    .unwrap();
    let err = Archive::open(&path).unwrap_err();
    assert!(err.to_string().contains("Unknown archive type"));
}

#[test]
fn from_table_groups_by_molecule_column() {
    let table = Table::new("peaks")
        .with_column(MOLECULE_COLUMN, vec![7.0, 7.0, 8.0, 7.0, 9.0, 9.0])
        .with_column("x", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let archive = Archive::from_table("peaks", ArchiveKind::SingleMolecule, &table).unwrap();

    assert_eq!(archive.molecule_count().unwrap(), 3);
    let mut sizes: Vec<usize> = archive
        .molecules()
        .unwrap()
        .map(|m| m.unwrap().table().row_count())
        .collect();
    sizes.sort();
    assert_eq!(sizes, vec![1, 2, 3]);

    let uids = archive.molecule_uids().unwrap();
    assert!(uids.iter().all(|uid| !uid.is_empty()));
    assert!(archive.properties().unwrap().column_names.contains("x"));
}

#[test]
fn from_table_without_molecule_column() {
    let table = Table::new("peaks").with_column("x", vec![1.0]);
    assert!(matches!(
        Archive::from_table("peaks", ArchiveKind::SingleMolecule, &table),
        Err(Error::InvalidOperation(_))
    ));
}
