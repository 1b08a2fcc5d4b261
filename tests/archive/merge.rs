//! Merging archive files

use crate::common::*;
use marsdb::{merge_archives, merge_directory, Archive, ArchiveKind, Error, Format};
use tempfile::TempDir;

#[test]
fn merge_counts_add_up() {
    let dir = TempDir::new().unwrap();
    let a = archive_file(&dir.path().join("a.yama"), ArchiveKind::SingleMolecule, "metaA", &["a1", "a2"]);
    let b = archive_file(
        &dir.path().join("b.yama"),
        ArchiveKind::SingleMolecule,
        "metaB",
        &["b1", "b2", "b3"],
    );
    let out = dir.path().join("merged.yama");

    let report = merge_archives(&[a, b], &out, Format::Binary).unwrap();
    assert_eq!((report.molecule_count, report.metadata_count), (5, 2));

    let merged = Archive::open(&out).unwrap();
    let props = merged.properties().unwrap();
    assert_eq!((props.molecule_count, props.metadata_count), (5, 2));
    assert_eq!(merged.metadata_uid_for_molecule("b2").as_deref(), Some("metaB"));
    assert!(merged.properties().unwrap().region_names.contains("bleach"));
    for meta in merged.metadata().unwrap() {
        assert!(meta.unwrap().log_text().contains("Merged 2 archives"));
    }
}

#[test]
fn self_merge_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let a = archive_file(&dir.path().join("a.yama"), ArchiveKind::SingleMolecule, "metaA", &["a1"]);
    let out = dir.path().join("merged.yama");

    let result = merge_archives(&[a.clone(), a], &out, Format::Binary);
    assert!(matches!(result, Err(Error::DuplicateMetadata { .. })));
    assert!(!out.exists());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1);
}

#[test]
fn mixed_kinds_are_rejected() {
    let dir = TempDir::new().unwrap();
    archive_file(&dir.path().join("a.yama"), ArchiveKind::SingleMolecule, "metaA", &["a1"]);
    archive_file(&dir.path().join("b.yama"), ArchiveKind::DnaMolecule, "metaB", &["b1"]);

    let result = merge_directory(dir.path(), Format::Binary);
    assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    assert!(!dir.path().join("merged.yama").exists());
}

#[test]
fn untyped_input_is_rejected() {
    let dir = TempDir::new().unwrap();
    let a = archive_file(&dir.path().join("a.yama"), ArchiveKind::SingleMolecule, "metaA", &["a1"]);
    let untyped = dir.path().join("untyped.yama");
    std::fs::write(
        &untyped,
        r#"{"ArchiveProperties": {"numberOfMolecules": 1},
            "Metadata": [{"UID": "metaU"}],
            "Molecules": [{"UID": "u1"}]}"#,
    )
    .unwrap();
    let out = dir.path().join("merged.yama");

    let result = merge_archives(&[a, untyped], &out, Format::Binary);
    assert!(matches!(result, Err(Error::Format(_))));
    assert!(!out.exists());
}

#[test]
fn merge_mixed_input_encodings() {
    let dir = TempDir::new().unwrap();
    let a = archive_file(&dir.path().join("a.yama"), ArchiveKind::DnaMolecule, "metaA", &["a1"]);
    let b = dir.path().join("b.yama");
    let archive = Archive::new("b", ArchiveKind::DnaMolecule);
    archive.put_metadata(metadata("metaB")).unwrap();
    archive.put(molecule("b1", &["bad"])).unwrap();
    archive.save_as_json(&b).unwrap();

    let report = merge_directory(dir.path(), Format::Text).unwrap();
    assert_eq!(report.inputs, vec![a, b]);
    let merged = Archive::open(&report.output).unwrap();
    assert_eq!(merged.kind(), ArchiveKind::DnaMolecule);
    assert!(merged.molecule_has_tag("b1", "bad"));
}
