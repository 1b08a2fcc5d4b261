//! Virtual store mode: sidecars, index rebuilds and mixed encodings

use crate::common::*;
use marsdb::{Archive, ArchiveConfig, Format, Taggable, CONFIG_FILE_NAME};
use tempfile::TempDir;

#[test]
fn rebuild_is_idempotent_on_unmodified_store() {
    let dir = TempDir::new().unwrap();
    populated_archive(25)
        .save_as_virtual_store_with(dir.path(), 3, Format::Binary)
        .unwrap();

    let archive = Archive::open(dir.path()).unwrap();
    let before = archive.index().snapshot();
    archive.rebuild_indexes_with(1).unwrap();
    assert_eq!(archive.index().snapshot(), before);
    archive.rebuild_indexes_with(4).unwrap();
    assert_eq!(archive.index().snapshot(), before);
}

#[test]
fn save_refreshes_sidecars() {
    let dir = TempDir::new().unwrap();
    populated_archive(6)
        .save_as_virtual_store_with(dir.path(), 2, Format::Text)
        .unwrap();
    assert!(dir.path().join("indexes.json").is_file());

    let archive = Archive::open_with_config(
        dir.path(),
        ArchiveConfig {
            format: "text".to_string(),
            ..ArchiveConfig::default()
        },
    )
    .unwrap();
    let mut m = archive.get("m001").unwrap().unwrap();
    m.add_tag("late");
    archive.put(m).unwrap();
    archive.save().unwrap();

    // Reopen without rebuilding: the sidecar already carries the new tag
    let reopened = Archive::open(dir.path()).unwrap();
    assert!(reopened.molecule_has_tag("m001", "late"));
    assert!(reopened.properties().unwrap().tag_names.contains("late"));
}

#[test]
fn store_config_file_is_honored() {
    let dir = TempDir::new().unwrap();
    populated_archive(3)
        .save_as_virtual_store_with(dir.path(), 1, Format::Binary)
        .unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "format = \"text\"\nworkers = 2\n",
    )
    .unwrap();

    let archive = Archive::open(dir.path()).unwrap();
    assert_eq!(archive.config().workers, 2);
    archive.put(molecule("fresh", &[])).unwrap();
    assert!(dir.path().join("Molecules").join("fresh.json").is_file());

    // Old binary records are still readable and rewritten as text on put
    let m = archive.get("m000").unwrap().unwrap();
    archive.put(m).unwrap();
    assert!(dir.path().join("Molecules").join("m000.json").is_file());
    assert!(!dir.path().join("Molecules").join("m000.mpk").exists());
}

#[test]
fn external_edits_need_explicit_rebuild() {
    let dir = TempDir::new().unwrap();
    populated_archive(4)
        .save_as_virtual_store_with(dir.path(), 1, Format::Binary)
        .unwrap();
    std::fs::remove_file(dir.path().join("Molecules").join("m002.mpk")).unwrap();

    let archive = Archive::open(dir.path()).unwrap();
    // The sidecar still lists the deleted record
    assert!(archive.index().molecule("m002").is_some());
    assert_eq!(archive.molecule_count().unwrap(), 3);

    archive.rebuild_indexes().unwrap();
    assert!(archive.index().molecule("m002").is_none());
}

#[test]
fn virtual_to_file_and_back() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store");
    let file = dir.path().join("flat.yama");
    populated_archive(9)
        .save_as_virtual_store_with(&store, 2, Format::Binary)
        .unwrap();

    let archive = Archive::open(&store).unwrap();
    archive.save_as(&file).unwrap();
    // Writing a copy does not detach the virtual archive from its directory
    assert_eq!(archive.source().as_deref(), Some(store.as_path()));

    let flat = Archive::open(&file).unwrap();
    assert_eq!(flat.molecule_uids().unwrap(), archive.molecule_uids().unwrap());
    assert_eq!(flat.metadata_uids().unwrap(), vec!["meta0"]);
}
