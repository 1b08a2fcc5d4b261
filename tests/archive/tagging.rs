//! Tag queries and their agreement with stored records

use crate::common::*;
use marsdb::{Archive, ArchiveKind, Format, Taggable};
use std::collections::BTreeSet;
use tempfile::TempDir;

fn set(tags: &[&str]) -> BTreeSet<String> {
    tags.iter().map(|t| t.to_string()).collect()
}

fn tag_scenario(archive: &Archive) {
    archive.put(molecule("m1", &["good"])).unwrap();
    archive.put(molecule("m2", &[])).unwrap();

    assert!(archive.molecule_has_no_tags("m2"));
    assert!(archive.molecule_has_tag("m1", "good"));

    let mut m2 = archive.get("m2").unwrap().unwrap();
    m2.add_tag("bad");
    archive.put(m2).unwrap();

    assert!(archive.molecule_has_tag("m2", "bad"));
    assert!(!archive.molecule_has_no_tags("m2"));
    assert_eq!(archive.properties().unwrap().tag_names, set(&["good", "bad"]));
}

#[test]
fn tag_scenario_in_memory() {
    tag_scenario(&Archive::new("tags", ArchiveKind::SingleMolecule));
}

#[test]
fn tag_scenario_in_virtual_store() {
    let dir = TempDir::new().unwrap();
    Archive::new("empty", ArchiveKind::SingleMolecule)
        .save_as_virtual_store_with(dir.path(), 1, Format::Binary)
        .unwrap();
    let archive = Archive::open(dir.path()).unwrap();
    assert!(archive.is_virtual());
    tag_scenario(&archive);
}

fn assert_index_agrees(archive: &Archive) {
    for uid in archive.molecule_uids().unwrap() {
        let record = archive.get(&uid).unwrap().unwrap();
        for tag in ["good", "bad", "never"] {
            assert_eq!(
                archive.molecule_has_tag(&uid, tag),
                record.has_tag(tag),
                "{} / {}",
                uid,
                tag
            );
        }
        assert_eq!(archive.molecule_tags(&uid), *record.tags().as_set());
        let entry = archive.index().molecule(&uid).unwrap();
        assert_eq!(entry.tags, *record.tags().as_set());
        assert_eq!(entry.metadata_uid.as_deref(), record.metadata_uid());
    }
}

#[test]
fn index_agrees_with_records_in_both_modes() {
    let memory = populated_archive(30);
    memory.add_molecule_tags([("m001", "bad"), ("m003", "bad")]).unwrap();
    assert_index_agrees(&memory);

    let dir = TempDir::new().unwrap();
    memory.save_as_virtual_store(dir.path()).unwrap();
    let virtual_archive = Archive::open(dir.path()).unwrap();
    assert_index_agrees(&virtual_archive);

    virtual_archive.remove("m003").unwrap();
    let mut m004 = virtual_archive.get("m004").unwrap().unwrap();
    m004.remove_all_tags();
    virtual_archive.put(m004).unwrap();
    assert_index_agrees(&virtual_archive);
    assert!(virtual_archive.index().molecule("m003").is_none());
}

#[test]
fn delete_by_tag() {
    let archive = populated_archive(12);
    assert_eq!(archive.molecule_uids_with_tag("good").len(), 4);
    assert_eq!(archive.delete_molecules_with_tag("good").unwrap(), 4);
    assert_eq!(archive.molecule_count().unwrap(), 8);
    assert!(archive.molecule_uids_with_tag("good").is_empty());
}
