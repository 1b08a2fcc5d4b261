//! Save and reopen through both file encodings

use crate::common::*;
use marsdb::{
    Archive, ArchiveKind, Parameterized, Position, Record, Region, RegionAnnotated, Taggable,
};
use proptest::prelude::*;
use rayon::prelude::*;
use tempfile::TempDir;

#[test]
fn put_get_preserves_record() {
    let archive = Archive::new("rt", ArchiveKind::SingleMolecule);
    let mut m = rich_molecule("m1", "meta1");
    m.put_position(Position::new("onset", "T", 1.5));
    archive.put(m).unwrap();

    let back = archive.get("m1").unwrap().unwrap();
    assert_eq!(back.uid(), "m1");
    assert!(back.has_tag("good"));
    assert_eq!(back.parameter("step_size"), 1.25);
    assert_eq!(back.notes(), Some("fit ok"));
    assert_eq!(back.region("bleach"), Some(&Region::new("bleach", "T", 1.0, 2.0)));
    assert!(back.has_position("onset"));
}

#[test]
fn hundred_molecules_binary_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hundred.yama");
    let archive = populated_archive(100);
    archive.save_as(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_ne!(bytes[0], b'{');

    let reopened = Archive::open(&path).unwrap();
    assert_eq!(reopened.molecule_count().unwrap(), 100);
    assert_eq!(reopened.molecule_uids().unwrap(), archive.molecule_uids().unwrap());
    for uid in archive.molecule_uids().unwrap() {
        assert_eq!(reopened.molecule_tags(&uid), archive.molecule_tags(&uid));
    }
    assert_eq!(
        reopened.properties().unwrap(),
        archive.properties().unwrap()
    );
}

#[test]
fn json_round_trip_and_resave() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("small.yama");
    populated_archive(5).save_as_json(&path).unwrap();

    let archive = Archive::open(&path).unwrap();
    assert_eq!(archive.source().as_deref(), Some(path.as_path()));
    archive.set_comments("checked");
    archive.save().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with('{'));
    assert_eq!(Archive::open(&path).unwrap().comments(), "checked");
}

#[test]
fn iterators_visit_every_record() {
    let archive = populated_archive(40);
    let sequential: Vec<String> = archive
        .molecules()
        .unwrap()
        .map(|m| m.unwrap().uid().to_string())
        .collect();
    assert_eq!(sequential, archive.molecule_uids().unwrap());

    let mut parallel: Vec<String> = archive
        .par_molecules()
        .unwrap()
        .map(|m| m.unwrap().uid().to_string())
        .collect();
    parallel.sort();
    assert_eq!(parallel, sequential);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_file_round_trip_preserves_tags_and_parameters(
        tags in proptest::collection::btree_set("[a-z]{1,8}", 0..4),
        params in proptest::collection::btree_map(
            "[a-z]{1,8}",
            (-4000i32..4000).prop_map(|v| v as f64 / 4.0),
            0..4,
        ),
        json in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.yama");
        let archive = Archive::new("p", ArchiveKind::SingleMolecule);
        let mut m = molecule("m1", &[]);
        for tag in &tags {
            m.add_tag(tag);
        }
        for (name, value) in &params {
            m.set_parameter(name, *value);
        }
        archive.put(m).unwrap();
        if json {
            archive.save_as_json(&path).unwrap();
        } else {
            archive.save_as(&path).unwrap();
        }

        let back = Archive::open(&path).unwrap().get("m1").unwrap().unwrap();
        prop_assert_eq!(back.tags().as_set(), &tags);
        prop_assert_eq!(back.parameters().as_map(), &params);
    }
}
