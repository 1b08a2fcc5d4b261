//! Configuration and worker pool behavior seen through the archive

use crate::common::*;
use marsdb::{Archive, ArchiveConfig, CancelFlag, Error, Format, Parameterized, Progress};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

#[test]
fn config_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("marsdb.toml");
    let config = ArchiveConfig {
        workers: 6,
        format: "text".to_string(),
        sync_writes: true,
        progress_interval_ms: 20,
    };
    config.write_to_file(&path).unwrap();

    let loaded = ArchiveConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.format().unwrap(), Format::Text);
}

#[test]
fn default_config_file_is_complete() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("marsdb.toml");
    ArchiveConfig::write_default_if_missing(&path).unwrap();
    assert_eq!(ArchiveConfig::from_file(&path).unwrap(), ArchiveConfig::default());
}

#[test]
fn synced_writes_produce_same_archive() {
    let dir = TempDir::new().unwrap();
    let config = ArchiveConfig {
        sync_writes: true,
        ..ArchiveConfig::default()
    };
    let archive = Archive::with_config("synced", marsdb::ArchiveKind::SingleMolecule, config);
    archive.put(molecule("m1", &["good"])).unwrap();
    archive.save_as(dir.path().join("s.yama")).unwrap();
    assert!(Archive::open(dir.path().join("s.yama"))
        .unwrap()
        .molecule_has_tag("m1", "good"));
}

#[test]
fn processing_reports_progress() {
    let archive = populated_archive(60);
    let seen = Mutex::new(Vec::new());
    let observer = |p: Progress| seen.lock().push(p);
    archive
        .process_molecules(3, Some(&observer), |m| {
            m.set_parameter("visited", 1.0);
            Ok(())
        })
        .unwrap();

    let seen = seen.lock();
    assert_eq!(seen.last().copied(), Some(Progress { done: 60, total: 60 }));
    for m in archive.molecules().unwrap() {
        assert!(m.unwrap().has_parameter("visited"));
    }
}

#[test]
fn cancellation_stops_processing() {
    let archive = populated_archive(200);
    let cancel = CancelFlag::new();
    let visited = AtomicUsize::new(0);
    let result = archive.process_molecules_cancellable(2, &cancel, None, |_| {
        visited.fetch_add(1, Ordering::Relaxed);
        cancel.cancel();
        Ok(())
    });
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(visited.load(Ordering::Relaxed) < 200);
}
