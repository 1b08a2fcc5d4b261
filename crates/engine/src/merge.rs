//! Archive merging
//!
//! Combines several archive files of the same kind into one. The merge
//! never holds more than the metadata of all inputs in memory; molecules
//! are streamed from each input straight into the output.
//!
//! 1. Scan every input for properties and metadata; the molecule array is
//!    skipped and only counted.
//! 2. Reject inputs of different archive kinds and metadata UIDs present in
//!    more than one input. Nothing is written in either case.
//! 3. Write the merged document to a temp file next to the output,
//!    re-reading each input to stream its molecules, then rename it into
//!    place. A failure removes the temp file.
//!
//! Molecule UID collisions across inputs are not checked.

use marsdb_core::{ArchiveProperties, Error, Metadata, Molecule, Record, Result};
use marsdb_storage::atomic::write_atomic;
use marsdb_storage::codec::{self, Encode};
use marsdb_storage::{read_document, ArchiveDocument, DocumentSink, Format};
use serde::ser::{self, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extension of archive files picked up by [`merge_directory`]
pub const ARCHIVE_EXTENSION: &str = "yama";
/// Output file name written by [`merge_directory`]
pub const MERGED_FILE_NAME: &str = "merged.yama";

/// Outcome of a successful merge
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// File written
    pub output: PathBuf,
    /// Inputs in merge order
    pub inputs: Vec<PathBuf>,
    /// Molecules written
    pub molecule_count: u64,
    /// Metadata records written
    pub metadata_count: u64,
    /// Properties of the merged archive
    pub properties: ArchiveProperties,
}

/// Properties and metadata of one input, with its molecule count.
struct Scan {
    path: PathBuf,
    properties: Option<ArchiveProperties>,
    metadata: Vec<Metadata>,
    molecules: u64,
}

impl DocumentSink for Scan {
    fn properties(&mut self, properties: ArchiveProperties) -> Result<()> {
        self.properties = Some(properties);
        Ok(())
    }

    fn metadata(&mut self, record: Metadata) -> Result<()> {
        self.metadata.push(record);
        Ok(())
    }

    fn molecule(&mut self, _record: Molecule) -> Result<()> {
        Ok(())
    }

    fn wants_molecules(&self) -> bool {
        false
    }

    fn skipped_molecules(&mut self, count: u64) {
        self.molecules += count;
    }
}

fn scan(path: &Path) -> Result<(ArchiveProperties, Scan)> {
    let mut scan = Scan {
        path: path.to_path_buf(),
        properties: None,
        metadata: Vec::new(),
        molecules: 0,
    };
    read_document(BufReader::new(File::open(path)?), &mut scan)?;
    let properties = scan
        .properties
        .take()
        .ok_or_else(|| Error::format(format!("{} has no archive properties", path.display())))?;
    debug!(
        target: "marsdb::merge",
        path = %path.display(),
        molecules = scan.molecules,
        metadata = scan.metadata.len(),
        "Scanned merge input"
    );
    Ok((properties, scan))
}

/// Merge archive files into `output`, written in `format`.
///
/// # Errors
///
/// - `Error::InvalidOperation` when `inputs` is empty
/// - `Error::TypeMismatch` when the inputs are of different kinds
/// - `Error::DuplicateMetadata` when a metadata UID appears in more than
///   one input (merging a file with itself is caught this way)
///
/// No output file exists after any error.
pub fn merge_archives(inputs: &[PathBuf], output: &Path, format: Format) -> Result<MergeReport> {
    if inputs.is_empty() {
        return Err(Error::InvalidOperation("No archives to merge".to_string()));
    }

    let mut scans = Vec::with_capacity(inputs.len());
    for input in inputs {
        scans.push(scan(input)?);
    }

    let expected = scans[0].0.archive_type;
    for (properties, scan) in &scans[1..] {
        if properties.archive_type != expected {
            return Err(Error::TypeMismatch {
                expected: expected.tag().to_string(),
                found: properties.archive_type.tag().to_string(),
                file: scan.path.display().to_string(),
            });
        }
    }

    check_duplicate_metadata(&scans)?;

    let mut merged = ArchiveProperties::new(expected);
    for (properties, _) in &scans {
        merged.merge(properties);
    }
    // Counts reflect what is actually written, not what inputs claimed
    merged.molecule_count = scans.iter().map(|(_, s)| s.molecules).sum();
    merged.metadata_count = scans.iter().map(|(_, s)| s.metadata.len() as u64).sum();

    let summary = merge_summary(inputs, output);
    let mut metadata: Vec<Metadata> = Vec::with_capacity(merged.metadata_count as usize);
    for (_, scan) in scans {
        for mut record in scan.metadata {
            for line in &summary {
                record.logln(line);
            }
            metadata.push(record);
        }
    }

    let document = ArchiveDocument {
        properties: &merged,
        metadata: MetadataSeq(&metadata),
        molecules: MergedMolecules {
            inputs,
            total: merged.molecule_count,
        },
    };
    write_atomic(output, false, |w| codec::write_value(&document, format, w))?;

    info!(
        target: "marsdb::merge",
        output = %output.display(),
        inputs = inputs.len(),
        molecules = merged.molecule_count,
        metadata = merged.metadata_count,
        %format,
        "Merged archives"
    );
    Ok(MergeReport {
        output: output.to_path_buf(),
        inputs: inputs.to_vec(),
        molecule_count: merged.molecule_count,
        metadata_count: merged.metadata_count,
        properties: merged,
    })
}

/// Merge every `*.yama` file in `dir` into `dir/merged.yama`.
///
/// Inputs are merged in file name order; an existing `merged.yama` is not
/// an input.
pub fn merge_directory(dir: &Path, format: Format) -> Result<MergeReport> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_archive = path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(ARCHIVE_EXTENSION)
            && path.file_name().and_then(|n| n.to_str()) != Some(MERGED_FILE_NAME);
        if is_archive {
            inputs.push(path);
        }
    }
    inputs.sort();
    merge_archives(&inputs, &dir.join(MERGED_FILE_NAME), format)
}

fn check_duplicate_metadata(scans: &[(ArchiveProperties, Scan)]) -> Result<()> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (position, (_, scan)) in scans.iter().enumerate() {
        for record in &scan.metadata {
            let first = *seen.entry(record.uid()).or_insert(position);
            if first != position {
                let uid = record.uid();
                let files = scans
                    .iter()
                    .filter(|(_, s)| s.metadata.iter().any(|m| m.uid() == uid))
                    .map(|(_, s)| s.path.display().to_string())
                    .collect();
                return Err(Error::DuplicateMetadata {
                    uid: uid.to_string(),
                    files,
                });
            }
        }
    }
    Ok(())
}

fn merge_summary(inputs: &[PathBuf], output: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "Merged {} archives into {}",
        inputs.len(),
        output.display()
    )];
    lines.extend(inputs.iter().map(|input| format!("  {}", input.display())));
    lines
}

struct MetadataSeq<'a>(&'a [Metadata]);

impl Serialize for MetadataSeq<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for record in self.0 {
            seq.serialize_element(&Encode(record))?;
        }
        seq.end()
    }
}

/// Molecule array of the merged document, read from the inputs while it
/// is being written.
struct MergedMolecules<'a> {
    inputs: &'a [PathBuf],
    total: u64,
}

impl Serialize for MergedMolecules<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.total as usize))?;
        let mut written = 0;
        for input in self.inputs {
            let file = File::open(input).map_err(ser::Error::custom)?;
            let mut forward = Forward {
                seq: &mut seq,
                written: 0,
                failure: None,
            };
            let result = read_document(BufReader::new(file), &mut forward);
            written += forward.written;
            if let Some(e) = forward.failure {
                return Err(e);
            }
            result.map_err(ser::Error::custom)?;
        }
        if written != self.total {
            return Err(ser::Error::custom(format!(
                "Input archives changed during merge: expected {} molecules, read {}",
                self.total, written
            )));
        }
        seq.end()
    }
}

/// Sink writing every molecule of an input into the output sequence.
struct Forward<'a, Q: SerializeSeq> {
    seq: &'a mut Q,
    written: u64,
    failure: Option<Q::Error>,
}

impl<Q: SerializeSeq> DocumentSink for Forward<'_, Q> {
    fn properties(&mut self, _properties: ArchiveProperties) -> Result<()> {
        Ok(())
    }

    fn metadata(&mut self, _record: Metadata) -> Result<()> {
        Ok(())
    }

    fn molecule(&mut self, record: Molecule) -> Result<()> {
        match self.seq.serialize_element(&Encode(&record)) {
            Ok(()) => {
                self.written += 1;
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.failure = Some(e);
                Err(Error::format(message))
            }
        }
    }

    fn wants_metadata(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Archive;
    use marsdb_core::{ArchiveKind, Taggable};
    use tempfile::TempDir;

    fn write_archive(
        path: &Path,
        kind: ArchiveKind,
        metadata_uid: &str,
        molecules: &[&str],
    ) -> PathBuf {
        let archive = Archive::new("input", kind);
        let mut meta = Metadata::with_uid(metadata_uid.to_string());
        meta.logln("collected");
        archive.put_metadata(meta).unwrap();
        for uid in molecules {
            let mut m = Molecule::with_uid(uid.to_string());
            m.set_metadata_uid(metadata_uid);
            m.add_tag(uid);
            archive.put(m).unwrap();
        }
        archive.save_as(path).unwrap();
        path.to_path_buf()
    }

    #[test]
    fn test_merge_counts() {
        let dir = TempDir::new().unwrap();
        let a = write_archive(&dir.path().join("a.yama"), ArchiveKind::SingleMolecule, "metaA", &["a1", "a2"]);
        let b = write_archive(&dir.path().join("b.yama"), ArchiveKind::SingleMolecule, "metaB", &["b1", "b2", "b3"]);
        let out = dir.path().join("out.yama");

        let report = merge_archives(&[a, b], &out, Format::Binary).unwrap();
        assert_eq!(report.molecule_count, 5);
        assert_eq!(report.metadata_count, 2);
        assert_eq!(report.properties.tag_names.len(), 5);

        let merged = Archive::open(&out).unwrap();
        assert_eq!(merged.molecule_count().unwrap(), 5);
        assert_eq!(merged.metadata_count().unwrap(), 2);
        assert!(merged.molecule_has_tag("b3", "b3"));
        let log = merged.get_metadata("metaA").unwrap().unwrap().log_text().to_string();
        assert!(log.starts_with("collected\nMerged 2 archives"));
    }

    #[test]
    fn test_self_merge_aborts_without_output() {
        let dir = TempDir::new().unwrap();
        let a = write_archive(&dir.path().join("a.yama"), ArchiveKind::SingleMolecule, "metaA", &["a1"]);
        let out = dir.path().join("out.yama");

        let result = merge_archives(&[a.clone(), a], &out, Format::Binary);
        match result {
            Err(Error::DuplicateMetadata { uid, files }) => {
                assert_eq!(uid, "metaA");
                assert_eq!(files.len(), 2);
            }
            other => panic!("expected duplicate metadata, got {:?}", other),
        }
        assert!(!out.exists());
    }

    #[test]
    fn test_type_mismatch_aborts_without_output() {
        let dir = TempDir::new().unwrap();
        let a = write_archive(&dir.path().join("a.yama"), ArchiveKind::SingleMolecule, "metaA", &["a1"]);
        let b = write_archive(&dir.path().join("b.yama"), ArchiveKind::DnaMolecule, "metaB", &["b1"]);
        let out = dir.path().join("out.yama");

        let result = merge_archives(&[a, b.clone()], &out, Format::Text);
        match result {
            Err(Error::TypeMismatch { file, .. }) => assert_eq!(file, b.display().to_string()),
            other => panic!("expected type mismatch, got {:?}", other),
        }
        assert!(!out.exists());
    }

    #[test]
    fn test_merge_directory() {
        let dir = TempDir::new().unwrap();
        write_archive(&dir.path().join("one.yama"), ArchiveKind::SingleMolecule, "m1", &["x"]);
        write_archive(&dir.path().join("two.yama"), ArchiveKind::SingleMolecule, "m2", &["y"]);
        std::fs::write(dir.path().join("notes.txt"), "not an archive").unwrap();

        let report = merge_directory(dir.path(), Format::Text).unwrap();
        assert_eq!(report.output, dir.path().join(MERGED_FILE_NAME));
        assert_eq!(report.inputs.len(), 2);
        assert_eq!(std::fs::read(&report.output).unwrap()[0], b'{');

        // A second run ignores the previous output
        let again = merge_directory(dir.path(), Format::Binary).unwrap();
        assert_eq!(again.inputs.len(), 2);
        assert_eq!(again.molecule_count, 2);
    }

    #[test]
    fn test_empty_input_list() {
        let dir = TempDir::new().unwrap();
        let result = merge_archives(&[], &dir.path().join("out.yama"), Format::Binary);
        assert!(matches!(result, Err(Error::InvalidOperation(_))));
    }
}
