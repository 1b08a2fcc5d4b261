use super::{HasCore, Record, RecordCore, RecordKind};
use crate::table::Table;
use crate::uid;

/// A collection-session record shared by a group of molecules.
///
/// The processing log only ever grows.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    core: RecordCore,
    table: Table,
    log: String,
    microscope: Option<String>,
    collection_date: Option<String>,
    source_directory: Option<String>,
}

impl Metadata {
    /// New metadata record with a freshly generated UID
    pub fn new() -> Self {
        Self::with_uid(uid::generate())
    }

    /// New metadata record with a UID and per-frame table
    pub fn with_table(uid: impl Into<String>, table: Table) -> Self {
        let mut metadata = Self::with_uid(uid.into());
        metadata.table = table;
        metadata
    }

    /// Replace the per-frame table
    pub fn set_table(&mut self, table: Table) {
        self.table = table;
    }

    /// Processing history
    pub fn log_text(&self) -> &str {
        &self.log
    }

    /// Append to the processing history
    pub fn log(&mut self, message: &str) {
        self.log.push_str(message);
    }

    /// Replace the processing history
    pub fn set_log(&mut self, log: impl Into<String>) {
        self.log = log.into();
    }

    /// Append a line to the processing history
    pub fn logln(&mut self, message: &str) {
        self.log.push_str(message);
        self.log.push('\n');
    }

    /// Microscope the data was collected on
    pub fn microscope(&self) -> Option<&str> {
        self.microscope.as_deref()
    }

    /// Set the microscope name
    pub fn set_microscope(&mut self, name: impl Into<String>) {
        self.microscope = Some(name.into());
    }

    /// Collection date as recorded by the acquisition software
    pub fn collection_date(&self) -> Option<&str> {
        self.collection_date.as_deref()
    }

    /// Set the collection date
    pub fn set_collection_date(&mut self, date: impl Into<String>) {
        self.collection_date = Some(date.into());
    }

    /// Directory the raw data was read from
    pub fn source_directory(&self) -> Option<&str> {
        self.source_directory.as_deref()
    }

    /// Set the source directory
    pub fn set_source_directory(&mut self, dir: impl Into<String>) {
        self.source_directory = Some(dir.into());
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

impl HasCore for Metadata {
    fn core(&self) -> &RecordCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RecordCore {
        &mut self.core
    }
}

impl Record for Metadata {
    const KIND: RecordKind = RecordKind::Metadata;

    fn with_uid(uid: String) -> Self {
        Metadata {
            core: RecordCore::new(uid),
            table: Table::default(),
            log: String::new(),
            microscope: None,
            collection_date: None,
            source_directory: None,
        }
    }

    fn table(&self) -> &Table {
        &self.table
    }

    fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }
}
