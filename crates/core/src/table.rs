//! Column-oriented numeric table
//!
//! `Table` is the payload carried by molecule and metadata records. The
//! storage engine treats it as opaque: it only serializes it, asks for its
//! column names, and (when building an archive from an import table) splits
//! it into row groups.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named column of `f64` values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column header
    pub name: String,
    /// Cell values, one per row
    #[serde(with = "crate::float::seq", default)]
    pub values: Vec<f64>,
}

/// A named table of numeric columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default)]
    columns: Vec<Column>,
}

impl Table {
    /// Create an empty table
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Table name (may be empty)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the table
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Add a column, replacing any existing column with the same name.
    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        let name = name.into();
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => column.values = values,
            None => self.columns.push(Column { name, values }),
        }
    }

    /// Builder form of [`Table::add_column`]
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.add_column(name, values);
        self
    }

    /// Values of a column
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Check whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Column headers in table order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows (length of the longest column)
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(|c| c.values.len()).max().unwrap_or(0)
    }

    /// True when the table has no rows
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Cell value, `None` when out of range
    pub fn value(&self, column: &str, row: usize) -> Option<f64> {
        self.column(column).and_then(|values| values.get(row).copied())
    }

    /// Build a new table from a subset of rows, keeping column order.
    pub fn select_rows(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: rows
                    .iter()
                    .map(|r| c.values.get(*r).copied().unwrap_or(f64::NAN))
                    .collect(),
            })
            .collect();
        Table {
            name: self.name.clone(),
            columns,
        }
    }

    /// Split rows into groups sharing the same value in `column`.
    ///
    /// Groups are returned in order of first appearance. Returns `None`
    /// when the column does not exist.
    pub fn group_by(&self, column: &str) -> Option<Vec<(f64, Table)>> {
        let keys = self.column(column)?;
        let mut order: Vec<(f64, Vec<usize>)> = Vec::new();
        let mut slots: HashMap<u64, usize> = HashMap::new();
        for (row, key) in keys.iter().enumerate() {
            let slot = *slots.entry(key.to_bits()).or_insert_with(|| {
                order.push((*key, Vec::new()));
                order.len() - 1
            });
            order[slot].1.push(row);
        }
        Some(
            order
                .into_iter()
                .map(|(key, rows)| (key, self.select_rows(&rows)))
                .collect(),
        )
    }
}
