//! Regions and positions of interest

use serde::{Deserialize, Serialize};

/// A named interval along one column of a record's table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Unique name within a record
    pub name: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Column the interval refers to
    #[serde(default)]
    pub column: String,
    /// Interval start
    #[serde(default, with = "crate::float")]
    pub start: f64,
    /// Interval end
    #[serde(default, with = "crate::float")]
    pub end: f64,
    /// Display color
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,
    /// Display opacity
    #[serde(default = "default_opacity", with = "crate::float")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    0.2
}

impl Region {
    /// Create a region on `column` spanning `start..end`
    pub fn new(name: impl Into<String>, column: impl Into<String>, start: f64, end: f64) -> Self {
        Region {
            name: name.into(),
            description: String::new(),
            column: column.into(),
            start,
            end,
            color: String::new(),
            opacity: default_opacity(),
        }
    }
}

/// A named point along one column of a record's table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Unique name within a record
    pub name: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Column the position refers to
    #[serde(default)]
    pub column: String,
    /// Position value
    #[serde(default, with = "crate::float")]
    pub position: f64,
    /// Display color
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,
}

impl Position {
    /// Create a position on `column`
    pub fn new(name: impl Into<String>, column: impl Into<String>, position: f64) -> Self {
        Position {
            name: name.into(),
            description: String::new(),
            column: column.into(),
            position,
            color: String::new(),
        }
    }
}
