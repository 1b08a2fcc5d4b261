//! Error types for marsdb
//!
//! This module defines all error types used throughout the archive engine.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! A missing record is not an error: lookups return `Ok(None)` and callers
//! must check.

use std::io;
use thiserror::Error;

/// Result type alias for marsdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the archive engine
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations, directory listing, etc.)
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// The stream does not match the expected token shape
    #[error("Format error: {0}")]
    Format(String),

    /// Archives of different kinds were combined
    #[error("Archive type mismatch in {file}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Archive type of the first input
        expected: String,
        /// Archive type of the offending input
        found: String,
        /// File that carried the unexpected type
        file: String,
    },

    /// The same metadata record appears in more than one input archive
    #[error("Duplicate metadata record {uid} found in {}", files.join(", "))]
    DuplicateMetadata {
        /// UID of the duplicated metadata record
        uid: String,
        /// Inputs containing the record
        files: Vec<String>,
    },

    /// Archive type tag not present in the registry
    #[error("Unknown archive type: {0}")]
    UnknownArchiveType(String),

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Configuration could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Work was stopped through a cancel flag
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Build a format error from anything printable
    pub fn format(msg: impl std::fmt::Display) -> Self {
        Error::Format(msg.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            return Error::IoError(e.into());
        }
        Error::Format(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        match e {
            rmp_serde::decode::Error::InvalidMarkerRead(io)
            | rmp_serde::decode::Error::InvalidDataRead(io) => Error::IoError(io),
            other => Error::Format(other.to_string()),
        }
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Format(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let err = Error::IoError(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        let msg = err.to_string();
        assert!(msg.contains("I/O error"));
    }

    #[test]
    fn test_error_display_format() {
        let err = Error::Format("missing UID".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Format error"));
        assert!(msg.contains("missing UID"));
    }

    #[test]
    fn test_error_display_type_mismatch() {
        let err = Error::TypeMismatch {
            expected: "SingleMoleculeArchive".to_string(),
            found: "DnaMoleculeArchive".to_string(),
            file: "b.yama".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("b.yama"));
        assert!(msg.contains("SingleMoleculeArchive"));
        assert!(msg.contains("DnaMoleculeArchive"));
    }

    #[test]
    fn test_error_display_duplicate_metadata_names_files() {
        let err = Error::DuplicateMetadata {
            uid: "meta1".to_string(),
            files: vec!["a.yama".to_string(), "copy.yama".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("meta1"));
        assert!(msg.contains("a.yama, copy.yama"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoError(_)));
    }

    #[test]
    fn test_error_from_json() {
        let result: std::result::Result<u32, _> = serde_json::from_str("{not json");
        let err: Error = result.unwrap_err().into();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_error_from_msgpack() {
        let invalid = vec![0xc1u8];
        let result: std::result::Result<String, _> = rmp_serde::from_slice(&invalid);
        let err: Error = result.unwrap_err().into();
        assert!(matches!(err, Error::Format(_)));
    }
}
