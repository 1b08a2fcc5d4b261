//! Archive variant registry
//!
//! Each archive file records which variant produced it. The tag is resolved
//! through this fixed registry when a file is opened or merged.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Concrete archive variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArchiveKind {
    /// Generic single-molecule archive
    #[default]
    SingleMolecule,
    /// Archive of DNA molecules (flow-stretching experiments)
    DnaMolecule,
}

impl ArchiveKind {
    /// All registered variants
    pub const ALL: [ArchiveKind; 2] = [ArchiveKind::SingleMolecule, ArchiveKind::DnaMolecule];

    /// Stable tag written to files
    pub fn tag(&self) -> &'static str {
        match self {
            ArchiveKind::SingleMolecule => "SingleMoleculeArchive",
            ArchiveKind::DnaMolecule => "DnaMoleculeArchive",
        }
    }

    /// Resolve a stored tag.
    ///
    /// Fully qualified names written by older tools
    /// (`de.mpg.biochem.mars.molecule.SingleMoleculeArchive`) resolve to the
    /// same variant as the short tag.
    pub fn from_tag(tag: &str) -> Result<Self> {
        let short = tag.rsplit('.').next().unwrap_or(tag);
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == short)
            .ok_or_else(|| Error::UnknownArchiveType(tag.to_string()))
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Serialize for ArchiveKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for ArchiveKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        ArchiveKind::from_tag(&tag).map_err(serde::de::Error::custom)
    }
}
