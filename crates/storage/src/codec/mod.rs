//! Record codec.
//!
//! Records are written as self-describing maps in one of two encodings:
//!
//! - `Format::Text`: JSON via `serde_json`
//! - `Format::Binary`: MessagePack via `rmp_serde`, with struct-map
//!   encoding so field names stay in the stream
//!
//! Both encodings go through the same serde visitors, so a record decodes
//! identically whichever format it was stored in. Readers never need to be
//! told the format: [`Format::sniff`] inspects the first byte of the stream.
//!
//! Field layout is declared as data, one [`schema::Schema`] per record type
//! (see [`fields`]), and interpreted by a single generic encoder/decoder.

pub mod fields;
pub mod schema;

pub use fields::SchemaRecord;
pub use schema::{DecodeSeed, Encode, FieldKind, FieldRef, FieldSpec, FieldValue, Schema};

use marsdb_core::{Error, Result};
use serde::de::{DeserializeOwned, DeserializeSeed};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufRead, Write};

/// On-disk encoding of an archive or record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON
    Text,
    /// MessagePack
    #[default]
    Binary,
}

impl Format {
    /// File extension used for per-record files and sidecars
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Text => "json",
            Format::Binary => "mpk",
        }
    }

    /// The other encoding
    pub fn other(&self) -> Format {
        match self {
            Format::Text => Format::Binary,
            Format::Binary => Format::Text,
        }
    }

    /// Parse a configuration name (`"text"`/`"json"`, `"binary"`/`"msgpack"`)
    pub fn from_name(name: &str) -> Result<Format> {
        match name.to_ascii_lowercase().as_str() {
            "text" | "json" => Ok(Format::Text),
            "binary" | "msgpack" | "mpk" => Ok(Format::Binary),
            other => Err(Error::Config(format!("unknown format: {}", other))),
        }
    }

    /// Detect the encoding of a stream.
    ///
    /// Leading whitespace is consumed; the first significant byte is left in
    /// the reader. `{` means JSON, a MessagePack map marker means binary.
    pub fn sniff<R: BufRead + ?Sized>(reader: &mut R) -> Result<Format> {
        loop {
            let (skip, first) = {
                let buf = reader.fill_buf()?;
                if buf.is_empty() {
                    return Err(Error::format("empty stream"));
                }
                let skip = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
                (skip, buf.get(skip).copied())
            };
            reader.consume(skip);
            let Some(first) = first else { continue };
            return match first {
                b'{' => Ok(Format::Text),
                0x80..=0x8f | 0xde | 0xdf => Ok(Format::Binary),
                other => Err(Error::format(format!(
                    "unrecognized leading byte 0x{:02x}",
                    other
                ))),
            };
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Text => f.write_str("text"),
            Format::Binary => f.write_str("binary"),
        }
    }
}

/// Serialize any value in the given format.
pub fn write_value<T, W>(value: &T, format: Format, writer: W) -> Result<()>
where
    T: Serialize + ?Sized,
    W: Write,
{
    match format {
        Format::Text => {
            let mut ser = serde_json::Serializer::new(writer);
            value.serialize(&mut ser)?;
        }
        Format::Binary => {
            let mut ser = rmp_serde::Serializer::new(writer).with_struct_map();
            value.serialize(&mut ser)?;
        }
    }
    Ok(())
}

/// Run a seed over a stream, sniffing its format first.
pub fn read_seed<'de, S, R>(seed: S, mut reader: R) -> Result<S::Value>
where
    S: DeserializeSeed<'de>,
    R: BufRead,
{
    match Format::sniff(&mut reader)? {
        Format::Text => {
            let mut de = serde_json::Deserializer::from_reader(reader);
            let value = seed.deserialize(&mut de)?;
            de.end()?;
            Ok(value)
        }
        Format::Binary => {
            let mut de = rmp_serde::Deserializer::new(reader);
            Ok(seed.deserialize(&mut de)?)
        }
    }
}

/// Deserialize any value from a stream of either format.
pub fn read_value<T, R>(reader: R) -> Result<T>
where
    T: DeserializeOwned,
    R: BufRead,
{
    read_seed(std::marker::PhantomData::<T>, reader)
}

/// Encode one record.
pub fn encode_record<R: SchemaRecord, W: Write>(record: &R, format: Format, writer: W) -> Result<()> {
    write_value(&Encode(record), format, writer)
}

/// Encode one record into a buffer.
pub fn record_to_vec<R: SchemaRecord>(record: &R, format: Format) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_record(record, format, &mut buf)?;
    Ok(buf)
}

/// Decode one record, every field.
pub fn decode_record<R: SchemaRecord, Rd: BufRead>(reader: Rd) -> Result<R> {
    read_seed(DecodeSeed::<R>::full(), reader)
}

/// Decode one record's header fields only; payload fields (tables) are
/// skipped token by token.
pub fn decode_header<R: SchemaRecord, Rd: BufRead>(reader: Rd) -> Result<R> {
    read_seed(DecodeSeed::<R>::header(), reader)
}
