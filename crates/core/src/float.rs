//! Float encoding that survives text formats
//!
//! JSON has no literal for NaN or the infinities. In human-readable formats
//! non-finite values are written as the strings `"NaN"`, `"Infinity"` and
//! `"-Infinity"`; binary formats keep the raw float. Decoding accepts either
//! form, plus `null` (read as NaN) for files written by tools that drop
//! non-finite numbers.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An `f64` with lenient, non-finite-safe serde behavior.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Flexible(pub f64);

impl Serialize for Flexible {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Flexible {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize(deserializer).map(Flexible)
    }
}

/// Serialize a single float (use with `#[serde(serialize_with)]`).
pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() || !serializer.is_human_readable() {
        serializer.serialize_f64(*value)
    } else if value.is_nan() {
        serializer.serialize_str("NaN")
    } else if *value > 0.0 {
        serializer.serialize_str("Infinity")
    } else {
        serializer.serialize_str("-Infinity")
    }
}

/// Deserialize a single float (use with `#[serde(deserialize_with)]`).
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    deserializer.deserialize_any(FloatVisitor)
}

struct FloatVisitor;

impl<'de> Visitor<'de> for FloatVisitor {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or one of \"NaN\", \"Infinity\", \"-Infinity\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
        match v {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse::<f64>()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(other), &self)),
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<f64, E> {
        Ok(f64::NAN)
    }

    fn visit_none<E: de::Error>(self) -> Result<f64, E> {
        Ok(f64::NAN)
    }
}

/// `#[serde(with = "float::seq")]` for `Vec<f64>` fields.
pub mod seq {
    use super::*;

    /// Serialize every element through [`Flexible`].
    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            seq.serialize_element(&Flexible(*v))?;
        }
        seq.end()
    }

    /// Deserialize a sequence of lenient floats.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        deserializer.deserialize_seq(SeqVisitor)
    }

    struct SeqVisitor;

    impl<'de> Visitor<'de> for SeqVisitor {
        type Value = Vec<f64>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a sequence of numbers")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<f64>, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(Flexible(v)) = seq.next_element()? {
                out.push(v);
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_writes_non_finite_as_strings() {
        let json = serde_json::to_string(&vec![
            Flexible(1.5),
            Flexible(f64::NAN),
            Flexible(f64::INFINITY),
            Flexible(f64::NEG_INFINITY),
        ])
        .unwrap();
        assert_eq!(json, r#"[1.5,"NaN","Infinity","-Infinity"]"#);
    }

    #[test]
    fn test_text_reads_all_forms() {
        let parsed: Vec<Flexible> =
            serde_json::from_str(r#"[2, 2.5, "NaN", "-Infinity", null]"#).unwrap();
        assert_eq!(parsed[0].0, 2.0);
        assert_eq!(parsed[1].0, 2.5);
        assert!(parsed[2].0.is_nan());
        assert_eq!(parsed[3].0, f64::NEG_INFINITY);
        assert!(parsed[4].0.is_nan());
    }

    #[test]
    fn test_binary_keeps_raw_floats() {
        let bytes = rmp_serde::to_vec(&Flexible(f64::INFINITY)).unwrap();
        let back: Flexible = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back.0, f64::INFINITY);
    }
}
