//! Dynamic CBOR value tree.
//!
//! Typed messages lower themselves into a [`PlainValue`] before hitting the
//! wire and hydrate their fields back from one after CBOR decoding. Keeping
//! the tree explicit separates "the bytes were not CBOR" from "the CBOR did
//! not carry the fields this message needs", which the decode pipeline
//! reports as distinct failures.

use std::fmt;

use minicbor::data::Type;
use minicbor::{Decode, Encode};

#[derive(Debug, Clone, PartialEq)]
pub enum PlainValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<PlainValue>),
    Map(Vec<(PlainValue, PlainValue)>),
}

impl PlainValue {
    /// Builds a map value from `(text-key, value)` entries, the common
    /// shape of a message's plain object.
    pub fn object<I, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, V)>,
        V: Into<PlainValue>,
    {
        PlainValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (PlainValue::Text(k.into()), v.into()))
                .collect(),
        )
    }

    /// Looks up a text key in a map value. Last write wins, mirroring the
    /// registry semantics for duplicate entries.
    pub fn get(&self, key: &str) -> Option<&PlainValue> {
        match self {
            PlainValue::Map(kvs) => kvs
                .iter()
                .rev()
                .find(|(k, _)| matches!(k, PlainValue::Text(t) if t == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PlainValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PlainValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            PlainValue::UInt(v) => Some(*v),
            PlainValue::Int(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PlainValue::Int(v) => Some(*v),
            PlainValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlainValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for PlainValue {
    fn from(s: &str) -> Self {
        PlainValue::Text(s.into())
    }
}

impl From<String> for PlainValue {
    fn from(s: String) -> Self {
        PlainValue::Text(s)
    }
}

impl From<bool> for PlainValue {
    fn from(b: bool) -> Self {
        PlainValue::Bool(b)
    }
}

impl From<u64> for PlainValue {
    fn from(v: u64) -> Self {
        PlainValue::UInt(v)
    }
}

impl From<i64> for PlainValue {
    fn from(v: i64) -> Self {
        PlainValue::Int(v)
    }
}

impl From<f64> for PlainValue {
    fn from(v: f64) -> Self {
        PlainValue::Float(v)
    }
}

impl From<Vec<u8>> for PlainValue {
    fn from(v: Vec<u8>) -> Self {
        PlainValue::Bytes(v)
    }
}

impl From<Vec<PlainValue>> for PlainValue {
    fn from(v: Vec<PlainValue>) -> Self {
        PlainValue::Array(v)
    }
}

impl fmt::Display for PlainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlainValue::Null => f.write_str("null"),
            PlainValue::Bool(b) => write!(f, "{b}"),
            PlainValue::Int(v) => write!(f, "{v}"),
            PlainValue::UInt(v) => write!(f, "{v}"),
            PlainValue::Float(v) => write!(f, "{v}"),
            PlainValue::Bytes(b) => write!(f, "h'{}'", hex::encode(b)),
            PlainValue::Text(s) => write!(f, "{s:?}"),
            PlainValue::Array(xs) => {
                f.write_str("[")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{x}")?;
                }
                f.write_str("]")
            }
            PlainValue::Map(kvs) => {
                f.write_str("{")?;
                for (i, (k, v)) in kvs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl<C> Encode<C> for PlainValue {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            PlainValue::Null => {
                e.null()?;
            }
            PlainValue::Bool(b) => {
                e.bool(*b)?;
            }
            PlainValue::Int(v) => {
                e.i64(*v)?;
            }
            PlainValue::UInt(v) => {
                e.u64(*v)?;
            }
            PlainValue::Float(v) => {
                e.f64(*v)?;
            }
            PlainValue::Bytes(b) => {
                e.bytes(b)?;
            }
            PlainValue::Text(s) => {
                e.str(s)?;
            }
            PlainValue::Array(xs) => {
                e.array(xs.len() as u64)?;
                for x in xs {
                    x.encode(e, ctx)?;
                }
            }
            PlainValue::Map(kvs) => {
                e.map(kvs.len() as u64)?;
                for (k, v) in kvs {
                    k.encode(e, ctx)?;
                    v.encode(e, ctx)?;
                }
            }
        }

        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for PlainValue {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            Type::Bool => Ok(PlainValue::Bool(d.bool()?)),
            Type::Null => {
                d.null()?;
                Ok(PlainValue::Null)
            }
            Type::Undefined => {
                d.undefined()?;
                Ok(PlainValue::Null)
            }
            Type::U8 | Type::U16 | Type::U32 | Type::U64 => Ok(PlainValue::UInt(d.u64()?)),
            Type::I8 | Type::I16 | Type::I32 | Type::I64 => Ok(PlainValue::Int(d.i64()?)),
            Type::F16 => Ok(PlainValue::Float(d.f16()? as f64)),
            Type::F32 => Ok(PlainValue::Float(d.f32()? as f64)),
            Type::F64 => Ok(PlainValue::Float(d.f64()?)),
            Type::Bytes => Ok(PlainValue::Bytes(d.bytes()?.to_vec())),
            Type::BytesIndef => {
                let mut all = Vec::new();
                for chunk in d.bytes_iter()? {
                    all.extend_from_slice(chunk?);
                }
                Ok(PlainValue::Bytes(all))
            }
            Type::String => Ok(PlainValue::Text(d.str()?.into())),
            Type::StringIndef => {
                let mut all = String::new();
                for chunk in d.str_iter()? {
                    all.push_str(chunk?);
                }
                Ok(PlainValue::Text(all))
            }
            Type::Array | Type::ArrayIndef => {
                let items: Result<Vec<_>, _> = d.array_iter_with::<C, PlainValue>(ctx)?.collect();
                Ok(PlainValue::Array(items?))
            }
            Type::Map | Type::MapIndef => {
                let items: Result<Vec<_>, _> =
                    d.map_iter_with::<C, PlainValue, PlainValue>(ctx)?.collect();
                Ok(PlainValue::Map(items?))
            }
            Type::Tag => {
                d.tag()?;
                PlainValue::decode(d, ctx)
            }
            other => Err(minicbor::decode::Error::message(format!(
                "unsupported cbor data type {other:?} in plain value"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(v: &PlainValue) -> PlainValue {
        let bytes = minicbor::to_vec(v).unwrap();
        minicbor::decode(&bytes).unwrap()
    }

    #[test]
    fn scalar_round_trips() {
        for v in [
            PlainValue::Null,
            PlainValue::Bool(true),
            PlainValue::Int(-42),
            PlainValue::UInt(u64::MAX),
            PlainValue::Float(1.5),
            PlainValue::Bytes(vec![0xde, 0xad]),
            PlainValue::Text("I love Kaspa!".into()),
        ] {
            assert_eq!(round_trip(&v), v);
        }
    }

    #[test]
    fn object_round_trips_and_indexes() {
        let v = PlainValue::object([
            ("t", PlainValue::from("hello")),
            ("n", PlainValue::from(7u64)),
        ]);

        let back = round_trip(&v);
        assert_eq!(back.get("t").and_then(PlainValue::as_text), Some("hello"));
        assert_eq!(back.get("n").and_then(PlainValue::as_u64), Some(7));
        assert_eq!(back.get("missing"), None);
    }

    #[test]
    fn nested_arrays_round_trip() {
        let v = PlainValue::Array(vec![
            PlainValue::from(1u64),
            PlainValue::Array(vec![PlainValue::from("x")]),
            PlainValue::Null,
        ]);
        assert_eq!(round_trip(&v), v);
    }

    #[test]
    fn duplicate_keys_resolve_to_last() {
        let v = PlainValue::Map(vec![
            (PlainValue::from("k"), PlainValue::from(1u64)),
            (PlainValue::from("k"), PlainValue::from(2u64)),
        ]);
        assert_eq!(v.get("k").and_then(PlainValue::as_u64), Some(2));
    }

    #[test]
    fn non_cbor_bytes_fail() {
        let garbage = [0xff, 0x00, 0x13, 0x37];
        assert!(minicbor::decode::<PlainValue>(&garbage).is_err());
    }
}
