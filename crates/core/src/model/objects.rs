//! PDF object types.
//!
//! Every value the parser produces is a [`PdfValue`]. Lookups on parsed
//! values return `Option` because absent or mistyped keys are ordinary in
//! real-world files; callers decide whether a missing value matters.

use std::fmt;

use bytes::Bytes;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::utils::decode_text;

/// Dictionary type: insertion ordered, looked up by name.
pub type Dict = IndexMap<String, PdfValue>;

/// PDF indirect object reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number
    pub number: u32,
    /// Generation number
    pub generation: u32,
}

impl ObjectRef {
    /// Create a new object reference.
    pub const fn new(number: u32, generation: u32) -> Self {
        Self { number, generation }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

impl Serialize for ObjectRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A numeric value, keeping track of whether it was written as an integer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Real(f64),
}

impl Number {
    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Int(n) => n as f64,
            Self::Real(r) => r,
        }
    }

    /// Integer value; reals are accepted when they have no fractional part.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(n),
            Self::Real(r) if r.is_finite() && r.fract() == 0.0 => Some(r as i64),
            Self::Real(_) => None,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Real(r) => write!(f, "{r}"),
        }
    }
}

/// PDF Object types - the fundamental value type in PDF.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    /// Null object
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer or real number
    Number(Number),
    /// Name object (e.g., /Type, /Font), stored without the slash
    Name(String),
    /// String written with parentheses
    LiteralString(Vec<u8>),
    /// String written with angle brackets
    HexString(Vec<u8>),
    /// Array of objects
    Array(Vec<Self>),
    /// Dictionary (name -> object mapping)
    Dict(Dict),
    /// Stream (dictionary + binary data)
    Stream(Box<Stream>),
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Shared null value handed out for dangling references.
pub static NULL: PdfValue = PdfValue::Null;

impl PdfValue {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub const fn as_number(&self) -> Option<Number> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(Number::as_i64)
    }

    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of a literal or hex string.
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Self::LiteralString(s) | Self::HexString(s) => Some(s),
            _ => None,
        }
    }

    /// String decoded as a PDF text string (PDFDocEncoding or UTF-16BE).
    pub fn as_text(&self) -> Option<String> {
        self.as_string().map(decode_text)
    }

    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub const fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Dictionary of either a plain dictionary or a stream.
    pub fn dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(d) => Some(d),
            Self::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Self::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Self::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Four-number rectangle such as `/MediaBox` or `/Rect`.
    pub fn as_rect(&self) -> Option<[f64; 4]> {
        let arr = self.as_array()?;
        if arr.len() != 4 {
            return None;
        }
        Some([
            arr[0].as_f64()?,
            arr[1].as_f64()?,
            arr[2].as_f64()?,
            arr[3].as_f64()?,
        ])
    }

    /// Get type name for diagnostics
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(Number::Int(_)) => "int",
            Self::Number(Number::Real(_)) => "real",
            Self::Name(_) => "name",
            Self::LiteralString(_) => "string",
            Self::HexString(_) => "hexstring",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
            Self::Stream(_) => "stream",
            Self::Reference(_) => "ref",
        }
    }
}

impl From<i64> for PdfValue {
    fn from(n: i64) -> Self {
        Self::Number(Number::Int(n))
    }
}

impl From<i32> for PdfValue {
    fn from(n: i32) -> Self {
        Self::Number(Number::Int(n.into()))
    }
}

impl From<usize> for PdfValue {
    fn from(n: usize) -> Self {
        Self::Number(Number::Int(i64::try_from(n).unwrap_or(i64::MAX)))
    }
}

impl From<f64> for PdfValue {
    fn from(r: f64) -> Self {
        Self::Number(Number::Real(r))
    }
}

impl From<bool> for PdfValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<ObjectRef> for PdfValue {
    fn from(r: ObjectRef) -> Self {
        Self::Reference(r)
    }
}

impl From<Dict> for PdfValue {
    fn from(d: Dict) -> Self {
        Self::Dict(d)
    }
}

/// Build a name value.
pub fn name(s: &str) -> PdfValue {
    PdfValue::Name(s.to_string())
}

/// PDF Stream - dictionary attributes + binary data.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// Stream dictionary attributes
    pub dict: Dict,
    /// Raw (possibly encoded) data
    raw: Bytes,
}

impl Stream {
    pub fn new(dict: Dict, raw: impl Into<Bytes>) -> Self {
        Self {
            dict,
            raw: raw.into(),
        }
    }

    /// Get raw (undecoded) data.
    pub fn raw(&self) -> &[u8] {
        self.raw.as_ref()
    }

    /// Get raw data as shared bytes.
    pub fn raw_bytes(&self) -> Bytes {
        self.raw.clone()
    }

    pub fn get(&self, key: &str) -> Option<&PdfValue> {
        self.dict.get(key)
    }
}

/// Typed lookups on dictionaries. Every accessor treats absence and type
/// mismatch the same way: `None`.
pub trait DictExt {
    fn value(&self, key: &str) -> Option<&PdfValue>;

    fn get_name(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(PdfValue::as_name)
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.value(key).and_then(PdfValue::as_i64)
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        self.value(key).and_then(PdfValue::as_f64)
    }

    fn get_text(&self, key: &str) -> Option<String> {
        self.value(key).and_then(PdfValue::as_text)
    }

    fn get_ref(&self, key: &str) -> Option<ObjectRef> {
        self.value(key).and_then(PdfValue::as_reference)
    }

    fn has_name(&self, key: &str, expected: &str) -> bool {
        self.get_name(key) == Some(expected)
    }
}

impl DictExt for Dict {
    fn value(&self, key: &str) -> Option<&PdfValue> {
        self.get(key).filter(|v| !v.is_null())
    }
}

impl Serialize for PdfValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(Number::Int(n)) => serializer.serialize_i64(*n),
            Self::Number(Number::Real(r)) => serializer.serialize_f64(*r),
            Self::Name(n) => serializer.collect_str(&format_args!("/{n}")),
            Self::LiteralString(s) => serializer.serialize_str(&decode_text(s)),
            Self::HexString(s) => serializer.collect_str(&format_args!("<{}>", hex::encode(s))),
            Self::Array(arr) => {
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for item in arr {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Dict(dict) => serialize_dict(dict, serializer),
            Self::Stream(stream) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("dict", &DictView(&stream.dict))?;
                map.serialize_entry("length", &stream.raw().len())?;
                map.end()
            }
            Self::Reference(r) => r.serialize(serializer),
        }
    }
}

struct DictView<'a>(&'a Dict);

impl Serialize for DictView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_dict(self.0, serializer)
    }
}

fn serialize_dict<S: Serializer>(dict: &Dict, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(dict.len()))?;
    for (k, v) in dict {
        map.serialize_entry(k, v)?;
    }
    map.end()
}
