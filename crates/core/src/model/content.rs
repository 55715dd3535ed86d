//! Content-stream operations.

use serde::Serialize;

use crate::model::objects::{Dict, PdfValue};

/// An inline image (`BI ... ID <payload> EI`), carried as one operand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineImage {
    /// Image dictionary between `BI` and `ID`, keys as written (possibly
    /// abbreviated, e.g. `/W`, `/BPC`).
    #[serde(serialize_with = "serialize_dict")]
    pub header: Dict,
    /// Number of payload bytes between `ID` and `EI`.
    pub payload_len: usize,
}

/// Operand of a content-stream operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    Value(PdfValue),
    InlineImage(InlineImage),
}

impl Operand {
    pub fn as_value(&self) -> Option<&PdfValue> {
        match self {
            Self::Value(v) => Some(v),
            Self::InlineImage(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(PdfValue::as_f64)
    }

    pub fn as_name(&self) -> Option<&str> {
        self.as_value().and_then(PdfValue::as_name)
    }
}

impl From<PdfValue> for Operand {
    fn from(v: PdfValue) -> Self {
        Self::Value(v)
    }
}

/// One operator together with the operands that preceded it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<Operand>,
}

impl ContentOp {
    /// The inline image carried by a `BI` operation.
    pub fn inline_image(&self) -> Option<&InlineImage> {
        self.operands.iter().find_map(|op| match op {
            Operand::InlineImage(img) => Some(img),
            Operand::Value(_) => None,
        })
    }

    /// Numeric operands, `None` if any operand is not a number.
    pub fn numbers(&self) -> Option<Vec<f64>> {
        self.operands.iter().map(Operand::as_f64).collect()
    }
}

fn serialize_dict<S: serde::Serializer>(dict: &Dict, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(dict)
}
