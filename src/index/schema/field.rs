use serde::{Deserialize, Serialize};

/// Name of a field, interned nowhere in particular, just a `String` wrapper
/// so call sites read clearly.
pub type FieldName = String;

/// Declares how a field's values are handled at index and query time.
///
/// Analysis itself (tokenizing raw text into terms) is out of scope for this
/// crate: callers hand the core an already-analyzed [`AnalyzedField`]. The
/// `FieldType` only records which capabilities (indexed / stored / doc
/// values) a field was built with, so the collector and codec know what is
/// available to read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text { indexed: bool, stored: bool, term_vectors: bool },
    Keyword { indexed: bool, stored: bool },
    Numeric { indexed: bool, stored: bool, doc_values: bool },
    DateTime { indexed: bool, stored: bool, doc_values: bool },
    GeoPoint { indexed: bool, stored: bool, geohash_precision: u8 },
}

impl FieldType {
    pub fn is_indexed(&self) -> bool {
        match self {
            FieldType::Text { indexed, .. } => *indexed,
            FieldType::Keyword { indexed, .. } => *indexed,
            FieldType::Numeric { indexed, .. } => *indexed,
            FieldType::DateTime { indexed, .. } => *indexed,
            FieldType::GeoPoint { indexed, .. } => *indexed,
        }
    }

    pub fn is_stored(&self) -> bool {
        match self {
            FieldType::Text { stored, .. } => *stored,
            FieldType::Keyword { stored, .. } => *stored,
            FieldType::Numeric { stored, .. } => *stored,
            FieldType::DateTime { stored, .. } => *stored,
            FieldType::GeoPoint { stored, .. } => *stored,
        }
    }

    pub fn has_doc_values(&self) -> bool {
        match self {
            FieldType::Numeric { doc_values, .. } => *doc_values,
            FieldType::DateTime { doc_values, .. } => *doc_values,
            _ => false,
        }
    }
}

/// A concrete field value as handed to a `Document`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Keyword(String),
    F64(f64),
    DateTimeNanos(i64),
    GeoPoint { lat: f64, lon: f64 },
}

impl FieldValue {
    /// The numeric sort key doc-value collectors compare on, where defined.
    pub fn as_sort_key(&self) -> Option<f64> {
        match self {
            FieldValue::F64(v) => Some(*v),
            FieldValue::DateTimeNanos(v) => Some(*v as f64),
            _ => None,
        }
    }
}
