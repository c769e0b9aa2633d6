use crate::index::schema::{AnalyzedField, Document};
use crate::Opstamp;

/// Timestamped delete operation: every posting for `term` in `field` is
/// removed from the set of documents visible from `opstamp` onward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteOperation {
    pub opstamp: Opstamp,
    pub field: String,
    pub term: Vec<u8>,
}

/// Timestamped add operation: a document plus the already-analyzed terms for
/// each of its indexed fields.
#[derive(Debug, PartialEq)]
pub struct AddOperation {
    pub opstamp: Opstamp,
    pub document: Document,
    pub analyzed_fields: Vec<AnalyzedField>,
}

/// Encapsulates the operations a caller may batch together via `IndexWriter::run`.
#[derive(Debug, PartialEq)]
pub enum UserOperation {
    Add(Document, Vec<AnalyzedField>),
    Delete { field: String, term: Vec<u8> },
}
