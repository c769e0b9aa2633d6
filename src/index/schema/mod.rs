mod document;
mod field;

pub use document::{analyze_default, analyze_exact, analyze_geo, AnalyzedField, AnalyzedTerm, Document};
pub use field::{FieldName, FieldType, FieldValue};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Maps field names to their declared `FieldType`, attached to an
/// `IndexSettings`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: HashMap<FieldName, FieldType>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn get_field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&FieldName, &FieldType)> {
        self.fields.iter()
    }
}

#[derive(Default)]
pub struct SchemaBuilder {
    fields: HashMap<FieldName, FieldType>,
}

impl SchemaBuilder {
    pub fn add_field(mut self, name: impl Into<FieldName>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }

    pub fn build(self) -> Schema {
        Schema { fields: self.fields }
    }
}
