use serde::{Deserialize, Serialize};

use crate::common::config::IndexConfig;
use crate::index::schema::Schema;

/// Settings applied to the whole index: its schema and its tunable knobs.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct IndexSettings {
    pub schema: Schema,
    pub config: IndexConfig,
}
