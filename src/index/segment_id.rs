use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A globally unique segment identifier, used both as an in-memory key and
/// as the filename stem every codec file for that segment shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(Uuid);

impl SegmentId {
    pub fn generate_random() -> SegmentId {
        SegmentId(Uuid::new_v4())
    }

    pub fn uuid_string(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for SegmentId {
    type Err = SegmentIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(SegmentId).map_err(|_| SegmentIdParseError { input: s.to_string() })
    }
}

#[derive(Debug, Error)]
#[error("'{input}' is not a valid segment id")]
pub struct SegmentIdParseError {
    input: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_id_roundtrips_through_display() {
        let id = SegmentId::generate_random();
        let rendered = id.to_string();
        let parsed: SegmentId = rendered.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_invalid_segment_id_errors() {
        assert!("not-a-uuid".parse::<SegmentId>().is_err());
    }
}
