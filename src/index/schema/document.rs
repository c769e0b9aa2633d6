use serde::{Deserialize, Serialize};

use super::field::{FieldName, FieldValue};

/// A document as handed to the writer: an external id plus an ordered
/// sequence of field values. Field order is preserved since stored-field
/// retrieval returns values in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Vec<u8>,
    pub fields: Vec<(FieldName, FieldValue)>,
}

impl Document {
    pub fn new(id: Vec<u8>) -> Document {
        Document { id, fields: Vec::new() }
    }

    pub fn add_field(&mut self, name: impl Into<FieldName>, value: FieldValue) {
        self.fields.push((name.into(), value));
    }

    pub fn field_values(&self, name: &str) -> impl Iterator<Item = &FieldValue> {
        self.fields.iter().filter(move |(n, _)| n == name).map(|(_, v)| v)
    }
}

/// One tokenized occurrence of a term within a field, already analyzed
/// (offset, position) by the out-of-scope analysis layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedTerm {
    pub term: Vec<u8>,
    pub position: u32,
    pub start_offset: u32,
    pub end_offset: u32,
}

/// The already-tokenized form of a single field value that
/// [`SegmentWriter`](crate::indexer::segment_writer::SegmentWriter) actually
/// consumes. Produced by the out-of-scope analysis subsystem; a trivial
/// whitespace analyzer (`analyze_default`) is provided so tests and the
/// built-in default codec have something to exercise end to end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzedField {
    pub name: FieldName,
    pub terms: Vec<AnalyzedTerm>,
}

/// Splits `value` on whitespace, lower-cases it, and assigns sequential
/// positions and byte offsets. Used for `Text` fields by the bundled
/// integration tests; `Keyword`/`Numeric`/`DateTime`/`GeoPoint` fields are
/// analyzed by [`analyze_exact`] and [`analyze_geo`] instead.
pub fn analyze_default(name: &str, text: &str) -> AnalyzedField {
    let mut terms = Vec::new();
    let mut position = 0u32;
    for (start, word) in split_with_offsets(text) {
        if word.is_empty() {
            continue;
        }
        let lower = word.to_lowercase();
        terms.push(AnalyzedTerm {
            term: lower.into_bytes(),
            position,
            start_offset: start as u32,
            end_offset: (start + word.len()) as u32,
        });
        position += 1;
    }
    AnalyzedField { name: name.to_string(), terms }
}

fn split_with_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut result = Vec::new();
    let mut start = None;
    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                result.push((s, &text[s..idx]));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(s) = start {
        result.push((s, &text[s..]));
    }
    result
}

/// Analyzes a field into a single exact-match term, used for `Keyword`,
/// `Numeric`, and `DateTime` fields.
pub fn analyze_exact(name: &str, term_bytes: Vec<u8>) -> AnalyzedField {
    AnalyzedField {
        name: name.to_string(),
        terms: vec![AnalyzedTerm { term: term_bytes, position: 0, start_offset: 0, end_offset: 0 }],
    }
}

/// Analyzes a `GeoPoint` into a small set of geohash-prefix terms, the
/// coarsest prefix first, so a `PrefixSearcher` over this field can resolve
/// bounding-box-ish queries without a dedicated geo codec.
pub fn analyze_geo(name: &str, lat: f64, lon: f64, precision: u8) -> AnalyzedField {
    let full = geohash_encode(lat, lon, precision);
    let terms = (1..=full.len())
        .map(|len| AnalyzedTerm {
            term: full.as_bytes()[..len].to_vec(),
            position: 0,
            start_offset: 0,
            end_offset: 0,
        })
        .collect();
    AnalyzedField { name: name.to_string(), terms }
}

const GEOHASH_ALPHABET: &[u8] = b"0123456789bcdefghjkmnpqrstuvwxyz";

fn geohash_encode(mut lat: f64, mut lon: f64, precision: u8) -> String {
    let mut lat_range = (-90.0, 90.0);
    let mut lon_range = (-180.0, 180.0);
    let mut out = String::with_capacity(precision as usize);
    let mut bit = 0u8;
    let mut ch = 0u8;
    let mut even = true;
    while out.len() < precision as usize {
        if even {
            let mid = (lon_range.0 + lon_range.1) / 2.0;
            if lon > mid {
                ch |= 1 << (4 - bit);
                lon_range.0 = mid;
            } else {
                lon_range.1 = mid;
            }
        } else {
            let mid = (lat_range.0 + lat_range.1) / 2.0;
            if lat > mid {
                ch |= 1 << (4 - bit);
                lat_range.0 = mid;
            } else {
                lat_range.1 = mid;
            }
        }
        even = !even;
        if bit < 4 {
            bit += 1;
        } else {
            out.push(GEOHASH_ALPHABET[ch as usize] as char);
            bit = 0;
            ch = 0;
        }
    }
    lat = lat.clamp(-90.0, 90.0);
    lon = lon.clamp(-180.0, 180.0);
    let _ = (lat, lon);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_default_splits_and_lowercases() {
        let analyzed = analyze_default("body", "Hello  World");
        let terms: Vec<String> =
            analyzed.terms.iter().map(|t| String::from_utf8(t.term.clone()).unwrap()).collect();
        assert_eq!(terms, vec!["hello", "world"]);
        assert_eq!(analyzed.terms[1].position, 1);
    }

    #[test]
    fn test_analyze_geo_prefixes_are_nested() {
        let analyzed = analyze_geo("loc", 37.7749, -122.4194, 5);
        assert_eq!(analyzed.terms.len(), 5);
        for i in 1..analyzed.terms.len() {
            assert!(analyzed.terms[i].term.starts_with(&analyzed.terms[i - 1].term));
        }
    }

    #[test]
    fn test_document_field_values_filters_by_name() {
        let mut doc = Document::new(b"doc-1".to_vec());
        doc.add_field("title", FieldValue::Text("a".into()));
        doc.add_field("body", FieldValue::Text("b".into()));
        doc.add_field("title", FieldValue::Text("c".into()));
        let titles: Vec<&FieldValue> = doc.field_values("title").collect();
        assert_eq!(titles.len(), 2);
    }
}
