use std::slice;

/// The on-disk pieces a [`Codec`](crate::index::codec::Codec) implementation
/// may persist for one segment. `SegmentMeta::list_files` and
/// `ManagedDirectory` garbage collection both iterate over every variant
/// without needing to know what any of them actually contain.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum SegmentComponent {
    /// Term dictionary, postings lists and term positions.
    Postings,
    /// Stored field values, keyed by local doc id.
    StoredFields,
    /// Per-field doc-values columns.
    DocValues,
    /// Per-field, per-doc quantized norms consumed by BM25.
    Norms,
}

impl SegmentComponent {
    /// Iterates through the components.
    pub fn iterator() -> slice::Iter<'static, SegmentComponent> {
        static SEGMENT_COMPONENTS: [SegmentComponent; 4] = [
            SegmentComponent::Postings,
            SegmentComponent::StoredFields,
            SegmentComponent::DocValues,
            SegmentComponent::Norms,
        ];
        SEGMENT_COMPONENTS.iter()
    }

    pub fn file_suffix(&self) -> &'static str {
        match self {
            SegmentComponent::Postings => ".postings",
            SegmentComponent::StoredFields => ".store",
            SegmentComponent::DocValues => ".fast",
            SegmentComponent::Norms => ".norms",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iterator_covers_every_variant() {
        let suffixes: Vec<&str> = SegmentComponent::iterator().map(|c| c.file_suffix()).collect();
        assert_eq!(suffixes.len(), 4);
        assert!(suffixes.contains(&".postings"));
    }
}
