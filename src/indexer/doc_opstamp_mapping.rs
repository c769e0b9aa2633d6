use crate::common::types::DocId;
use crate::Opstamp;

/// Identifies which documents a delete should apply to.
///
/// A delete's matching set isn't computed the moment the delete is
/// received, so by the time it runs we need a way to tell whether a given
/// doc was added before or after the delete was issued. That's done by
/// comparing the doc's opstamp against the delete's.
///
/// The mapping is simply an array indexed by local doc id, storing that
/// doc's opstamp. It isn't necessarily increasing, since docs may have been
/// reordered while building the segment.
#[derive(Clone)]
pub enum DocToOpstampMapping<'a> {
    WithMap(&'a [Opstamp]),
    None,
}

impl<'a> DocToOpstampMapping<'a> {
    /// Whether `doc` should be considered deleted by a delete issued at
    /// `delete_opstamp`: true if there's no mapping, or if the doc's own
    /// opstamp predates the delete.
    pub fn is_deleted(&self, doc: DocId, delete_opstamp: Opstamp) -> bool {
        match self {
            Self::WithMap(opstamps) => opstamps[doc as usize] < delete_opstamp,
            Self::None => true,
        }
    }
}

#[cfg(test)]
mod tests {

    use super::DocToOpstampMapping;

    #[test]
    fn test_doc_to_opstamp_mapping_none() {
        let doc_to_opstamp_mapping = DocToOpstampMapping::None;
        assert!(doc_to_opstamp_mapping.is_deleted(1u32, 0u64));
        assert!(doc_to_opstamp_mapping.is_deleted(1u32, 2u64));
    }

    #[test]
    fn test_doc_to_opstamp_mapping_with_map() {
        let doc_to_opstamp_mapping = DocToOpstampMapping::WithMap(&[5u64, 1u64, 0u64, 4u64, 3u64]);
        assert_eq!(doc_to_opstamp_mapping.is_deleted(0u32, 2u64), false);
        assert_eq!(doc_to_opstamp_mapping.is_deleted(1u32, 2u64), true);
        assert_eq!(doc_to_opstamp_mapping.is_deleted(2u32, 2u64), true);
        assert_eq!(doc_to_opstamp_mapping.is_deleted(3u32, 2u64), false);
        assert_eq!(doc_to_opstamp_mapping.is_deleted(4u32, 2u64), false);
    }
}
