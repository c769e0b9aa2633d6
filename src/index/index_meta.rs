use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use census::{Inventory, TrackedObject};
use serde::{Deserialize, Serialize};

use super::SegmentComponent;
use crate::index::SegmentId;
use crate::Opstamp;

/// Tracks every live `SegmentMeta`, the same way `SearcherGeneration`s are
/// tracked for readers: a `DeletionPolicy` needs to know which segments are
/// still referenced by *some* tracked meta before it can reclaim their
/// files, even across overlapping merges.
#[derive(Clone, Default)]
pub(crate) struct SegmentMetaInventory {
    inventory: Inventory<InnerSegmentMeta>,
}

impl SegmentMetaInventory {
    pub fn all(&self) -> Vec<SegmentMeta> {
        self.inventory.list().into_iter().map(SegmentMeta::from).collect::<Vec<_>>()
    }

    pub fn new_segment_meta(&self, segment_id: SegmentId, num_docs: u32) -> SegmentMeta {
        let inner = InnerSegmentMeta { segment_id, num_docs };
        SegmentMeta::from(self.inventory.track(inner))
    }
}

#[derive(Clone)]
pub struct SegmentMeta {
    tracked: TrackedObject<InnerSegmentMeta>,
}

impl fmt::Debug for SegmentMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tracked.fmt(f)
    }
}

impl serde::Serialize for SegmentMeta {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tracked.serialize(serializer)
    }
}

impl From<TrackedObject<InnerSegmentMeta>> for SegmentMeta {
    fn from(tracked: TrackedObject<InnerSegmentMeta>) -> SegmentMeta {
        SegmentMeta { tracked }
    }
}

impl SegmentMeta {
    pub fn id(&self) -> SegmentId {
        self.tracked.segment_id
    }

    /// Every file this segment may have on disk. Some may not exist yet
    /// depending on the segment's lifecycle stage (in-memory vs persisted).
    pub fn list_files(&self) -> HashSet<PathBuf> {
        SegmentComponent::iterator().map(|c| self.relative_path(*c)).collect()
    }

    pub fn relative_path(&self, component: SegmentComponent) -> PathBuf {
        PathBuf::from(format!("{}{}", self.id(), component.file_suffix()))
    }

    pub fn num_docs(&self) -> u32 {
        self.tracked.num_docs
    }

    /// Called once after a freshly built segment has been persisted and its
    /// doc count is finally known (it starts at 0 while still in memory).
    pub(crate) fn with_num_docs(self, num_docs: u32) -> SegmentMeta {
        assert_eq!(self.tracked.num_docs, 0);
        let tracked = self.tracked.map(move |inner: &InnerSegmentMeta| InnerSegmentMeta {
            segment_id: inner.segment_id,
            num_docs,
        });
        SegmentMeta { tracked }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct InnerSegmentMeta {
    segment_id: SegmentId,
    num_docs: u32,
}

impl InnerSegmentMeta {
    pub fn track(self, inventory: &SegmentMetaInventory) -> SegmentMeta {
        SegmentMeta { tracked: inventory.inventory.track(self) }
    }
}

/// Metadata persisted to `meta.json`: the ordered list of segments making up
/// the current snapshot, plus the opstamp of the last commit.
#[derive(Clone, Serialize)]
pub struct IndexMeta {
    pub segments: Vec<SegmentMeta>,
    pub opstamp: Opstamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl fmt::Debug for IndexMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::ser::to_string(self).expect("IndexMeta serialization failed"))
    }
}

impl IndexMeta {
    pub fn default() -> Self {
        Self { segments: Vec::new(), opstamp: 0u64, payload: None }
    }

    pub(crate) fn deserialize(
        meta_json: &str,
        inventory: &SegmentMetaInventory,
    ) -> serde_json::Result<IndexMeta> {
        let untracked: UntrackedIndexMeta = serde_json::from_str(meta_json)?;
        Ok(untracked.track(inventory))
    }
}

#[derive(Deserialize, Debug)]
pub struct UntrackedIndexMeta {
    pub segments: Vec<InnerSegmentMeta>,
    pub opstamp: Opstamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl UntrackedIndexMeta {
    pub fn track(self, inventory: &SegmentMetaInventory) -> IndexMeta {
        IndexMeta {
            segments: self.segments.into_iter().map(|s| s.track(inventory)).collect(),
            opstamp: self.opstamp,
            payload: self.payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_metas() {
        let index_metas = IndexMeta { segments: Vec::new(), opstamp: 0u64, payload: None };
        let json = serde_json::ser::to_string(&index_metas).expect("serialization failed");
        assert_eq!(json, r#"{"segments":[],"opstamp":0}"#);

        let deser_meta: UntrackedIndexMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(index_metas.opstamp, deser_meta.opstamp);
    }

    #[test]
    fn test_segment_meta_inventory_tracks_new_meta() {
        let inventory = SegmentMetaInventory::default();
        let meta = inventory.new_segment_meta(SegmentId::generate_random(), 0);
        assert_eq!(inventory.all().len(), 1);
        let meta = meta.with_num_docs(42);
        assert_eq!(meta.num_docs(), 42);
    }
}
