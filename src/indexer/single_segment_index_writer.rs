use crate::index::codec::{Codec, DefaultCodec};
use crate::index::schema::{AnalyzedField, Document};
use crate::index::{Index, IndexMeta, Segment};
use crate::indexer::operation::AddOperation;
use crate::indexer::segment_updater::save_metas;
use crate::indexer::SegmentWriter;
use crate::Opstamp;

/// A minimal, single-threaded writer with no background merging or
/// concurrent workers; useful for bulk-loading an index in one shot, e.g.
/// converting data from another format.
#[doc(hidden)]
pub struct SingleSegmentIndexWriter {
    segment_writer: SegmentWriter,
    segment: Segment,
    opstamp: Opstamp,
}

impl SingleSegmentIndexWriter {
    pub fn new(index: Index, mem_budget: usize) -> crate::Result<Self> {
        let segment = index.new_segment();
        let segment_writer = SegmentWriter::for_segment(mem_budget, segment.clone())?;
        Ok(Self { segment_writer, segment, opstamp: 0 })
    }

    pub fn mem_usage(&self) -> usize {
        self.segment_writer.mem_usage()
    }

    pub fn add_document(&mut self, document: Document, analyzed_fields: Vec<AnalyzedField>) -> crate::Result<()> {
        let opstamp = self.opstamp;
        self.opstamp += 1;
        self.segment_writer.index_document(AddOperation { opstamp, document, analyzed_fields })
    }

    pub fn finalize(self) -> crate::Result<Index> {
        let num_docs = self.segment_writer.num_docs();
        let data = self.segment_writer.finalize()?;
        DefaultCodec.write_segment(self.segment.index().directory(), self.segment.id(), &data)?;

        let segment = self.segment.with_num_docs(num_docs);
        let index = segment.index().clone();
        let index_meta = IndexMeta { segments: vec![segment.meta().clone()], opstamp: 0, payload: None };
        save_metas(&index_meta, index.directory())?;
        index.directory().sync_directory()?;
        Ok(index)
    }
}
