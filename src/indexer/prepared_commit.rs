use super::index_writer::IndexWriter;
use crate::Opstamp;

/// A commit that has been cut from the indexing pipeline (every pending
/// document has been handed to its worker thread) but not yet published.
/// Borrows the `IndexWriter` mutably, so no new document can be added while
/// it is alive.
pub struct PreparedCommit<'a> {
    writer: &'a mut IndexWriter,
    payload: Option<String>,
    opstamp: Opstamp,
}

impl<'a> PreparedCommit<'a> {
    pub(crate) fn new(writer: &'a mut IndexWriter, opstamp: Opstamp) -> PreparedCommit<'a> {
        PreparedCommit { writer, payload: None, opstamp }
    }

    pub fn opstamp(&self) -> Opstamp {
        self.opstamp
    }

    pub fn set_payload(&mut self, payload: &str) {
        self.payload = Some(payload.to_string());
    }

    /// Cancels the commit; the writer keeps running with the same opstamp.
    pub fn abort(self) -> crate::Result<Opstamp> {
        self.writer.rollback()
    }

    /// Publishes every segment flushed since the last commit and advances
    /// `committed_opstamp`.
    pub fn commit(self) -> crate::Result<Opstamp> {
        self.writer.segment_updater().schedule_commit(self.opstamp, self.payload).wait()?;
        self.writer.set_committed_opstamp(self.opstamp);
        Ok(self.opstamp)
    }
}
