use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel as channel;
use log::{error, info};

use crate::common::config::IndexConfig;
use crate::directory::Directory;
use crate::index::codec::{Codec, SegmentData};
use crate::index::SegmentId;

/// One in-memory segment waiting to be written out.
pub(crate) struct PersistTask {
    pub segment_id: SegmentId,
    pub data: SegmentData,
}

/// A message on the persister's queue: either a segment to flush, or a
/// barrier a caller is waiting on. Routing both through the same channel
/// means a barrier is only handled once every task ahead of it in the queue
/// has actually been written and folded into the segment set.
enum PersistMessage {
    Task(PersistTask),
    Barrier(oneshot::Sender<()>),
}

/// Decouples segment construction (CPU-bound, happens on indexing worker
/// threads) from writing a segment's codec files to the `Directory`
/// (IO-bound). Naps for `persister_nap_time_msec` whenever fewer than
/// `persister_nap_under_num_files` segments are queued, so bursts of small
/// commits coalesce into fewer fsyncs.
pub(crate) struct Persister {
    sender: channel::Sender<PersistMessage>,
    join_handle: Option<JoinHandle<()>>,
}

impl Persister {
    /// `on_persisted` is called, on the persister's own thread, once a
    /// segment's files are durable; it is expected to fold the new segment
    /// into whatever live segment set the caller maintains.
    pub fn start<F>(
        directory: Arc<dyn Directory>,
        codec: Arc<dyn Codec>,
        config: IndexConfig,
        on_persisted: F,
    ) -> Persister
    where
        F: Fn(SegmentId, u32, Vec<std::path::PathBuf>) + Send + 'static,
    {
        let (sender, receiver) = channel::unbounded::<PersistMessage>();
        let nap_time = config.persister_nap_time();
        let nap_under = config.persister_nap_under_num_files;

        let join_handle = thread::Builder::new()
            .name("vellum-persister".to_string())
            .spawn(move || {
                loop {
                    if receiver.len() < nap_under {
                        thread::sleep(nap_time);
                    }
                    let message = match receiver.recv_timeout(Duration::from_secs(1)) {
                        Ok(message) => message,
                        Err(channel::RecvTimeoutError::Timeout) => continue,
                        Err(channel::RecvTimeoutError::Disconnected) => return,
                    };
                    let task = match message {
                        PersistMessage::Task(task) => task,
                        PersistMessage::Barrier(acked) => {
                            let _ = acked.send(());
                            continue;
                        }
                    };
                    match codec.write_segment(directory.as_ref(), task.segment_id, &task.data) {
                        Ok(paths) => {
                            info!("persisted segment {} ({} files)", task.segment_id, paths.len());
                            on_persisted(task.segment_id, task.data.num_docs, paths);
                        }
                        Err(err) => error!("failed to persist segment {}: {err}", task.segment_id),
                    }
                }
            })
            .expect("failed to spawn persister thread");

        Persister { sender, join_handle: Some(join_handle) }
    }

    pub fn submit(&self, segment_id: SegmentId, data: SegmentData) -> crate::Result<()> {
        self.sender
            .send(PersistMessage::Task(PersistTask { segment_id, data }))
            .map_err(|_| crate::common::errors::SearchError::Closed)
    }

    /// Blocks until every task submitted before this call has been written
    /// and handed to `on_persisted`. Used before a commit snapshots the
    /// segment set, so a segment flushed just ahead of the commit is never
    /// silently left out of it.
    pub fn wait_until_drained(&self) -> crate::Result<()> {
        let (acked_sender, acked_receiver) = oneshot::channel();
        self.sender
            .send(PersistMessage::Barrier(acked_sender))
            .map_err(|_| crate::common::errors::SearchError::Closed)?;
        acked_receiver.recv().map_err(|_| crate::common::errors::SearchError::Closed)
    }
}

impl Drop for Persister {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            drop(handle);
        }
    }
}
