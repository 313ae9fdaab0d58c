use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use futures::channel::oneshot;
use image::RgbaImage;

use super::{EntryId, HistoryError, HistoryResult, HistoryStore};

struct SaveJob {
    image: RgbaImage,
    reply: oneshot::Sender<HistoryResult<EntryId>>,
}

/// Encodes and stores drawings on a dedicated thread so the input thread
/// never waits on the disk.
///
/// Jobs run in submission order. Dropping the writer finishes the queued
/// jobs before the thread exits.
pub struct SaveWriter {
    jobs: Option<mpsc::Sender<SaveJob>>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SaveWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveWriter")
            .field("running", &self.thread.is_some())
            .finish()
    }
}

impl SaveWriter {
    pub fn spawn(store: Arc<HistoryStore>) -> std::io::Result<Self> {
        let (jobs, queue) = mpsc::channel::<SaveJob>();
        let thread = thread::Builder::new()
            .name("history-writer".to_owned())
            .spawn(move || {
                for job in queue {
                    let result = store.save(&job.image);
                    if let Err(err) = &result {
                        log::error!("Background save failed: {err}");
                    }
                    // The requester may have stopped caring.
                    let _ = job.reply.send(result);
                }
                log::debug!("History writer stopped");
            })?;

        Ok(Self {
            jobs: Some(jobs),
            thread: Some(thread),
        })
    }

    /// Queues a snapshot for saving. The image must already be a copy; the
    /// writer never looks at the live canvas.
    pub fn submit(&self, image: RgbaImage) -> PendingSave {
        let (reply, result) = oneshot::channel();
        let job = SaveJob { image, reply };
        if let Some(jobs) = &self.jobs {
            // On failure the job, and with it the reply sender, is dropped,
            // which the pending save reports as a stopped writer.
            let _ = jobs.send(job);
        }
        PendingSave { result }
    }
}

impl Drop for SaveWriter {
    fn drop(&mut self) {
        drop(self.jobs.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("History writer panicked");
            }
        }
    }
}

/// Outcome of a submitted save, to be collected later.
#[derive(Debug)]
pub struct PendingSave {
    result: oneshot::Receiver<HistoryResult<EntryId>>,
}

impl PendingSave {
    /// The result if the save has finished, without blocking.
    pub fn try_take(&mut self) -> Option<HistoryResult<EntryId>> {
        match self.result.try_recv() {
            Ok(Some(result)) => Some(result),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(HistoryError::WriterStopped)),
        }
    }

    /// Blocks until the save has finished.
    pub fn wait(self) -> HistoryResult<EntryId> {
        futures::executor::block_on(self.result).unwrap_or(Err(HistoryError::WriterStopped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryPrefs;

    #[test]
    fn test_background_saves_land_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            HistoryStore::with_index(dir.path(), "history", Box::new(MemoryPrefs::new())).unwrap(),
        );
        let writer = SaveWriter::spawn(Arc::clone(&store)).unwrap();

        let first = writer.submit(RgbaImage::new(2, 2));
        let second = writer.submit(RgbaImage::new(3, 3));
        let first = first.wait().unwrap();
        let second = second.wait().unwrap();

        assert!(second > first);
        assert_eq!(store.list(), vec![second, first]);
        assert_eq!(store.load(second).unwrap().dimensions(), (3, 3));
    }

    #[test]
    fn test_failed_save_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let store = Arc::new(
            HistoryStore::with_index(&missing, "history", Box::new(MemoryPrefs::new())).unwrap(),
        );
        let writer = SaveWriter::spawn(Arc::clone(&store)).unwrap();

        let pending = writer.submit(RgbaImage::new(2, 2));
        assert!(matches!(pending.wait(), Err(HistoryError::Io(_))));
        assert!(store.is_empty());
    }
}
