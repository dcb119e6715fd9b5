//! Per-Ledger Ordered Execution Lanes
//!
//! The offload engine is parallel across ledgers but strictly serial per
//! ledger: every operation on a given ledger (offload, read dispatch,
//! delete) runs on the same lane, giving natural mutual exclusion on
//! per-ledger state without locks, and keeping multipart parts in order.
//!
//! A lane is a tokio task draining an unbounded mailbox of boxed jobs;
//! ledgers hash onto lanes by ID. Submitting returns once the job has run to
//! completion on its lane, so callers keep ordinary async ergonomics while
//! the lane provides the ordering.
//!
//! Dropping the executor closes the mailboxes; lane workers finish their
//! queued jobs and exit. Jobs submitted after that fail with `Shutdown`.

use std::future::Future;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};

type Job = BoxFuture<'static, ()>;

/// Fixed set of serial execution lanes, keyed by ledger ID.
pub struct OrderedExecutor {
    lanes: Vec<mpsc::UnboundedSender<Job>>,
}

impl OrderedExecutor {
    /// Spawn `lanes` worker tasks. Must be called within a tokio runtime.
    pub fn new(lanes: usize) -> Self {
        let lanes = (0..lanes.max(1))
            .map(|_| {
                let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
                tokio::spawn(async move {
                    while let Some(job) = rx.recv().await {
                        job.await;
                    }
                });
                tx
            })
            .collect();
        Self { lanes }
    }

    /// Run `work` on the lane owning `key`, after everything previously
    /// submitted for that key, and return its output.
    pub async fn submit<T, F>(&self, key: u64, work: F) -> Result<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let _ = tx.send(work.await);
        });

        let lane = &self.lanes[(key % self.lanes.len() as u64) as usize];
        lane.send(job).map_err(|_| Error::Shutdown)?;
        rx.await.map_err(|_| Error::Shutdown)
    }
}
