//! Single-slot queue feeding the remote writer task.
//!
//! The writer only ever needs the latest desired contents, so the queue holds
//! at most one pending write. Enqueuing while a write is pending replaces it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::{watch, Notify};
use tote_engine::EntityList;

/// Desired remote contents after a mutation.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    /// Session generation the write belongs to
    pub generation: u64,
    pub entities: EntityList,
}

#[derive(Debug)]
pub struct WriteQueue {
    slot: Mutex<Option<(u64, PendingWrite)>>,
    notify: Notify,
    enqueued: AtomicU64,
    completed: watch::Sender<u64>,
}

impl Default for WriteQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteQueue {
    pub fn new() -> Self {
        let (completed, _) = watch::channel(0);
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
            enqueued: AtomicU64::new(0),
            completed,
        }
    }

    /// Queue `write`, replacing any write not yet taken by the writer.
    pub fn push(&self, write: PendingWrite) {
        let seq = self.enqueued.fetch_add(1, Ordering::SeqCst) + 1;
        let replaced = {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            slot.replace((seq, write))
        };
        if let Some((old_seq, _)) = replaced {
            tracing::debug!(superseded = old_seq, by = seq, "Superseded queued remote write");
        }
        self.notify.notify_one();
    }

    /// Wait for the next write. Returns it with its sequence number.
    pub async fn next(&self) -> (u64, PendingWrite) {
        loop {
            if let Some(entry) = self.take() {
                return entry;
            }
            self.notify.notified().await;
        }
    }

    fn take(&self) -> Option<(u64, PendingWrite)> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Mark every write up to `seq` as done.
    pub fn complete(&self, seq: u64) {
        self.completed.send_modify(|done| *done = (*done).max(seq));
    }

    /// Whether writes are queued or in flight.
    pub fn is_idle(&self) -> bool {
        *self.completed.borrow() >= self.enqueued.load(Ordering::SeqCst)
    }

    /// Wait until the writer has nothing queued or in flight.
    ///
    /// Writes queued by the writer itself while sending are waited for too.
    pub async fn flush(&self) {
        let mut done = self.completed.subscribe();
        while !self.is_idle() {
            let target = self.enqueued.load(Ordering::SeqCst);
            // The sender lives in `self`, so the channel cannot close here.
            let _ = done.wait_for(|done| *done >= target).await;
        }
    }
}
