//! Shared work queue feeding the worker pool.
//!
//! A tokio mpsc channel sized to hold every key, filled and closed by the
//! coordinator before any worker starts. Workers share the receiving half
//! behind a mutex so each dequeue hands a key to exactly one worker.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::types::{ImageKey, WorkItem};

/// Multi-consumer handle onto a closed, pre-filled channel of work items.
#[derive(Clone)]
pub struct WorkQueue {
    receiver: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
}

impl WorkQueue {
    /// Enqueue every key and close the channel.
    ///
    /// Capacity equals the number of keys, so the producer never waits on a
    /// consumer. Returns `None` for an empty key set: there is nothing to
    /// hand out and tokio channels need a non-zero capacity.
    pub fn filled(keys: Vec<ImageKey>) -> Option<Self> {
        if keys.is_empty() {
            return None;
        }

        let (tx, rx) = mpsc::channel(keys.len());
        for key in keys {
            // Capacity is exactly keys.len() and the receiver is alive.
            if tx.try_send(WorkItem::new(key)).is_err() {
                tracing::error!("Work queue rejected a key while filling");
            }
        }
        drop(tx);

        Some(Self {
            receiver: Arc::new(Mutex::new(rx)),
        })
    }

    /// Take the next item in FIFO order, or `None` once the queue is drained.
    pub async fn next(&self) -> Option<WorkItem> {
        self.receiver.lock().await.recv().await
    }

    /// Items not yet taken by any worker.
    pub async fn remaining(&self) -> usize {
        self.receiver.lock().await.len()
    }
}
