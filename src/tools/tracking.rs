// ABOUTME: Bounded usage-tracking queue with a worker task and visible failure counters
// ABOUTME: Audit writes never block a turn and never throw, but losses are counted, not silent
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Usage Tracking Queue
//!
//! Tool handlers log a usage record on every invocation, success or failure.
//! Those writes must never block the turn and must never fail it, but
//! swallowing their errors silently would mask systemic audit gaps. So audit
//! writes go through an explicit bounded queue: a full queue drops the record
//! and increments a visible counter, a failed write increments another, and
//! both are exported for alerting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::models::ToolUsageRecord;
use crate::storage::Storage;

/// Queue depth before records are dropped (and counted)
const QUEUE_CAPACITY: usize = 256;

enum TrackerMessage {
    Record(Box<ToolUsageRecord>),
    Flush(oneshot::Sender<()>),
}

/// Handle to the usage-tracking worker
#[derive(Clone)]
pub struct UsageTracker {
    sender: mpsc::Sender<TrackerMessage>,
    dropped: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl UsageTracker {
    /// Spawn the worker task and return a cloneable handle
    #[must_use]
    pub fn spawn(storage: Arc<dyn Storage>) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let dropped = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        tokio::spawn(worker(receiver, storage, Arc::clone(&failed)));

        Self {
            sender,
            dropped,
            failed,
        }
    }

    /// Enqueue a usage record; never blocks and never fails the caller
    pub fn record(&self, record: ToolUsageRecord) {
        if self
            .sender
            .try_send(TrackerMessage::Record(Box::new(record)))
            .is_err()
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                dropped_total = self.dropped.load(Ordering::Relaxed),
                "Usage tracking queue full; record dropped"
            );
        }
    }

    /// Wait until every record enqueued so far has been written
    ///
    /// Test and shutdown helper; live turns never call this.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(TrackerMessage::Flush(ack)).await.is_ok() {
            let _ = done.await;
        }
    }

    /// Records dropped because the queue was full
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Records that reached the worker but failed to persist
    #[must_use]
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

async fn worker(
    mut receiver: mpsc::Receiver<TrackerMessage>,
    storage: Arc<dyn Storage>,
    failed: Arc<AtomicU64>,
) {
    while let Some(message) = receiver.recv().await {
        match message {
            TrackerMessage::Record(record) => {
                if let Err(e) = storage.insert_usage_record(&record).await {
                    failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        tool = %record.tool_name,
                        failed_total = failed.load(Ordering::Relaxed),
                        "Usage record write failed: {e}"
                    );
                }
            }
            TrackerMessage::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}
