// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded worker pool running observer hooks.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};

/// A hook invocation bound to its arguments.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Default)]
struct DispatchStats {
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Runs observer hooks off the caller's task.
///
/// Jobs go through a bounded queue drained by a fixed number of workers.
/// Each worker runs one hook at a time on Tokio's blocking pool, so at most
/// `workers` hooks run concurrently and a slow hook never stalls the async
/// runtime. When the queue is full, [`submit`](Self::submit) waits for room:
/// notifications are delayed under bursts, never dropped.
///
/// The wait is felt by whoever submits. The event stream reader and
/// inventory refresh submit inline, so while hooks keep the queue full no
/// further event frame is read and a refresh does not return. Raise
/// [`HubConfig::with_dispatch_capacity`](crate::HubConfig::with_dispatch_capacity)
/// or keep hooks short if events must not back up.
///
/// Hooks for different events may run concurrently and complete in any
/// order. A panicking hook is logged and counted as failed.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    sender: mpsc::Sender<Job>,
    stats: Arc<DispatchStats>,
    capacity: usize,
}

impl Dispatcher {
    /// Creates the queue and spawns `workers` worker tasks.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn new(capacity: usize, workers: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let stats = Arc::new(DispatchStats::default());

        for index in 0..workers.max(1) {
            tokio::spawn(run_worker(
                index,
                Arc::clone(&receiver),
                Arc::clone(&stats),
            ));
        }

        Self {
            sender,
            stats,
            capacity,
        }
    }

    /// Queues a job, waiting for room if the queue is full.
    ///
    /// Cancelling the returned future before it completes drops the job.
    ///
    /// Returns `false` if the workers are gone and the job was discarded.
    pub(crate) async fn submit(&self, job: Job) -> bool {
        if self.sender.send(job).await.is_err() {
            tracing::warn!("Observer dispatcher closed, notification discarded");
            return false;
        }
        true
    }

    /// Number of hook invocations that returned normally.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.stats.delivered.load(Ordering::Relaxed)
    }

    /// Number of hook invocations that panicked.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }

    /// Number of jobs waiting in the queue.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.capacity - self.sender.capacity()
    }
}

async fn run_worker(
    index: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    stats: Arc<DispatchStats>,
) {
    loop {
        // Lock is released before the job runs so other workers can pull
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        match tokio::task::spawn_blocking(job).await {
            Ok(()) => {
                stats.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!(worker = index, error = %e, "Observer hook failed");
                stats.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    tracing::debug!(worker = index, "Observer worker stopped");
}
