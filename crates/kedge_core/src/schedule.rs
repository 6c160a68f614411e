//! # Delivery Scheduling
//!
//! By default a continuation runs on whatever thread performs settlement (or
//! on the subscribing thread, for late subscription). Hosts that need
//! delivery on a particular context - a single-threaded event loop, a game
//! tick - attach a [`Scheduler`] to the instance and pull deliveries from it
//! themselves.
//!
//! ## Architecture
//!
//! ```text
//!   Producer thread ──┐
//!   Producer thread ──┼──> [ QueueScheduler ] ──> host loop calls drain()
//!   Subscriber (late)─┘      (bounded FIFO)        and runs continuations
//! ```
//!
//! A FIFO scheduler preserves per-instance registration-order delivery.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

/// A unit of continuation delivery, ready to run.
pub type Job = Box<dyn FnOnce() + Send>;

/// Delivery hook. Implementations decide where and when a scheduled job runs;
/// the settlement engine guarantees each job is scheduled exactly once.
pub trait Scheduler: Send + Sync {
    /// Accepts a delivery job. Must not drop it: a dropped job is a
    /// continuation that never fires.
    fn schedule(&self, job: Job);
}

/// Runs every job immediately on the scheduling thread.
///
/// Behaviorally identical to having no hook at all; exists so call sites can
/// be written against [`Scheduler`] uniformly.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn schedule(&self, job: Job) {
        job();
    }
}

/// Configuration for [`QueueScheduler`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum queued deliveries before producers block.
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

impl QueueConfig {
    /// Production preset: headroom for settlement bursts from network
    /// callbacks landing between host drains.
    #[must_use]
    pub const fn production() -> Self {
        Self { capacity: 8192 }
    }
}

/// Channel-backed FIFO scheduler for event-loop hosts.
///
/// Producers (settling threads, late subscribers) enqueue delivery jobs; the
/// host thread calls [`QueueScheduler::drain`] wherever continuations should
/// run. Clones share the same queue, so one clone can live inside the
/// instances while the host keeps another for draining.
#[derive(Clone)]
pub struct QueueScheduler {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
}

impl QueueScheduler {
    /// Creates a scheduler with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&QueueConfig::default())
    }

    /// Creates a scheduler from an explicit configuration.
    #[must_use]
    pub fn from_config(config: &QueueConfig) -> Self {
        let (sender, receiver) = bounded(config.capacity);
        Self { sender, receiver }
    }

    /// Runs every queued delivery on the calling thread, in FIFO order.
    ///
    /// Returns the number of jobs run. Non-blocking: jobs enqueued by other
    /// threads after the drain started may be left for the next call.
    pub fn drain(&self) -> usize {
        let mut count = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            count += 1;
        }
        count
    }

    /// Runs at most one queued delivery. Returns `false` if the queue was
    /// empty.
    pub fn run_next(&self) -> bool {
        match self.receiver.try_recv() {
            Ok(job) => {
                job();
                true
            }
            Err(_) => false,
        }
    }

    /// Returns the number of deliveries waiting for the host.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks whether any delivery is waiting.
    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.receiver.is_empty()
    }
}

impl Default for QueueScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for QueueScheduler {
    fn schedule(&self, job: Job) {
        match self.sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                // The host is not draining fast enough. Delivery still must
                // happen exactly once, so the producer blocks here.
                tracing::warn!(
                    capacity = self.receiver.capacity().unwrap_or(0),
                    "delivery queue full, blocking producer until the host drains"
                );
                let _ = self.sender.send(job);
            }
            Err(TrySendError::Disconnected(_)) => {
                // Host is gone; the delivery is discarded with it.
            }
        }
    }
}
