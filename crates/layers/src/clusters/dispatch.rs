//! Coalescing of clustering results into single-flight render passes.
//!
//! Producers only ever replace the pending result. The foreground starts a
//! pass when none is running; the completion of a pass starts the next one if
//! something arrived in the meantime.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::clusters::item::ClusterSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// The result equalled the one already shown.
    Unchanged,
    Rendered {
        created: usize,
        reused: usize,
        removed: usize,
        animated: usize,
    },
    /// The pass stopped part way; the map may show a mix of both results.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub generation: u64,
    pub zoom: f64,
    pub clusters: usize,
    pub outcome: PassOutcome,
}

/// A clustering result waiting for its pass.
#[derive(Debug)]
pub(crate) struct PendingRender<T> {
    pub generation: u64,
    pub clusters: ClusterSet<T>,
}

#[derive(Debug)]
struct Slot<T> {
    next: Option<PendingRender<T>>,
    running: bool,
    animating: bool,
    generation: u64,
}

pub(crate) struct Dispatcher<T> {
    slot: Mutex<Slot<T>>,
    settled: Condvar,
    subscribers: Mutex<Vec<Sender<PassReport>>>,
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Dispatcher<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                next: None,
                running: false,
                animating: false,
                generation: 0,
            }),
            settled: Condvar::new(),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Makes `clusters` the next result to render, superseding any queued one.
    pub fn queue(&self, clusters: ClusterSet<T>) -> u64 {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        let generation = slot.generation;
        if let Some(dropped) = slot.next.replace(PendingRender {
            generation,
            clusters,
        }) {
            debug!(
                "cluster result {} superseded by {generation}",
                dropped.generation
            );
        }
        generation
    }

    /// Takes the queued result unless a pass is already running.
    pub fn begin(&self) -> Option<PendingRender<T>> {
        let mut slot = self.slot.lock();
        if slot.running {
            return None;
        }
        let next = slot.next.take()?;
        slot.running = true;
        Some(next)
    }

    /// Marks the running pass done; returns whether another one is queued.
    pub fn finish(&self) -> bool {
        let mut slot = self.slot.lock();
        slot.running = false;
        self.settled.notify_all();
        slot.next.is_some()
    }

    pub fn set_animating(&self, animating: bool) {
        let mut slot = self.slot.lock();
        if slot.animating != animating {
            slot.animating = animating;
            self.settled.notify_all();
        }
    }

    pub fn is_settled(&self) -> bool {
        let slot = self.slot.lock();
        !slot.running && slot.next.is_none() && !slot.animating
    }

    /// Waits until nothing is queued, running, or animating.
    pub fn wait_until_settled(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        while slot.running || slot.next.is_some() || slot.animating {
            if self.settled.wait_until(&mut slot, deadline).timed_out() {
                return !slot.running && slot.next.is_none() && !slot.animating;
            }
        }
        true
    }

    pub fn subscribe(&self) -> Receiver<PassReport> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Sends `report` to every live subscriber, forgetting the dropped ones.
    pub fn publish(&self, report: &PassReport) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(report.clone()).is_ok());
    }
}
