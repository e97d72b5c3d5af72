//! Prioritized queue of marker operations.
//!
//! Render passes run on the background looper but may only touch the map
//! through the foreground. They enqueue operations here and block in
//! [`MarkerModifier::drain`]; the foreground idle hook applies them in small
//! batches via [`MarkerModifier::pump`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use foundation::{LatLng, MarkerId};
use parking_lot::{Condvar, Mutex};
use runtime::{BatchBudget, IdleStatus, TaskQueue, Waker};
use tracing::debug;

use crate::clusters::animation::AnimationTask;
use crate::clusters::cache::MarkerWithPosition;
use crate::clusters::error::RenderError;
use crate::clusters::item::{Cluster, ClusterItem};

/// Queue lanes, drained strictly in declaration order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lane {
    OnScreenRemove,
    Animation,
    OnScreenCreate,
    OffScreenCreate,
    OffScreenRemove,
}

impl Lane {
    pub fn create(on_screen: bool) -> Self {
        if on_screen {
            Lane::OnScreenCreate
        } else {
            Lane::OffScreenCreate
        }
    }

    pub fn remove(on_screen: bool) -> Self {
        if on_screen {
            Lane::OnScreenRemove
        } else {
            Lane::OffScreenRemove
        }
    }

    fn priority(self) -> i32 {
        self as i32
    }
}

/// Markers produced by the create tasks of one render pass.
#[derive(Debug, Default)]
pub struct CreatedMarkers {
    pub markers: HashSet<MarkerWithPosition>,
    pub created: usize,
    pub reused: usize,
    pub animated: usize,
}

/// Show one cluster, either as a single cluster marker or one marker per item.
#[derive(Debug)]
pub struct CreateMarkerTask<T> {
    pub cluster: Arc<Cluster<T>>,
    /// Slide new markers in from here.
    pub animate_from: Option<LatLng>,
    pub as_cluster: bool,
    pub output: Arc<Mutex<CreatedMarkers>>,
}

#[derive(Debug)]
pub enum MarkerTask<T> {
    Create(CreateMarkerTask<T>),
    Remove(MarkerId),
    Animate(AnimationTask),
}

/// The foreground side that actually performs queued operations.
pub trait MarkerOps<T: ClusterItem> {
    /// May enqueue follow-up work (animations) on `modifier`.
    fn create_markers(&mut self, task: CreateMarkerTask<T>, modifier: &MarkerModifier<T>);
    fn remove_marker(&mut self, marker: MarkerId);
    fn start_animation(&mut self, task: AnimationTask);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PumpReport {
    pub performed: u32,
    pub status: IdleStatus,
}

struct Queues<T> {
    tasks: TaskQueue<MarkerTask<T>>,
    in_flight: usize,
    closed: bool,
}

impl<T> Queues<T> {
    fn is_busy(&self) -> bool {
        !self.tasks.is_empty() || self.in_flight > 0
    }
}

pub struct MarkerModifier<T> {
    queues: Mutex<Queues<T>>,
    free: Condvar,
    foreground: Waker,
    batch_size: u32,
    wake_interval: Duration,
}

impl<T: ClusterItem> MarkerModifier<T> {
    pub fn new(foreground: Waker, batch_size: u32, wake_interval: Duration) -> Self {
        Self {
            queues: Mutex::new(Queues {
                tasks: TaskQueue::new(),
                in_flight: 0,
                closed: false,
            }),
            free: Condvar::new(),
            foreground,
            batch_size: batch_size.max(1),
            wake_interval,
        }
    }

    pub fn add(&self, on_screen: bool, task: CreateMarkerTask<T>) {
        self.push(Lane::create(on_screen), MarkerTask::Create(task));
    }

    pub fn remove(&self, on_screen: bool, marker: MarkerId) {
        self.push(Lane::remove(on_screen), MarkerTask::Remove(marker));
    }

    pub fn animate(&self, marker: MarkerWithPosition, from: LatLng, to: LatLng) {
        self.push(
            Lane::Animation,
            MarkerTask::Animate(AnimationTask {
                marker,
                from,
                to,
                remove_on_complete: false,
            }),
        );
    }

    pub fn animate_then_remove(&self, marker: MarkerWithPosition, from: LatLng, to: LatLng) {
        self.push(
            Lane::Animation,
            MarkerTask::Animate(AnimationTask {
                marker,
                from,
                to,
                remove_on_complete: true,
            }),
        );
    }

    fn push(&self, lane: Lane, task: MarkerTask<T>) {
        {
            let mut queues = self.queues.lock();
            if queues.closed {
                debug!("marker modifier closed, dropping {lane:?} task");
                return;
            }
            queues.tasks.push(lane.priority(), task);
        }
        if !self.foreground.is_current() {
            let _ = self.foreground.wake();
        }
    }

    pub fn pending(&self) -> usize {
        self.queues.lock().tasks.len()
    }

    pub fn pending_in(&self, lane: Lane) -> usize {
        self.queues.lock().tasks.len_at(lane.priority())
    }

    pub fn is_busy(&self) -> bool {
        self.queues.lock().is_busy()
    }

    /// Applies up to one batch of queued operations through `ops`.
    ///
    /// The lock is released while each operation runs, so create tasks can
    /// enqueue follow-up animations into the same batch.
    pub fn pump(&self, ops: &mut impl MarkerOps<T>) -> PumpReport {
        let mut budget = BatchBudget::new(self.batch_size);
        loop {
            let task = {
                let mut queues = self.queues.lock();
                match queues.tasks.pop_next_with_budget(&mut budget) {
                    Some((_, _, task)) => {
                        queues.in_flight += 1;
                        task
                    }
                    None => break,
                }
            };
            match task {
                MarkerTask::Create(task) => ops.create_markers(task, self),
                MarkerTask::Remove(marker) => ops.remove_marker(marker),
                MarkerTask::Animate(task) => ops.start_animation(task),
            }
            self.queues.lock().in_flight -= 1;
        }

        let queues = self.queues.lock();
        let status = if queues.is_busy() {
            IdleStatus::Pending
        } else {
            self.free.notify_all();
            IdleStatus::Idle
        };
        PumpReport {
            performed: budget.spent_units(),
            status,
        }
    }

    /// Blocks until every queued operation has been applied.
    ///
    /// Must not be called on the foreground looper, which is the only thread
    /// that can make progress on the queue.
    pub fn drain(&self) -> Result<(), RenderError> {
        if self.foreground.is_current() {
            return Err(RenderError::DrainOnForeground);
        }
        let mut queues = self.queues.lock();
        loop {
            if queues.closed {
                return Err(RenderError::Interrupted);
            }
            if !queues.is_busy() {
                return Ok(());
            }
            if self.foreground.wake().is_err() {
                return Err(RenderError::ForegroundClosed);
            }
            self.free.wait_for(&mut queues, self.wake_interval);
        }
    }

    /// Drops queued work and fails current and future drains.
    pub fn close(&self) -> usize {
        let mut queues = self.queues.lock();
        queues.closed = true;
        let dropped = queues.tasks.clear();
        self.free.notify_all();
        dropped
    }

    pub fn is_closed(&self) -> bool {
        self.queues.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use foundation::{LatLng, MarkerId};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use runtime::{IdleStatus, Inbox, Looper, LooperState};

    use super::{CreateMarkerTask, CreatedMarkers, Lane, MarkerModifier, MarkerOps};
    use crate::clusters::animation::AnimationTask;
    use crate::clusters::cache::MarkerWithPosition;
    use crate::clusters::error::RenderError;
    use crate::clusters::item::Cluster;
    use crate::clusters::testing::Poi;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Create(u32),
        Remove(u64),
        Animate(u64, bool),
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
        animate_after_create: bool,
    }

    impl MarkerOps<Poi> for Recorder {
        fn create_markers(&mut self, task: CreateMarkerTask<Poi>, modifier: &MarkerModifier<Poi>) {
            let id = task.cluster.items()[0].id;
            self.ops.push(Op::Create(id));
            if self.animate_after_create {
                let at = task.cluster.position();
                modifier.animate(MarkerWithPosition::new(MarkerId::new(u64::from(id)), at), at, at);
            }
        }

        fn remove_marker(&mut self, marker: MarkerId) {
            self.ops.push(Op::Remove(marker.get()));
        }

        fn start_animation(&mut self, task: AnimationTask) {
            self.ops
                .push(Op::Animate(task.marker.marker.get(), task.remove_on_complete));
        }
    }

    struct Idle;

    impl LooperState for Idle {}

    fn detached_modifier(batch: u32) -> (Inbox<Idle>, MarkerModifier<Poi>) {
        let inbox = Inbox::<Idle>::new();
        let modifier = MarkerModifier::new(inbox.handle().waker(), batch, Duration::from_millis(1));
        (inbox, modifier)
    }

    fn create(id: u32) -> CreateMarkerTask<Poi> {
        CreateMarkerTask {
            cluster: Arc::new(Cluster::single(Poi::new(id, 0.0, 0.0))),
            animate_from: None,
            as_cluster: false,
            output: Arc::new(Mutex::new(CreatedMarkers::default())),
        }
    }

    fn marker(id: u64) -> MarkerWithPosition {
        MarkerWithPosition::new(MarkerId::new(id), LatLng::new(0.0, 0.0))
    }

    #[test]
    fn lanes_run_in_priority_order() {
        let (_inbox, modifier) = detached_modifier(100);
        let origin = LatLng::new(0.0, 0.0);
        modifier.remove(false, MarkerId::new(50));
        modifier.add(false, create(40));
        modifier.add(true, create(30));
        modifier.animate_then_remove(marker(20), origin, origin);
        modifier.remove(true, MarkerId::new(10));
        modifier.add(true, create(31));
        assert_eq!(modifier.pending_in(Lane::OnScreenCreate), 2);

        let mut recorder = Recorder::default();
        let report = modifier.pump(&mut recorder);
        assert_eq!(report.performed, 6);
        assert_eq!(report.status, IdleStatus::Idle);
        assert_eq!(
            recorder.ops,
            vec![
                Op::Remove(10),
                Op::Animate(20, true),
                Op::Create(30),
                Op::Create(31),
                Op::Create(40),
                Op::Remove(50),
            ]
        );
    }

    #[test]
    fn one_pump_is_bounded_by_the_batch_size() {
        let (_inbox, modifier) = detached_modifier(10);
        for i in 0..25 {
            modifier.remove(true, MarkerId::new(i));
        }
        let mut recorder = Recorder::default();
        let first = modifier.pump(&mut recorder);
        assert_eq!(first.performed, 10);
        assert_eq!(first.status, IdleStatus::Pending);
        assert_eq!(modifier.pending(), 15);
        assert_eq!(modifier.pump(&mut recorder).performed, 10);
        let last = modifier.pump(&mut recorder);
        assert_eq!(last.performed, 5);
        assert_eq!(last.status, IdleStatus::Idle);
        assert_eq!(recorder.ops.len(), 25);
    }

    #[test]
    fn follow_up_animations_join_the_current_batch() {
        let (_inbox, modifier) = detached_modifier(10);
        modifier.add(true, create(1));
        modifier.add(true, create(2));
        let mut recorder = Recorder {
            animate_after_create: true,
            ..Recorder::default()
        };
        modifier.pump(&mut recorder);
        assert_eq!(
            recorder.ops,
            vec![
                Op::Create(1),
                Op::Animate(1, false),
                Op::Create(2),
                Op::Animate(2, false),
            ]
        );
    }

    #[test]
    fn drain_returns_once_another_thread_pumps_everything() {
        let (_inbox, modifier) = detached_modifier(3);
        let modifier = Arc::new(modifier);
        for i in 0..20 {
            modifier.add(i % 2 == 0, create(i));
        }

        let pumper = {
            let modifier = Arc::clone(&modifier);
            thread::spawn(move || {
                let mut recorder = Recorder::default();
                while recorder.ops.len() < 20 {
                    modifier.pump(&mut recorder);
                    thread::sleep(Duration::from_millis(1));
                }
                recorder.ops.len()
            })
        };

        assert_eq!(modifier.drain(), Ok(()));
        assert!(!modifier.is_busy());
        assert_eq!(pumper.join().unwrap(), 20);
    }

    #[test]
    fn drain_after_close_is_interrupted() {
        let (_inbox, modifier) = detached_modifier(10);
        modifier.remove(true, MarkerId::new(1));
        assert_eq!(modifier.close(), 1);
        assert_eq!(modifier.drain(), Err(RenderError::Interrupted));
        modifier.remove(true, MarkerId::new(2));
        assert_eq!(modifier.pending(), 0);
    }

    #[test]
    fn close_wakes_a_blocked_drain() {
        let (_inbox, modifier) = detached_modifier(10);
        let modifier = Arc::new(modifier);
        modifier.remove(true, MarkerId::new(1));

        let waiter = {
            let modifier = Arc::clone(&modifier);
            thread::spawn(move || modifier.drain())
        };
        thread::sleep(Duration::from_millis(20));
        modifier.close();
        assert_eq!(waiter.join().unwrap(), Err(RenderError::Interrupted));
    }

    #[test]
    fn drain_without_a_foreground_fails() {
        let (inbox, modifier) = detached_modifier(10);
        drop(inbox);
        modifier.remove(true, MarkerId::new(1));
        assert_eq!(modifier.drain(), Err(RenderError::ForegroundClosed));
    }

    struct Holder {
        modifier: Arc<MarkerModifier<Poi>>,
    }

    impl LooperState for Holder {}

    #[test]
    fn drain_on_the_foreground_is_refused() {
        let inbox = Inbox::<Holder>::new();
        let modifier = Arc::new(MarkerModifier::new(
            inbox.handle().waker(),
            10,
            Duration::from_millis(1),
        ));
        let looper = Looper::start(
            "test-drain-foreground",
            Duration::from_millis(5),
            inbox,
            Holder {
                modifier: Arc::clone(&modifier),
            },
        )
        .expect("spawn");

        let (tx, rx) = mpsc::channel();
        looper
            .handle()
            .post(move |holder: &mut Holder| tx.send(holder.modifier.drain()).unwrap())
            .unwrap();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            Err(RenderError::DrainOnForeground)
        );
    }
}
