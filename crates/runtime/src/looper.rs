//! Cooperative single-thread dispatch context.
//!
//! A [`Looper`] owns a value of `S` on a dedicated thread and runs closures
//! posted to it in FIFO order. Once every pending message has been handled it
//! calls [`LooperState::on_idle`]. While the idle hook reports pending work the
//! hook is re-run after `fallback` even if no message arrives, so deferred work
//! keeps making progress with bounded latency.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IdleStatus {
    /// Nothing left to do until the next message.
    Idle,
    /// More deferred work remains; run the hook again after the fallback delay.
    Pending,
}

pub trait LooperState: Send + 'static {
    fn on_idle(&mut self, now: Instant) -> IdleStatus {
        let _ = now;
        IdleStatus::Idle
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LooperClosed;

impl std::fmt::Display for LooperClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "looper is no longer running")
    }
}

impl std::error::Error for LooperClosed {}

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

enum Message<S> {
    Run(Job<S>),
    Wake,
    Quit,
}

/// Cloneable sender side of a looper.
pub struct LooperHandle<S> {
    tx: Sender<Message<S>>,
    thread: Arc<OnceLock<ThreadId>>,
}

impl<S> Clone for LooperHandle<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            thread: Arc::clone(&self.thread),
        }
    }
}

impl<S> std::fmt::Debug for LooperHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LooperHandle")
            .field("thread", &self.thread.get())
            .finish()
    }
}

impl<S: 'static> LooperHandle<S> {
    /// Queues `job` to run on the looper thread with exclusive access to the state.
    pub fn post(&self, job: impl FnOnce(&mut S) + Send + 'static) -> Result<(), LooperClosed> {
        self.tx
            .send(Message::Run(Box::new(job)))
            .map_err(|_| LooperClosed)
    }

    /// Forces an idle pass without running any job.
    pub fn wake(&self) -> Result<(), LooperClosed> {
        self.tx.send(Message::Wake).map_err(|_| LooperClosed)
    }

    /// True when called from the looper's own thread.
    pub fn is_current(&self) -> bool {
        self.thread.get() == Some(&thread::current().id())
    }

    /// Type-erased wake handle, for code that must not know `S`.
    pub fn waker(&self) -> Waker
    where
        S: Send,
    {
        let tx = self.tx.clone();
        Waker {
            wake: Arc::new(move || tx.send(Message::Wake).map_err(|_| LooperClosed)),
            thread: Arc::clone(&self.thread),
        }
    }
}

#[derive(Clone)]
pub struct Waker {
    wake: Arc<dyn Fn() -> Result<(), LooperClosed> + Send + Sync>,
    thread: Arc<OnceLock<ThreadId>>,
}

impl Waker {
    pub fn wake(&self) -> Result<(), LooperClosed> {
        (self.wake)()
    }

    pub fn is_current(&self) -> bool {
        self.thread.get() == Some(&thread::current().id())
    }
}

impl std::fmt::Debug for Waker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waker")
            .field("thread", &self.thread.get())
            .finish()
    }
}

/// Receiving side of a looper that has not started yet.
///
/// Creating the inbox first lets callers hand out handles and wakers before
/// the state (which may need them) is built.
pub struct Inbox<S> {
    rx: Receiver<Message<S>>,
    handle: LooperHandle<S>,
}

impl<S> Inbox<S> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            rx,
            handle: LooperHandle {
                tx,
                thread: Arc::new(OnceLock::new()),
            },
        }
    }

    pub fn handle(&self) -> &LooperHandle<S> {
        &self.handle
    }
}

impl<S> Default for Inbox<S> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Looper<S> {
    name: String,
    handle: LooperHandle<S>,
    join: Option<JoinHandle<S>>,
}

impl<S: LooperState> Looper<S> {
    pub fn spawn(name: impl Into<String>, fallback: Duration, state: S) -> std::io::Result<Self> {
        Self::start(name, fallback, Inbox::new(), state)
    }

    /// Starts the looper thread on an inbox created earlier.
    pub fn start(
        name: impl Into<String>,
        fallback: Duration,
        inbox: Inbox<S>,
        state: S,
    ) -> std::io::Result<Self> {
        let name = name.into();
        let Inbox { rx, handle } = inbox;
        let thread = Arc::clone(&handle.thread);
        let thread_name = name.clone();
        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run(&thread_name, rx, state, fallback, thread))?;
        Ok(Self {
            name,
            handle,
            join: Some(join),
        })
    }
}

impl<S> Looper<S> {
    pub fn handle(&self) -> &LooperHandle<S> {
        &self.handle
    }

    /// Stops the thread after the messages already queued and returns the state.
    ///
    /// Returns `None` if the thread panicked.
    pub fn shutdown(mut self) -> Option<S> {
        self.stop()
    }

    fn stop(&mut self) -> Option<S> {
        let join = self.join.take()?;
        let _ = self.handle.tx.send(Message::Quit);
        if join.thread().id() == thread::current().id() {
            warn!("looper {} cannot join itself", self.name);
            return None;
        }
        match join.join() {
            Ok(state) => Some(state),
            Err(_) => {
                warn!("looper {} panicked", self.name);
                None
            }
        }
    }
}

impl<S> Drop for Looper<S> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn run<S: LooperState>(
    name: &str,
    rx: Receiver<Message<S>>,
    mut state: S,
    fallback: Duration,
    thread: Arc<OnceLock<ThreadId>>,
) -> S {
    let _ = thread.set(thread::current().id());
    debug!("looper {name} started");

    let mut idle = IdleStatus::Idle;
    'outer: loop {
        let first = match idle {
            IdleStatus::Pending => match rx.recv_timeout(fallback) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            IdleStatus::Idle => match rx.recv() {
                Ok(message) => Some(message),
                Err(_) => break,
            },
        };

        if let Some(message) = first {
            if !handle(&mut state, message) {
                break;
            }
            // Pending messages take precedence over idle work.
            loop {
                match rx.try_recv() {
                    Ok(message) => {
                        if !handle(&mut state, message) {
                            break 'outer;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => break 'outer,
                }
            }
        }

        idle = state.on_idle(Instant::now());
    }

    debug!("looper {name} stopped");
    state
}

fn handle<S>(state: &mut S, message: Message<S>) -> bool {
    match message {
        Message::Run(job) => {
            job(state);
            true
        }
        Message::Wake => true,
        Message::Quit => false,
    }
}
