//! Deferred-callback scheduling for simulated processing.
//!
//! Every delayed completion goes through a [`TaskScheduler`] and comes
//! back as a [`TaskHandle`]. A task that has not started when `cancel()`
//! returns never runs. A body already under way on another thread runs to
//! completion, so callers that need a hard stop also check their own state.
//!
//! - [`TokioScheduler`]: real timers on a tokio runtime.
//! - [`ManualScheduler`]: virtual clock advanced by tests.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait TaskScheduler: Send + Sync {
    /// Run `task` once after `delay`, unless cancelled first.
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle;
}

/// Cancellation handle for one scheduled task.
#[derive(Clone)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
    abort: Option<tokio::task::AbortHandle>,
}

impl TaskHandle {
    fn new(cancelled: Arc<AtomicBool>, abort: Option<tokio::task::AbortHandle>) -> Self {
        Self { cancelled, abort }
    }

    /// Prevent the task from starting. Does not interrupt a running body.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════
// TokioScheduler
// ═══════════════════════════════════════════════════════════

pub struct TokioScheduler {
    runtime: tokio::runtime::Handle,
}

impl TokioScheduler {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self { runtime }
    }

    /// Scheduler bound to the runtime of the calling context, if any.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl TaskScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if !flag.load(Ordering::SeqCst) {
                task();
            }
        });
        TaskHandle::new(cancelled, Some(join.abort_handle()))
    }
}

// ═══════════════════════════════════════════════════════════
// ManualScheduler
// ═══════════════════════════════════════════════════════════

struct PendingTask {
    due: Duration,
    seq: u64,
    cancelled: Arc<AtomicBool>,
    task: Task,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    pending: Vec<PendingTask>,
}

/// Deterministic scheduler on a virtual clock.
///
/// Tasks run on the caller's thread inside `advance` / `run_all`, in due
/// order (ties broken by scheduling order). Tasks may schedule more tasks.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Virtual time elapsed so far.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Tasks still waiting (cancelled ones excluded).
    pub fn pending(&self) -> usize {
        self.lock()
            .pending
            .iter()
            .filter(|p| !p.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Move the clock forward by `by`, running every task that falls due.
    /// Returns how many tasks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let ran = self.run_until(target);
        let mut state = self.lock();
        if state.now < target {
            state.now = target;
        }
        ran
    }

    /// Run every pending task regardless of delay, including tasks they schedule.
    pub fn run_all(&self) -> usize {
        self.run_until(Duration::MAX)
    }

    fn run_until(&self, target: Duration) -> usize {
        let mut ran = 0;
        while let Some(next) = self.pop_due(target) {
            if !next.cancelled.load(Ordering::SeqCst) {
                (next.task)();
                ran += 1;
            }
        }
        ran
    }

    fn pop_due(&self, target: Duration) -> Option<PendingTask> {
        let mut state = self.lock();
        state.pending.retain(|p| !p.cancelled.load(Ordering::SeqCst));
        let index = state
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= target)
            .min_by_key(|(_, p)| (p.due, p.seq))
            .map(|(i, _)| i)?;
        let next = state.pending.swap_remove(index);
        if next.due > state.now {
            state.now = next.due;
        }
        Some(next)
    }
}

impl TaskScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut state = self.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let due = state.now.saturating_add(delay);
        state.pending.push(PendingTask {
            due,
            seq,
            cancelled: cancelled.clone(),
            task,
        });
        TaskHandle::new(cancelled, None)
    }
}
