//! Cancellable one-shot timers.
//!
//! `ThreadScheduler` runs tasks on a single background thread; tasks run
//! serially in deadline order. `ManualScheduler` keeps a virtual clock that
//! only moves when told to, for tests and offline simulation.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a scheduled task. Cancelling is idempotent and never blocks;
/// a task that is already running is not interrupted.
#[derive(Debug, Clone, Default)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay` unless the returned handle is cancelled.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle;
}

// ---------------------------------------------------------------------------
// ThreadScheduler
// ---------------------------------------------------------------------------

struct Scheduled {
    deadline: Instant,
    seq: u64,
    handle: TimerHandle,
    task: TimerTask,
}

// BinaryHeap is a max-heap; order so the earliest deadline pops first.
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Scheduled {}

/// Timer backed by one named worker thread. Dropping the scheduler stops the
/// thread; tasks still waiting are discarded.
pub struct ThreadScheduler {
    tx: mpsc::Sender<Scheduled>,
    seq: AtomicU64,
}

impl ThreadScheduler {
    pub fn new() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Scheduled>();
        thread::Builder::new()
            .name("tap-timer".into())
            .spawn(move || timer_worker(rx))?;
        Ok(Self {
            tx,
            seq: AtomicU64::new(0),
        })
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let handle = TimerHandle::default();
        let scheduled = Scheduled {
            deadline: Instant::now() + delay,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            handle: handle.clone(),
            task,
        };
        if self.tx.send(scheduled).is_err() {
            debug!("timer thread gone, task dropped");
            handle.cancel();
        }
        handle
    }
}

fn timer_worker(rx: mpsc::Receiver<Scheduled>) {
    let mut heap: BinaryHeap<Scheduled> = BinaryHeap::new();
    loop {
        // Block for new work, or until the earliest deadline.
        let next = match heap.peek() {
            None => match rx.recv() {
                Ok(s) => Some(s),
                Err(_) => return,
            },
            Some(top) => {
                let wait = top.deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(wait) {
                    Ok(s) => Some(s),
                    Err(mpsc::RecvTimeoutError::Timeout) => None,
                    Err(mpsc::RecvTimeoutError::Disconnected) => return,
                }
            }
        };
        if let Some(s) = next {
            heap.push(s);
        }

        let now = Instant::now();
        while heap.peek().is_some_and(|top| top.deadline <= now) {
            let Some(due) = heap.pop() else { break };
            if due.handle.is_cancelled() {
                trace!(seq = due.seq, "skipping cancelled timer");
                continue;
            }
            (due.task)();
        }
        heap.retain(|s| !s.handle.is_cancelled());
    }
}

// ---------------------------------------------------------------------------
// ManualScheduler
// ---------------------------------------------------------------------------

struct ManualEntry {
    due: Duration,
    seq: u64,
    handle: TimerHandle,
    task: TimerTask,
}

#[derive(Default)]
struct ManualQueue {
    now: Duration,
    next_seq: u64,
    entries: Vec<ManualEntry>,
}

/// Scheduler on a virtual clock. Nothing fires until [`advance`] or
/// [`fire_all`] is called.
///
/// [`advance`]: ManualScheduler::advance
/// [`fire_all`]: ManualScheduler::fire_all
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<ManualQueue>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of scheduled tasks that are not cancelled.
    pub fn pending(&self) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|e| !e.handle.is_cancelled())
            .count()
    }

    /// Move the clock forward and run every task that becomes due, in
    /// deadline order. Tasks scheduled by a running task fire too if they
    /// fall within the window. Returns how many tasks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.lock().now + by;
        let mut fired = 0;
        while let Some(entry) = self.pop_due(target) {
            (entry.task)();
            fired += 1;
        }
        self.lock().now = target;
        fired
    }

    /// Run every pending task, however far in the future.
    pub fn fire_all(&self) -> usize {
        let mut fired = 0;
        while let Some(entry) = self.pop_due(Duration::MAX) {
            (entry.task)();
            fired += 1;
        }
        fired
    }

    // The queue lock is released before the task runs, since tasks usually
    // schedule again.
    fn pop_due(&self, limit: Duration) -> Option<ManualEntry> {
        let mut queue = self.lock();
        queue.entries.retain(|e| !e.handle.is_cancelled());
        let idx = queue
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= limit)
            .min_by_key(|(_, e)| (e.due, e.seq))
            .map(|(i, _)| i)?;
        let entry = queue.entries.swap_remove(idx);
        if entry.due > queue.now {
            queue.now = entry.due;
        }
        Some(entry)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let handle = TimerHandle::default();
        let mut queue = self.lock();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        let due = queue.now.saturating_add(delay);
        queue.entries.push(ManualEntry {
            due,
            seq,
            handle: handle.clone(),
            task,
        });
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    fn counter() -> (Arc<AtomicU64>, impl Fn() -> TimerTask) {
        let count = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&count);
        let make = move || -> TimerTask {
            let c = Arc::clone(&c);
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
        };
        (count, make)
    }

    #[test]
    fn manual_fires_only_when_due() {
        let sched = ManualScheduler::new();
        let (count, task) = counter();
        sched.schedule(Duration::from_millis(300), task());
        assert_eq!(sched.advance(Duration::from_millis(299)), 0);
        assert_eq!(sched.pending(), 1);
        assert_eq!(sched.advance(Duration::from_millis(1)), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(sched.pending(), 0);
        assert_eq!(sched.now(), Duration::from_millis(300));
    }

    #[test]
    fn manual_cancel_is_idempotent() {
        let sched = ManualScheduler::new();
        let (count, task) = counter();
        let handle = sched.schedule(Duration::from_millis(10), task());
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(sched.fire_all(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn manual_runs_in_deadline_order() {
        let sched = ManualScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for (delay, label) in [(30, "c"), (10, "a"), (20, "b")] {
            let order = Arc::clone(&order);
            sched.schedule(
                Duration::from_millis(delay),
                Box::new(move || order.lock().unwrap().push(label)),
            );
        }
        assert_eq!(sched.fire_all(), 3);
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn manual_task_may_reschedule() {
        let sched = Arc::new(ManualScheduler::new());
        let (count, task) = counter();
        let inner = Arc::clone(&sched);
        let follow_up = task();
        sched.schedule(
            Duration::from_millis(10),
            Box::new(move || {
                inner.schedule(Duration::from_millis(10), follow_up);
            }),
        );
        assert_eq!(sched.advance(Duration::from_millis(15)), 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(sched.advance(Duration::from_millis(5)), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn thread_scheduler_fires() {
        let sched = ThreadScheduler::new().unwrap();
        let (tx, rx) = channel();
        sched.schedule(
            Duration::from_millis(5),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
    }

    #[test]
    fn thread_scheduler_skips_cancelled() {
        let sched = ThreadScheduler::new().unwrap();
        let (tx, rx) = channel();
        let tx2 = tx.clone();
        let handle = sched.schedule(
            Duration::from_millis(50),
            Box::new(move || {
                let _ = tx.send("cancelled");
            }),
        );
        handle.cancel();
        sched.schedule(
            Duration::from_millis(80),
            Box::new(move || {
                let _ = tx2.send("kept");
            }),
        );
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "kept");
        assert!(rx.try_recv().is_err());
    }
}
