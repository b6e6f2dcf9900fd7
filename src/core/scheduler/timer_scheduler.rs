// Deferred-action scheduler for moderation events.
//
// Deletion timers, ban-notice cleanup and similar deferred work all go
// through here. A single driver task owns a priority queue keyed by
// (deadline, submission order), so actions with equal fire times run in the
// order they were scheduled. Zero-delay actions skip the queue entirely and
// run inline before `schedule` returns.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// A boxed future executed when its deadline passes.
pub type TimerAction = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid delay: {0}")]
    InvalidDelay(String),

    #[error("Scheduler has shut down")]
    Closed,
}

/// Handle returned by [`TimerScheduler::schedule`].
///
/// `cancel` is idempotent; cancelling after the action fired is a no-op.
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, AtomicOrdering::SeqCst);
    }

    #[allow(dead_code)]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::SeqCst)
    }

    /// Handle for an action that already ran (zero delay). Cancelling it
    /// flips a flag nothing reads.
    fn detached() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

struct QueuedTimer {
    fire_at: Instant,
    seq: u64,
    cancelled: Arc<AtomicBool>,
    action: TimerAction,
}

// Heap ordering is (fire_at, seq); seq breaks ties FIFO.
impl PartialEq for QueuedTimer {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for QueuedTimer {}

impl PartialOrd for QueuedTimer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTimer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_at
            .cmp(&other.fire_at)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Schedules actions to run after a delay.
///
/// Cloning is cheap; all clones feed the same driver task.
#[derive(Clone)]
pub struct TimerScheduler {
    tx: mpsc::UnboundedSender<QueuedTimer>,
    seq: Arc<AtomicU64>,
}

impl TimerScheduler {
    /// Create a scheduler and spawn its driver task. Must be called from
    /// within a tokio runtime.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(drive(rx));
        Self {
            tx,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedule `action` to run after `delay`.
    ///
    /// A zero delay runs the action inline, before this returns. Pending
    /// actions with equal deadlines fire in submission order.
    pub async fn schedule(
        &self,
        delay: Duration,
        action: impl Future<Output = ()> + Send + 'static,
    ) -> Result<CancelHandle, SchedulerError> {
        if delay.is_zero() {
            action.await;
            return Ok(CancelHandle::detached());
        }

        let fire_at = Instant::now().checked_add(delay).ok_or_else(|| {
            SchedulerError::InvalidDelay(format!("delay of {delay:?} is not representable"))
        })?;

        let cancelled = Arc::new(AtomicBool::new(false));
        let timer = QueuedTimer {
            fire_at,
            seq: self.seq.fetch_add(1, AtomicOrdering::Relaxed),
            cancelled: Arc::clone(&cancelled),
            action: Box::pin(action),
        };

        self.tx.send(timer).map_err(|_| SchedulerError::Closed)?;

        Ok(CancelHandle { cancelled })
    }
}

async fn drive(mut rx: mpsc::UnboundedReceiver<QueuedTimer>) {
    let mut queue: BinaryHeap<Reverse<QueuedTimer>> = BinaryHeap::new();
    let mut open = true;

    loop {
        // Run everything that is due, in (deadline, seq) order.
        while queue
            .peek()
            .map(|Reverse(t)| t.fire_at <= Instant::now())
            .unwrap_or(false)
        {
            if let Some(Reverse(timer)) = queue.pop() {
                if !timer.cancelled.load(AtomicOrdering::SeqCst) {
                    timer.action.await;
                }
            }
        }

        if !open && queue.is_empty() {
            break;
        }

        let next_deadline = queue.peek().map(|Reverse(t)| t.fire_at);

        tokio::select! {
            received = rx.recv(), if open => match received {
                Some(timer) => queue.push(Reverse(timer)),
                // All senders dropped: drain what is left, then exit.
                None => open = false,
            },
            _ = sleep_until_next(next_deadline), if next_deadline.is_some() => {}
        }
    }
}

async fn sleep_until_next(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    }
}
