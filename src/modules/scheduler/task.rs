//! A single named periodic task and the routine that drives it
//!
//! Each task owns a child cancellation token of the scheduler's root token and
//! the join handle of its routine, so stopping a task means "cancel, then wait
//! until the routine has actually returned".
use crate::{log_debug, log_error, log_warn};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Type-erased work function: called once per tick, awaited to completion
pub type TaskFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Lifecycle of one task instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Running,
    Stopped,
    Replaced,
}

impl TaskState {
    fn as_u8(self) -> u8 {
        match self {
            TaskState::Created => 0,
            TaskState::Running => 1,
            TaskState::Stopped => 2,
            TaskState::Replaced => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskState::Created,
            1 => TaskState::Running,
            2 => TaskState::Stopped,
            _ => TaskState::Replaced,
        }
    }

    /// Stopped and replaced instances never run again
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Stopped | TaskState::Replaced)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Created => write!(f, "created"),
            TaskState::Running => write!(f, "running"),
            TaskState::Stopped => write!(f, "stopped"),
            TaskState::Replaced => write!(f, "replaced"),
        }
    }
}

/// Counters shared between a task's routine and its registry entry
#[derive(Debug, Default)]
pub(crate) struct TaskStatus {
    state: AtomicU8,
    runs: AtomicU64,
    failures: AtomicU64,
}

impl TaskStatus {
    pub(crate) fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Move to `Running` unless a stop already made the instance terminal
    fn mark_running(&self) {
        let _ = self.state.compare_exchange(
            TaskState::Created.as_u8(),
            TaskState::Running.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// Point-in-time view of a registered task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub name: String,
    pub interval: Duration,
    pub state: TaskState,
    /// Executions started so far
    pub runs: u64,
    /// Executions that panicked or exceeded the run timeout
    pub failures: u64,
}

/// Registry entry for one running task instance
pub(crate) struct ScheduledTask {
    name: String,
    interval: Duration,
    token: CancellationToken,
    status: Arc<TaskStatus>,
    handle: JoinHandle<()>,
}

/// What the new instance must wait for before its first tick
pub(crate) struct Predecessor {
    handle: JoinHandle<()>,
    status: Arc<TaskStatus>,
}

impl ScheduledTask {
    /// Spawn the routine for a new task instance.
    ///
    /// The first tick fires one `interval` after the routine starts ticking;
    /// if a predecessor is given, the routine first waits for it to exit.
    pub(crate) fn spawn(
        name: String,
        interval: Duration,
        work: TaskFn,
        token: CancellationToken,
        run_timeout: Option<Duration>,
        predecessor: Option<Predecessor>,
    ) -> Self {
        let status = Arc::new(TaskStatus::default());
        let handle = tokio::spawn(run_loop(
            name.clone(),
            interval,
            work,
            token.clone(),
            Arc::clone(&status),
            run_timeout,
            predecessor,
        ));

        Self {
            name,
            interval,
            token,
            status,
            handle,
        }
    }

    /// Signal the routine to exit and hand over what a replacement must await
    pub(crate) fn retire(self) -> Predecessor {
        self.token.cancel();
        Predecessor {
            handle: self.handle,
            status: self.status,
        }
    }

    /// Cancel the routine and wait until it has returned.
    ///
    /// From inside the task's own work function the routine cannot be joined;
    /// it is only cancelled and exits once that execution returns.
    pub(crate) async fn stop(self) {
        let name = self.name.clone();
        let Predecessor { handle, status } = self.retire();
        if is_current_task(&handle) {
            status.set_state(TaskState::Stopped);
            log_debug!("Task '{}' stopped from its own execution", name);
            return;
        }
        if let Err(e) = handle.await {
            log_warn!("Task '{}' routine ended abnormally: {}", name, e);
        }
        status.set_state(TaskState::Stopped);
        log_debug!("Task '{}' stopped", name);
    }

    pub(crate) fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            name: self.name.clone(),
            interval: self.interval,
            state: self.status.state(),
            runs: self.status.runs.load(Ordering::Relaxed),
            failures: self.status.failures.load(Ordering::Relaxed),
        }
    }
}

async fn run_loop(
    name: String,
    interval: Duration,
    work: TaskFn,
    token: CancellationToken,
    status: Arc<TaskStatus>,
    run_timeout: Option<Duration>,
    predecessor: Option<Predecessor>,
) {
    // never both running: the replaced instance must be gone first
    if let Some(previous) = predecessor {
        if let Err(e) = previous.handle.await {
            log_warn!("Replaced instance of task '{}' ended abnormally: {}", name, e);
        }
        previous.status.set_state(TaskState::Replaced);
    }

    if token.is_cancelled() {
        return;
    }
    status.mark_running();

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                if token.is_cancelled() {
                    break;
                }
                execute_once(&name, &work, &status, run_timeout).await;
            }
        }
    }

    log_debug!("Task '{}' routine exited", name);
}

/// Run one execution inside a failure boundary
async fn execute_once(
    name: &str,
    work: &TaskFn,
    status: &TaskStatus,
    run_timeout: Option<Duration>,
) {
    status.runs.fetch_add(1, Ordering::Relaxed);

    // the call itself happens inside the guarded future so a panic while
    // building the future is caught too
    let execution = AssertUnwindSafe(async { work().await }).catch_unwind();

    let outcome = match run_timeout {
        Some(limit) => match tokio::time::timeout(limit, execution).await {
            Ok(outcome) => outcome,
            Err(_) => {
                status.failures.fetch_add(1, Ordering::Relaxed);
                log_warn!("Task '{}' exceeded run timeout of {:?}", name, limit);
                return;
            }
        },
        None => execution.await,
    };

    if let Err(panic) = outcome {
        status.failures.fetch_add(1, Ordering::Relaxed);
        log_error!("Task '{}' panicked: {}", name, panic_message(&*panic));
    }
}

fn is_current_task(handle: &JoinHandle<()>) -> bool {
    tokio::task::try_id() == Some(handle.id())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
