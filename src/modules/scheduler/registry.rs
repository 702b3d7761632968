//! Registry of named, independently cancellable periodic tasks
//!
//! The scheduler is an owned value: whoever needs to register or stop jobs
//! holds a reference (usually an `Arc<Scheduler>`). Registry mutations happen
//! under a write lock that is never held across a work function or a join.
use super::task::{ScheduledTask, TaskFn, TaskSnapshot};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::Validator;
use crate::{log_debug, log_info};
use futures::future::join_all;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Scheduler-wide settings
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Deadline for a single execution. `None` lets an execution run as long
    /// as it needs; the task's next ticks are skipped meanwhile.
    pub run_timeout: Option<Duration>,
}

pub struct Scheduler {
    tasks: RwLock<HashMap<String, ScheduledTask>>,
    root: CancellationToken,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            root: CancellationToken::new(),
            config,
        }
    }

    /// Register `work` to run every `interval` under `name`.
    ///
    /// An existing task with the same name is cancelled and the new instance
    /// only starts ticking once the old routine has exited. The first
    /// execution happens one `interval` after that, never immediately.
    pub async fn schedule_at_fixed_rate<F, Fut>(
        &self,
        name: impl Into<String>,
        work: F,
        interval: Duration,
    ) -> AppResult<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        Validator::validate_task_name(&name)?;
        Validator::validate_interval(interval)?;

        let work: TaskFn = Arc::new(move || work().boxed());

        let mut tasks = self.tasks.write().await;
        if self.root.is_cancelled() {
            return Err(AppError::ServiceUnavailable(format!(
                "Scheduler is shut down, cannot register task '{}'",
                name
            )));
        }

        let predecessor = tasks.remove(&name).map(|existing| {
            log_info!("Replacing scheduled task '{}'", name);
            existing.retire()
        });

        let task = ScheduledTask::spawn(
            name.clone(),
            interval,
            work,
            self.root.child_token(),
            self.config.run_timeout,
            predecessor,
        );
        tasks.insert(name.clone(), task);

        log_info!("Scheduled task '{}' every {:?}", name, interval);
        Ok(())
    }

    /// Stop and remove a task. Returns `false` when no task has that name.
    ///
    /// An execution already in progress finishes; this returns once the
    /// task's routine has exited.
    pub async fn stop_task(&self, name: &str) -> bool {
        let removed = self.tasks.write().await.remove(name);

        match removed {
            Some(task) => {
                task.stop().await;
                log_info!("Stopped task '{}'", name);
                true
            }
            None => {
                log_debug!("stop_task: no task named '{}'", name);
                false
            }
        }
    }

    /// Stop every task and refuse further registrations. Idempotent.
    ///
    /// The root token is cancelled before anything else so no tick that
    /// races with shutdown can start a new execution.
    pub async fn shutdown(&self) {
        self.root.cancel();

        let drained: Vec<ScheduledTask> = {
            let mut tasks = self.tasks.write().await;
            tasks.drain().map(|(_, task)| task).collect()
        };

        if drained.is_empty() {
            log_debug!("Scheduler shutdown: no tasks left to stop");
            return;
        }

        let count = drained.len();
        join_all(drained.into_iter().map(ScheduledTask::stop)).await;
        log_info!("Scheduler shut down, {} tasks stopped", count);
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.tasks.read().await.contains_key(name)
    }

    pub async fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn snapshot(&self) -> Vec<TaskSnapshot> {
        let mut snapshots: Vec<TaskSnapshot> = self
            .tasks
            .read()
            .await
            .values()
            .map(ScheduledTask::snapshot)
            .collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub async fn task_snapshot(&self, name: &str) -> Option<TaskSnapshot> {
        self.tasks.read().await.get(name).map(ScheduledTask::snapshot)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // routines cannot be joined here; cancelling makes them exit on their own
        self.root.cancel();
    }
}
