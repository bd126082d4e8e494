//! In-memory supervisor for agent subprocesses.
//!
//! The [`TaskRegistry`] is built once at startup and shared by every worker.
//! It tracks one [`Task`] per remote item number, spawns the process for a
//! claimed item, and reports the outcome through a [`TaskHandle`] when the
//! process exits. Finished tasks stay in the registry for display until the
//! daemon exits.

mod board;
mod table;

pub use board::StatusBoard;
pub use table::{format_duration, render_table};

use std::fmt;
use std::process::Child;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::subprocess::Launch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a task ended in [`TaskStatus::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The process could not be started.
    Spawn(String),
    /// The process exited with a non-zero code.
    Exit(i32),
    /// The process was terminated by a signal.
    Signal,
    /// Waiting on the process failed.
    Wait(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Spawn(msg) => write!(f, "failed to spawn: {msg}"),
            Failure::Exit(code) => write!(f, "exited with code {code}"),
            Failure::Signal => f.write_str("terminated by signal"),
            Failure::Wait(msg) => write!(f, "lost track of process: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
    /// Set iff `status` is not `Running`.
    pub finished_at: Option<DateTime<Utc>>,
    pub failure: Option<Failure>,
}

impl Task {
    fn running(id: u64, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            status: TaskStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            failure: None,
        }
    }
}

/// Final result of one task, delivered exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub id: u64,
    pub status: TaskStatus,
    pub failure: Option<Failure>,
}

impl Outcome {
    fn completed(id: u64) -> Self {
        Self {
            id,
            status: TaskStatus::Completed,
            failure: None,
        }
    }

    fn failed(id: u64, failure: Failure) -> Self {
        Self {
            id,
            status: TaskStatus::Failed,
            failure: Some(failure),
        }
    }
}

/// Receiving end for a task's [`Outcome`].
#[derive(Debug)]
pub struct TaskHandle {
    id: u64,
    rx: Receiver<Outcome>,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Block until the task resolves.
    pub fn wait(self) -> Outcome {
        self.rx.recv().unwrap_or_else(|_| {
            Outcome::failed(
                self.id,
                Failure::Wait("supervisor exited without reporting".to_string()),
            )
        })
    }

    /// Wait up to `timeout`; `None` if the task is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Outcome::failed(
                self.id,
                Failure::Wait("supervisor exited without reporting".to_string()),
            )),
        }
    }
}

type Listener = Box<dyn Fn() + Send>;

/// Process-lifetime registry of tasks keyed by item number.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<Vec<Task>>,
    listeners: Mutex<Vec<Listener>>,
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &*self.lock_tasks())
            .finish_non_exhaustive()
    }
}

impl TaskRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// True iff a task with this id exists and is still running.
    pub fn is_running(&self, id: u64) -> bool {
        self.lock_tasks()
            .iter()
            .any(|t| t.id == id && t.status == TaskStatus::Running)
    }

    pub fn get(&self, id: u64) -> Option<Task> {
        self.lock_tasks().iter().find(|t| t.id == id).cloned()
    }

    /// Copy of every tracked task, in first-registration order.
    pub fn snapshot(&self) -> Vec<Task> {
        self.lock_tasks().clone()
    }

    pub fn running_count(&self) -> usize {
        self.lock_tasks()
            .iter()
            .filter(|t| t.status == TaskStatus::Running)
            .count()
    }

    /// Register `listener` to be called after every state change.
    pub fn on_change(&self, listener: impl Fn() + Send + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Register a running task for `id` and spawn `launch` for it.
    ///
    /// Returns `None` without side effects if `id` is already running; the
    /// check and the registration happen under one lock. Otherwise returns
    /// immediately with a handle that yields the outcome once the process
    /// exits. A spawn failure is not an error here: the task resolves to
    /// `Failed` and the handle reports it.
    pub fn run(self: &Arc<Self>, launch: &Launch, id: u64, title: &str) -> Option<TaskHandle> {
        {
            let mut tasks = self.lock_tasks();
            if tasks
                .iter()
                .any(|t| t.id == id && t.status == TaskStatus::Running)
            {
                return None;
            }
            let task = Task::running(id, title);
            match tasks.iter_mut().find(|t| t.id == id) {
                Some(existing) => *existing = task,
                None => tasks.push(task),
            }
        }
        self.changed();

        let (tx, rx) = mpsc::channel();
        match launch.spawn() {
            Ok(child) => {
                info!(id, pid = child.id(), command = %launch, "process started");
                self.supervise(child, id, tx);
            }
            Err(e) => {
                error!(id, error = %e, "failed to spawn process for #{id}");
                self.resolve(Outcome::failed(id, Failure::Spawn(e.to_string())), &tx);
            }
        }

        Some(TaskHandle { id, rx })
    }

    fn supervise(self: &Arc<Self>, mut child: Child, id: u64, tx: Sender<Outcome>) {
        let registry = Arc::clone(self);
        let reply = tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("task-{id}"))
            .spawn(move || {
                let outcome = match child.wait() {
                    Ok(status) if status.success() => Outcome::completed(id),
                    Ok(status) => match status.code() {
                        Some(code) => {
                            error!(id, code, "process for #{id} exited with code {code}");
                            Outcome::failed(id, Failure::Exit(code))
                        }
                        None => {
                            error!(id, "process for #{id} was terminated by a signal");
                            Outcome::failed(id, Failure::Signal)
                        }
                    },
                    Err(e) => Outcome::failed(id, Failure::Wait(e.to_string())),
                };
                registry.resolve(outcome, &reply);
            });

        if let Err(e) = spawned {
            error!(id, error = %e, "could not start supervisor thread");
            self.resolve(
                Outcome::failed(id, Failure::Wait(format!("supervisor thread: {e}"))),
                &tx,
            );
        }
    }

    /// Record the outcome, then deliver it. The registry is updated before
    /// the handle sees the outcome, so `is_running` is already false for a
    /// caller woken by [`TaskHandle::wait`].
    fn resolve(&self, outcome: Outcome, tx: &Sender<Outcome>) {
        {
            let mut tasks = self.lock_tasks();
            if let Some(task) = tasks
                .iter_mut()
                .find(|t| t.id == outcome.id && t.status == TaskStatus::Running)
            {
                task.status = outcome.status;
                task.finished_at = Some(Utc::now());
                task.failure.clone_from(&outcome.failure);
            }
        }
        self.changed();
        let _ = tx.send(outcome);
    }

    fn changed(&self) {
        for listener in self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            listener();
        }
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Vec<Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
