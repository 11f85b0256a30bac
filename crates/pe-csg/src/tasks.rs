//! Background task execution
//!
//! Rebuilds run as tasks. In [`ExecutionMode::Background`] each task gets its
//! own worker thread and reports into shared state the caller polls; in
//! [`ExecutionMode::Inline`] the task runs before `execute` returns, which is
//! what headless tools and tests want.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use parking_lot::{Condvar, Mutex};
use pe_core::config::RebuildConfig;

use crate::progress::{CancelToken, ProgressSink, ProgressStatus};

/// Where tasks run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Background,
    Inline,
}

/// Lifecycle of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Completed,
    Failed(String),
    Cancelled,
}

impl TaskState {
    pub fn is_finished(&self) -> bool {
        !matches!(self, TaskState::Running)
    }
}

/// Non-fatal message for the user, e.g. a failed rebuild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Job signature: report progress, poll cancellation, return an error text
/// on failure.
pub type TaskJob = Box<dyn FnOnce(&dyn ProgressSink, &CancelToken) -> Result<(), String> + Send>;

#[derive(Debug)]
struct TaskShared {
    id: u64,
    title: String,
    state: Mutex<TaskState>,
    done: Condvar,
    progress: Mutex<ProgressStatus>,
    cancel: CancelToken,
    log_progress: bool,
}

impl TaskShared {
    fn finish(&self, state: TaskState) {
        let mut current = self.state.lock();
        *current = state;
        self.done.notify_all();
    }
}

impl ProgressSink for TaskShared {
    fn report(&self, status: &ProgressStatus) {
        if self.log_progress {
            tracing::debug!(
                "{} [{}]: {:.0}% {}",
                self.title,
                self.id,
                status.progress * 100.0,
                status.status
            );
        }
        *self.progress.lock() = status.clone();
    }
}

/// Handle to a submitted task
#[derive(Debug, Clone)]
pub struct TaskHandle {
    shared: Arc<TaskShared>,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn title(&self) -> &str {
        &self.shared.title
    }

    pub fn state(&self) -> TaskState {
        self.shared.state.lock().clone()
    }

    /// Latest progress report
    pub fn progress(&self) -> ProgressStatus {
        self.shared.progress.lock().clone()
    }

    /// Ask the task to stop at its next cancellation check
    pub fn cancel(&self) {
        self.shared.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.shared.state.lock().is_finished()
    }

    /// Block until the task has finished and return its final state
    pub fn wait(&self) -> TaskState {
        let mut state = self.shared.state.lock();
        while !state.is_finished() {
            self.shared.done.wait(&mut state);
        }
        state.clone()
    }
}

/// Runs tasks and collects the notices they raise
#[derive(Debug)]
pub struct TaskScheduler {
    mode: ExecutionMode,
    log_progress: bool,
    next_id: AtomicU64,
    tasks: Mutex<Vec<TaskHandle>>,
    notices: Mutex<Vec<Notice>>,
}

impl TaskScheduler {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            log_progress: false,
            next_id: AtomicU64::new(1),
            tasks: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
        }
    }

    /// Scheduler configured from the `rebuild` settings
    pub fn from_config(config: &RebuildConfig) -> Self {
        let mode = if config.background {
            ExecutionMode::Background
        } else {
            ExecutionMode::Inline
        };
        Self {
            log_progress: config.report_progress,
            ..Self::new(mode)
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Submit a job. Panics inside the job are caught and turn the task into
    /// [`TaskState::Failed`].
    pub fn execute<F>(&self, title: impl Into<String>, job: F) -> TaskHandle
    where
        F: FnOnce(&dyn ProgressSink, &CancelToken) -> Result<(), String> + Send + 'static,
    {
        let shared = Arc::new(TaskShared {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            title: title.into(),
            state: Mutex::new(TaskState::Running),
            done: Condvar::new(),
            progress: Mutex::new(ProgressStatus::default()),
            cancel: CancelToken::new(),
            log_progress: self.log_progress,
        });
        let handle = TaskHandle {
            shared: shared.clone(),
        };
        {
            let mut tasks = self.tasks.lock();
            tasks.retain(|t| !t.is_finished());
            tasks.push(handle.clone());
        }
        tracing::debug!("Starting task {} [{}]", shared.title, shared.id);

        let job: TaskJob = Box::new(job);
        match self.mode {
            ExecutionMode::Inline => run_task(&shared, job),
            ExecutionMode::Background => {
                // The job moves into the closure; keep it reachable so a failed
                // spawn can still run it here.
                let slot = Arc::new(Mutex::new(Some(job)));
                let worker_slot = slot.clone();
                let worker_shared = shared.clone();
                let spawned = thread::Builder::new()
                    .name(format!("task-{}", shared.id))
                    .spawn(move || {
                        if let Some(job) = worker_slot.lock().take() {
                            run_task(&worker_shared, job);
                        }
                    });
                if let Err(e) = spawned {
                    tracing::warn!("Failed to spawn worker thread, running inline: {}", e);
                    if let Some(job) = slot.lock().take() {
                        run_task(&shared, job);
                    }
                }
            }
        }
        handle
    }

    /// Tasks that have not finished yet
    pub fn running(&self) -> Vec<TaskHandle> {
        self.tasks
            .lock()
            .iter()
            .filter(|t| !t.is_finished())
            .cloned()
            .collect()
    }

    /// Wait for every task, including tasks submitted while waiting.
    pub fn wait_idle(&self) {
        loop {
            let pending = self.running();
            if pending.is_empty() {
                break;
            }
            for task in pending {
                task.wait();
            }
        }
    }

    /// Cancel every running task
    pub fn cancel_all(&self) {
        for task in self.running() {
            task.cancel();
        }
    }

    /// Queue a notice for the user
    pub fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }

    /// Drain queued notices
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }
}

fn run_task(shared: &TaskShared, job: TaskJob) {
    let result = catch_unwind(AssertUnwindSafe(|| job(shared, &shared.cancel)));
    let state = match result {
        Ok(Ok(())) if shared.cancel.is_cancelled() => TaskState::Cancelled,
        Ok(Ok(())) => TaskState::Completed,
        Ok(Err(e)) => {
            tracing::warn!("Task {} failed: {}", shared.title, e);
            TaskState::Failed(e)
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::warn!("Task {} panicked: {}", shared.title, message);
            TaskState::Failed(message)
        }
    };
    tracing::debug!("Task {} [{}] finished: {:?}", shared.title, shared.id, state);
    shared.finish(state);
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_inline_runs_before_return() {
        let scheduler = TaskScheduler::new(ExecutionMode::Inline);
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let handle = scheduler.execute("count", move |progress, _| {
            progress.report(&ProgressStatus::new(1.0, "done"));
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state(), TaskState::Completed);
        assert_eq!(handle.progress().progress, 1.0);
        assert!(scheduler.running().is_empty());
    }

    #[test]
    fn test_background_wait_idle() {
        let scheduler = TaskScheduler::new(ExecutionMode::Background);
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let c = count.clone();
            scheduler.execute("sleep", move |_, _| {
                thread::sleep(Duration::from_millis(10));
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        scheduler.wait_idle();
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_failure_and_panic_are_reported() {
        let scheduler = TaskScheduler::new(ExecutionMode::Inline);
        let failed = scheduler.execute("fail", |_, _| Err("no good".into()));
        assert_eq!(failed.state(), TaskState::Failed("no good".into()));

        let panicked = scheduler.execute("panic", |_, _| panic!("boom"));
        assert_eq!(panicked.wait(), TaskState::Failed("boom".into()));
    }

    #[test]
    fn test_cancel_background_task() {
        let scheduler = TaskScheduler::new(ExecutionMode::Background);
        let handle = scheduler.execute("spin", |_, cancel| {
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            Ok(())
        });
        handle.cancel();
        assert_eq!(handle.wait(), TaskState::Cancelled);
    }

    #[test]
    fn test_notices_drain() {
        let scheduler = TaskScheduler::new(ExecutionMode::Inline);
        scheduler.notify(Notice::new("Subtract", "failed"));
        assert_eq!(scheduler.take_notices().len(), 1);
        assert!(scheduler.take_notices().is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = RebuildConfig {
            background: false,
            report_progress: true,
        };
        assert_eq!(TaskScheduler::from_config(&config).mode(), ExecutionMode::Inline);
    }
}
