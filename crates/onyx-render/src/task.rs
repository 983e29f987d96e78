//! Upload scheduling.
//!
//! Uploads of one frame run as independent jobs. [`run_upload_tasks`] hands all but the last
//! job to a [`TaskManager`], runs the last one on the calling thread and then joins the rest:
//! with a single job (the common case) nothing is spawned at all.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use async_executor::{Executor, Task};

use crate::error::{RenderError, Result};

/// A unit of upload work: write host data into a staging buffer and flush it.
pub type UploadJob = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

/// Handle to a spawned job.
pub enum TaskHandle {
    Pending(Task<Result<()>>),
    Ready(Result<()>),
}

/// Runs upload jobs.
pub trait TaskManager: Send + Sync {
    fn spawn(&self, job: UploadJob) -> TaskHandle;

    /// Block until the job behind `handle` completed and return its result.
    fn wait_until_finished(&self, handle: TaskHandle) -> Result<()> {
        match handle {
            TaskHandle::Pending(task) => futures_lite::future::block_on(task),
            TaskHandle::Ready(result) => result,
        }
    }
}

fn run_guarded(job: UploadJob) -> Result<()> {
    catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "job panicked".to_string());
        Err(RenderError::TaskFailed(message))
    })
}

/// A thread pool executing upload jobs.
///
/// # Example
///
/// ```
/// use onyx_render::{TaskManager, TaskPool};
///
/// let pool = TaskPool::new(2);
/// let handle = pool.spawn(Box::new(|| Ok(())));
/// assert!(pool.wait_until_finished(handle).is_ok());
/// ```
pub struct TaskPool {
    executor: Arc<Executor<'static>>,
    threads: Vec<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl TaskPool {
    /// Create a new task pool with the specified number of threads.
    ///
    /// # Panics
    ///
    /// Panics if num_threads is 0.
    pub fn new(num_threads: usize) -> Self {
        assert!(num_threads > 0, "TaskPool must have at least one thread");

        let executor = Arc::new(Executor::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut threads = Vec::with_capacity(num_threads);

        for i in 0..num_threads {
            let exec = executor.clone();
            let shutdown_flag = shutdown.clone();

            let handle = thread::Builder::new()
                .name(format!("onyx-upload-{}", i))
                .spawn(move || {
                    while !shutdown_flag.load(Ordering::Relaxed) {
                        if !exec.try_tick() {
                            thread::sleep(std::time::Duration::from_millis(1));
                        }
                    }
                })
                .expect("Failed to spawn task pool thread");

            threads.push(handle);
        }

        tracing::debug!("TaskPool created with {} threads", num_threads);

        Self {
            executor,
            threads,
            shutdown,
        }
    }

    /// Uses max(1, num_cpus - 1) to leave one core for the thread recording commands.
    pub fn default_threads() -> Self {
        Self::new(Self::default_thread_count())
    }

    pub fn default_thread_count() -> usize {
        num_cpus::get().saturating_sub(1).max(1)
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Stop the workers and wait for them to exit.
    pub fn shutdown(mut self) {
        self.join_workers();
    }

    fn join_workers(&mut self) {
        if self.threads.is_empty() {
            return;
        }
        tracing::debug!("Shutting down TaskPool with {} threads", self.threads.len());
        self.shutdown.store(true, Ordering::Relaxed);

        for handle in std::mem::take(&mut self.threads) {
            if let Err(e) = handle.join() {
                tracing::error!("Task pool thread panicked: {:?}", e);
            }
        }
    }
}

impl TaskManager for TaskPool {
    fn spawn(&self, job: UploadJob) -> TaskHandle {
        TaskHandle::Pending(self.executor.spawn(async move { run_guarded(job) }))
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::default_threads()
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.join_workers();
    }
}

/// Runs every job immediately on the spawning thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineTaskManager;

impl TaskManager for InlineTaskManager {
    fn spawn(&self, job: UploadJob) -> TaskHandle {
        TaskHandle::Ready(run_guarded(job))
    }
}

/// Run a frame's upload jobs: all but the last on `manager`, the last inline, then join.
///
/// Every job is joined even when one fails; the error of the earliest failing job, in
/// submission order, is returned.
pub fn run_upload_tasks(manager: &dyn TaskManager, mut jobs: Vec<UploadJob>) -> Result<()> {
    let Some(last) = jobs.pop() else {
        return Ok(());
    };

    let handles: Vec<TaskHandle> = jobs.into_iter().map(|job| manager.spawn(job)).collect();
    let last_result = run_guarded(last);

    let mut result = Ok(());
    for handle in handles {
        let joined = manager.wait_until_finished(handle);
        if result.is_ok() {
            result = joined;
        }
    }
    result.and(last_result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_task_pool_creation() {
        let pool = TaskPool::new(2);
        assert_eq!(pool.thread_count(), 2);
        pool.shutdown();
    }

    #[test]
    fn test_drop_joins_workers() {
        let pool = TaskPool::new(3);
        let executor = pool.executor.clone();
        let handle = pool.spawn(Box::new(|| Ok(())));
        pool.wait_until_finished(handle).unwrap();

        drop(pool);
        // Each worker held a clone of the executor until it exited.
        assert_eq!(Arc::strong_count(&executor), 1);
    }

    #[test]
    #[should_panic(expected = "TaskPool must have at least one thread")]
    fn test_zero_threads_panics() {
        TaskPool::new(0);
    }

    #[test]
    fn test_default_threads() {
        let pool = TaskPool::default_threads();
        assert!(pool.thread_count() >= 1);
        assert!(pool.thread_count() <= num_cpus::get().max(1));
    }

    #[test]
    fn test_all_jobs_run() {
        let pool = TaskPool::new(3);
        let counter = Arc::new(AtomicUsize::new(0));

        let jobs: Vec<UploadJob> = (0..10)
            .map(|_| {
                let counter = counter.clone();
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }) as UploadJob
            })
            .collect();

        run_upload_tasks(&pool, jobs).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_last_job_runs_on_calling_thread() {
        let pool = TaskPool::new(2);
        let caller = thread::current().id();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let jobs: Vec<UploadJob> = (0..3)
            .map(|i| {
                let seen = seen.clone();
                Box::new(move || {
                    seen.lock().push((i, thread::current().id()));
                    Ok(())
                }) as UploadJob
            })
            .collect();

        run_upload_tasks(&pool, jobs).unwrap();

        let seen = seen.lock();
        let (_, last_thread) = seen.iter().find(|(i, _)| *i == 2).unwrap();
        assert_eq!(*last_thread, caller);
        for (i, id) in seen.iter() {
            if *i != 2 {
                assert_ne!(*id, caller);
            }
        }
    }

    #[test]
    fn test_first_error_is_returned_after_join() {
        let counter = Arc::new(AtomicUsize::new(0));
        let ok = |counter: Arc<AtomicUsize>| -> UploadJob {
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };

        let jobs: Vec<UploadJob> = vec![
            ok(counter.clone()),
            Box::new(|| Err(RenderError::TaskFailed("boom".into()))),
            ok(counter.clone()),
        ];

        let err = run_upload_tasks(&InlineTaskManager, jobs).unwrap_err();
        assert_eq!(err, RenderError::TaskFailed("boom".into()));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_spawned_error_wins_over_inline_error() {
        let pool = TaskPool::new(2);
        let jobs: Vec<UploadJob> = vec![
            Box::new(|| Ok(())),
            Box::new(|| Err(RenderError::TaskFailed("second".into()))),
            Box::new(|| Err(RenderError::TaskFailed("last".into()))),
        ];

        let err = run_upload_tasks(&pool, jobs).unwrap_err();
        assert_eq!(err, RenderError::TaskFailed("second".into()));

        let jobs: Vec<UploadJob> = vec![
            Box::new(|| Ok(())),
            Box::new(|| Err(RenderError::TaskFailed("last".into()))),
        ];
        let err = run_upload_tasks(&pool, jobs).unwrap_err();
        assert_eq!(err, RenderError::TaskFailed("last".into()));
    }

    #[test]
    fn test_panicking_job_becomes_error() {
        let pool = TaskPool::new(1);
        let jobs: Vec<UploadJob> = vec![Box::new(|| panic!("bad upload")), Box::new(|| Ok(()))];

        let err = run_upload_tasks(&pool, jobs).unwrap_err();
        assert_eq!(err, RenderError::TaskFailed("bad upload".into()));
    }

    #[test]
    fn test_empty_job_list() {
        assert!(run_upload_tasks(&InlineTaskManager, Vec::new()).is_ok());
    }
}
