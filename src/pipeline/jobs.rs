//! Fixed worker pool with dependency-ordered jobs
//!
//! CPU work runs on a dedicated rayon pool. Dependencies are wired through a
//! small tokio runtime: a dependent job is a task that awaits its input's
//! completion and only then hands the closure to the pool, so nothing ever
//! blocks a worker thread waiting on another job.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::core::{Error, Result};

fn dropped() -> Error {
    Error::Pipeline("job dropped before completing".into())
}

/// Completion handle for a scheduled job.
///
/// Polled with [`JobHandle::try_take`]; dropping it discards the result once
/// the job finishes.
#[derive(Debug)]
pub struct JobHandle<T> {
    rx: oneshot::Receiver<Result<T>>,
}

/// Producer side of [`JobHandle::pending`]
#[derive(Debug)]
pub struct JobCompleter<T> {
    tx: oneshot::Sender<Result<T>>,
}

impl<T> JobCompleter<T> {
    /// Deliver the result, returns `false` if the handle is already gone
    pub fn complete(self, result: Result<T>) -> bool {
        self.tx.send(result).is_ok()
    }
}

impl<T> JobHandle<T> {
    /// Handle completed by hand instead of by a worker
    pub fn pending() -> (JobCompleter<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (JobCompleter { tx }, Self { rx })
    }

    /// Non-blocking completion check
    pub fn try_take(&mut self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => {
                log::warn!("Job finished without delivering a result");
                Some(Err(dropped()))
            }
        }
    }

    /// Block the calling thread until the job completes.
    ///
    /// Must not be called from inside the job system's own runtime.
    pub fn wait(self) -> Result<T> {
        self.rx.blocking_recv().unwrap_or_else(|_| Err(dropped()))
    }

    async fn resolve(self) -> Result<T> {
        self.rx.await.unwrap_or_else(|_| Err(dropped()))
    }
}

fn run_caught<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".into());
        Err(Error::Pipeline(format!("job panicked: {message}")))
    })
}

/// Worker pool plus the runtime that sequences dependent jobs
pub struct JobSystem {
    runtime: Runtime,
    pool: Arc<ThreadPool>,
}

impl JobSystem {
    pub fn new(worker_threads: usize) -> Result<Self> {
        if worker_threads == 0 {
            return Err(Error::Config("worker_threads must be at least 1".into()));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("marchland-worker-{i}"))
            .build()
            .map_err(|e| Error::Pipeline(format!("failed to start worker pool: {e}")))?;

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("marchland-jobs")
            .build()?;

        log::debug!("Job system started with {worker_threads} workers");

        Ok(Self {
            runtime,
            pool: Arc::new(pool),
        })
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `f` on the pool
    pub fn schedule<T, F>(&self, f: F) -> JobHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.try_schedule(move || Ok(f()))
    }

    /// Run a fallible `f` on the pool
    pub fn try_schedule<T, F>(&self, f: F) -> JobHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.pool.spawn(move || {
            let _ = tx.send(run_caught(f));
        });
        JobHandle { rx }
    }

    /// Run `f` on the output of `dep` once it completes
    pub fn schedule_after<T, U, F>(&self, dep: JobHandle<T>, f: F) -> JobHandle<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.try_schedule_after(dep, move |input| Ok(f(input)))
    }

    /// Fallible [`JobSystem::schedule_after`]; a failed dependency skips `f`
    pub fn try_schedule_after<T, U, F>(&self, dep: JobHandle<T>, f: F) -> JobHandle<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let pool = Arc::clone(&self.pool);

        self.runtime.spawn(async move {
            match dep.resolve().await {
                Ok(input) => pool.spawn(move || {
                    let _ = tx.send(run_caught(move || f(input)));
                }),
                Err(e) => {
                    let _ = tx.send(Err(e));
                }
            }
        });

        JobHandle { rx }
    }

    /// Completes when both inputs have, failing if either fails
    pub fn join<A, B>(&self, a: JobHandle<A>, b: JobHandle<B>) -> JobHandle<(A, B)>
    where
        A: Send + 'static,
        B: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        self.runtime.spawn(async move {
            let result = match tokio::join!(a.resolve(), b.resolve()) {
                (Ok(a), Ok(b)) => Ok((a, b)),
                (Err(e), _) | (_, Err(e)) => Err(e),
            };
            let _ = tx.send(result);
        });

        JobHandle { rx }
    }

    /// Stop the runtime without waiting for queued dependency tasks
    pub fn shutdown(self) {
        log::debug!("Job system shutting down");
        self.runtime.shutdown_background();
    }
}
