//! Index-preserving fan-out/fan-in over a bounded worker pool.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;

use crate::error::FocalPointError;

/// Upper bound on default worker threads; the full ensemble has nine passes.
const MAX_DEFAULT_WORKERS: usize = 9;

/// Shared flag telling queued tasks to stop before they start.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every holder of this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bounded thread pool running independent tasks with an optional deadline.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    timeout: Option<Duration>,
}

impl WorkerPool {
    /// Build a pool of `threads` workers. `timeout` bounds how long a single
    /// [`map`](Self::map) call waits for its batch.
    pub fn new(threads: usize, timeout: Option<Duration>) -> Result<Self, FocalPointError> {
        if threads == 0 {
            return Err(FocalPointError::InvalidConfig(
                "worker count must be > 0".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("focalpoint-worker-{index}"))
            .build()
            .map_err(|e| FocalPointError::WorkerPool(e.to_string()))?;
        Ok(Self { pool, timeout })
    }

    /// Worker count used when none is configured.
    pub fn default_threads() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_DEFAULT_WORKERS)
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Apply `f` to every input concurrently and return the outputs in input
    /// order, whatever order the tasks finish in.
    ///
    /// A panicking task fails the batch with [`FocalPointError::TaskPanicked`].
    /// When the deadline passes first, `cancel` is tripped so tasks that have
    /// not started yet are skipped, and the batch fails with
    /// [`FocalPointError::Timeout`]. Calls made from one of this pool's own
    /// workers run inline on that worker.
    pub fn map<T, R, F>(
        &self,
        inputs: Vec<T>,
        f: F,
        cancel: &CancelToken,
    ) -> Result<Vec<R>, FocalPointError>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        if cancel.is_cancelled() {
            return Err(FocalPointError::Cancelled);
        }
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        if self.pool.current_thread_index().is_some() {
            return inputs
                .into_iter()
                .enumerate()
                .map(|(index, input)| run_task(&f, index, input, cancel))
                .collect();
        }

        let total = inputs.len();
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let f = Arc::new(f);
        let (tx, rx) = mpsc::channel();

        for (index, input) in inputs.into_iter().enumerate() {
            let tx = tx.clone();
            let f = Arc::clone(&f);
            let cancel = cancel.clone();
            self.pool.spawn(move || {
                let outcome = run_task(f.as_ref(), index, input, &cancel);
                // The receiver is gone once the batch has failed or timed out.
                let _ = tx.send((index, outcome));
            });
        }
        drop(tx);

        let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
        for _ in 0..total {
            let received = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    rx.recv_timeout(remaining)
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            let (index, outcome) = match received {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => {
                    cancel.cancel();
                    let timeout = self.timeout.unwrap_or_default();
                    warn!("parallel batch of {total} tasks timed out after {timeout:?}");
                    return Err(FocalPointError::Timeout(timeout));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(FocalPointError::WorkerPool(
                        "worker channel closed before the batch finished".to_string(),
                    ));
                }
            };
            match outcome {
                Ok(value) => slots[index] = Some(value),
                Err(err) => {
                    cancel.cancel();
                    return Err(err);
                }
            }
        }

        slots
            .into_iter()
            .collect::<Option<Vec<R>>>()
            .ok_or_else(|| FocalPointError::WorkerPool("missing task result".to_string()))
    }
}

fn run_task<T, R, F>(
    f: &F,
    index: usize,
    input: T,
    cancel: &CancelToken,
) -> Result<R, FocalPointError>
where
    F: Fn(T) -> R,
{
    if cancel.is_cancelled() {
        return Err(FocalPointError::Cancelled);
    }
    panic::catch_unwind(AssertUnwindSafe(|| f(input))).map_err(|_| {
        warn!("parallel task {index} panicked");
        FocalPointError::TaskPanicked { index }
    })
}
