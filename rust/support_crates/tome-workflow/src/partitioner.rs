//! Parallel execution of a loop body over an arithmetic index progression.
//!
//! [`WorkPartitioner::execute`] materializes the indices of a [`StepRange`], submits one
//! worker per executor slot, and blocks until every worker has exited. Workers claim
//! indices through a shared atomic cursor, so each index runs exactly once regardless of
//! how many workers there are. No ordering between indices is guaranteed.
//!
//! The number of iterations follows ceiling division: `(0, 10, 4)` runs `0, 4, 8` and
//! `(10, 0, -3)` runs `10, 7, 4, 1`. A progression that moves away from `stop` yields a
//! negative count and is rejected before any work is scheduled. One that falls short of
//! a full step, such as `(0, -1, 3)`, has a count of zero and runs nothing.

use std::{
    panic::AssertUnwindSafe,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use tome_common::{
    Result,
    error::{Error, StdErrorBoxed},
};

use crate::{
    executor::Executor,
    latch::CompletionLatch,
    thread_pool::{ThreadPool, panic_message},
};

/// The half-open progression `start, start + step, ...` that stops before `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRange {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl StepRange {
    pub fn new(start: i64, stop: i64, step: i64) -> StepRange {
        StepRange { start, stop, step }
    }

    /// Computes `ceil((stop - start) / step)`.
    ///
    /// Fails with a configuration error if `step` is zero or the count is negative.
    pub fn iteration_count(&self) -> Result<usize> {
        if self.step == 0 {
            return Err(Error::configuration(format!(
                "step is zero in {self:?}, loop would run infinitely"
            )));
        }
        let distance = self.stop as i128 - self.start as i128;
        let step = self.step as i128;
        let mut count = distance / step;
        let rem = distance % step;
        if rem != 0 && (rem > 0) == (step > 0) {
            count += 1;
        }
        if count < 0 {
            return Err(Error::configuration(format!(
                "negative iteration count {count} for {self:?}, loop would run infinitely"
            )));
        }
        usize::try_from(count).map_err(|_| {
            Error::configuration(format!("iteration count {count} for {self:?} is too large"))
        })
    }

    /// Materializes every index of the progression.
    pub fn indices(&self) -> Result<Vec<i64>> {
        let count = self.iteration_count()?;
        let (start, step) = (self.start as i128, self.step as i128);
        Ok((0..count as i128)
            .map(|i| (start + i * step) as i64)
            .collect())
    }
}

/// A cooperative cancellation flag.
///
/// Clones share the same flag. Cancellation is observed by workers between iterations;
/// it never interrupts a body that has already started.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        Default::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Splits index progressions across the workers of an [`Executor`].
///
/// ## Faults
///
/// An error returned by the body, or a panic inside it, is captured as a worker fault.
/// Only the first fault is kept. It is returned once every worker has exited. By
/// default the remaining indices still run after a fault; see
/// [`with_stop_on_fault`](Self::with_stop_on_fault).
///
/// ## Cancellation
///
/// [`cancel`](Self::cancel) may be called from any thread, including from inside the
/// body. It stops new indices from starting and is sticky: a cancelled partitioner runs
/// nothing on later calls. A cancelled call still returns `Ok(())` unless a fault was
/// captured.
///
/// ## Nesting
///
/// `execute` blocks the calling thread. Calling it from a task already running on the
/// same executor can deadlock when every worker thread is occupied by such callers.
pub struct WorkPartitioner {
    executor: Arc<dyn Executor>,
    cancellation: CancellationToken,
    stop_on_fault: bool,
}

impl WorkPartitioner {
    pub fn new(executor: Arc<dyn Executor>) -> WorkPartitioner {
        WorkPartitioner {
            executor,
            cancellation: CancellationToken::new(),
            stop_on_fault: false,
        }
    }

    /// Creates a partitioner backed by the global [`ThreadPool`].
    pub fn global() -> WorkPartitioner {
        WorkPartitioner::new(Arc::new(ThreadPool::global().clone()))
    }

    /// When enabled, the first fault stops further indices from starting in that call.
    pub fn with_stop_on_fault(mut self, stop_on_fault: bool) -> WorkPartitioner {
        self.stop_on_fault = stop_on_fault;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn cancel(&self) {
        log::debug!("work partitioner cancelled");
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Same as [`execute`](Self::execute) with the range given as separate bounds.
    pub fn execute_range<F, E>(&self, start: i64, stop: i64, step: i64, body: F) -> Result<()>
    where
        F: Fn(i64) -> std::result::Result<(), E> + Send + Sync + 'static,
        E: Into<StdErrorBoxed> + 'static,
    {
        self.execute(StepRange::new(start, stop, step), body)
    }

    /// Runs `body` once for every index in `range` and waits for all of them.
    ///
    /// A range with a single index runs `body` directly on the calling thread. An empty
    /// range returns immediately.
    pub fn execute<F, E>(&self, range: StepRange, body: F) -> Result<()>
    where
        F: Fn(i64) -> std::result::Result<(), E> + Send + Sync + 'static,
        E: Into<StdErrorBoxed> + 'static,
    {
        let count = range.iteration_count()?;
        match count {
            0 => return Ok(()),
            1 => {
                if self.is_cancelled() {
                    return Ok(());
                }
                return invoke_body(&body, range.start);
            }
            _ => (),
        }

        let indices = range.indices()?;
        let workers = self.executor.parallelism().clamp(1, count);
        log::debug!("partitioning {count} indices of {range:?} across {workers} workers");

        let state = Arc::new(PartitionState {
            indices,
            cursor: AtomicUsize::new(0),
            cancellation: self.cancellation.clone(),
            stop_on_fault: self.stop_on_fault,
            halted: AtomicBool::new(false),
            fault: Mutex::new(None),
            body,
        });
        let latch = Arc::new(CompletionLatch::new(workers));

        for _ in 0..workers {
            let worker_state = state.clone();
            let guard = latch.guard();
            let submitted = self.executor.execute(Box::new(move || {
                let _guard = guard;
                run_worker(&worker_state);
            }));
            if let Err(e) = submitted {
                // The rejected task was dropped, which already released its latch slot.
                log::warn!("failed to submit partition worker: {e}");
                state.record_fault(Error::io("submit partition worker", e));
            }
        }

        latch.wait();

        match state.fault.lock().unwrap().take() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }
}

/// Shared state of a single `execute` call.
struct PartitionState<F> {
    indices: Vec<i64>,
    cursor: AtomicUsize,
    cancellation: CancellationToken,
    stop_on_fault: bool,
    /// Set by the first fault when `stop_on_fault` is enabled.
    halted: AtomicBool,
    /// The first captured fault.
    fault: Mutex<Option<Error>>,
    body: F,
}

impl<F> PartitionState<F> {
    /// Claims the next unprocessed offset; the cursor never moves past the end.
    fn claim(&self) -> Option<usize> {
        let len = self.indices.len();
        self.cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                (cursor < len).then_some(cursor + 1)
            })
            .ok()
    }

    fn should_stop(&self) -> bool {
        self.cancellation.is_cancelled() || self.halted.load(Ordering::Acquire)
    }

    fn record_fault(&self, fault: Error) {
        if self.stop_on_fault {
            self.halted.store(true, Ordering::Release);
        }
        let mut slot = self.fault.lock().unwrap();
        if slot.is_none() {
            log::warn!("captured work partition fault: {fault}");
            *slot = Some(fault);
        } else {
            log::debug!("dropping subsequent work partition fault: {fault}");
        }
    }
}

fn run_worker<F, E>(state: &PartitionState<F>)
where
    F: Fn(i64) -> std::result::Result<(), E>,
    E: Into<StdErrorBoxed>,
{
    while !state.should_stop() {
        let Some(offset) = state.claim() else {
            break;
        };
        let index = state.indices[offset];
        if let Err(fault) = invoke_body(&state.body, index) {
            state.record_fault(fault);
        }
    }
}

fn invoke_body<F, E>(body: &F, index: i64) -> Result<()>
where
    F: Fn(i64) -> std::result::Result<(), E>,
    E: Into<StdErrorBoxed>,
{
    match std::panic::catch_unwind(AssertUnwindSafe(|| body(index))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Error::worker(index, e)),
        Err(payload) => Err(Error::worker_panic(index, panic_message(payload.as_ref()))),
    }
}
