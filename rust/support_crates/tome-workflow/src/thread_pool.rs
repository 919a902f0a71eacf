//! Fixed-size thread pool for background task execution.
//!
//! The pool runs fire-and-forget tasks on a set of named worker threads. A lazily
//! initialized global instance is available through [`ThreadPool::global`].

use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicUsize, Ordering},
};

use crate::executor::{Executor, Task};

/// A fixed-size thread pool for executing concurrent tasks.
///
/// ## Cloning
///
/// `ThreadPool` implements [`Clone`] and all clones share the same underlying worker
/// threads.
///
/// ## Panics in tasks
///
/// A panicking task does not take its worker thread down. The panic is logged and the
/// worker moves on to the next task.
#[derive(Clone)]
pub struct ThreadPool(Arc<rayon::ThreadPool>);

impl ThreadPool {
    /// Creates a new `ThreadPool` with the specified number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads` is 0.
    pub fn new(num_threads: usize) -> Self {
        Self::with_thread_name(num_threads, |i| format!("tome_worker_{i}"))
    }

    /// Creates a new `ThreadPool` with custom thread names.
    ///
    /// The `thread_name` function is called for each thread with its 0-based index.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads` is 0.
    pub fn with_thread_name(
        num_threads: usize,
        thread_name: impl Fn(usize) -> String + 'static,
    ) -> Self {
        assert_ne!(num_threads, 0);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(thread_name)
            .panic_handler(|payload| {
                log::error!(
                    "task panicked on pool thread: {}",
                    panic_message(payload.as_ref())
                );
            })
            .build()
            .expect("thread pool");
        ThreadPool(Arc::new(pool))
    }

    /// Creates a new `ThreadPool` sized to the number of logical CPUs, or 8 threads if
    /// that cannot be determined.
    pub fn with_default_threads() -> Self {
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        Self::new(num_threads)
    }

    /// Configures the size of the global pool.
    ///
    /// Only takes effect when called before the first call to [`global()`](Self::global).
    /// Values less than 1 are clamped to 1.
    pub fn configure_global_pool_size(pool_size: usize) {
        let pool_size = pool_size.max(1);
        GLOBAL_POOL_SIZE.store(pool_size, Ordering::SeqCst);
    }

    /// Returns the global `ThreadPool` instance.
    ///
    /// The number of worker threads is the value set via
    /// [`configure_global_pool_size()`](Self::configure_global_pool_size), or
    /// `(available_parallelism * 3 + 1) / 2`, or 8 if the CPU count is unknown.
    pub fn global() -> &'static ThreadPool {
        static POOL: OnceLock<ThreadPool> = OnceLock::new();
        POOL.get_or_init(|| {
            let size = Self::get_global_pool_size();
            log::debug!("starting global thread pool with {size} threads");
            ThreadPool::with_thread_name(size, |i| format!("tome_global_{i}"))
        })
    }

    /// Number of worker threads in this pool.
    pub fn num_threads(&self) -> usize {
        self.0.current_num_threads()
    }

    /// Spawns a task on the pool without waiting for the result.
    pub fn spawn_detached<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.0.spawn_fifo(f);
    }

    fn get_global_pool_size() -> usize {
        let size = GLOBAL_POOL_SIZE.load(Ordering::SeqCst);
        if size == 0 {
            std::thread::available_parallelism()
                .map(|n| (n.get() * 3).div_ceil(2))
                .unwrap_or(8)
        } else {
            size
        }
    }
}

impl Executor for ThreadPool {
    fn parallelism(&self) -> usize {
        self.num_threads()
    }

    fn execute(&self, task: Task) -> std::io::Result<()> {
        self.spawn_detached(task);
        Ok(())
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::with_default_threads()
    }
}

/// Extracts a printable message from a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Configured size of the global pool; 0 means "derive from the CPU count".
static GLOBAL_POOL_SIZE: AtomicUsize = AtomicUsize::new(0);
