//! The executor abstraction shared by the parallel loop and the background prefetcher.
//!
//! An [`Executor`] accepts boxed, fire-and-forget tasks. It reports how many tasks it
//! can run at the same time through [`Executor::parallelism`], which callers use to size
//! the number of workers they submit.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

/// A boxed function that can be executed on a background thread.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A sized sink for fire-and-forget background tasks.
pub trait Executor: Send + Sync {
    /// The number of tasks this executor can run concurrently.
    fn parallelism(&self) -> usize;

    /// Submits a task for execution.
    ///
    /// If the task cannot be submitted, it is dropped without running and an error is
    /// returned. Callers that track task completion through values captured by the task
    /// observe the drop.
    fn execute(&self, task: Task) -> std::io::Result<()>;
}

impl Executor for rayon::ThreadPool {
    fn parallelism(&self) -> usize {
        self.current_num_threads()
    }

    fn execute(&self, task: Task) -> std::io::Result<()> {
        self.spawn_fifo(task);
        Ok(())
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn parallelism(&self) -> usize {
        self.as_ref().parallelism()
    }

    fn execute(&self, task: Task) -> std::io::Result<()> {
        self.as_ref().execute(task)
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn parallelism(&self) -> usize {
        (**self).parallelism()
    }

    fn execute(&self, task: Task) -> std::io::Result<()> {
        (**self).execute(task)
    }
}

/// An executor that starts a new named OS thread for every task.
///
/// Suited for long-lived roles such as a stream producer, which would otherwise pin a
/// pool worker for the lifetime of the stream.
pub struct ThreadSpawner {
    name_prefix: String,
    spawned: AtomicUsize,
}

impl ThreadSpawner {
    /// Creates a spawner whose threads are named `{name_prefix}-{n}`.
    pub fn new(name_prefix: impl Into<String>) -> ThreadSpawner {
        ThreadSpawner {
            name_prefix: name_prefix.into(),
            spawned: AtomicUsize::new(0),
        }
    }

    /// Number of threads started so far.
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::Relaxed)
    }
}

impl Executor for ThreadSpawner {
    fn parallelism(&self) -> usize {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8)
    }

    fn execute(&self, task: Task) -> std::io::Result<()> {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        thread::Builder::new()
            .name(format!("{}-{n}", self.name_prefix))
            .spawn(task)?;
        Ok(())
    }
}
