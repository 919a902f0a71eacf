//! Workflow execution utilities for parallel and background processing.
//!
//! # Key Components
//!
//! ## Executors
//!
//! - [`executor::Executor`] - The sized, fire-and-forget task sink consumed by the
//!   partitioner and by background stream producers
//! - [`thread_pool::ThreadPool`] - A fixed-size pool with named worker threads and a
//!   lazily initialized global instance
//! - [`executor::ThreadSpawner`] - Runs every task on its own named thread, for
//!   long-lived background roles that must never wait for a pool slot
//!
//! ## Synchronization
//!
//! - [`latch::CompletionLatch`] - A countdown barrier that releases its waiters once all
//!   participants have finished
//!
//! ## Parallel Loops
//!
//! - [`partitioner::WorkPartitioner`] - Splits an arithmetic index progression across
//!   the workers of an executor, runs each index exactly once, and reports the first
//!   failure back to the caller

pub mod executor;
pub mod latch;
pub mod partitioner;
pub mod thread_pool;

pub use executor::{Executor, Task, ThreadSpawner};
pub use latch::CompletionLatch;
pub use partitioner::{CancellationToken, StepRange, WorkPartitioner};
pub use thread_pool::ThreadPool;
