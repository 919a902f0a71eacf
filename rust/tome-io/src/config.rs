//! Prefetch stream configuration.

use serde::{Deserialize, Serialize};
use tome_common::{Result, verify_arg};

/// Sizing of a [`PrefetchStream`](crate::PrefetchStream).
///
/// Deserializes from partial documents; missing fields take their default values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrefetchConfig {
    /// Total size of the ring buffer in bytes.
    pub capacity: usize,
    /// Upper bound on a single read-ahead call when the source reports buffered data.
    pub max_chunk_size: usize,
    /// Upper bound on a single read-ahead call when the source gives no availability
    /// hint. Bounds how long the producer can stay blocked in one call.
    pub blocking_chunk_size: usize,
}

impl PrefetchConfig {
    pub const DEFAULT_CAPACITY: usize = 256 * 1024;
    pub const DEFAULT_MAX_CHUNK_SIZE: usize = 64 * 1024;
    pub const DEFAULT_BLOCKING_CHUNK_SIZE: usize = 8 * 1024;

    pub fn new(capacity: usize, max_chunk_size: usize, blocking_chunk_size: usize) -> Self {
        PrefetchConfig {
            capacity,
            max_chunk_size,
            blocking_chunk_size,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    pub fn with_blocking_chunk_size(mut self, blocking_chunk_size: usize) -> Self {
        self.blocking_chunk_size = blocking_chunk_size;
        self
    }

    /// Size of the producer's scratch chunk: the largest single read it will issue.
    pub fn scratch_size(&self) -> usize {
        self.max_chunk_size
            .max(self.blocking_chunk_size)
            .min(self.capacity)
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(capacity, self.capacity != 0, "ring buffer capacity must be positive");
        verify_arg!(max_chunk_size, self.max_chunk_size != 0);
        verify_arg!(blocking_chunk_size, self.blocking_chunk_size != 0);
        Ok(())
    }
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        PrefetchConfig::new(
            Self::DEFAULT_CAPACITY,
            Self::DEFAULT_MAX_CHUNK_SIZE,
            Self::DEFAULT_BLOCKING_CHUNK_SIZE,
        )
    }
}
