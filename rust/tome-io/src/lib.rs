//! Byte source abstractions and the background-prefetching stream:
//! - `ByteSource`: a blocking, sequential byte producer with an optional availability hint.
//! - `PrefetchStream`: wraps a `ByteSource`, filling a fixed-capacity ring buffer on a
//!   background producer while the caller drains it through `std::io::Read`.
//!
//! Provides a few `ByteSource` adapters: any `std::io::Read`, a file, and an in-memory buffer.

pub mod config;
pub mod prefetch_stream;
pub mod ring_buffer;
pub mod source;

pub use config::PrefetchConfig;
pub use prefetch_stream::{PrefetchStats, PrefetchStream};
pub use ring_buffer::RingBuffer;
pub use source::{ByteSource, FileSource, MemorySource, ReadSource};
