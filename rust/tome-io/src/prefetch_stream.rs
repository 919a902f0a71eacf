//! A stream that reads ahead from a `ByteSource` on a background producer.
//!
//! The producer fills a fixed-capacity [`RingBuffer`] while the consumer drains it. The
//! two roles coordinate through one mutex and two condition variables:
//! - `space_available`: signaled by the consumer after it frees bytes, awaited by the
//!   producer when the buffer is full;
//! - `data_available`: signaled by the producer after it appends bytes, reaches the end
//!   of the source, or records a fault; awaited by the consumer when the buffer is empty.
//!
//! Closing the stream signals both.

use std::{
    io::Read,
    panic::AssertUnwindSafe,
    sync::{
        Arc, Condvar, Mutex, MutexGuard, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
};

use serde::Serialize;
use tome_common::{Result, error::Error};
use tome_workflow::{
    executor::{Executor, ThreadSpawner},
    thread_pool::panic_message,
};

use crate::{
    config::PrefetchConfig,
    ring_buffer::RingBuffer,
    source::{ByteSource, InterruptHandle},
};

/// A sequential reader over a `ByteSource`, prefetched in the background.
///
/// Consumed bytes are exactly the source's bytes, in order. All methods take `&self`, so
/// a stream can be shared with another thread that closes it while a read is blocked.
///
/// ## Faults
///
/// A source error or a panic inside the source stops the producer. The consumer still
/// receives the bytes buffered before it; after that, every read fails with the same
/// source fault until the stream is closed. Any operation on a closed stream fails with
/// a closed-stream error.
///
/// ## Closing
///
/// [`close`](Self::close) wakes a blocked consumer and a producer waiting for space, and
/// invokes the source's [interrupt handle](ByteSource::interrupt_handle) so that a
/// producer blocked inside a source read returns. The producer then discards any data
/// it got, closes the source, and exits. Dropping the stream closes it.
pub struct PrefetchStream {
    shared: Arc<Shared>,
}

/// Counters describing the work done by a stream so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrefetchStats {
    /// Bytes appended to the ring buffer by the producer.
    pub bytes_produced: u64,
    /// Bytes handed to the consumer.
    pub bytes_consumed: u64,
    /// Successful, non-empty source reads.
    pub source_reads: u64,
    /// Times the producer found the buffer full and waited.
    pub producer_waits: u64,
    /// Times the consumer found the buffer empty and waited.
    pub consumer_waits: u64,
}

impl PrefetchStream {
    /// Creates a stream whose producer runs on a dedicated thread.
    pub fn new(source: impl ByteSource, config: PrefetchConfig) -> Result<PrefetchStream> {
        Self::with_executor(source, config, producer_spawner())
    }

    /// Creates a stream whose producer is submitted to `executor`.
    ///
    /// The producer occupies one executor slot for as long as the stream is open and the
    /// source is not exhausted.
    pub fn with_executor(
        source: impl ByteSource,
        config: PrefetchConfig,
        executor: &dyn Executor,
    ) -> Result<PrefetchStream> {
        config.validate()?;
        let shared = Arc::new(Shared::new(config, source.interrupt_handle()));
        let source: Box<dyn ByteSource> = Box::new(source);
        let producer = shared.clone();
        executor
            .execute(Box::new(move || run_producer(producer, source)))
            .map_err(|e| Error::io("start prefetch producer", e))?;
        log::debug!("prefetch stream started: {config:?}");
        Ok(PrefetchStream { shared })
    }

    pub fn config(&self) -> &PrefetchConfig {
        &self.shared.config
    }

    /// Reads a single byte, blocking until one is buffered.
    ///
    /// Returns `None` at the end of the stream.
    pub fn read_byte(&self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Reads buffered bytes into `dest`, blocking until at least one is available.
    ///
    /// Returns the number of bytes copied, which may be less than `dest.len()`, or `0` at
    /// the end of the stream (or when `dest` is empty).
    pub fn read(&self, dest: &mut [u8]) -> Result<usize> {
        self.shared.read(dest)
    }

    /// Number of buffered bytes that can be read without blocking.
    pub fn available(&self) -> Result<usize> {
        let state = self.shared.lock();
        if state.closed {
            return Err(Error::stream_closed());
        }
        Ok(state.ring.len())
    }

    /// Closes the stream and wakes every thread waiting inside it.
    ///
    /// Closing an already closed stream does nothing.
    pub fn close(&self) -> Result<()> {
        self.shared.close();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    pub fn stats(&self) -> PrefetchStats {
        self.shared.counters.snapshot()
    }
}

impl Drop for PrefetchStream {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl Read for PrefetchStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.shared.read(buf).map_err(Into::into)
    }
}

impl Read for &PrefetchStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.shared.read(buf).map_err(Into::into)
    }
}

impl std::fmt::Debug for PrefetchStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchStream")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Producers of streams created with [`PrefetchStream::new`] run on their own threads.
fn producer_spawner() -> &'static ThreadSpawner {
    static SPAWNER: OnceLock<ThreadSpawner> = OnceLock::new();
    SPAWNER.get_or_init(|| ThreadSpawner::new("tome-prefetch"))
}

/// State shared between the consumer-facing stream and its producer.
struct Shared {
    config: PrefetchConfig,
    state: Mutex<StreamState>,
    space_available: Condvar,
    data_available: Condvar,
    counters: Counters,
    interrupt: Option<InterruptHandle>,
}

struct StreamState {
    ring: RingBuffer,
    /// Value of `ring.filled()` when the source reported its end.
    eof_pos: Option<u64>,
    /// First source fault; never cleared.
    fault: Option<Arc<std::io::Error>>,
    closed: bool,
}

impl Shared {
    fn new(config: PrefetchConfig, interrupt: Option<InterruptHandle>) -> Shared {
        Shared {
            config,
            state: Mutex::new(StreamState {
                ring: RingBuffer::new(config.capacity),
                eof_pos: None,
                fault: None,
                closed: false,
            }),
            space_available: Condvar::new(),
            data_available: Condvar::new(),
            counters: Counters::default(),
            interrupt,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap()
    }

    fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn read(&self, dest: &mut [u8]) -> Result<usize> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return Err(Error::stream_closed());
            }
            if dest.is_empty() {
                return Ok(0);
            }
            if !state.ring.is_empty() {
                let n = state.ring.read_into(dest);
                self.counters.bytes_consumed.add(n);
                drop(state);
                self.space_available.notify_one();
                return Ok(n);
            }
            if state.eof_pos == Some(state.ring.pos()) {
                return Ok(0);
            }
            if let Some(fault) = &state.fault {
                return Err(Error::source(fault.clone()));
            }
            self.counters.consumer_waits.add(1);
            state = self.data_available.wait(state).unwrap();
        }
    }

    /// Blocks until the buffer has free space and returns its size, or `None` once the
    /// stream is closed.
    fn wait_for_space(&self) -> Option<usize> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return None;
            }
            let free = state.ring.free();
            if free > 0 {
                return Some(free);
            }
            self.counters.producer_waits.add(1);
            state = self.space_available.wait(state).unwrap();
        }
    }

    /// Appends freshly read bytes. Returns `false` if the stream was closed meanwhile,
    /// in which case the bytes are discarded.
    fn publish(&self, data: &[u8]) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        let n = state.ring.write(data);
        debug_assert_eq!(n, data.len(), "producer read more than the free space");
        self.counters.bytes_produced.add(n);
        drop(state);
        self.data_available.notify_one();
        true
    }

    fn record_eof(&self) {
        let mut state = self.lock();
        let filled = state.ring.filled();
        state.eof_pos.get_or_insert(filled);
        drop(state);
        self.data_available.notify_all();
    }

    fn record_fault(&self, fault: std::io::Error) {
        let mut state = self.lock();
        if state.fault.is_none() {
            state.fault = Some(Arc::new(fault));
        }
        drop(state);
        self.data_available.notify_all();
    }

    fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.ring.release();
        drop(state);
        log::debug!("prefetch stream closed: {:?}", self.counters.snapshot());
        self.data_available.notify_all();
        self.space_available.notify_all();
        if let Some(interrupt) = &self.interrupt {
            interrupt();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProducerExit {
    EndOfSource,
    Fault,
    Panic,
    Closed,
}

/// Body of the background producer: reads ahead until the source ends, fails, or the
/// stream is closed, then closes the source.
fn run_producer(shared: Arc<Shared>, mut source: Box<dyn ByteSource>) {
    let mut scratch = vec![0u8; shared.config.scratch_size()];
    let produced = std::panic::catch_unwind(AssertUnwindSafe(|| {
        produce(&shared, source.as_mut(), &mut scratch)
    }));
    let exit = produced.unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        log::error!("prefetch source panicked: {message}");
        shared.record_fault(std::io::Error::other(format!(
            "byte source panicked: {message}"
        )));
        ProducerExit::Panic
    });
    log::debug!(
        "prefetch producer finished ({exit:?}) after {} bytes",
        shared.counters.bytes_produced.get()
    );
    if let Err(e) = source.close() {
        log::warn!("failed to close prefetch source: {e}");
    }
}

fn produce(shared: &Shared, source: &mut dyn ByteSource, scratch: &mut [u8]) -> ProducerExit {
    let config = &shared.config;
    loop {
        let Some(free) = shared.wait_for_space() else {
            return ProducerExit::Closed;
        };

        let hint = match source.available_hint() {
            Ok(hint) => hint,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => 0,
            Err(e) => return fail(shared, e),
        };
        let limit = if hint > 0 {
            config.max_chunk_size
        } else {
            config.blocking_chunk_size
        };
        let len = limit.min(free).min(scratch.len());

        match source.read(&mut scratch[..len]) {
            Ok(0) => {
                shared.record_eof();
                return ProducerExit::EndOfSource;
            }
            Ok(n) => {
                let n = n.min(len);
                shared.counters.source_reads.add(1);
                log::trace!("prefetched {n} bytes (hint {hint}, limit {len})");
                if !shared.publish(&scratch[..n]) {
                    return ProducerExit::Closed;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return fail(shared, e),
        }
    }
}

/// Records a source error, unless it is the source reacting to the stream being closed.
fn fail(shared: &Shared, e: std::io::Error) -> ProducerExit {
    if shared.is_closed() {
        log::debug!("prefetch source stopped after close: {e}");
        return ProducerExit::Closed;
    }
    log::warn!("prefetch source failed: {e}");
    shared.record_fault(e);
    ProducerExit::Fault
}

#[derive(Default)]
struct Counter(AtomicU64);

impl Counter {
    fn add(&self, n: usize) {
        self.0.fetch_add(n as u64, Ordering::Relaxed);
    }

    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
struct Counters {
    bytes_produced: Counter,
    bytes_consumed: Counter,
    source_reads: Counter,
    producer_waits: Counter,
    consumer_waits: Counter,
}

impl Counters {
    fn snapshot(&self) -> PrefetchStats {
        PrefetchStats {
            bytes_produced: self.bytes_produced.get(),
            bytes_consumed: self.bytes_consumed.get(),
            source_reads: self.source_reads.get(),
            producer_waits: self.producer_waits.get(),
            consumer_waits: self.consumer_waits.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, ReadSource};
    use std::{
        collections::VecDeque,
        sync::{atomic::AtomicBool, mpsc},
        thread,
        time::Duration,
    };

    /// Yields scripted chunks, records the read sizes it was asked for, then either ends
    /// or fails.
    struct ChunkSource {
        chunks: VecDeque<Vec<u8>>,
        fail_at_end: bool,
        requested: Arc<Mutex<Vec<usize>>>,
        closed: Arc<AtomicBool>,
    }

    impl ChunkSource {
        fn new(chunks: Vec<Vec<u8>>) -> ChunkSource {
            ChunkSource {
                chunks: chunks.into(),
                fail_at_end: false,
                requested: Default::default(),
                closed: Default::default(),
            }
        }
    }

    impl ByteSource for ChunkSource {
        fn available_hint(&mut self) -> std::io::Result<usize> {
            Ok(self.chunks.front().map_or(0, Vec::len))
        }

        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.requested.lock().unwrap().push(buf.len());
            let Some(chunk) = self.chunks.front_mut() else {
                if self.fail_at_end {
                    return Err(std::io::Error::other("disk on fire"));
                }
                return Ok(0);
            };
            let n = buf.len().min(chunk.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            chunk.drain(..n);
            if chunk.is_empty() {
                self.chunks.pop_front();
            }
            Ok(n)
        }

        fn close(&mut self) -> std::io::Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..500 {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_read_to_end_in_small_calls() {
        let data = pattern(10_000);
        let stream =
            PrefetchStream::new(MemorySource::new(data.clone()), PrefetchConfig::new(64, 16, 8))
                .unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 13];
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            assert!(n <= buf.len());
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, data);
        // End of stream is sticky.
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
        assert_eq!(stream.read_byte().unwrap(), None);

        let stats = stream.stats();
        assert_eq!(stats.bytes_produced, 10_000);
        assert_eq!(stats.bytes_consumed, 10_000);
    }

    #[test]
    fn test_std_read_to_end() {
        let data = pattern(4096);
        let mut stream = PrefetchStream::new(
            ReadSource::new(std::io::Cursor::new(data.clone())),
            PrefetchConfig::new(100, 40, 30),
        )
        .unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_read_byte() {
        let stream =
            PrefetchStream::new(MemorySource::new(b"abc".to_vec()), PrefetchConfig::default())
                .unwrap();
        assert_eq!(stream.read_byte().unwrap(), Some(b'a'));
        assert_eq!(stream.read_byte().unwrap(), Some(b'b'));
        assert_eq!(stream.read_byte().unwrap(), Some(b'c'));
        assert_eq!(stream.read_byte().unwrap(), None);
    }

    #[test]
    fn test_chunk_size_follows_hint() {
        let source = ChunkSource::new(vec![pattern(20)]);
        let requested = source.requested.clone();
        let stream = PrefetchStream::new(source, PrefetchConfig::new(64, 8, 4)).unwrap();
        let mut out = Vec::new();
        (&stream).read_to_end(&mut out).unwrap();
        assert_eq!(out, pattern(20));

        let requested = requested.lock().unwrap().clone();
        // Chunk reads are capped by the max chunk size; the final read after the source
        // runs dry has no hint and uses the blocking chunk size.
        assert_eq!(requested, vec![8, 8, 8, 4]);
    }

    #[test]
    fn test_producer_waits_for_space() {
        let stream = PrefetchStream::new(
            MemorySource::new(pattern(64)),
            PrefetchConfig::new(16, 8, 4),
        )
        .unwrap();
        assert!(wait_until(|| stream.available().unwrap() == 16));
        // The buffer is full; the producer must be parked rather than overwriting.
        thread::sleep(Duration::from_millis(20));
        assert_eq!(stream.available().unwrap(), 16);
        assert_eq!(stream.stats().bytes_produced, 16);

        let mut out = Vec::new();
        (&stream).read_to_end(&mut out).unwrap();
        assert_eq!(out, pattern(64));
        assert!(stream.stats().producer_waits >= 1);
    }

    #[test]
    fn test_buffered_bytes_drain_before_fault() {
        let mut source = ChunkSource::new(vec![b"hello".to_vec()]);
        source.fail_at_end = true;
        let stream = PrefetchStream::new(source, PrefetchConfig::new(64, 8, 4)).unwrap();

        let mut buf = [0u8; 16];
        let mut got = Vec::new();
        let err = loop {
            match stream.read(&mut buf) {
                Ok(n) => got.extend_from_slice(&buf[..n]),
                Err(e) => break e,
            }
        };
        assert_eq!(got, b"hello");
        assert!(err.is_source_fault());
        assert!(err.to_string().contains("disk on fire"));

        // Sticky until close.
        for _ in 0..3 {
            assert!(stream.read(&mut buf).unwrap_err().is_source_fault());
            assert!(stream.read_byte().unwrap_err().is_source_fault());
        }
        stream.close().unwrap();
        assert!(stream.read(&mut buf).unwrap_err().is_stream_closed());
    }

    #[test]
    fn test_source_closed_after_end() {
        let source = ChunkSource::new(vec![pattern(10)]);
        let closed = source.closed.clone();
        let stream = PrefetchStream::new(source, PrefetchConfig::default()).unwrap();
        let mut out = Vec::new();
        (&stream).read_to_end(&mut out).unwrap();
        assert!(wait_until(|| closed.load(Ordering::SeqCst)));
    }

    #[test]
    fn test_close_is_idempotent_and_releases_source() {
        let source = ChunkSource::new(vec![pattern(1000)]);
        let closed = source.closed.clone();
        let stream = PrefetchStream::new(source, PrefetchConfig::new(16, 8, 4)).unwrap();
        assert!(wait_until(|| stream.available().unwrap() == 16));

        stream.close().unwrap();
        stream.close().unwrap();
        assert!(stream.is_closed());
        assert!(stream.available().unwrap_err().is_stream_closed());
        assert!(stream.read_byte().unwrap_err().is_stream_closed());
        // The producer was parked waiting for space; close wakes it and it releases
        // the source.
        assert!(wait_until(|| closed.load(Ordering::SeqCst)));
    }

    #[test]
    fn test_close_wakes_blocked_consumer() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let stream = Arc::new(
            PrefetchStream::new(
                ReadSource::new(GateReader(release_rx)),
                PrefetchConfig::default(),
            )
            .unwrap(),
        );

        let (done_tx, done_rx) = mpsc::channel();
        {
            let stream = stream.clone();
            thread::spawn(move || {
                let mut buf = [0u8; 8];
                done_tx.send(stream.read(&mut buf)).unwrap();
            });
        }
        // The reader is blocked: nothing has been produced.
        assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());

        stream.close().unwrap();
        let result = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(result.unwrap_err().is_stream_closed());
        drop(release_tx);
    }

    /// Blocks every read until the paired sender is dropped, then reports end of input.
    struct GateReader(mpsc::Receiver<()>);

    impl Read for GateReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    #[test]
    fn test_close_interrupts_blocked_reader() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let woke = Arc::new(AtomicBool::new(false));
        let reader = {
            let woke = woke.clone();
            WakeReader {
                gate: release_rx,
                woke,
            }
        };
        let release_tx = Mutex::new(Some(release_tx));
        let source = ReadSource::new(reader).with_interrupt(move || {
            release_tx.lock().unwrap().take();
        });
        let stream = PrefetchStream::new(source, PrefetchConfig::default()).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(!woke.load(Ordering::SeqCst));

        stream.close().unwrap();
        assert!(wait_until(|| woke.load(Ordering::SeqCst)));
        assert!(stream.read(&mut [0u8; 4]).unwrap_err().is_stream_closed());
    }

    /// Blocks until the paired sender is dropped, then records the wakeup and hands out
    /// data, which a closed stream must discard.
    struct WakeReader {
        gate: mpsc::Receiver<()>,
        woke: Arc<AtomicBool>,
    }

    impl Read for WakeReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let _ = self.gate.recv();
            self.woke.store(true, Ordering::SeqCst);
            buf.fill(1);
            Ok(buf.len())
        }
    }

    struct PanickingSource {
        served: bool,
    }

    impl ByteSource for PanickingSource {
        fn available_hint(&mut self) -> std::io::Result<usize> {
            Ok(if self.served { 0 } else { 3 })
        }

        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.served {
                panic!("decoder bug");
            }
            self.served = true;
            buf[..3].copy_from_slice(b"abc");
            Ok(3)
        }
    }

    #[test]
    fn test_source_panic_becomes_sticky_fault() {
        let stream =
            PrefetchStream::new(PanickingSource { served: false }, PrefetchConfig::default())
                .unwrap();

        let (tx, rx) = mpsc::channel();
        let stream = Arc::new(stream);
        {
            let stream = stream.clone();
            thread::spawn(move || {
                let mut out = Vec::new();
                let mut buf = [0u8; 4];
                let err = loop {
                    match stream.read(&mut buf) {
                        Ok(n) => out.extend_from_slice(&buf[..n]),
                        Err(e) => break e,
                    }
                };
                tx.send((out, err)).unwrap();
            });
        }
        let (out, err) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(out, b"abc");
        assert!(err.is_source_fault());
        assert!(err.to_string().contains("decoder bug"), "{err}");
        assert!(stream.read_byte().unwrap_err().is_source_fault());
    }

    #[test]
    fn test_available_never_overstates() {
        let data = pattern(5000);
        let stream =
            PrefetchStream::new(MemorySource::new(data.clone()), PrefetchConfig::new(32, 8, 8))
                .unwrap();
        let mut consumed = 0usize;
        let mut buf = [0u8; 7];
        loop {
            let available = stream.available().unwrap();
            let stats = stream.stats();
            assert!(available as u64 <= stats.bytes_produced - consumed as u64);
            assert!(available <= 32);
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            assert!(n >= available.min(buf.len()));
            consumed += n;
        }
        assert_eq!(consumed, data.len());
    }

    #[test]
    fn test_empty_destination() {
        let stream =
            PrefetchStream::new(MemorySource::new(pattern(4)), PrefetchConfig::default()).unwrap();
        assert_eq!(stream.read(&mut []).unwrap(), 0);
        let mut out = Vec::new();
        (&stream).read_to_end(&mut out).unwrap();
        assert_eq!(out, pattern(4));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = PrefetchStream::new(MemorySource::new(vec![]), PrefetchConfig::new(0, 1, 1))
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            tome_common::error::ErrorKind::InvalidArgument { .. }
        ));
    }

    #[test]
    fn test_empty_source() {
        let stream =
            PrefetchStream::new(MemorySource::new(vec![]), PrefetchConfig::default()).unwrap();
        assert_eq!(stream.read_byte().unwrap(), None);
        assert_eq!(stream.available().unwrap(), 0);
    }

    #[test]
    fn test_io_error_kind_on_closed_stream() {
        let mut stream =
            PrefetchStream::new(MemorySource::new(pattern(8)), PrefetchConfig::default()).unwrap();
        stream.close().unwrap();
        let mut buf = [0u8; 4];
        let err = Read::read(&mut stream, &mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotConnected);
    }
}
