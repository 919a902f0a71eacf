//! `ByteSource` implementations with scripted behavior.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Condvar, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use tome_io::{ByteSource, source::InterruptHandle};

/// Observes a scripted source after it has been moved into a stream.
#[derive(Clone, Default)]
pub struct SourceTracker {
    requested: Arc<Mutex<Vec<usize>>>,
    reads: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl SourceTracker {
    /// Buffer lengths passed to every `read` call, in order.
    pub fn requested(&self) -> Vec<usize> {
        self.requested.lock().unwrap().clone()
    }

    /// Number of `read` calls made so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Polls until the source is closed or `timeout` elapses.
    pub fn wait_closed(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_closed() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        true
    }

    fn record_read(&self, len: usize) {
        self.requested.lock().unwrap().push(len);
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

/// Serves a fixed sequence of chunks: a read never crosses a chunk boundary.
///
/// When hints are enabled, the availability hint is the unread part of the current chunk.
/// After the last chunk, reads report the end of the source or the scripted failure.
pub struct ScriptedSource {
    chunks: VecDeque<Vec<u8>>,
    hints: bool,
    failure: Option<(std::io::ErrorKind, String)>,
    hint_failure: Option<(std::io::ErrorKind, String)>,
    /// Pending `Interrupted` errors for `available_hint` and `read`.
    hint_interruptions: usize,
    read_interruptions: usize,
    tracker: SourceTracker,
}

impl ScriptedSource {
    pub fn new(chunks: impl IntoIterator<Item = Vec<u8>>) -> ScriptedSource {
        ScriptedSource {
            chunks: chunks.into_iter().filter(|c| !c.is_empty()).collect(),
            hints: true,
            failure: None,
            hint_failure: None,
            hint_interruptions: 0,
            read_interruptions: 0,
            tracker: SourceTracker::default(),
        }
    }

    /// Splits `data` into chunks of the given sizes; leftover bytes form a final chunk.
    pub fn from_sizes(data: &[u8], sizes: &[usize]) -> ScriptedSource {
        let mut chunks = Vec::with_capacity(sizes.len() + 1);
        let mut offset = 0;
        for &size in sizes {
            let end = (offset + size).min(data.len());
            chunks.push(data[offset..end].to_vec());
            offset = end;
        }
        chunks.push(data[offset..].to_vec());
        ScriptedSource::new(chunks)
    }

    /// Reports no availability hint, as a socket or pipe would.
    pub fn without_hints(mut self) -> Self {
        self.hints = false;
        self
    }

    /// Fails every read after the scripted chunks are exhausted.
    pub fn fail_at_end(mut self, kind: std::io::ErrorKind, message: impl Into<String>) -> Self {
        self.failure = Some((kind, message.into()));
        self
    }

    /// Fails every `available_hint` call after the scripted chunks are exhausted.
    pub fn fail_hint_at_end(
        mut self,
        kind: std::io::ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        self.hint_failure = Some((kind, message.into()));
        self
    }

    /// Makes the first `count` hint calls and the first `count` reads fail with
    /// `ErrorKind::Interrupted` before behaving normally.
    pub fn with_interruptions(mut self, count: usize) -> Self {
        self.hint_interruptions = count;
        self.read_interruptions = count;
        self
    }

    pub fn tracker(&self) -> SourceTracker {
        self.tracker.clone()
    }
}

impl ByteSource for ScriptedSource {
    fn available_hint(&mut self) -> std::io::Result<usize> {
        if self.hint_interruptions > 0 {
            self.hint_interruptions -= 1;
            return Err(std::io::ErrorKind::Interrupted.into());
        }
        let exhausted = self.chunks.is_empty();
        if let Some((kind, message)) = self.hint_failure.as_ref().filter(|_| exhausted) {
            return Err(std::io::Error::new(*kind, message.clone()));
        }
        if !self.hints {
            return Ok(0);
        }
        Ok(self.chunks.front().map_or(0, Vec::len))
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.tracker.record_read(buf.len());
        if self.read_interruptions > 0 {
            self.read_interruptions -= 1;
            return Err(std::io::ErrorKind::Interrupted.into());
        }
        let Some(chunk) = self.chunks.front_mut() else {
            return match &self.failure {
                Some((kind, message)) => Err(std::io::Error::new(*kind, message.clone())),
                None => Ok(0),
            };
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
        self.chunks.clear();
        self.tracker.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Controls a [`GatedSource`]: each read waits for a permit.
#[derive(Clone, Default)]
pub struct Gate {
    inner: Arc<GateInner>,
}

#[derive(Default)]
struct GateInner {
    state: Mutex<GateState>,
    changed: Condvar,
}

#[derive(Default)]
struct GateState {
    permits: usize,
    open: bool,
    interrupted: bool,
    waiting: usize,
}

impl Gate {
    /// Lets `n` more reads through.
    pub fn allow(&self, n: usize) {
        self.inner.state.lock().unwrap().permits += n;
        self.inner.changed.notify_all();
    }

    /// Lets every current and future read through.
    pub fn open(&self) {
        self.inner.state.lock().unwrap().open = true;
        self.inner.changed.notify_all();
    }

    /// Fails every current and future read that has no permit.
    pub fn interrupt(&self) {
        self.inner.state.lock().unwrap().interrupted = true;
        self.inner.changed.notify_all();
    }

    /// Number of reads currently blocked at the gate.
    pub fn waiting(&self) -> usize {
        self.inner.state.lock().unwrap().waiting
    }

    /// Blocks until at least one read is waiting at the gate, or `timeout` elapses.
    pub fn wait_for_reader(&self, timeout: Duration) -> bool {
        let state = self.inner.state.lock().unwrap();
        let (state, _) = self
            .inner
            .changed
            .wait_timeout_while(state, timeout, |s| s.waiting == 0)
            .unwrap();
        state.waiting > 0
    }

    fn pass(&self) -> std::io::Result<()> {
        let mut state = self.inner.state.lock().unwrap();
        state.waiting += 1;
        self.inner.changed.notify_all();
        while !state.open && state.permits == 0 && !state.interrupted {
            state = self.inner.changed.wait(state).unwrap();
        }
        state.waiting -= 1;
        if state.open {
            Ok(())
        } else if state.permits > 0 {
            state.permits -= 1;
            Ok(())
        } else {
            Err(std::io::Error::other("gated read interrupted"))
        }
    }
}

/// Wraps a source so that every read blocks until its [`Gate`] lets it through.
///
/// Reports no availability hint: every read is a potentially blocking one. Interrupting
/// the source interrupts the gate and the wrapped source.
pub struct GatedSource<S> {
    inner: S,
    gate: Gate,
}

impl<S: ByteSource> GatedSource<S> {
    pub fn new(inner: S) -> (GatedSource<S>, Gate) {
        let gate = Gate::default();
        (
            GatedSource {
                inner,
                gate: gate.clone(),
            },
            gate,
        )
    }
}

impl<S: ByteSource> ByteSource for GatedSource<S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.gate.pass()?;
        self.inner.read(buf)
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.inner.close()
    }

    fn interrupt_handle(&self) -> Option<InterruptHandle> {
        let gate = self.gate.clone();
        let inner = self.inner.interrupt_handle();
        Some(Arc::new(move || {
            gate.interrupt();
            if let Some(inner) = &inner {
                inner();
            }
        }))
    }
}
