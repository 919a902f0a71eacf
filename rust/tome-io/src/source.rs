//! The `ByteSource` trait and its stock implementations.

use std::{
    fs::File,
    io::{Read, Seek},
    path::Path,
    sync::Arc,
};

use tome_workflow::CancellationToken;

/// Callback that makes a source's pending and future reads return promptly.
pub type InterruptHandle = Arc<dyn Fn() + Send + Sync>;

/// A blocking, sequential source of bytes.
///
/// This is the producer side of a [`PrefetchStream`](crate::PrefetchStream): the stream
/// calls these methods from its background thread only.
pub trait ByteSource: Send + 'static {
    /// Returns the number of bytes that can be read without blocking, if known.
    ///
    /// `0` means "unknown": the next `read` may block.
    fn available_hint(&mut self) -> std::io::Result<usize> {
        Ok(0)
    }

    /// Reads up to `buf.len()` bytes into `buf`.
    ///
    /// Returns `Ok(0)` at the end of the source, or a short count when fewer bytes are
    /// ready.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Releases the resources held by the source. Reads after `close` fail.
    fn close(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    /// Returns a callback that unblocks a `read` in progress and fails later ones.
    ///
    /// The stream takes the handle before moving the source to its producer and invokes
    /// it from the thread that closes the stream. `None` means reads cannot be
    /// interrupted; that is only acceptable for sources whose reads never stall.
    fn interrupt_handle(&self) -> Option<InterruptHandle> {
        None
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn available_hint(&mut self) -> std::io::Result<usize> {
        self.as_mut().available_hint()
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.as_mut().read(buf)
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.as_mut().close()
    }

    fn interrupt_handle(&self) -> Option<InterruptHandle> {
        self.as_ref().interrupt_handle()
    }
}

fn closed_source_error() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::NotConnected, "byte source is closed")
}

/// Not `ErrorKind::Interrupted`: that kind means "retry".
fn interrupted_error() -> std::io::Error {
    std::io::Error::other("byte source read was interrupted")
}

/// Adapts any `std::io::Read` into a `ByteSource` with no availability hint.
///
/// Every read may block, so a stream over this source always uses its blocking chunk size.
/// Once interrupted, reads fail without touching the reader. A read already blocked in
/// the reader is only woken by a hook registered with
/// [`with_interrupt`](Self::with_interrupt), such as shutting down a socket.
pub struct ReadSource<R> {
    inner: Option<R>,
    interrupted: CancellationToken,
    on_interrupt: Option<InterruptHandle>,
}

impl<R: Read + Send + 'static> ReadSource<R> {
    pub fn new(inner: R) -> ReadSource<R> {
        ReadSource {
            inner: Some(inner),
            interrupted: CancellationToken::new(),
            on_interrupt: None,
        }
    }

    /// Registers a hook that unblocks the underlying reader when the source is
    /// interrupted.
    pub fn with_interrupt(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_interrupt = Some(Arc::new(hook));
        self
    }
}

impl<R: Read + Send + 'static> ByteSource for ReadSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.interrupted.is_cancelled() {
            return Err(interrupted_error());
        }
        self.inner
            .as_mut()
            .ok_or_else(closed_source_error)?
            .read(buf)
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.inner = None;
        Ok(())
    }

    fn interrupt_handle(&self) -> Option<InterruptHandle> {
        let interrupted = self.interrupted.clone();
        let hook = self.on_interrupt.clone();
        Some(Arc::new(move || {
            interrupted.cancel();
            if let Some(hook) = &hook {
                hook();
            }
        }))
    }
}

/// A file read sequentially from its current position.
///
/// The availability hint is the distance to the end of the file as measured when it was
/// opened, so reads over local files use the larger read-ahead chunk.
pub struct FileSource {
    file: Option<File>,
    len: u64,
    position: u64,
    interrupted: CancellationToken,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<FileSource> {
        Self::from_file(File::open(path)?)
    }

    pub fn from_file(mut file: File) -> std::io::Result<FileSource> {
        let len = file.metadata()?.len();
        let position = file.stream_position()?;
        Ok(FileSource {
            file: Some(file),
            len,
            position,
            interrupted: CancellationToken::new(),
        })
    }

    /// Size of the file when it was opened.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl ByteSource for FileSource {
    fn available_hint(&mut self) -> std::io::Result<usize> {
        if self.file.is_none() {
            return Err(closed_source_error());
        }
        let remaining = self.len.saturating_sub(self.position);
        Ok(usize::try_from(remaining).unwrap_or(usize::MAX))
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.interrupted.is_cancelled() {
            return Err(interrupted_error());
        }
        let file = self.file.as_mut().ok_or_else(closed_source_error)?;
        let n = file.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.file = None;
        Ok(())
    }

    fn interrupt_handle(&self) -> Option<InterruptHandle> {
        let interrupted = self.interrupted.clone();
        Some(Arc::new(move || interrupted.cancel()))
    }
}

/// An in-memory source; everything it holds is immediately available.
pub struct MemorySource {
    data: Vec<u8>,
    pos: usize,
    closed: bool,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> MemorySource {
        MemorySource {
            data: data.into(),
            pos: 0,
            closed: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl ByteSource for MemorySource {
    fn available_hint(&mut self) -> std::io::Result<usize> {
        if self.closed {
            return Err(closed_source_error());
        }
        Ok(self.remaining())
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.closed {
            return Err(closed_source_error());
        }
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.closed = true;
        self.data = Vec::new();
        self.pos = 0;
        Ok(())
    }
}
