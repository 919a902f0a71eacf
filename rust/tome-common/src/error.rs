use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn configuration(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::Configuration {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn worker<E>(index: i64, source: E) -> Error
    where
        E: Into<StdErrorBoxed>,
    {
        Error(
            ErrorKind::Worker {
                index,
                source: source.into(),
            }
            .into(),
        )
    }

    pub fn worker_panic(index: i64, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::WorkerPanic {
                index,
                message: message.into(),
            }
            .into(),
        )
    }

    /// Wraps a byte source failure. The underlying error is shared, so the same
    /// fault can be reported on every read after it was first observed.
    pub fn source(source: Arc<std::io::Error>) -> Error {
        Error(ErrorKind::Source { source }.into())
    }

    pub fn stream_closed() -> Error {
        Error(ErrorKind::StreamClosed.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    /// Returns `true` for a sticky byte source fault.
    pub fn is_source_fault(&self) -> bool {
        matches!(self.kind(), ErrorKind::Source { .. })
    }

    /// Returns `true` if the operation was attempted on a closed stream.
    pub fn is_stream_closed(&self) -> bool {
        matches!(self.kind(), ErrorKind::StreamClosed)
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid range configuration: {message}")]
    Configuration { message: String },

    #[error("work item {index} failed: {source}")]
    Worker { index: i64, source: StdErrorBoxed },

    #[error("work item {index} panicked: {message}")]
    WorkerPanic { index: i64, message: String },

    #[error("byte source failed: {source}")]
    Source { source: Arc<std::io::Error> },

    #[error("stream is closed")]
    StreamClosed,

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        let kind = match e.kind() {
            ErrorKind::Source { source } => source.kind(),
            ErrorKind::Io { source, .. } => source.kind(),
            ErrorKind::StreamClosed => std::io::ErrorKind::NotConnected,
            ErrorKind::InvalidArgument { .. } | ErrorKind::Configuration { .. } => {
                std::io::ErrorKind::InvalidInput
            }
            ErrorKind::Worker { .. } | ErrorKind::WorkerPanic { .. } => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, e)
    }
}
