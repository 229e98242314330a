use sluice_bufpool::PoolError;
use sluice_worker::TaskError;
use thiserror::Error;

/// Non-success outcome of producing or pushing data.
///
/// `Flushing` and `Eos` are control flow; the rest stop streaming and are
/// reported on the bus by the streaming loop.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowError {
    #[error("flushing")]
    Flushing,

    #[error("end of stream")]
    Eos,

    #[error("not negotiated")]
    NotNegotiated,

    #[error("not linked")]
    NotLinked,

    #[error("not supported")]
    NotSupported,

    #[error("error")]
    Error,
}

impl FlowError {
    /// Failures that end streaming with an element error.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        !matches!(self, Self::Flushing | Self::Eos)
    }
}

impl From<PoolError> for FlowError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::Flushing => Self::Flushing,
            _ => Self::Error,
        }
    }
}

pub type FlowResult<T> = Result<T, FlowError>;

/// Errors returned by source control operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// Caller broke an API precondition.
    #[error("usage error: {0}")]
    Usage(&'static str),

    /// Underlying resource failed (open, read, allocate).
    #[error("resource error: {0}")]
    Resource(String),

    #[error("source is flushing")]
    Flushing,

    #[error("not negotiated")]
    NotNegotiated,

    #[error("source is not seekable")]
    NotSeekable,

    #[error("end of stream")]
    Eos,

    #[error("state change failed: {0}")]
    StateChange(String),

    #[error("streaming task: {0}")]
    Task(#[from] TaskError),

    #[error("buffer pool: {0}")]
    Pool(#[from] PoolError),
}

impl From<FlowError> for SourceError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::Flushing => Self::Flushing,
            FlowError::Eos => Self::Eos,
            FlowError::NotNegotiated => Self::NotNegotiated,
            other => Self::Resource(other.to_string()),
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
