use thiserror::Error;

/// Buffer pool failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PoolError {
    #[error("pool is flushing")]
    Flushing,

    #[error("pool is not active")]
    Inactive,

    #[error("pool configuration cannot change while active")]
    Busy,

    #[error("invalid pool configuration: {0}")]
    InvalidConfig(&'static str),
}

pub type PoolResult<T> = Result<T, PoolError>;
