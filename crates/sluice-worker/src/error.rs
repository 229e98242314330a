use thiserror::Error;

/// Failures controlling a [`Task`](crate::Task).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskError {
    #[error("failed to spawn task thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("task cannot join itself")]
    JoinSelf,

    #[error("task body panicked")]
    Panicked,

    #[error("task is still shutting down")]
    Busy,
}

pub type TaskResult<T> = Result<T, TaskError>;
