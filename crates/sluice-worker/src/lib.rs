//! Worker thread primitive for streaming loops.
//!
//! A [`Task`] owns one OS thread that calls a loop body repeatedly while the
//! task is [`TaskState::Started`]. The body decides after every iteration
//! whether to keep going ([`TaskFlow::Continue`]) or park the task
//! ([`TaskFlow::Pause`]). Control threads can pause, resume and stop it at any
//! time; state changes take effect between iterations, so anything the body
//! must not race with is serialized by the lock the body itself takes.
//!
//! Stopping never interrupts an iteration. Callers that need the body to
//! return promptly unblock it first (flushing), then call [`Task::stop`] and
//! [`Task::join`].

#![forbid(unsafe_code)]

mod error;
mod task;

pub use error::{TaskError, TaskResult};
pub use task::{Task, TaskFlow, TaskState};
