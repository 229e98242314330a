use std::{
    fmt,
    sync::Arc,
    thread::{self, JoinHandle, ThreadId},
};

use sluice_platform::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::error::{TaskError, TaskResult};

/// Lifecycle of a [`Task`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// No thread, or the thread is exiting.
    Stopped,
    /// The body runs in a loop.
    Started,
    /// The thread is parked between iterations.
    Paused,
}

/// What the body wants after an iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskFlow {
    Continue,
    Pause,
}

type Body = Box<dyn FnMut() -> TaskFlow + Send + 'static>;

struct Control {
    state: TaskState,
    /// `start()` arrived while an iteration was running.
    restarted: bool,
    body: Option<Body>,
    thread: Option<JoinHandle<()>>,
    thread_id: Option<ThreadId>,
}

struct Shared {
    name: String,
    control: Mutex<Control>,
    cond: Condvar,
}

/// Worker thread running a loop body.
///
/// Clones are handles to the same task.
#[derive(Clone)]
pub struct Task {
    shared: Arc<Shared>,
}

impl Task {
    /// Create a stopped task. No thread is spawned until [`Task::start`].
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnMut() -> TaskFlow + Send + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                control: Mutex::new(Control {
                    state: TaskState::Stopped,
                    restarted: false,
                    body: Some(Box::new(body)),
                    thread: None,
                    thread_id: None,
                }),
                cond: Condvar::new(),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        self.shared.control.lock().state
    }

    /// Whether the caller is running on this task's thread.
    #[must_use]
    pub fn is_current_thread(&self) -> bool {
        self.shared.control.lock().thread_id == Some(thread::current().id())
    }

    /// Start the loop, spawning the thread if needed, or resume a paused one.
    ///
    /// Called while an iteration runs, it overrides a `Pause` returned by
    /// that iteration.
    pub fn start(&self) -> TaskResult<()> {
        self.set_state(TaskState::Started)
    }

    /// Park the loop after the current iteration. Spawns a parked thread
    /// when the task is stopped.
    pub fn pause(&self) -> TaskResult<()> {
        self.set_state(TaskState::Paused)
    }

    /// Ask the loop to exit after the current iteration. Does not wait.
    pub fn stop(&self) {
        let mut control = self.shared.control.lock();
        if control.state != TaskState::Stopped {
            trace!(task = %self.shared.name, "task stop");
            control.state = TaskState::Stopped;
            drop(control);
            self.shared.cond.notify_all();
        }
    }

    /// Wait for the thread to exit. Call [`Task::stop`] first.
    ///
    /// Fails with [`TaskError::JoinSelf`] on the task's own thread; the
    /// thread then exits on its own once the body returns.
    pub fn join(&self) -> TaskResult<()> {
        let handle = {
            let mut control = self.shared.control.lock();
            if control.thread_id == Some(thread::current().id()) {
                return Err(TaskError::JoinSelf);
            }
            control.thread.take()
        };
        let Some(handle) = handle else {
            return Ok(());
        };
        let joined = handle.join();
        let mut control = self.shared.control.lock();
        control.thread_id = None;
        if joined.is_err() {
            control.state = TaskState::Stopped;
            return Err(TaskError::Panicked);
        }
        debug!(task = %self.shared.name, "task joined");
        Ok(())
    }

    fn set_state(&self, target: TaskState) -> TaskResult<()> {
        let mut control = self.shared.control.lock();
        if control.state == target {
            if target == TaskState::Started {
                control.restarted = true;
            }
            return Ok(());
        }
        if control.state == TaskState::Stopped {
            if control.body.is_none() {
                // Previous thread has not handed the body back yet.
                return Err(if control.thread.is_some() {
                    TaskError::Busy
                } else {
                    TaskError::Panicked
                });
            }
            if let Some(stale) = control.thread.take() {
                // Exited already (body is back); reap it.
                drop(control);
                if stale.join().is_err() {
                    warn!(task = %self.shared.name, "previous task thread panicked");
                }
                control = self.shared.control.lock();
            }
            let Some(body) = control.body.take() else {
                return Err(TaskError::Busy);
            };
            control.state = target;
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(self.shared.name.clone())
                .spawn(move || run(&shared, body));
            match spawned {
                Ok(handle) => {
                    control.thread_id = Some(handle.thread().id());
                    control.thread = Some(handle);
                }
                Err(e) => {
                    control.state = TaskState::Stopped;
                    return Err(TaskError::Spawn(e));
                }
            }
            debug!(task = %self.shared.name, state = ?target, "task spawned");
            return Ok(());
        }
        trace!(task = %self.shared.name, from = ?control.state, to = ?target, "task state");
        control.state = target;
        drop(control);
        self.shared.cond.notify_all();
        Ok(())
    }
}

fn run(shared: &Shared, mut body: Body) {
    loop {
        {
            let mut control = shared.control.lock();
            while control.state == TaskState::Paused {
                shared.cond.wait(&mut control);
            }
            if control.state == TaskState::Stopped {
                break;
            }
            control.restarted = false;
        }

        if body() == TaskFlow::Pause {
            let mut control = shared.control.lock();
            if control.state == TaskState::Started && !control.restarted {
                trace!(task = %shared.name, "task paused itself");
                control.state = TaskState::Paused;
            }
        }
    }
    // Handing the body back lets a later start() respawn.
    shared.control.lock().body = Some(body);
    trace!(task = %shared.name, "task thread exit");
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .finish()
    }
}
