//! # Execution Contexts
//!
//! The transport endpoint runs in its own execution context so the caller can
//! block while the socket keeps being serviced. A spawner decides what that
//! context is; the default is an OS thread driving a current-thread tokio
//! runtime.

use std::future::Future;
use std::pin::Pin;
use std::thread::JoinHandle;

#[derive(Debug)]
pub enum Error {
    Spawn(String),
    Join(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(msg) => write!(f, "Failed to spawn transport context: {}", msg),
            Self::Join(msg) => write!(f, "Transport context did not stop cleanly: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// The work a transport context runs to completion.
pub type ContextTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Starts transport contexts.
pub trait ContextSpawner: Send + Sync {
    fn spawn(&self, name: &str, task: ContextTask) -> Result<Box<dyn ContextJoin>>;
}

/// Handle to a running transport context.
pub trait ContextJoin: Send {
    /// Waits until the context has fully stopped.
    fn join(self: Box<Self>) -> Result<()>;
}

/// Runs each transport context on a dedicated thread.
///
/// The thread owns its runtime, so the caller may block on any thread.
#[derive(Debug, Clone, Default)]
pub struct ThreadSpawner;

impl ThreadSpawner {
    pub fn new() -> Self {
        Self
    }
}

impl ContextSpawner for ThreadSpawner {
    fn spawn(&self, name: &str, task: ContextTask) -> Result<Box<dyn ContextJoin>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Spawn(e.to_string()))?;

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || runtime.block_on(task))
            .map_err(|e| Error::Spawn(e.to_string()))?;

        Ok(Box::new(ThreadJoin { handle }))
    }
}

struct ThreadJoin {
    handle: JoinHandle<()>,
}

impl ContextJoin for ThreadJoin {
    fn join(self: Box<Self>) -> Result<()> {
        self.handle
            .join()
            .map_err(|_| Error::Join("transport thread panicked".into()))
    }
}
