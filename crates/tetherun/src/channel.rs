//! # Channel Client
//!
//! The caller's half of the two-context channel. Spawns the transport
//! context, posts requests to it and receives its responses either
//! asynchronously or by blocking the calling thread.
//!
//! ## Receiving
//!
//! - **Async**: responses not claimed by a blocking exchange land in a FIFO
//!   inbox. `receive` pops from it or parks a single one-shot waiter.
//! - **Blocking**: `blocking_receive` registers a handoff with the transport
//!   context and waits on it with a timeout. A response that is already
//!   queued is returned without a round trip.
//!
//! At most one exchange may be outstanding at a time.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing::debug;

use crate::config::Config;
use crate::context;
use crate::context::ContextJoin;
use crate::context::ContextSpawner;
use crate::endpoint::Outbox;
use crate::endpoint::TransportEndpoint;
use crate::handoff::Handoff;
use crate::message::ContextRequest;
use crate::message::ContextResponse;
use crate::message::ContextResponseKind;
use crate::message::Envelope;
use crate::transport::Connector;

const CONTEXT_NAME: &str = "tether-transport";

#[derive(Debug)]
pub enum Error {
    Context(context::Error),
    /// The transport context has stopped and no longer accepts requests.
    ContextStopped,
    UnexpectedResponse {
        expected: ContextResponseKind,
        actual: ContextResponseKind,
    },
    /// The socket went away while a response was outstanding.
    TransportLost,
    Timeout {
        expected: ContextResponseKind,
        after: Duration,
    },
    /// An async receive was started while another was still waiting.
    ConcurrentReceive,
    /// The inbox was closed with nothing left in it.
    Disconnected,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Context(e) => write!(f, "Context error: {}", e),
            Self::ContextStopped => write!(f, "Transport context has stopped"),
            Self::UnexpectedResponse { expected, actual } => {
                write!(f, "Expected {} but received {}", expected, actual)
            }
            Self::TransportLost => write!(f, "Connection to the remote debugger was lost"),
            Self::Timeout { expected, after } => {
                write!(f, "Timed out after {:?} waiting for {}", after, expected)
            }
            Self::ConcurrentReceive => write!(f, "Can't wait for multiple responses at once"),
            Self::Disconnected => write!(f, "Response channel closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Context(e) => Some(e),
            _ => None,
        }
    }
}

impl From<context::Error> for Error {
    fn from(e: context::Error) -> Self {
        Self::Context(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

enum Next {
    Ready(ContextResponse),
    Wait(oneshot::Receiver<ContextResponse>),
    Closed,
}

struct InboxState {
    queue: VecDeque<ContextResponse>,
    waiter: Option<oneshot::Sender<ContextResponse>>,
    closed: bool,
}

/// Responses posted by the transport context for async consumption.
pub struct Inbox {
    state: Mutex<InboxState>,
}

impl Inbox {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InboxState {
                queue: VecDeque::new(),
                waiter: None,
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, InboxState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn pop(&self) -> Option<ContextResponse> {
        self.lock().queue.pop_front()
    }

    fn next(&self) -> Result<Next> {
        let mut state = self.lock();
        if let Some(response) = state.queue.pop_front() {
            return Ok(Next::Ready(response));
        }
        if state.closed {
            return Ok(Next::Closed);
        }
        if state.waiter.as_ref().is_some_and(|waiter| !waiter.is_closed()) {
            return Err(Error::ConcurrentReceive);
        }

        let (tx, rx) = oneshot::channel();
        state.waiter = Some(tx);
        Ok(Next::Wait(rx))
    }

    pub fn pending_len(&self) -> usize {
        self.lock().queue.len()
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Outbox for Inbox {
    fn deliver(&self, response: ContextResponse) {
        let mut state = self.lock();
        let response = match state.waiter.take() {
            Some(waiter) => match waiter.send(response) {
                Ok(()) => return,
                // the receive future was dropped; keep the response
                Err(response) => response,
            },
            None => response,
        };
        state.queue.push_back(response);
    }

    fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.waiter = None;
    }
}

/// Caller-side handle on a transport context.
pub struct ChannelClient {
    config: Config,
    requests: mpsc::UnboundedSender<Envelope>,
    inbox: Arc<Inbox>,
    context: Mutex<Option<Box<dyn ContextJoin>>>,
}

impl ChannelClient {
    /// Spawns a transport context that connects through `connector`.
    ///
    /// The socket is not opened until a `Configure` request is posted.
    pub fn spawn(
        config: Config,
        connector: Arc<dyn Connector>,
        spawner: &dyn ContextSpawner,
    ) -> Result<Self> {
        let (requests, rx) = mpsc::unbounded_channel();
        let inbox = Arc::new(Inbox::new());

        let endpoint = TransportEndpoint::new(connector, inbox.clone());
        let context = spawner.spawn(CONTEXT_NAME, Box::pin(endpoint.run(rx)))?;

        Ok(Self {
            config,
            requests,
            inbox,
            context: Mutex::new(Some(context)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of responses waiting in the inbox.
    pub fn queued_len(&self) -> usize {
        self.inbox.pending_len()
    }

    pub fn post_request(&self, request: ContextRequest, is_blocking: bool) -> Result<()> {
        if self.config.debug_enabled {
            debug!(request = request.name(), is_blocking, "[caller] post");
        }

        self.requests
            .send(Envelope { request, is_blocking })
            .map_err(|_| Error::ContextStopped)
    }

    /// Waits asynchronously for the next response, which must be of `kind`.
    pub async fn receive(&self, kind: ContextResponseKind) -> Result<ContextResponse> {
        let response = match self.inbox.next()? {
            Next::Ready(response) => response,
            Next::Wait(rx) => rx.await.map_err(|_| Error::Disconnected)?,
            Next::Closed => return Err(Error::Disconnected),
        };

        if self.config.debug_enabled {
            debug!(response = %response.kind(), "[caller] received");
        }
        check_kind(response, kind)
    }

    /// Blocks the calling thread until the next response of the current
    /// blocking exchange arrives or the configured timeout elapses.
    ///
    /// After a timeout the client remains usable; a late response is
    /// discarded by the transport context.
    pub fn blocking_receive(&self, kind: ContextResponseKind) -> Result<ContextResponse> {
        if let Some(response) = self.inbox.pop() {
            return check_kind(response, kind);
        }

        let handoff = Arc::new(Handoff::new());
        self.post_request(ContextRequest::BlockingReceive(handoff.clone()), true)?;

        let timeout = self.config.blocking_timeout;
        let Some(response) = handoff.take_timeout(timeout) else {
            return Err(Error::Timeout {
                expected: kind,
                after: timeout,
            });
        };

        if self.config.debug_enabled {
            debug!(response = %response.kind(), "[caller] received (blocking)");
        }
        check_kind(response, kind)
    }

    /// Closes the socket, waits for the acknowledgement and joins the
    /// transport context.
    pub async fn terminate(&self) -> Result<()> {
        let result = match self.post_request(ContextRequest::Terminate, false) {
            Ok(()) => self.receive(ContextResponseKind::Terminated).await.map(|_| ()),
            Err(e) => Err(e),
        };

        let context = self
            .context
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(context) = context {
            context.join()?;
        }

        result
    }
}

fn check_kind(response: ContextResponse, expected: ContextResponseKind) -> Result<ContextResponse> {
    let actual = response.kind();
    if actual == expected {
        return Ok(response);
    }
    if actual == ContextResponseKind::Terminated {
        return Err(Error::TransportLost);
    }
    Err(Error::UnexpectedResponse { expected, actual })
}
