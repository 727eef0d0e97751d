//! # Transport Endpoint
//!
//! Owns the socket to the remote debugger. Runs inside the transport context
//! and never blocks, so it can keep servicing the socket while the caller
//! context is parked in a blocking exchange.
//!
//! ## Routing
//!
//! Every envelope carries an `is_blocking` tag which the endpoint adopts
//! before dispatching it. Responses produced while the tag is set go to the
//! blocking rendezvous; all others are posted to the caller's outbox.
//!
//! ## Invariants
//!
//! - `SetConfiguration` is always emitted before `OnSocketOpen`.
//! - Socket loss is reported as a synthetic `Terminated`, routed like any
//!   other response so blocking callers fail fast.
//! - Logic violations are logged and the offending request is dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use tetherpc::SocketFrame;

use crate::config::Configuration;
use crate::handoff::Consume;
use crate::handoff::Handoff;
use crate::handoff::Push;
use crate::handoff::Rendezvous;
use crate::message::ContextRequest;
use crate::message::ContextResponse;
use crate::message::Envelope;
use crate::transport;
use crate::transport::Connector;
use crate::transport::Socket;

/// Where non-blocking responses go.
pub trait Outbox: Send + Sync + 'static {
    fn deliver(&self, response: ContextResponse);

    /// Called once when the endpoint loop exits.
    fn close(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unconfigured,
    Opening,
    Open,
    Closed,
}

enum Event {
    Request(Option<Envelope>),
    Socket(transport::Result<Option<SocketFrame>>),
}

enum Flow {
    Continue,
    Stop,
}

pub struct TransportEndpoint {
    connector: Arc<dyn Connector>,
    outbox: Arc<dyn Outbox>,
    state: State,
    debug_enabled: bool,
    is_blocking: bool,
    socket: Option<Box<dyn Socket>>,
    rendezvous: Rendezvous<ContextResponse>,
}

impl TransportEndpoint {
    pub fn new(connector: Arc<dyn Connector>, outbox: Arc<dyn Outbox>) -> Self {
        Self {
            connector,
            outbox,
            state: State::Unconfigured,
            debug_enabled: false,
            is_blocking: false,
            socket: None,
            rendezvous: Rendezvous::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Services caller requests and socket frames until terminated or until
    /// the caller drops its sender.
    pub async fn run(mut self, mut requests: mpsc::UnboundedReceiver<Envelope>) {
        loop {
            let event = match &self.socket {
                Some(socket) => tokio::select! {
                    envelope = requests.recv() => Event::Request(envelope),
                    frame = socket.recv() => Event::Socket(frame),
                },
                None => Event::Request(requests.recv().await),
            };

            match event {
                Event::Request(Some(envelope)) => {
                    if let Flow::Stop = self.handle_request(envelope).await {
                        break;
                    }
                }
                Event::Request(None) => {
                    debug!("caller went away, shutting down transport");
                    self.shutdown().await;
                    break;
                }
                Event::Socket(Ok(Some(frame))) => {
                    if self.debug_enabled {
                        debug!(?frame, "[transport] <- [socket]");
                    }
                    self.route(ContextResponse::Socket(frame));
                }
                Event::Socket(Ok(None)) => {
                    warn!("socket closed by the remote debugger");
                    self.lose_transport();
                }
                Event::Socket(Err(e)) => {
                    error!("socket error: {}", e);
                    self.lose_transport();
                }
            }
        }

        // a caller still parked on the rendezvous must not wait out its timeout
        if self.rendezvous.has_consumer() {
            self.rendezvous.interrupt(ContextResponse::Terminated);
        }
        self.outbox.close();
    }

    async fn handle_request(&mut self, envelope: Envelope) -> Flow {
        let Envelope { request, is_blocking } = envelope;

        if self.debug_enabled {
            debug!(request = request.name(), is_blocking, "[caller] -> [transport]");
        }

        let was_blocking = self.is_blocking;
        self.is_blocking = is_blocking;

        match request {
            ContextRequest::Configure(configuration) => {
                self.configure(configuration).await;
                Flow::Continue
            }
            ContextRequest::Terminate => {
                self.shutdown().await;
                self.route(ContextResponse::Terminated);
                Flow::Stop
            }
            ContextRequest::Socket(frame) => {
                self.forward(frame).await;
                Flow::Continue
            }
            ContextRequest::BlockingReceive(handoff) => {
                if !was_blocking {
                    error!("BlockingReceive issued without a preceding blocking request");
                }
                self.register_consumer(handoff);
                Flow::Continue
            }
        }
    }

    async fn configure(&mut self, configuration: Configuration) {
        self.debug_enabled = configuration.debug_enabled;

        if self.state != State::Unconfigured {
            error!(state = ?self.state, "transport is already configured, ignoring Configure");
            return;
        }

        self.state = State::Opening;
        self.route(ContextResponse::SetConfiguration);

        match self.connector.connect(&configuration.socket_addr).await {
            Ok(socket) => {
                info!(addr = %configuration.socket_addr, "socket open");
                self.socket = Some(socket);
                self.state = State::Open;
                self.route(ContextResponse::OnSocketOpen);
            }
            Err(e) => {
                error!("failed to open socket: {}", e);
                self.state = State::Closed;
                self.route(ContextResponse::Terminated);
            }
        }
    }

    async fn forward(&mut self, frame: SocketFrame) {
        match self.state {
            State::Unconfigured | State::Opening => {
                error!("SocketRequest should be issued after Configure, dropping {:?}", frame);
            }
            State::Closed => {
                warn!("socket is closed, dropping {:?}", frame);
                self.route(ContextResponse::Terminated);
            }
            State::Open => {
                let Some(socket) = &self.socket else {
                    return;
                };
                if self.debug_enabled {
                    debug!(?frame, "[transport] -> [socket]");
                }
                if let Err(e) = socket.send(&frame).await {
                    error!("failed to send frame: {}", e);
                    self.lose_transport();
                }
            }
        }
    }

    fn register_consumer(&mut self, handoff: Arc<Handoff<ContextResponse>>) {
        match self.rendezvous.consume(handoff) {
            Consume::Delivered | Consume::Registered => {}
            Consume::Rejected => {
                error!("can't wait for multiple blocking responses at once, dropping BlockingReceive");
            }
            Consume::Abandoned => {
                warn!("blocking exchange timed out before its BlockingReceive arrived");
            }
        }
    }

    fn route(&mut self, response: ContextResponse) {
        if !self.is_blocking {
            self.outbox.deliver(response);
            return;
        }

        // only socket frames answer a particular exchange
        let pushed = match response {
            ContextResponse::Socket(_) => self.rendezvous.push(response),
            _ => self.rendezvous.interrupt(response),
        };
        match pushed {
            Push::Delivered | Push::Queued => {}
            Push::Discarded => warn!("discarding response for an abandoned blocking exchange"),
        }
    }

    fn lose_transport(&mut self) {
        self.socket = None;
        self.state = State::Closed;
        self.route(ContextResponse::Terminated);
    }

    async fn shutdown(&mut self) {
        if let Some(socket) = self.socket.take() {
            if let Err(e) = socket.close().await {
                warn!("error while closing socket: {}", e);
            }
        }
        self.state = State::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use crate::config::Config;
    use crate::mock_transport::MockConnector;

    #[derive(Default)]
    struct Recorder {
        delivered: Mutex<Vec<ContextResponse>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<ContextResponse> {
            std::mem::take(&mut *self.delivered.lock().unwrap())
        }
    }

    impl Outbox for Recorder {
        fn deliver(&self, response: ContextResponse) {
            self.delivered.lock().unwrap().push(response);
        }

        fn close(&self) {}
    }

    fn envelope(request: ContextRequest) -> Envelope {
        Envelope {
            request,
            is_blocking: false,
        }
    }

    fn configure() -> Envelope {
        envelope(ContextRequest::Configure(Config::new().transport()))
    }

    #[tokio::test]
    async fn test_configure_opens_and_ignores_second_configure() {
        let (connector, _server) = MockConnector::pair();
        let outbox = Arc::new(Recorder::default());
        let mut endpoint = TransportEndpoint::new(connector, outbox.clone());
        assert_eq!(endpoint.state(), State::Unconfigured);

        endpoint.handle_request(configure()).await;
        assert_eq!(endpoint.state(), State::Open);
        assert_eq!(
            outbox.take(),
            vec![ContextResponse::SetConfiguration, ContextResponse::OnSocketOpen]
        );

        endpoint.handle_request(configure()).await;
        assert_eq!(endpoint.state(), State::Open);
        assert!(outbox.take().is_empty());
    }

    #[tokio::test]
    async fn test_refused_connection_closes() {
        let outbox = Arc::new(Recorder::default());
        let mut endpoint = TransportEndpoint::new(Arc::new(MockConnector::refusing()), outbox.clone());

        endpoint.handle_request(configure()).await;
        assert_eq!(endpoint.state(), State::Closed);
        assert_eq!(
            outbox.take(),
            vec![ContextResponse::SetConfiguration, ContextResponse::Terminated]
        );
    }

    #[tokio::test]
    async fn test_failed_send_closes_and_reports_terminated() {
        let (connector, server) = MockConnector::pair();
        let outbox = Arc::new(Recorder::default());
        let mut endpoint = TransportEndpoint::new(connector, outbox.clone());
        endpoint.handle_request(configure()).await;
        outbox.take();

        drop(server);
        let frame = SocketFrame::Text("ping".into());
        endpoint.handle_request(envelope(ContextRequest::Socket(frame.clone()))).await;
        assert_eq!(endpoint.state(), State::Closed);
        assert_eq!(outbox.take(), vec![ContextResponse::Terminated]);

        // every later request is answered with Terminated
        endpoint.handle_request(envelope(ContextRequest::Socket(frame))).await;
        assert_eq!(outbox.take(), vec![ContextResponse::Terminated]);
    }

    #[tokio::test]
    async fn test_socket_request_before_configure_stays_unconfigured() {
        let (connector, _server) = MockConnector::pair();
        let outbox = Arc::new(Recorder::default());
        let mut endpoint = TransportEndpoint::new(connector, outbox.clone());

        let frame = SocketFrame::Text("early".into());
        endpoint.handle_request(envelope(ContextRequest::Socket(frame))).await;
        assert_eq!(endpoint.state(), State::Unconfigured);
        assert!(outbox.take().is_empty());
    }

    #[tokio::test]
    async fn test_terminate_closes() {
        let (connector, _server) = MockConnector::pair();
        let outbox = Arc::new(Recorder::default());
        let mut endpoint = TransportEndpoint::new(connector, outbox.clone());
        endpoint.handle_request(configure()).await;
        outbox.take();

        let flow = endpoint.handle_request(envelope(ContextRequest::Terminate)).await;
        assert!(matches!(flow, Flow::Stop));
        assert_eq!(endpoint.state(), State::Closed);
        assert_eq!(outbox.take(), vec![ContextResponse::Terminated]);
    }
}
