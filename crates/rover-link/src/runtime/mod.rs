//! Link runtime — the single owner of connection state.
//!
//! Every mutation of link state happens on one event-loop task; the
//! application talks to it through [`LinkHandle`] (commands in) and the
//! [`LinkEvent`] receiver (events out). Background tasks (dialer, acceptor,
//! session reader/writer, retry timers) never touch shared state; they
//! report through an internal channel and the loop decides.

mod r#loop;

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::peer::PeerInfo;
use crate::permission::{AlwaysGranted, Permissions};
use crate::stats::LinkMetrics;
use crate::transport::{LinkStream, Transport};

/// Current link state. Exactly one value at any time, owned by the
/// runtime loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Idle,
    Connecting,
    Listening,
    Connected,
    Reconnecting,
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnState::Idle => "idle",
            ConnState::Connecting => "connecting",
            ConnState::Listening => "listening",
            ConnState::Connected => "connected",
            ConnState::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}

// ── Commands (application → runtime) ────────────────────────────────

pub(crate) enum Command {
    Connect { peer: PeerInfo },
    Listen { peer: PeerInfo },
    Send { data: Vec<u8> },
    Disconnect,
    Cleanup,
    IsConnected { reply: oneshot::Sender<bool> },
    IsListening { reply: oneshot::Sender<bool> },
    State { reply: oneshot::Sender<ConnState> },
    PeerDiscovered { peer: PeerInfo },
}

// ── Internal events (background tasks → runtime) ────────────────────

/// Reports from the dialer, acceptor, and session tasks. Each carries the
/// attempt generation it belongs to; the loop drops anything stale.
pub(crate) enum Internal {
    DialDone {
        generation: u64,
        peer: PeerInfo,
        result: Result<LinkStream, LinkError>,
    },
    Accepted {
        generation: u64,
        peer: PeerInfo,
        stream: LinkStream,
    },
    ListenTimeout {
        generation: u64,
    },
    ListenFailed {
        generation: u64,
        error: LinkError,
    },
    Frame {
        generation: u64,
        line: String,
    },
    SessionLost {
        generation: u64,
        reason: String,
    },
}

// ── Events (runtime → application) ──────────────────────────────────

/// Link events, delivered in order over one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A session was established (either role).
    Connected(PeerInfo),
    /// The session ended — explicit disconnect, remote close, or fault.
    Disconnected,
    /// One complete newline-delimited message arrived.
    DataReceived(String),
    /// A terminal connection failure (permission denial, exhausted bounded
    /// retries, endpoint failure). Transient per-route failures never
    /// surface here.
    ConnectionFailed(String),
    /// The listen deadline elapsed without the expected peer.
    ConnectionTimeout,
    /// The server endpoint is open and waiting for the peer. Emitted for
    /// explicit `listen` calls only, never for automatic re-arms.
    WaitingForConnection(PeerInfo),
    /// Passthrough from the external discovery collaborator.
    PeerDiscovered(PeerInfo),
}

// ── Handle (application-facing API) ─────────────────────────────────

/// Handle to a running [`Link`]. Cheap to clone; all methods are
/// channel sends.
#[derive(Clone)]
pub struct LinkHandle {
    cmd_tx: mpsc::Sender<Command>,
    metrics: Arc<LinkMetrics>,
}

impl LinkHandle {
    /// Connect to a peer (client role). Supersedes any attempt already in
    /// flight, of either role. The outcome arrives as an event.
    pub async fn connect(&self, peer: PeerInfo) -> Result<(), LinkError> {
        self.command(Command::Connect { peer }).await
    }

    /// Wait for an inbound connection from a peer (server role).
    /// Idempotent while already listening for the same peer.
    pub async fn listen(&self, peer: PeerInfo) -> Result<(), LinkError> {
        self.command(Command::Listen { peer }).await
    }

    /// Queue bytes for the current session, best-effort.
    ///
    /// No delimiter is appended — callers frame their own messages. A write
    /// fault is not reported here: it surfaces indirectly through the
    /// subsequent read failure and its `Disconnected` event. Sends while
    /// disconnected are dropped.
    pub async fn send(&self, data: impl Into<Vec<u8>>) -> Result<(), LinkError> {
        self.command(Command::Send { data: data.into() }).await
    }

    /// Tear everything down and stay down: closes the session, cancels all
    /// pending attempts and timers, and disables reconnection until the
    /// next `connect`/`listen`. Callable from any state, idempotent.
    pub async fn disconnect(&self) -> Result<(), LinkError> {
        self.command(Command::Disconnect).await
    }

    /// Terminal shutdown of the runtime. The event channel closes once
    /// everything is released.
    pub async fn cleanup(&self) {
        let _ = self.cmd_tx.send(Command::Cleanup).await;
    }

    /// Is a session currently established?
    pub async fn is_connected(&self) -> bool {
        self.query(|reply| Command::IsConnected { reply })
            .await
            .unwrap_or(false)
    }

    /// Is the server endpoint currently accepting?
    pub async fn is_listening(&self) -> bool {
        self.query(|reply| Command::IsListening { reply })
            .await
            .unwrap_or(false)
    }

    /// Current link state.
    pub async fn state(&self) -> ConnState {
        self.query(|reply| Command::State { reply })
            .await
            .unwrap_or(ConnState::Idle)
    }

    /// Forward a discovery result from the external peer registry; it comes
    /// back out as [`LinkEvent::PeerDiscovered`].
    pub async fn peer_discovered(&self, peer: PeerInfo) {
        let _ = self.cmd_tx.send(Command::PeerDiscovered { peer }).await;
    }

    /// Link statistics snapshot.
    pub fn metrics(&self) -> &LinkMetrics {
        &self.metrics
    }

    async fn command(&self, cmd: Command) -> Result<(), LinkError> {
        self.cmd_tx.send(cmd).await.map_err(|_| LinkError::Shutdown)
    }

    async fn query<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, LinkError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| LinkError::Shutdown)?;
        rx.await.map_err(|_| LinkError::Shutdown)
    }
}

/// Channels returned to the application when the link starts.
pub struct LinkChannels {
    /// Command side.
    pub handle: LinkHandle,
    /// Event side. Events for one session are never re-ordered.
    pub events: mpsc::Receiver<LinkEvent>,
}

// ── Link (entry point) ──────────────────────────────────────────────

/// The connection manager — spawn it and communicate via channels.
pub struct Link;

impl Link {
    /// Start the runtime with the default (always-granted) permission
    /// collaborator. Must be called within a tokio runtime.
    pub fn spawn(transport: impl Transport, config: LinkConfig) -> LinkChannels {
        Self::spawn_with_permissions(transport, Arc::new(AlwaysGranted), config)
    }

    /// Start the runtime with an explicit permission collaborator.
    pub fn spawn_with_permissions(
        transport: impl Transport,
        permissions: Arc<dyn Permissions>,
        config: LinkConfig,
    ) -> LinkChannels {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer);
        let metrics = Arc::new(LinkMetrics::default());

        let (state, internal_rx) = r#loop::LinkLoop::new(
            Arc::new(transport),
            permissions,
            config,
            Arc::clone(&metrics),
            event_tx,
        );
        tokio::spawn(state.run(cmd_rx, internal_rx));

        LinkChannels {
            handle: LinkHandle { cmd_tx, metrics },
            events: event_rx,
        }
    }
}
