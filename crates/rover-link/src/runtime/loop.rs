//! The link event loop.
//!
//! One task owns all mutable link state and multiplexes over application
//! commands, reports from background tasks, and the two reconnection
//! timers. At most one retry timer and one re-listen timer exist at any
//! instant; scheduling a new one replaces the old.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::accept::accept_loop;
use crate::config::LinkConfig;
use crate::dial::establish;
use crate::error::LinkError;
use crate::peer::PeerInfo;
use crate::permission::Permissions;
use crate::session::Session;
use crate::stats::LinkMetrics;
use crate::supervisor::{RetryDecision, Supervisor};
use crate::transport::{LinkStream, Transport};

use super::{Command, ConnState, Internal, LinkEvent};

struct AcceptorState {
    handle: JoinHandle<()>,
    peer: PeerInfo,
    generation: u64,
}

pub(super) struct LinkLoop {
    transport: Arc<dyn Transport>,
    permissions: Arc<dyn Permissions>,
    config: LinkConfig,
    metrics: Arc<LinkMetrics>,
    events: mpsc::Sender<LinkEvent>,
    internal_tx: mpsc::Sender<Internal>,

    state: ConnState,
    supervisor: Supervisor,
    /// Monotonic attempt counter; reports carrying an older generation are
    /// stale and ignored.
    generation: u64,

    session: Option<Session>,
    session_generation: u64,
    dial_task: Option<JoinHandle<()>>,
    dial_generation: Option<u64>,
    acceptor: Option<AcceptorState>,
    /// Pending active-retry timer (at most one).
    retry_at: Option<(Instant, PeerInfo)>,
    /// Pending re-listen timer (at most one).
    relisten_at: Option<(Instant, PeerInfo)>,
}

impl LinkLoop {
    pub(super) fn new(
        transport: Arc<dyn Transport>,
        permissions: Arc<dyn Permissions>,
        config: LinkConfig,
        metrics: Arc<LinkMetrics>,
        events: mpsc::Sender<LinkEvent>,
    ) -> (Self, mpsc::Receiver<Internal>) {
        let supervisor = Supervisor::new(config.reconnect);
        let (internal_tx, internal_rx) = mpsc::channel(64);
        let state = Self {
            transport,
            permissions,
            config,
            metrics,
            events,
            internal_tx,
            state: ConnState::Idle,
            supervisor,
            generation: 0,
            session: None,
            session_generation: 0,
            dial_task: None,
            dial_generation: None,
            acceptor: None,
            retry_at: None,
            relisten_at: None,
        };
        (state, internal_rx)
    }

    pub(super) async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<Command>,
        mut internal_rx: mpsc::Receiver<Internal>,
    ) {
        loop {
            let far_future = Instant::now() + Duration::from_secs(3600);
            let retry_deadline = self.retry_at.as_ref().map_or(far_future, |(at, _)| *at);
            let relisten_deadline = self.relisten_at.as_ref().map_or(far_future, |(at, _)| *at);

            tokio::select! {
                maybe_cmd = cmd_rx.recv() => match maybe_cmd {
                    Some(Command::Cleanup) | None => break,
                    Some(cmd) => self.handle_command(cmd).await,
                },
                Some(report) = internal_rx.recv() => self.handle_internal(report).await,
                _ = tokio::time::sleep_until(retry_deadline), if self.retry_at.is_some() => {
                    if let Some((_, peer)) = self.retry_at.take() {
                        debug!(%peer, "active retry timer fired");
                        self.start_connect(peer, false).await;
                    }
                }
                _ = tokio::time::sleep_until(relisten_deadline), if self.relisten_at.is_some() => {
                    if let Some((_, peer)) = self.relisten_at.take() {
                        debug!(%peer, "re-listen timer fired");
                        self.start_listen(peer, false).await;
                    }
                }
            }
        }

        self.release_everything();
        debug!("link runtime stopped");
    }

    // ── Command handling ────────────────────────────────────────────

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { peer } => {
                self.supervisor.on_attempt_started();
                self.start_connect(peer, true).await;
            }
            Command::Listen { peer } => {
                self.supervisor.on_attempt_started();
                self.start_listen(peer, true).await;
            }
            Command::Send { data } => self.handle_send(data),
            Command::Disconnect => self.handle_disconnect().await,
            Command::IsConnected { reply } => {
                let _ = reply.send(self.session.is_some());
            }
            Command::IsListening { reply } => {
                let _ = reply.send(self.acceptor.is_some());
            }
            Command::State { reply } => {
                let _ = reply.send(self.state);
            }
            Command::PeerDiscovered { peer } => {
                self.emit(LinkEvent::PeerDiscovered(peer)).await;
            }
            // Handled by the run loop.
            Command::Cleanup => {}
        }
    }

    /// Begin a client-role attempt. An explicit call supersedes whatever is
    /// in flight, of either role; an automatic retry coexists with the
    /// passive listening path.
    async fn start_connect(&mut self, peer: PeerInfo, explicit: bool) {
        if !self.permissions.transport_allowed() {
            warn!(%peer, "connect refused: transport permission not granted");
            self.emit(LinkEvent::ConnectionFailed(
                LinkError::PermissionDenied.to_string(),
            ))
            .await;
            return;
        }

        self.cancel_dial();
        if explicit {
            self.cancel_acceptor().await;
            self.retry_at = None;
            self.relisten_at = None;
            if self.session.is_some() {
                self.close_session("superseded by new connect").await;
            }
        }

        self.generation += 1;
        let generation = self.generation;
        self.dial_generation = Some(generation);
        self.state = if explicit {
            ConnState::Connecting
        } else {
            ConnState::Reconnecting
        };

        debug!(%peer, generation, "starting dial attempt");
        let transport = Arc::clone(&self.transport);
        let routes = self.config.dial_routes();
        let metrics = Arc::clone(&self.metrics);
        let internal_tx = self.internal_tx.clone();
        self.dial_task = Some(tokio::spawn(async move {
            let result = establish(transport.as_ref(), &peer, &routes, &metrics).await;
            let _ = internal_tx
                .send(Internal::DialDone {
                    generation,
                    peer,
                    result,
                })
                .await;
        }));
    }

    /// Begin a server-role attempt. Idempotent while already listening for
    /// the same peer. `announce` distinguishes explicit application calls
    /// (which emit `WaitingForConnection`) from automatic re-arms (which
    /// stay silent).
    async fn start_listen(&mut self, peer: PeerInfo, announce: bool) {
        if !self.permissions.transport_allowed() {
            warn!(%peer, "listen refused: transport permission not granted");
            self.emit(LinkEvent::ConnectionFailed(
                LinkError::PermissionDenied.to_string(),
            ))
            .await;
            return;
        }

        if let Some(acceptor) = &self.acceptor {
            if acceptor.peer == peer {
                debug!(%peer, "already listening for this peer");
                return;
            }
        }

        self.cancel_acceptor().await;
        self.relisten_at = None;
        if announce {
            self.cancel_dial();
            self.retry_at = None;
            if self.session.is_some() {
                self.close_session("superseded by new listen").await;
            }
        }

        self.generation += 1;
        let generation = self.generation;

        if announce {
            self.emit(LinkEvent::WaitingForConnection(peer.clone())).await;
        }

        debug!(%peer, generation, "opening server endpoint");
        let handle = tokio::spawn(accept_loop(
            Arc::clone(&self.transport),
            peer.clone(),
            self.config.listen_timeout,
            generation,
            self.internal_tx.clone(),
        ));
        self.acceptor = Some(AcceptorState {
            handle,
            peer,
            generation,
        });
        if self.session.is_none() && announce {
            self.state = ConnState::Listening;
        }
    }

    fn handle_send(&mut self, data: Vec<u8>) {
        match &self.session {
            Some(session) => {
                if session.send(data) {
                    self.metrics.frames_sent.inc();
                }
            }
            None => debug!("send while disconnected, dropping"),
        }
    }

    async fn handle_disconnect(&mut self) {
        debug!("disconnect requested");
        self.supervisor.on_manual_disconnect();
        self.cancel_dial();
        self.cancel_acceptor().await;
        self.retry_at = None;
        self.relisten_at = None;
        if self.session.is_some() {
            self.close_session("manual disconnect").await;
        } else {
            self.emit(LinkEvent::Disconnected).await;
        }
        self.state = ConnState::Idle;
    }

    // ── Internal report handling ────────────────────────────────────

    async fn handle_internal(&mut self, report: Internal) {
        match report {
            Internal::DialDone {
                generation,
                peer,
                result,
            } => {
                if self.dial_generation != Some(generation) {
                    debug!(generation, "stale dial report dropped");
                    return;
                }
                self.dial_task = None;
                self.dial_generation = None;

                match result {
                    Ok(stream) => self.promote_session(peer, stream, generation).await,
                    Err(e) => {
                        debug!(%peer, error = %e, "dial attempt exhausted");
                        match self.supervisor.on_dial_exhausted() {
                            RetryDecision::RetryAfter(delay) => {
                                self.retry_at = Some((Instant::now() + delay, peer));
                                if self.session.is_none() {
                                    self.state = ConnState::Reconnecting;
                                }
                            }
                            RetryDecision::GiveUp => {
                                self.emit(LinkEvent::ConnectionFailed(e.to_string())).await;
                                self.recompute_state();
                            }
                        }
                    }
                }
            }

            Internal::Accepted {
                generation,
                peer,
                stream,
            } => {
                if !self.acceptor_current(generation) {
                    debug!(generation, "stale accept report dropped");
                    return;
                }
                self.acceptor = None;
                self.promote_session(peer, stream, generation).await;
            }

            Internal::ListenTimeout { generation } => {
                if !self.acceptor_current(generation) {
                    return;
                }
                let Some(acceptor) = self.acceptor.take() else {
                    return;
                };
                let peer = acceptor.peer;
                info!(%peer, "listen timed out");
                self.emit(LinkEvent::ConnectionTimeout).await;
                if self.supervisor.on_listen_timeout() {
                    self.relisten_at = Some((Instant::now() + self.config.relisten_delay, peer));
                    if self.session.is_none() {
                        self.state = ConnState::Reconnecting;
                    }
                } else {
                    self.recompute_state();
                }
            }

            Internal::ListenFailed { generation, error } => {
                if !self.acceptor_current(generation) {
                    return;
                }
                self.acceptor = None;
                warn!(error = %error, "server endpoint failed");
                self.emit(LinkEvent::ConnectionFailed(error.to_string()))
                    .await;
                self.recompute_state();
            }

            Internal::Frame { generation, line } => {
                if self.session.is_some() && generation == self.session_generation {
                    self.metrics.frames_received.inc();
                    self.emit(LinkEvent::DataReceived(line)).await;
                }
            }

            Internal::SessionLost { generation, reason } => {
                if self.session.is_none() || generation != self.session_generation {
                    return;
                }
                self.metrics.sessions_lost.inc();
                self.close_session(&reason).await;

                let plan = self.supervisor.on_session_lost();
                let recovering = plan.rearm_listen.is_some() || plan.retry_after.is_some();
                if let Some((peer, delay)) = plan.retry_after {
                    self.retry_at = Some((Instant::now() + delay, peer));
                }
                if let Some(peer) = plan.rearm_listen {
                    self.start_listen(peer, false).await;
                }
                self.state = if recovering {
                    ConnState::Reconnecting
                } else {
                    ConnState::Idle
                };
            }
        }
    }

    // ── Session lifecycle ───────────────────────────────────────────

    /// A dial or accept succeeded: first success wins. Cancels the other
    /// pending path and every timer, resets the supervisor, starts the
    /// session tasks, and emits exactly one `Connected`.
    async fn promote_session(&mut self, peer: PeerInfo, stream: LinkStream, generation: u64) {
        self.cancel_dial();
        self.cancel_acceptor().await;
        self.retry_at = None;
        self.relisten_at = None;

        self.supervisor.on_connected(&peer);
        self.metrics.sessions_established.inc();
        self.session_generation = generation;
        self.session = Some(Session::spawn(
            stream,
            peer.clone(),
            generation,
            self.internal_tx.clone(),
        ));
        self.state = ConnState::Connected;
        info!(%peer, "session established");
        self.emit(LinkEvent::Connected(peer)).await;
    }

    /// Close the current session (idempotent at the session level) and
    /// notify the application immediately — any grace period before giving
    /// up on the peer is the application's business, not ours.
    async fn close_session(&mut self, reason: &str) {
        if let Some(mut session) = self.session.take() {
            let uptime = session.uptime();
            self.metrics.last_session_secs.set(uptime.as_secs());
            info!(
                peer = %session.peer(),
                ?uptime,
                reason,
                "session closed"
            );
            session.close();
        }
        self.emit(LinkEvent::Disconnected).await;
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn acceptor_current(&self, generation: u64) -> bool {
        matches!(&self.acceptor, Some(a) if a.generation == generation)
    }

    fn cancel_dial(&mut self) {
        if let Some(task) = self.dial_task.take() {
            task.abort();
        }
        self.dial_generation = None;
    }

    /// Abort the acceptor and wait for its endpoint to actually close, so
    /// that a follow-up bind cannot race the old listener for the port.
    async fn cancel_acceptor(&mut self) {
        if let Some(acceptor) = self.acceptor.take() {
            acceptor.handle.abort();
            let _ = acceptor.handle.await;
        }
    }

    /// Derive the state from what is actually live. Used after a path dies
    /// without a replacement being scheduled.
    fn recompute_state(&mut self) {
        self.state = if self.session.is_some() {
            ConnState::Connected
        } else if self.acceptor.is_some() {
            ConnState::Listening
        } else if self.retry_at.is_some() || self.relisten_at.is_some() {
            ConnState::Reconnecting
        } else {
            ConnState::Idle
        };
    }

    fn release_everything(&mut self) {
        self.cancel_dial();
        if let Some(acceptor) = self.acceptor.take() {
            acceptor.handle.abort();
        }
        self.retry_at = None;
        self.relisten_at = None;
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        self.state = ConnState::Idle;
    }

    async fn emit(&self, event: LinkEvent) {
        let _ = self.events.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActiveReconnect, ReconnectPolicy};
    use crate::permission::DenyAll;
    use crate::runtime::{Link, LinkChannels};
    use crate::transport::mock::MemoryTransport;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::time::timeout;

    fn peer() -> PeerInfo {
        PeerInfo::new("10.0.0.5:7200")
    }

    fn fast_config(active: ActiveReconnect, rearm_listen: bool) -> LinkConfig {
        LinkConfig::default()
            .reconnect(ReconnectPolicy {
                active,
                rearm_listen,
            })
            .listen_timeout(Duration::from_secs(5))
            .relisten_delay(Duration::from_millis(20))
    }

    async fn next_event(channels: &mut LinkChannels) -> LinkEvent {
        timeout(Duration::from_secs(2), channels.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !check() {
            assert!(
                std::time::Instant::now() < deadline,
                "condition not reached in time"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn continuous_policy_keeps_dialing_after_exhaustion() {
        let transport = MemoryTransport::new();
        let config = fast_config(
            ActiveReconnect::Continuous {
                interval: Duration::from_millis(20),
            },
            false,
        );
        let channels = Link::spawn(transport.clone(), config);

        channels.handle.connect(peer()).await.unwrap();

        // First walk covers all 12 routes, then the retry timer re-arms
        // a full second walk. No terminal failure in between.
        wait_until(|| transport.dials().len() >= 24).await;
        assert_eq!(channels.handle.state().await, ConnState::Reconnecting);
    }

    #[tokio::test]
    async fn bounded_policy_ends_with_terminal_failure() {
        let transport = MemoryTransport::new();
        let config = fast_config(
            ActiveReconnect::Bounded {
                delay: Duration::from_millis(10),
                max_attempts: 2,
            },
            false,
        );
        let mut channels = Link::spawn(transport.clone(), config);

        channels.handle.connect(peer()).await.unwrap();

        let event = next_event(&mut channels).await;
        assert!(
            matches!(event, LinkEvent::ConnectionFailed(ref reason) if reason.contains("12")),
            "expected terminal failure, got: {event:?}"
        );
        // Initial walk + 2 retries, and nothing further once given up.
        assert_eq!(transport.dials().len(), 36);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.dials().len(), 36);
        assert_eq!(channels.handle.state().await, ConnState::Idle);
    }

    #[tokio::test]
    async fn connect_succeeds_after_scheduled_retry() {
        let transport = MemoryTransport::new();
        let config = fast_config(
            ActiveReconnect::Bounded {
                delay: Duration::from_millis(200),
                max_attempts: 1,
            },
            false,
        );
        let mut channels = Link::spawn(transport.clone(), config);

        // First walk fails, one retry is scheduled; the dial starts
        // working before it fires.
        channels.handle.connect(peer()).await.unwrap();
        wait_until(|| transport.dials().len() >= 12).await;
        transport.allow_dial(true);

        assert_eq!(next_event(&mut channels).await, LinkEvent::Connected(peer()));
        assert_eq!(channels.handle.state().await, ConnState::Connected);

        let mut far = transport.take_dialed_peer().expect("dialed stream");
        far.write_all(b"looking for target\n").await.unwrap();
        assert_eq!(
            next_event(&mut channels).await,
            LinkEvent::DataReceived("looking for target".into())
        );
        assert_eq!(channels.handle.metrics().sessions_established.get(), 1);
    }

    #[tokio::test]
    async fn listen_is_idempotent_for_same_peer() {
        let transport = MemoryTransport::new();
        let mut channels = Link::spawn(transport.clone(), fast_config(ActiveReconnect::Off, false));

        channels.handle.listen(peer()).await.unwrap();
        wait_until(|| transport.bind_count() == 1).await;
        channels.handle.listen(peer()).await.unwrap();

        assert_eq!(
            next_event(&mut channels).await,
            LinkEvent::WaitingForConnection(peer())
        );
        // Second listen: no new endpoint, no second announcement.
        assert!(channels.handle.is_listening().await);
        assert_eq!(transport.bind_count(), 1);
        assert!(
            timeout(Duration::from_millis(50), channels.events.recv())
                .await
                .is_err(),
            "unexpected second event"
        );
    }

    #[tokio::test]
    async fn inbound_peer_connects_and_exchanges_frames() {
        let transport = MemoryTransport::new();
        let mut channels = Link::spawn(transport.clone(), fast_config(ActiveReconnect::Off, false));

        channels.handle.listen(peer()).await.unwrap();
        assert_eq!(
            next_event(&mut channels).await,
            LinkEvent::WaitingForConnection(peer())
        );
        wait_until(|| transport.bind_count() == 1).await;

        let mut far = transport.inject_inbound(PeerInfo::new("10.0.0.5:49000"));
        assert_eq!(next_event(&mut channels).await, LinkEvent::Connected(peer()));
        assert!(channels.handle.is_connected().await);
        assert!(!channels.handle.is_listening().await);

        far.write_all(b"ROBOT,5,12,N\nready to start\n")
            .await
            .unwrap();
        assert_eq!(
            next_event(&mut channels).await,
            LinkEvent::DataReceived("ROBOT,5,12,N".into())
        );
        assert_eq!(
            next_event(&mut channels).await,
            LinkEvent::DataReceived("ready to start".into())
        );

        channels.handle.send(&b"forward\n"[..]).await.unwrap();
        let mut buf = [0u8; 16];
        let n = far.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"forward\n");
    }

    #[tokio::test]
    async fn session_loss_rearms_listening_without_announcement() {
        let transport = MemoryTransport::new();
        // Long continuous interval: the active path stays pending while the
        // passive one does the work.
        let config = fast_config(
            ActiveReconnect::Continuous {
                interval: Duration::from_secs(60),
            },
            true,
        );
        let mut channels = Link::spawn(transport.clone(), config);

        channels.handle.listen(peer()).await.unwrap();
        assert_eq!(
            next_event(&mut channels).await,
            LinkEvent::WaitingForConnection(peer())
        );
        wait_until(|| transport.bind_count() == 1).await;

        let far = transport.inject_inbound(PeerInfo::new("10.0.0.5:49000"));
        assert_eq!(next_event(&mut channels).await, LinkEvent::Connected(peer()));

        // Remote closes: exactly one Disconnected, listener re-armed
        // silently, state goes to Reconnecting.
        drop(far);
        assert_eq!(next_event(&mut channels).await, LinkEvent::Disconnected);
        wait_until(|| transport.bind_count() == 2).await;
        assert_eq!(channels.handle.state().await, ConnState::Reconnecting);
        assert!(
            timeout(Duration::from_millis(50), channels.events.recv())
                .await
                .is_err(),
            "re-arm must not announce"
        );

        // The peer comes back; the link recovers.
        let _far = transport.inject_inbound(PeerInfo::new("10.0.0.5:49001"));
        assert_eq!(next_event(&mut channels).await, LinkEvent::Connected(peer()));
        assert_eq!(channels.handle.metrics().sessions_established.get(), 2);
        assert_eq!(channels.handle.metrics().sessions_lost.get(), 1);
    }

    #[tokio::test]
    async fn disconnect_is_terminal_until_next_attempt() {
        let transport = MemoryTransport::new();
        let config = fast_config(
            ActiveReconnect::Continuous {
                interval: Duration::from_millis(10),
            },
            true,
        );
        let mut channels = Link::spawn(transport.clone(), config);

        channels.handle.listen(peer()).await.unwrap();
        assert_eq!(
            next_event(&mut channels).await,
            LinkEvent::WaitingForConnection(peer())
        );
        wait_until(|| transport.bind_count() == 1).await;
        let _far = transport.inject_inbound(PeerInfo::new("10.0.0.5:49000"));
        assert_eq!(next_event(&mut channels).await, LinkEvent::Connected(peer()));

        channels.handle.disconnect().await.unwrap();
        assert_eq!(next_event(&mut channels).await, LinkEvent::Disconnected);
        assert_eq!(channels.handle.state().await, ConnState::Idle);

        // No reconnection machinery left running: no re-bind, no dials.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.bind_count(), 1);
        assert!(transport.dials().is_empty());

        // Disconnect is idempotent from Idle.
        channels.handle.disconnect().await.unwrap();
        assert_eq!(next_event(&mut channels).await, LinkEvent::Disconnected);
        assert_eq!(channels.handle.state().await, ConnState::Idle);

        // And a fresh listen works without resource errors.
        channels.handle.listen(peer()).await.unwrap();
        assert_eq!(
            next_event(&mut channels).await,
            LinkEvent::WaitingForConnection(peer())
        );
        wait_until(|| transport.bind_count() == 2).await;
    }

    #[tokio::test]
    async fn permission_denial_fails_without_io() {
        let transport = MemoryTransport::new();
        let mut channels = Link::spawn_with_permissions(
            transport.clone(),
            Arc::new(DenyAll),
            LinkConfig::default(),
        );

        channels.handle.connect(peer()).await.unwrap();
        assert!(matches!(
            next_event(&mut channels).await,
            LinkEvent::ConnectionFailed(ref reason) if reason.contains("permission denied")
        ));
        assert!(transport.dials().is_empty());

        channels.handle.listen(peer()).await.unwrap();
        assert!(matches!(
            next_event(&mut channels).await,
            LinkEvent::ConnectionFailed(ref reason) if reason.contains("permission denied")
        ));
        assert_eq!(transport.bind_count(), 0);
    }

    #[tokio::test]
    async fn listen_timeout_schedules_silent_relisten() {
        let transport = MemoryTransport::new();
        let config = fast_config(ActiveReconnect::Off, true).listen_timeout(Duration::from_millis(30));
        let mut channels = Link::spawn(transport.clone(), config);

        channels.handle.listen(peer()).await.unwrap();
        assert_eq!(
            next_event(&mut channels).await,
            LinkEvent::WaitingForConnection(peer())
        );
        assert_eq!(next_event(&mut channels).await, LinkEvent::ConnectionTimeout);
        assert_eq!(channels.handle.state().await, ConnState::Reconnecting);

        // After the re-listen delay the endpoint re-opens, silently.
        wait_until(|| transport.bind_count() >= 2).await;
        let first = channels.events.try_recv();
        assert!(
            !matches!(first, Ok(LinkEvent::WaitingForConnection(_))),
            "automatic re-listen must not announce"
        );
    }

    #[tokio::test]
    async fn discovery_passthrough_surfaces_event() {
        let transport = MemoryTransport::new();
        let mut channels = Link::spawn(transport, LinkConfig::default());

        let found = PeerInfo::named("10.0.0.7:7200", "Rover-B");
        channels.handle.peer_discovered(found.clone()).await;
        assert_eq!(
            next_event(&mut channels).await,
            LinkEvent::PeerDiscovered(found)
        );
    }

    #[tokio::test]
    async fn cleanup_closes_the_event_channel() {
        let transport = MemoryTransport::new();
        let mut channels = Link::spawn(transport, LinkConfig::default());

        channels.handle.cleanup().await;
        assert!(
            timeout(Duration::from_secs(1), channels.events.recv())
                .await
                .expect("timed out")
                .is_none()
        );
        assert!(matches!(
            channels.handle.connect(peer()).await,
            Err(crate::LinkError::Shutdown)
        ));
    }
}
