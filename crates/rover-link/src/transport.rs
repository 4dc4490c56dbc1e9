use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

use crate::config::DialRoute;
use crate::peer::PeerInfo;

/// The byte stream a transport hands back once a socket is established.
pub trait LinkIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> LinkIo for T {}

/// A boxed, established stream to the peer.
pub type LinkStream = Box<dyn LinkIo>;

// Lets `Result<LinkStream, _>::unwrap_err` be called in tests, which requires
// the `Ok` type to be `Debug`. The stream itself has no meaningful textual
// form, so this is an opaque placeholder used only by the test harness.
#[cfg(test)]
impl std::fmt::Debug for dyn LinkIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LinkStream")
    }
}

/// Network abstraction for the link.
///
/// Production: [`TcpTransport`] (the dev rig bridges the rover's serial
/// port to a socket). Tests: an in-memory transport with scriptable
/// failures.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Attempt one dial route to the peer. A failed attempt must leave no
    /// half-open socket behind (dropping the error is enough for socket
    /// types that close on drop).
    async fn dial(&self, peer: &PeerInfo, route: &DialRoute) -> io::Result<LinkStream>;

    /// Open the server endpoint under the well-known service.
    async fn bind(&self) -> io::Result<Box<dyn Listener>>;
}

/// A bound server endpoint accepting inbound peers.
#[async_trait]
pub trait Listener: Send {
    /// Wait for the next inbound connection. Dropping the listener is the
    /// cross-task cancellation mechanism for a blocked accept.
    async fn accept(&mut self) -> io::Result<(LinkStream, PeerInfo)>;
}

// ── TCP transport ───────────────────────────────────────────────────

/// TCP implementation of [`Transport`].
///
/// The service route dials the peer's address as given; channel route `n`
/// dials the same host with the port offset by `n`. The secure flag is
/// carried for transports that distinguish secure sockets — plain TCP does
/// not, so both variants of a route dial the same endpoint.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    listen_addr: String,
}

impl TcpTransport {
    /// A transport whose server endpoint binds `listen_addr`
    /// (e.g. `"0.0.0.0:7201"`).
    pub fn new(listen_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
        }
    }

    fn route_addr(peer: &PeerInfo, route: &DialRoute) -> io::Result<String> {
        match route {
            DialRoute::Service { .. } => Ok(peer.addr().to_string()),
            DialRoute::Channel { channel, .. } => {
                let addr = peer.addr();
                let (host, port) = addr.rsplit_once(':').ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("peer address has no port: {addr}"),
                    )
                })?;
                let port: u16 = port.parse().map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("peer address has a bad port: {addr}"),
                    )
                })?;
                Ok(format!("{host}:{}", port + u16::from(*channel)))
            }
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn dial(&self, peer: &PeerInfo, route: &DialRoute) -> io::Result<LinkStream> {
        let addr = Self::route_addr(peer, route)?;
        let stream = TcpStream::connect(&addr).await?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }

    async fn bind(&self) -> io::Result<Box<dyn Listener>> {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        Ok(Box::new(TcpEndpoint { listener }))
    }
}

struct TcpEndpoint {
    listener: TcpListener,
}

#[async_trait]
impl Listener for TcpEndpoint {
    async fn accept(&mut self) -> io::Result<(LinkStream, PeerInfo)> {
        let (stream, remote) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok((Box::new(stream), PeerInfo::new(remote.to_string())))
    }
}

// ── In-memory transport (tests) ─────────────────────────────────────
