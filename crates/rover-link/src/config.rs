use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One concrete way of establishing a socket to the peer.
///
/// Routes are configuration, not per-connection state: the dialer walks the
/// ordered list produced by [`LinkConfig::dial_routes`] until one succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialRoute {
    /// The well-known service endpoint.
    Service { secure: bool },
    /// A numbered fallback channel.
    Channel { channel: u8, secure: bool },
}

impl DialRoute {
    /// Whether this route requests a secure socket.
    ///
    /// Transports that cannot distinguish secure from insecure sockets (the
    /// TCP bridge) may ignore the flag; the route list still walks both
    /// variants so attempt counting is transport-independent.
    pub fn secure(&self) -> bool {
        match self {
            DialRoute::Service { secure } => *secure,
            DialRoute::Channel { secure, .. } => *secure,
        }
    }
}

impl fmt::Display for DialRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.secure() { "secure" } else { "insecure" };
        match self {
            DialRoute::Service { .. } => write!(f, "service ({mode})"),
            DialRoute::Channel { channel, .. } => write!(f, "channel {channel} ({mode})"),
        }
    }
}

/// Active reconnection behavior after a failed dial or a lost session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveReconnect {
    /// Never dial on our own initiative.
    Off,
    /// Keep dialing at a fixed interval until something succeeds.
    Continuous { interval: Duration },
    /// Dial up to `max_attempts` times, `delay` apart, then give up.
    Bounded { delay: Duration, max_attempts: u32 },
}

/// Reconnection policy for a lost or never-established link.
///
/// The active and passive paths may both be armed at once — the original
/// controller runs a 5-second dial loop *and* re-opens its server endpoint
/// after every loss; whichever side re-establishes first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Active (client-role) retry behavior.
    pub active: ActiveReconnect,
    /// Re-open the server endpoint after session loss and listen timeouts.
    pub rearm_listen: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            active: ActiveReconnect::Continuous {
                interval: Duration::from_secs(5),
            },
            rearm_listen: true,
        }
    }
}

/// Configuration for a [`Link`](crate::Link).
///
/// Defaults mirror the field-tested controller timings: 60 s listen
/// deadline, 60 s re-listen delay, continuous 5 s active retries, fallback
/// channels 1–5.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Numbered fallback channels tried after the service routes.
    pub channels: Vec<u8>,
    /// How long the server endpoint waits for a matching peer.
    pub listen_timeout: Duration,
    /// Delay before re-opening the endpoint after a listen timeout.
    pub relisten_delay: Duration,
    /// Reconnection policy.
    pub reconnect: ReconnectPolicy,
    /// Buffer size for the outbound event channel.
    pub event_buffer: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            channels: vec![1, 2, 3, 4, 5],
            listen_timeout: Duration::from_secs(60),
            relisten_delay: Duration::from_secs(60),
            reconnect: ReconnectPolicy::default(),
            event_buffer: 64,
        }
    }
}

impl LinkConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reconnection policy.
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Set the listen deadline.
    pub fn listen_timeout(mut self, timeout: Duration) -> Self {
        self.listen_timeout = timeout;
        self
    }

    /// Set the delay before automatically re-opening the endpoint.
    pub fn relisten_delay(mut self, delay: Duration) -> Self {
        self.relisten_delay = delay;
        self
    }

    /// The ordered dial route list: service secure, service insecure, then
    /// each fallback channel secure, then each insecure.
    pub fn dial_routes(&self) -> Vec<DialRoute> {
        let mut routes = vec![
            DialRoute::Service { secure: true },
            DialRoute::Service { secure: false },
        ];
        for &channel in &self.channels {
            routes.push(DialRoute::Channel {
                channel,
                secure: true,
            });
        }
        for &channel in &self.channels {
            routes.push(DialRoute::Channel {
                channel,
                secure: false,
            });
        }
        routes
    }
}
