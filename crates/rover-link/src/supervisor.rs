use std::time::Duration;

use crate::config::{ActiveReconnect, ReconnectPolicy};
use crate::peer::PeerInfo;

/// Reconnection decision logic — a pure state machine.
///
/// The runtime loop owns the timers; this struct only decides what should
/// happen next. Attempt counting survives session losses and resets on
/// every successful session. An explicit disconnect sets a manual flag
/// that disables all reconnection until the application issues a new
/// `connect`/`listen`.
#[derive(Debug)]
pub(crate) struct Supervisor {
    policy: ReconnectPolicy,
    attempts: u32,
    last_peer: Option<PeerInfo>,
    manual_disconnect: bool,
}

/// What to do after a full strategy walk failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// What to arm after a session was lost. Both paths may be armed at once;
/// whichever re-establishes first wins.
#[derive(Debug, Default)]
pub(crate) struct LossPlan {
    /// Re-open the server endpoint for this peer, immediately.
    pub rearm_listen: Option<PeerInfo>,
    /// Schedule an active dial to this peer after the delay.
    pub retry_after: Option<(PeerInfo, Duration)>,
}

impl Supervisor {
    pub(crate) fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            last_peer: None,
            manual_disconnect: false,
        }
    }

    /// A session was established (either role): counters reset, the peer
    /// becomes the reconnection target.
    pub(crate) fn on_connected(&mut self, peer: &PeerInfo) {
        self.attempts = 0;
        self.last_peer = Some(peer.clone());
        self.manual_disconnect = false;
    }

    /// The application asked for a fresh attempt: re-enable reconnection.
    pub(crate) fn on_attempt_started(&mut self) {
        self.manual_disconnect = false;
    }

    /// The application explicitly disconnected: disable reconnection until
    /// the next `connect`/`listen`.
    pub(crate) fn on_manual_disconnect(&mut self) {
        self.manual_disconnect = true;
    }

    /// An established session was lost (fault or remote close).
    pub(crate) fn on_session_lost(&mut self) -> LossPlan {
        if self.manual_disconnect {
            return LossPlan::default();
        }
        let Some(peer) = self.last_peer.clone() else {
            return LossPlan::default();
        };

        let rearm_listen = self.policy.rearm_listen.then(|| peer.clone());
        let retry_after = match self.policy.active {
            ActiveReconnect::Off => None,
            ActiveReconnect::Continuous { interval } => Some((peer, interval)),
            ActiveReconnect::Bounded { delay, .. } => Some((peer, delay)),
        };

        LossPlan {
            rearm_listen,
            retry_after,
        }
    }

    /// A full strategy walk came up empty. Bounded policies count the
    /// exhaustion; continuous ones retry forever.
    pub(crate) fn on_dial_exhausted(&mut self) -> RetryDecision {
        if self.manual_disconnect {
            return RetryDecision::GiveUp;
        }
        match self.policy.active {
            ActiveReconnect::Off => RetryDecision::GiveUp,
            ActiveReconnect::Continuous { interval } => RetryDecision::RetryAfter(interval),
            ActiveReconnect::Bounded {
                delay,
                max_attempts,
            } => {
                if self.attempts < max_attempts {
                    self.attempts += 1;
                    RetryDecision::RetryAfter(delay)
                } else {
                    RetryDecision::GiveUp
                }
            }
        }
    }

    /// The listen deadline elapsed: should the endpoint re-open after the
    /// configured delay?
    pub(crate) fn on_listen_timeout(&self) -> bool {
        self.policy.rearm_listen && !self.manual_disconnect
    }
}
