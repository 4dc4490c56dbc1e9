use std::io;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::DialRoute;
use crate::error::LinkError;
use crate::peer::PeerInfo;
use crate::stats::LinkMetrics;
use crate::transport::{LinkStream, Transport};

/// Walk the ordered route list until one dial succeeds.
///
/// Each failed attempt's socket is released before the next route is tried.
/// Individual failures stay at debug level — only full exhaustion becomes
/// an error, carrying the last route's failure as its source.
pub(crate) async fn establish(
    transport: &dyn Transport,
    peer: &PeerInfo,
    routes: &[DialRoute],
    metrics: &Arc<LinkMetrics>,
) -> Result<LinkStream, LinkError> {
    let mut last_err: Option<io::Error> = None;

    for route in routes {
        debug!(%peer, %route, "dialing");
        metrics.dial_attempts.inc();
        match transport.dial(peer, route).await {
            Ok(stream) => {
                info!(%peer, %route, "connected");
                return Ok(stream);
            }
            Err(e) => {
                debug!(%peer, %route, error = %e, "dial route failed");
                last_err = Some(e);
            }
        }
    }

    Err(LinkError::StrategyExhausted {
        attempts: routes.len(),
        source: last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no routes configured")),
    })
}
