use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::LinkError;
use crate::peer::PeerInfo;
use crate::runtime::Internal;
use crate::transport::{Listener as _, Transport};

/// Server-role accept loop: open the endpoint and wait for the target peer.
///
/// Exactly two exits before cancellation: a matching peer connects
/// (`Accepted`), or the fixed deadline elapses (`ListenTimeout`). Inbound
/// connections from any other peer are closed on the spot and the loop
/// keeps accepting — a rejection is not an event, and the deadline is not
/// extended for it. The runtime unblocks this task by aborting it, which
/// drops the endpoint.
pub(crate) async fn accept_loop(
    transport: Arc<dyn Transport>,
    target: PeerInfo,
    timeout: Duration,
    generation: u64,
    internal_tx: mpsc::Sender<Internal>,
) {
    let deadline = Instant::now() + timeout;

    let mut listener = match transport.bind().await {
        Ok(listener) => listener,
        Err(e) => {
            let _ = internal_tx
                .send(Internal::ListenFailed {
                    generation,
                    error: LinkError::Bind(e),
                })
                .await;
            return;
        }
    };

    debug!(peer = %target, "endpoint open, waiting for connection");

    loop {
        tokio::select! {
            result = listener.accept() => match result {
                Ok((stream, remote)) if target.matches(&remote) => {
                    info!(peer = %target, "inbound connection from expected peer");
                    let _ = internal_tx
                        .send(Internal::Accepted {
                            generation,
                            peer: target.clone(),
                            stream,
                        })
                        .await;
                    return;
                }
                Ok((stream, remote)) => {
                    warn!(expected = %target, actual = %remote, "rejecting inbound from unexpected peer");
                    drop(stream);
                }
                Err(e) => {
                    let _ = internal_tx
                        .send(Internal::ListenFailed {
                            generation,
                            error: LinkError::Bind(e),
                        })
                        .await;
                    return;
                }
            },
            _ = tokio::time::sleep_until(deadline) => {
                debug!(peer = %target, "listen deadline elapsed");
                let _ = internal_tx
                    .send(Internal::ListenTimeout { generation })
                    .await;
                return;
            }
        }
    }
}
