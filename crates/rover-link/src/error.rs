/// Errors surfaced by the link layer.
///
/// Transient, single-attempt failures (one dial route, one rejected inbound
/// peer) never appear here — they are absorbed internally and drive the
/// retry machinery instead. Only terminal, class-level outcomes cross the
/// API boundary; a listen deadline is not an error but the
/// `ConnectionTimeout` event.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport authorization was not granted. Never auto-retried.
    #[error("transport permission denied")]
    PermissionDenied,

    /// Every configured dial route failed.
    #[error("all {attempts} connect routes failed: {source}")]
    StrategyExhausted {
        attempts: usize,
        #[source]
        source: std::io::Error,
    },

    /// Could not open the server endpoint.
    #[error("failed to open listener: {0}")]
    Bind(#[source] std::io::Error),

    /// I/O fault or end-of-stream on an established session.
    #[error("session stream fault: {0}")]
    StreamFault(#[source] std::io::Error),

    /// The link runtime has been shut down.
    #[error("link is shut down")]
    Shutdown,
}
