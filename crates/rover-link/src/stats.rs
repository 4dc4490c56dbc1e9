use rover_metrics::{Counter, Gauge};
use serde::Serialize;

/// Link statistics, shared between the runtime loop and [`LinkHandle`]
/// snapshots.
#[derive(Debug, Default, Serialize)]
pub struct LinkMetrics {
    /// Individual dial route attempts (12 per full strategy walk).
    pub dial_attempts: Counter,
    /// Sessions successfully established, both roles.
    pub sessions_established: Counter,
    /// Sessions torn down by stream fault or remote close.
    pub sessions_lost: Counter,
    /// Messages handed to the writer task.
    pub frames_sent: Counter,
    /// Complete newline-delimited messages delivered to the application.
    pub frames_received: Counter,
    /// Uptime of the most recently closed session, in seconds.
    pub last_session_secs: Gauge,
}
