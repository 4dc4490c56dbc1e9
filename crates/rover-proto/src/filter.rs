/// Display filter for free-form status lines.
///
/// The rover emits a lot of telemetry chatter (sensor readings, position
/// samples) alongside the occasional line an operator actually cares about.
/// A line is noteworthy only if it matches one of the important patterns and
/// none of the filtered-out ones; the default is to hide.

/// Substrings that mark a line as routine telemetry — never shown.
const FILTER_OUT: &[&str] = &[
    "sensor:",
    "coordinate:",
    "x:",
    "y:",
    "z:",
    "temp:",
    "humidity:",
    "pressure:",
    "voltage:",
    "current:",
    "raw data:",
    "debug:",
    "trace:",
    "heartbeat",
    "ping",
    "ack",
    "data:",
    "value:",
    "reading:",
    "measurement:",
    "sample:",
    "update:",
    "sync:",
    "buffer:",
    "packet:",
    "frame:",
    "bytes:",
    "signal:",
    "noise:",
    "rssi:",
    "timestamp:",
    "counter:",
    "index:",
    "position:",
    "angle:",
    "speed:",
    "acceleration:",
    "gyro:",
    "compass:",
    "gps:",
    "wifi:",
    "bluetooth:",
    "cellular:",
    "network:",
];

/// Substrings that mark a line as operator-relevant.
const IMPORTANT: &[&str] = &[
    "ready to start",
    "looking for target",
    "target found",
    "target lost",
    "mission complete",
    "obstacle detected",
    "path blocked",
    "battery low",
    "error",
    "warning",
    "status:",
    "connected",
    "disconnected",
    "initialization",
    "calibration",
    "startup",
    "shutdown",
    "emergency",
    "alert",
    "mission",
    "task",
    "complete",
    "failed",
    "success",
    "abort",
    "stop",
    "pause",
    "resume",
    "scanning",
    "searching",
    "found",
    "lost",
    "detected",
    "arrived",
    "destination",
];

/// Should this status line be surfaced to the operator?
pub fn is_noteworthy(line: &str) -> bool {
    let lower = line.trim().to_ascii_lowercase();
    if lower.is_empty() {
        return false;
    }

    if FILTER_OUT.iter().any(|p| lower.contains(p)) {
        return false;
    }

    IMPORTANT.iter().any(|p| lower.contains(p))
}
