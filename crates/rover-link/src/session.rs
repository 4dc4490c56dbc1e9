use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::LinkError;
use crate::frame::FrameBuffer;
use crate::peer::PeerInfo;
use crate::runtime::Internal;
use crate::transport::LinkStream;

/// The live, established connection to one peer.
///
/// Owns the socket via two tasks: a writer draining the send queue and a
/// reader reassembling newline-delimited messages. Lifetime of both tasks
/// equals the session lifetime; [`Session::close`] is idempotent.
///
/// Write faults are deliberately invisible to senders — the writer logs and
/// exits, and the dead socket is observed by the reader, which reports the
/// loss. This asymmetry matches the transport's fire-and-forget send.
pub(crate) struct Session {
    peer: PeerInfo,
    connected_since: Instant,
    write_tx: mpsc::UnboundedSender<Vec<u8>>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl Session {
    /// Take ownership of an established stream and start both tasks.
    ///
    /// `generation` tags every event this session emits so the runtime can
    /// discard events from a session it has already torn down.
    pub(crate) fn spawn(
        stream: LinkStream,
        peer: PeerInfo,
        generation: u64,
        internal_tx: mpsc::Sender<Internal>,
    ) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let (write_tx, write_rx) = mpsc::unbounded_channel();

        let writer = tokio::spawn(write_loop(write_half, write_rx));
        let reader = tokio::spawn(read_loop(read_half, generation, internal_tx));

        Self {
            peer,
            connected_since: Instant::now(),
            write_tx,
            reader: Some(reader),
            writer: Some(writer),
        }
    }

    pub(crate) fn peer(&self) -> &PeerInfo {
        &self.peer
    }

    pub(crate) fn uptime(&self) -> Duration {
        self.connected_since.elapsed()
    }

    /// Queue bytes for the writer task. Returns whether the queue accepted
    /// them; a full/dead socket is never reported here.
    pub(crate) fn send(&self, data: Vec<u8>) -> bool {
        self.write_tx.send(data).is_ok()
    }

    /// Stop both tasks and release the socket. Safe to call repeatedly.
    pub(crate) fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

async fn write_loop(
    mut write_half: tokio::io::WriteHalf<LinkStream>,
    mut write_rx: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    while let Some(data) = write_rx.recv().await {
        if let Err(e) = write_half.write_all(&data).await {
            debug!(error = %e, "session write failed; loss surfaces via the reader");
            break;
        }
        if let Err(e) = write_half.flush().await {
            debug!(error = %e, "session flush failed; loss surfaces via the reader");
            break;
        }
    }
}

async fn read_loop(
    mut read_half: tokio::io::ReadHalf<LinkStream>,
    generation: u64,
    internal_tx: mpsc::Sender<Internal>,
) {
    let mut frames = FrameBuffer::new();
    let mut chunk = [0u8; 1024];

    loop {
        match read_half.read(&mut chunk).await {
            Ok(0) => {
                let _ = internal_tx
                    .send(Internal::SessionLost {
                        generation,
                        reason: "remote closed the stream".into(),
                    })
                    .await;
                return;
            }
            Ok(n) => {
                for line in frames.push(&chunk[..n]) {
                    let _ = internal_tx
                        .send(Internal::Frame { generation, line })
                        .await;
                }
            }
            Err(e) => {
                let _ = internal_tx
                    .send(Internal::SessionLost {
                        generation,
                        reason: LinkError::StreamFault(e).to_string(),
                    })
                    .await;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reader_reassembles_fragmented_messages() {
        let (near, mut far) = tokio::io::duplex(64);
        let (tx, mut rx) = mpsc::channel(16);
        let _session = Session::spawn(Box::new(near), PeerInfo::new("test:1"), 7, tx);

        far.write_all(b"A\nB").await.unwrap();
        far.flush().await.unwrap();
        far.write_all(b"\n").await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, Internal::Frame { generation: 7, ref line } if line == "A"));
        assert!(matches!(second, Internal::Frame { generation: 7, ref line } if line == "B"));
    }

    #[tokio::test]
    async fn eof_reports_session_lost_once() {
        let (near, far) = tokio::io::duplex(64);
        let (tx, mut rx) = mpsc::channel(16);
        let _session = Session::spawn(Box::new(near), PeerInfo::new("test:1"), 3, tx);

        drop(far);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, Internal::SessionLost { generation: 3, .. }));
        // Reader task has exited; the channel drains with no further events.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_reaches_the_peer() {
        let (near, mut far) = tokio::io::duplex(64);
        let (tx, _rx) = mpsc::channel(16);
        let session = Session::spawn(Box::new(near), PeerInfo::new("test:1"), 1, tx);

        assert!(session.send(b"forward\n".to_vec()));

        let mut buf = [0u8; 16];
        let n = far.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"forward\n");
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (near, _far) = tokio::io::duplex(64);
        let (tx, _rx) = mpsc::channel(16);
        let mut session = Session::spawn(Box::new(near), PeerInfo::new("test:1"), 1, tx);

        session.close();
        session.close();
    }
}
