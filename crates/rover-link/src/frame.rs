use bytes::BytesMut;

/// Accumulator that splits a raw byte stream into newline-delimited
/// messages.
///
/// A message may span arbitrarily many reads; only the trailing
/// unterminated remainder is retained between calls. Emission order equals
/// arrival order, and each complete segment is produced exactly once. The
/// delimiter is a single ASCII `\n` — no length prefix, no checksum, no
/// carriage-return handling.
#[derive(Debug, Default)]
pub(crate) struct FrameBuffer {
    buf: BytesMut,
}

impl FrameBuffer {
    pub(crate) fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(1024),
        }
    }

    /// Append freshly read bytes and drain every complete segment.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut segments = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut segment = self.buf.split_to(pos + 1);
            segment.truncate(pos);
            segments.push(String::from_utf8_lossy(&segment).into_owned());
        }
        segments
    }

    /// Bytes received but not yet terminated.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> &[u8] {
        &self.buf
    }
}
