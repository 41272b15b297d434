//! Adaptive raw-mode receiver used for body ingestion.
//!
//! Line mode (see [`crate::read_line`]) is cheap: one `read_until` per
//! command or header line. Streaming an arbitrarily large message body is
//! different — we want large reads once the peer is clearly sending a lot
//! of data, but small reads while we're still hunting for a `CRLF.CRLF`
//! sentinel that might be split across two TCP segments.
//!
//! [`RawFramer`] starts at a ceiling of 0 (deliver whatever the transport
//! hands back) and ratchets the ceiling up as more non-empty reads come in,
//! and ratchets it back down on a short read-timeout. This mirrors the
//! adaptive behavior described for SMTP DATA ingestion: be stingy until the
//! peer proves it has a lot to send, then go big.
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

/// One second, used for the short timed-receive that probes for a sentinel
/// split across two reads.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

const STEPS: [usize; 5] = [0, 8192, 65536, 262_144, 1_048_576];

/// Tracks the adaptive read-size ceiling for raw-mode body ingestion.
#[derive(Debug, Clone, Copy)]
pub struct RawFramer {
    step: usize,
    non_empty_reads: u32,
}

impl Default for RawFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl RawFramer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: 0,
            non_empty_reads: 0,
        }
    }

    /// Current read-size ceiling. 0 means "no cap, read whatever arrives".
    #[must_use]
    pub fn ceiling(&self) -> usize {
        STEPS[self.step]
    }

    fn note_non_empty_read(&mut self) {
        self.non_empty_reads += 1;

        let threshold = match self.step {
            0 => 2,
            _ => 5,
        };

        if self.non_empty_reads > threshold && self.step + 1 < STEPS.len() {
            self.step += 1;
            self.non_empty_reads = 0;
        }
    }

    fn step_down(&mut self) {
        self.step = self.step.saturating_sub(1);
        self.non_empty_reads = 0;
    }

    /// Read one chunk, sized according to the current ceiling. Returns the
    /// number of bytes read (0 at EOF).
    ///
    /// `buf` must have spare capacity; this reads at most `ceiling()` bytes
    /// when the ceiling is nonzero, or whatever `read` returns otherwise.
    pub async fn read_chunk<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
        buf: &mut [u8],
    ) -> std::io::Result<usize> {
        let cap = match self.ceiling() {
            0 => buf.len(),
            ceiling => buf.len().min(ceiling),
        };

        let n = reader.read(&mut buf[..cap]).await?;
        if n > 0 {
            self.note_non_empty_read();
        }
        Ok(n)
    }

    /// Run a short timed receive (used to detect a `CRLF.CRLF` sentinel
    /// split across two reads). On timeout, steps the ceiling back down.
    pub async fn read_chunk_timed<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
        buf: &mut [u8],
    ) -> std::io::Result<Option<usize>> {
        match timeout(PROBE_TIMEOUT, self.read_chunk(reader, buf)).await {
            Ok(res) => res.map(Some),
            Err(_) => {
                self.step_down();
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_steps_up_then_down() {
        let mut f = RawFramer::new();
        assert_eq!(f.ceiling(), 0);

        for _ in 0..3 {
            f.note_non_empty_read();
        }
        assert_eq!(f.ceiling(), 8192);

        for _ in 0..6 {
            f.note_non_empty_read();
        }
        assert_eq!(f.ceiling(), 65536);

        f.step_down();
        assert_eq!(f.ceiling(), 8192);
        f.step_down();
        assert_eq!(f.ceiling(), 0);
        f.step_down();
        assert_eq!(f.ceiling(), 0);
    }

    #[tokio::test]
    async fn read_chunk_respects_ceiling() {
        let mut f = RawFramer::new();
        let data = vec![b'x'; 100];
        let mut cursor = std::io::Cursor::new(data);
        let mut buf = [0u8; 1000];
        let n = f.read_chunk(&mut cursor, &mut buf).await.unwrap();
        assert_eq!(n, 100);
    }
}
