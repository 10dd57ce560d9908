//! Chunked transfer of opaque audio payloads.
//!
//! A payload larger than one notification is split into fixed-size chunks,
//! each written to the audio channel as its own notification:
//!
//! ```text
//! payload (1500 B) ──▶ [ 512 B ][ 512 B ][ 476 B ]
//!                        #0        #1       #2 (last, short)
//! ```
//!
//! The session keeps no resend buffer.  Once aborted it is consumed; a
//! caller that needs redelivery starts a fresh transfer.

/// One in-flight audio transfer over a borrowed payload.
pub struct AudioTransfer<'a> {
    payload: &'a [u8],
    chunk_size: usize,
    sent: usize,
}

impl<'a> AudioTransfer<'a> {
    /// `chunk_size` of zero is treated as one byte per chunk.
    pub fn new(payload: &'a [u8], chunk_size: usize) -> Self {
        Self {
            payload,
            chunk_size: chunk_size.max(1),
            sent: 0,
        }
    }

    pub fn total_chunks(&self) -> usize {
        self.payload.len().div_ceil(self.chunk_size)
    }

    /// Chunks handed to the transport so far.
    pub fn sent_chunks(&self) -> usize {
        self.sent
    }

    /// The next chunk to write, without advancing.
    pub fn peek(&self) -> Option<&'a [u8]> {
        let start = self.sent.checked_mul(self.chunk_size)?;
        if start >= self.payload.len() {
            return None;
        }
        let end = (start + self.chunk_size).min(self.payload.len());
        Some(&self.payload[start..end])
    }

    /// Record that the chunk returned by [`peek`](Self::peek) was written.
    pub fn advance(&mut self) {
        if self.sent < self.total_chunks() {
            self.sent += 1;
        }
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}
