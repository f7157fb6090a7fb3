//! Line framing for the interactive protocol.
//!
//! The interactive process answers each command with zero or more lines and a
//! terminating sentinel. [`LineReader`] is a stateful scanner that owns the
//! bytes read so far: a caller can stop pulling at any point (typically right
//! after the sentinel) and whatever arrived past that point stays buffered for
//! the next caller. Nothing is read ahead unless a caller asks for a line.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// Upper bound for a single unterminated line held in memory (16 MiB).
const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

const READ_CHUNK: usize = 4096;

pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            eof: false,
        }
    }

    /// Next complete line, suspending until one is available.
    ///
    /// Returns `Ok(None)` once the stream is exhausted. An unterminated
    /// fragment left at EOF is returned as a final line.
    ///
    /// Cancel-safe: if the future is dropped mid-read, bytes already read stay
    /// in the buffer.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(line) = self.buffered_line() {
                return Ok(Some(line));
            }
            if self.eof {
                return Ok(self.take_fragment());
            }
            if self.buf.len() > MAX_LINE_BYTES {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line exceeds maximum {MAX_LINE_BYTES} bytes"),
                ));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }
    }

    /// A complete line already sitting in the buffer. Never performs I/O.
    pub fn buffered_line(&mut self) -> Option<String> {
        let newline = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=newline).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Push `fragment` back in front of anything still buffered.
    pub fn unread(&mut self, fragment: &[u8]) {
        self.buf.splice(0..0, fragment.iter().copied());
    }

    /// Whether the underlying stream has reported EOF.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Bytes read from the stream but not yet returned as lines.
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }

    fn take_fragment(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}
