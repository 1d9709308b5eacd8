//! Line channel
//!
//! Turns an ordered byte stream into ordered lines.
//!
//! Writes are buffered until `flush` (or the next read), so a whole request or
//! response leaves in as few transport writes as possible.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};

use crate::config::Limits;
use crate::error::{Result, TransferError};

/// A byte stream that can carry a session
pub trait Transport: Read + Write {
    /// Close our side of the stream
    fn close(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

/// Bidirectional line-oriented channel owning its transport
pub struct LineChannel<S> {
    /// Buffered reader; writes go through `get_mut`
    inner: BufReader<S>,

    /// Encoded lines not yet handed to the transport
    pending: Vec<u8>,

    /// Longest line accepted, terminator excluded
    max_line_bytes: usize,
}

impl<S: Transport> LineChannel<S> {
    pub fn new(stream: S) -> Self {
        Self::with_max_line(stream, Limits::default().max_line_bytes)
    }

    /// Create a channel that rejects received lines longer than `max_line_bytes`
    pub fn with_max_line(stream: S, max_line_bytes: usize) -> Self {
        Self {
            inner: BufReader::new(stream),
            pending: Vec::new(),
            max_line_bytes,
        }
    }

    /// Read the next line without its terminator
    ///
    /// Returns `None` at end of stream. Pending writes are flushed first so
    /// the peer always sees a complete request before we block.
    ///
    /// At most `max_line_bytes` plus the terminator are buffered. A longer
    /// line is skipped up to its newline and reported as a
    /// `ProtocolViolation`, so the next read starts on a line boundary.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        self.flush()?;

        // Room for the line plus "\r\n"
        let cap = self.max_line_bytes as u64 + 2;
        let mut buf = Vec::new();
        let read = self
            .inner
            .by_ref()
            .take(cap)
            .read_until(b'\n', &mut buf)
            .map_err(TransferError::from_channel)?;
        if read == 0 {
            return Ok(None);
        }

        let terminated = buf.ends_with(b"\n");
        if terminated {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        } else if read as u64 == cap {
            self.skip_line()?;
        }

        if buf.len() > self.max_line_bytes {
            return Err(TransferError::ProtocolViolation(format!(
                "line exceeds {} bytes",
                self.max_line_bytes
            )));
        }

        String::from_utf8(buf)
            .map(Some)
            .map_err(|_| TransferError::ProtocolViolation("line is not valid UTF-8".into()))
    }

    /// Discard input up to and including the next newline
    fn skip_line(&mut self) -> Result<()> {
        loop {
            let available = self.inner.fill_buf().map_err(TransferError::from_channel)?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.inner.consume(pos + 1);
                    return Ok(());
                }
                None => {
                    let len = available.len();
                    self.inner.consume(len);
                }
            }
        }
    }

    /// Queue one line; it is terminated with `\n`
    pub fn write_line(&mut self, line: &str) {
        self.pending.extend_from_slice(line.as_bytes());
        self.pending.push(b'\n');
    }

    /// Hand every queued line to the transport
    ///
    /// The queue is emptied even when the write fails.
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let stream = self.inner.get_mut();
        let written = stream
            .write_all(&self.pending)
            .and_then(|_| stream.flush())
            .map_err(TransferError::from_channel);

        // Never resend a partially written batch
        self.pending.clear();
        written
    }

    /// Flush and close our side of the transport
    pub fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.inner
            .get_mut()
            .close()
            .map_err(TransferError::from_channel)
    }

    /// Borrow the underlying transport
    pub fn get_ref(&self) -> &S {
        self.inner.get_ref()
    }
}
