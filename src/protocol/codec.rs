//! Protocol codec
//!
//! Section framing for the line protocol. The codec never owns a channel: it
//! reads from any `LineSource` and writes to any `LineSink`, so the same rules
//! apply to a live session and to an in-memory list of lines.
//!
//! ## Legacy Framing
//! ```text
//! name section:     <name>  DATA_NAME_SENT
//! content section:  <line>* DATA_TEXT_SENT
//! ```
//! The receiver keeps the last line before `DATA_NAME_SENT` as the name and
//! concatenates content lines with no separator. Payload equal to a sentinel
//! breaks the framing; there is no escaping.
//!
//! ## Counted Framing
//! ```text
//! name section:     LINES <0|1>  <name>?  DATA_NAME_SENT
//! content section:  LINES <n>    <line>{n} DATA_TEXT_SENT
//! ```
//! Counted lines are taken verbatim (they may equal a sentinel) and each
//! content line is reassembled with a trailing `\n`.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use super::{LineChannel, Outcome, Request, Sentinel, Status, Transport};
use crate::config::Limits;
use crate::error::{Result, TransferError};

/// Header opening every counted section
pub const COUNT_HEADER: &str = "LINES";

// =============================================================================
// Line Sources and Sinks
// =============================================================================

/// Something lines can be read from
pub trait LineSource {
    /// Next line, or `None` at end of stream
    fn next_line(&mut self) -> Result<Option<String>>;
}

/// Something lines can be written to
pub trait LineSink {
    fn push_line(&mut self, line: &str);
}

impl<S: Transport> LineSource for LineChannel<S> {
    fn next_line(&mut self) -> Result<Option<String>> {
        self.read_line()
    }
}

impl<S: Transport> LineSink for LineChannel<S> {
    fn push_line(&mut self, line: &str) {
        self.write_line(line);
    }
}

impl LineSource for VecDeque<String> {
    fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.pop_front())
    }
}

impl LineSink for Vec<String> {
    fn push_line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Read a line that must exist; end of stream means the peer is gone
fn require_line<R: LineSource + ?Sized>(source: &mut R) -> Result<String> {
    source.next_line()?.ok_or(TransferError::ChannelClosed)
}

fn violation(message: impl Into<String>) -> TransferError {
    TransferError::ProtocolViolation(message.into())
}

// =============================================================================
// Framing
// =============================================================================

/// Section framing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Sentinel-terminated sections, content joined without separators
    #[default]
    Legacy,

    /// Line-counted sections, content lines newline-terminated
    Counted,
}

impl Framing {
    /// Name used in the `FRAMING` command
    pub fn wire_name(self) -> &'static str {
        match self {
            Framing::Legacy => "LEGACY",
            Framing::Counted => "COUNTED",
        }
    }

    /// Exact, case-sensitive inverse of `wire_name`
    pub fn from_wire_name(name: &str) -> Option<Framing> {
        [Framing::Legacy, Framing::Counted]
            .into_iter()
            .find(|framing| framing.wire_name() == name)
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire_name().to_ascii_lowercase())
    }
}

/// Lenient parse for command-line arguments; the wire uses `from_wire_name`
impl FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("legacy") {
            Ok(Framing::Legacy)
        } else if s.eq_ignore_ascii_case("counted") {
            Ok(Framing::Counted)
        } else {
            Err(format!("unknown framing {:?} (expected legacy or counted)", s))
        }
    }
}

// =============================================================================
// Codec
// =============================================================================

/// Frames and parses sections according to one framing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCodec {
    framing: Framing,
    limits: Limits,
}

impl LineCodec {
    pub fn new(framing: Framing, limits: Limits) -> Self {
        Self { framing, limits }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Same limits, other framing
    pub fn with_framing(self, framing: Framing) -> Self {
        Self { framing, ..self }
    }

    // -------------------------------------------------------------------------
    // Writing
    // -------------------------------------------------------------------------

    /// Write a complete request: command line, name section, content section
    pub fn write_request<W: LineSink + ?Sized>(&self, sink: &mut W, request: &Request) {
        sink.push_line(&request.command.to_line());
        if request.command.has_name_section() {
            self.write_name_section(sink, &request.name);
        }
        if let Some(content) = &request.content {
            self.write_content_section(sink, content);
        }
    }

    /// Encode a request into its wire lines
    pub fn encode_request(&self, request: &Request) -> Vec<String> {
        let mut lines = Vec::new();
        self.write_request(&mut lines, request);
        lines
    }

    pub fn write_name_section<W: LineSink + ?Sized>(&self, sink: &mut W, name: &str) {
        if self.framing == Framing::Counted {
            sink.push_line(&format!("{} 1", COUNT_HEADER));
        }
        sink.push_line(name);
        sink.push_line(Sentinel::DataNameSent.as_str());
    }

    pub fn write_content_section<W, L>(&self, sink: &mut W, lines: &[L])
    where
        W: LineSink + ?Sized,
        L: AsRef<str>,
    {
        if self.framing == Framing::Counted {
            sink.push_line(&format!("{} {}", COUNT_HEADER, lines.len()));
        }
        for line in lines {
            sink.push_line(line.as_ref());
        }
        sink.push_line(Sentinel::DataTextSent.as_str());
    }

    /// Write the two-line outcome pair
    pub fn write_outcome<W: LineSink + ?Sized>(&self, sink: &mut W, outcome: &Outcome) {
        sink.push_line(outcome.status.sentinel().as_str());
        sink.push_line(&outcome.message);
    }

    // -------------------------------------------------------------------------
    // Reading
    // -------------------------------------------------------------------------

    /// Read a name section and return the effective file name
    ///
    /// Legacy: the last line before `DATA_NAME_SENT` wins, zero lines give
    /// the empty name.
    pub fn read_name_section<R: LineSource + ?Sized>(&self, source: &mut R) -> Result<String> {
        match self.framing {
            Framing::Legacy => self.read_legacy_name(source),
            Framing::Counted => {
                let header = require_line(source)?;
                self.read_counted_name(source, &header)
            }
        }
    }

    fn read_legacy_name<R: LineSource + ?Sized>(&self, source: &mut R) -> Result<String> {
        let mut name = String::new();
        let mut seen = 0usize;

        loop {
            let line = require_line(source)?;
            match Sentinel::parse(&line) {
                Some(Sentinel::DataNameSent) => break,
                Some(other) => {
                    return Err(violation(format!("name section interrupted by {}", other)));
                }
                None => {}
            }

            seen += 1;
            if seen > self.limits.max_name_lines {
                return Err(violation(format!(
                    "name section exceeds {} lines",
                    self.limits.max_name_lines
                )));
            }
            name = line;
        }

        if seen > 1 {
            tracing::debug!("Name section carried {} lines, using the last", seen);
        }
        Ok(name)
    }

    fn read_counted_name<R: LineSource + ?Sized>(
        &self,
        source: &mut R,
        header: &str,
    ) -> Result<String> {
        let count = parse_count_header(header)?;
        if count > 1 {
            return Err(violation(format!(
                "counted name section carries {} lines (max 1)",
                count
            )));
        }

        let name = if count == 1 {
            require_line(source)?
        } else {
            String::new()
        };
        expect_terminator(source, Sentinel::DataNameSent)?;
        Ok(name)
    }

    /// Read a content section and return the reassembled content
    pub fn read_content_section<R: LineSource + ?Sized>(&self, source: &mut R) -> Result<String> {
        let first = require_line(source)?;
        self.read_content_after(source, first)
    }

    /// Read a content section whose first line was already consumed
    ///
    /// Used by the download path, which must look at the first response line
    /// before knowing whether a content section follows at all.
    pub fn read_content_after<R: LineSource + ?Sized>(
        &self,
        source: &mut R,
        first: String,
    ) -> Result<String> {
        match self.framing {
            Framing::Legacy => self.read_legacy_content(source, first),
            Framing::Counted => self.read_counted_content(source, &first),
        }
    }

    fn read_legacy_content<R: LineSource + ?Sized>(
        &self,
        source: &mut R,
        first: String,
    ) -> Result<String> {
        let mut content = String::new();
        let mut line = first;

        loop {
            match Sentinel::parse(&line) {
                Some(Sentinel::DataTextSent) => return Ok(content),
                Some(other) => {
                    return Err(violation(format!(
                        "content section interrupted by {}",
                        other
                    )));
                }
                None => {}
            }

            self.check_content_size(content.len() + line.len())?;
            content.push_str(&line);
            line = require_line(source)?;
        }
    }

    fn read_counted_content<R: LineSource + ?Sized>(
        &self,
        source: &mut R,
        header: &str,
    ) -> Result<String> {
        let count = parse_count_header(header)?;
        let mut content = String::new();

        for _ in 0..count {
            let line = require_line(source)?;
            self.check_content_size(content.len() + line.len() + 1)?;
            content.push_str(&line);
            content.push('\n');
        }

        expect_terminator(source, Sentinel::DataTextSent)?;
        Ok(content)
    }

    fn check_content_size(&self, size: usize) -> Result<()> {
        if size > self.limits.max_content_bytes {
            return Err(violation(format!(
                "content exceeds {} bytes",
                self.limits.max_content_bytes
            )));
        }
        Ok(())
    }

    /// Read an outcome pair
    pub fn read_outcome<R: LineSource + ?Sized>(&self, source: &mut R) -> Result<Outcome> {
        let status = require_line(source)?;
        self.read_outcome_after(source, &status)
    }

    /// Read the message of an outcome pair whose status line was already
    /// consumed
    pub fn read_outcome_after<R: LineSource + ?Sized>(
        &self,
        source: &mut R,
        status_line: &str,
    ) -> Result<Outcome> {
        let status = Sentinel::parse(status_line)
            .and_then(Status::from_sentinel)
            .ok_or_else(|| violation(format!("expected outcome status, got {:?}", status_line)))?;
        let message = require_line(source)?;
        Ok(Outcome::new(status, message))
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new(Framing::Legacy, Limits::default())
    }
}

/// Parse a `LINES <n>` header
pub fn parse_count_header(line: &str) -> Result<usize> {
    line.strip_prefix(COUNT_HEADER)
        .and_then(|rest| rest.strip_prefix(' '))
        .and_then(|count| count.parse::<usize>().ok())
        .ok_or_else(|| violation(format!("malformed section header {:?}", line)))
}

fn expect_terminator<R: LineSource + ?Sized>(source: &mut R, terminator: Sentinel) -> Result<()> {
    let line = require_line(source)?;
    if line != terminator.as_str() {
        return Err(violation(format!(
            "expected {} after counted lines, got {:?}",
            terminator, line
        )));
    }
    Ok(())
}
