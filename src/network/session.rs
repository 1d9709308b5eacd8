//! Server Session
//!
//! Drives one accepted connection: read a command, dispatch it to its
//! handler, repeat until `EXIT` or the channel closes.
//!
//! ```text
//! AwaitingCommand ──► Dispatch ──► Downloading ─┐
//!        ▲                    ├──► Uploading  ──┤
//!        │                    └──► Deleting   ──┤
//!        └──────────────────────────────────────┘
//! EXIT / end of stream / read failure ──► Closed
//! ```

use tracing::{debug, info, warn};

use crate::error::{Result, TransferError};
use crate::protocol::{
    Command, Framing, LineChannel, LineCodec, Outcome, Sentinel, Transport,
};
use crate::store::FileStore;

/// Where the session is after handling one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingCommand,
    Closed,
}

/// Server side of one connection
pub struct Session<S> {
    /// Exclusively owned for the session's lifetime
    channel: LineChannel<S>,

    codec: LineCodec,

    store: FileStore,

    /// Peer address for logging
    peer: String,
}

impl<S: Transport> Session<S> {
    /// Create a session over an established stream
    pub fn new(stream: S, store: FileStore, codec: LineCodec, peer: impl Into<String>) -> Self {
        Self {
            channel: LineChannel::with_max_line(stream, codec.limits().max_line_bytes),
            codec,
            store,
            peer: peer.into(),
        }
    }

    /// Serve commands until the session closes
    ///
    /// Returns the number of command lines handled before the session closed,
    /// unrecognized lines included.
    pub fn run(&mut self) -> u64 {
        info!("Session with {} started", self.peer);

        let mut handled = 0;
        while self.step() == SessionState::AwaitingCommand {
            handled += 1;
        }

        info!("Session with {} closed after {} line(s)", self.peer, handled);
        handled
    }

    /// Read and handle exactly one command line
    pub fn step(&mut self) -> SessionState {
        let line = match self.channel.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Client {} disconnected", self.peer);
                return SessionState::Closed;
            }
            Err(TransferError::ProtocolViolation(reason)) => {
                warn!("Discarded input from {}: {}", self.peer, reason);
                return SessionState::AwaitingCommand;
            }
            Err(e) => {
                debug!("Read from {} failed: {}", self.peer, e);
                return SessionState::Closed;
            }
        };

        let Some(command) = Command::parse(&line) else {
            warn!("Unexpected input from {}: {:?}", self.peer, line);
            return SessionState::AwaitingCommand;
        };

        debug!("Received {} from {}", command, self.peer);

        let result = match command {
            Command::Download => self.handle_download(),
            Command::Upload => self.handle_upload(),
            Command::Delete => self.handle_delete(),
            Command::Framing(framing) => self.handle_framing(framing),
            Command::Exit => {
                info!("Client {} requested exit", self.peer);
                if let Err(e) = self.channel.close() {
                    debug!("Closing channel to {} failed: {}", self.peer, e);
                }
                return SessionState::Closed;
            }
        };

        match result {
            Ok(()) => SessionState::AwaitingCommand,
            Err(e) if e.is_channel_closed() => {
                debug!("Client {} went away during {}", self.peer, command);
                SessionState::Closed
            }
            Err(e) => {
                warn!("{} from {} aborted: {}", command, self.peer, e);
                let outcome = Outcome::error(format!("The {} request failed: {}", command, e));
                self.write_failure(command, &outcome);
                match self.channel.flush() {
                    Ok(()) => SessionState::AwaitingCommand,
                    Err(_) => SessionState::Closed,
                }
            }
        }
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    /// DOWNLOAD: content section then outcome pair; on failure the error pair
    /// is followed by a trailing `FINISHED_REQUEST` line.
    fn handle_download(&mut self) -> Result<()> {
        let outcome = match self.codec.read_name_section(&mut self.channel) {
            Ok(name) => self.send_file(&name),
            Err(e) => recover(e, "There was an error trying to read the requested file name.")?,
        };

        if outcome.is_success() {
            self.codec.write_outcome(&mut self.channel, &outcome);
        } else {
            self.write_failure(Command::Download, &outcome);
        }
        self.channel.flush()
    }

    fn send_file(&mut self, name: &str) -> Outcome {
        match self.store.read_lines(name) {
            Ok(lines) => {
                self.codec.write_content_section(&mut self.channel, &lines);
                info!("Sent {} ({} lines) to {}", name, lines.len(), self.peer);
                Outcome::finished(format!("The file {} was downloaded from the server.", name))
            }
            Err(TransferError::NotFound(_)) | Err(TransferError::InvalidName(_)) => {
                info!("The file {} can not be found.", name);
                Outcome::error(format!("The file {} can not be found.", name))
            }
            Err(e) => {
                warn!("Reading {} failed: {}", name, e);
                Outcome::error(format!(
                    "There was an error trying to send the file {} to the client.",
                    name
                ))
            }
        }
    }

    /// UPLOAD: name section, content section, overwrite, outcome pair
    fn handle_upload(&mut self) -> Result<()> {
        let received = self
            .codec
            .read_name_section(&mut self.channel)
            .and_then(|name| {
                let content = self.codec.read_content_section(&mut self.channel)?;
                Ok((name, content))
            });

        let outcome = match received {
            Ok((name, content)) => match self.store.write(&name, &content) {
                Ok(()) => {
                    info!("Stored {} ({} bytes) from {}", name, content.len(), self.peer);
                    Outcome::finished(format!("The file {} was uploaded successfully.", name))
                }
                Err(e) => {
                    warn!("Writing {} failed: {}", name, e);
                    Outcome::error(format!(
                        "There was an error trying to upload the new file called {} to the server.",
                        name
                    ))
                }
            },
            Err(e) => recover(e, "There was an error trying to upload the file to the server.")?,
        };

        self.respond(&outcome)
    }

    /// DELETE: name section, remove, outcome pair
    fn handle_delete(&mut self) -> Result<()> {
        let outcome = match self.codec.read_name_section(&mut self.channel) {
            Ok(name) => match self.store.delete(&name) {
                Ok(()) => {
                    info!("The file {} was deleted from the server.", name);
                    Outcome::finished(format!("The file {} was deleted from the server.", name))
                }
                Err(TransferError::NotFound(_)) => {
                    Outcome::error(format!("The file {} could not be found on the server.", name))
                }
                Err(TransferError::InvalidName(_)) => {
                    Outcome::error(format!("The file name {:?} is not valid.", name))
                }
                Err(e) => {
                    warn!("Deleting {} failed: {}", name, e);
                    Outcome::error(format!(
                        "An error occurred when trying to delete the file {} from the server.",
                        name
                    ))
                }
            },
            Err(e) => recover(e, "An error occurred when trying to delete the file from the server.")?,
        };

        self.respond(&outcome)
    }

    /// FRAMING: switch the session codec, acknowledged in the old framing
    fn handle_framing(&mut self, framing: Framing) -> Result<()> {
        self.codec = self.codec.with_framing(framing);
        info!("Session with {} now uses {} framing", self.peer, framing);
        self.respond(&Outcome::finished(format!("Framing set to {}.", framing)))
    }

    /// Queue an error outcome in the response shape of `command`
    ///
    /// A failed DOWNLOAD is followed by a trailing `FINISHED_REQUEST`.
    fn write_failure(&mut self, command: Command, outcome: &Outcome) {
        self.codec.write_outcome(&mut self.channel, outcome);
        if command == Command::Download {
            self.channel.write_line(Sentinel::FinishedRequest.as_str());
        }
    }

    fn respond(&mut self, outcome: &Outcome) -> Result<()> {
        self.codec.write_outcome(&mut self.channel, outcome);
        self.channel.flush()
    }

    /// Current framing of the session
    pub fn framing(&self) -> Framing {
        self.codec.framing()
    }
}

/// Turn a request-level read failure into an error outcome
///
/// A closed channel is passed through: there is nobody left to answer.
fn recover(err: TransferError, message: &str) -> Result<Outcome> {
    if err.is_channel_closed() {
        return Err(err);
    }
    warn!("{} ({})", message, err);
    Ok(Outcome::error(format!("{} ({})", message, err)))
}
