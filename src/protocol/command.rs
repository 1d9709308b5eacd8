//! Command definitions
//!
//! Represents the first line of every client request.

use std::fmt;

use super::Framing;

/// Prefix of the framing negotiation command
const FRAMING_PREFIX: &str = "FRAMING ";

/// A parsed command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Fetch a file from the server
    Download,

    /// Store a file on the server
    Upload,

    /// Remove a file from the server
    Delete,

    /// End the session
    Exit,

    /// Switch the session to another framing
    Framing(Framing),
}

impl Command {
    /// Parse a received line; `None` for anything outside the vocabulary
    pub fn parse(line: &str) -> Option<Command> {
        match line {
            "DOWNLOAD" => Some(Command::Download),
            "UPLOAD" => Some(Command::Upload),
            "DELETE" => Some(Command::Delete),
            "EXIT" => Some(Command::Exit),
            _ => line
                .strip_prefix(FRAMING_PREFIX)
                .and_then(Framing::from_wire_name)
                .map(Command::Framing),
        }
    }

    /// The line sent on the wire
    pub fn to_line(self) -> String {
        match self {
            Command::Download => "DOWNLOAD".to_string(),
            Command::Upload => "UPLOAD".to_string(),
            Command::Delete => "DELETE".to_string(),
            Command::Exit => "EXIT".to_string(),
            Command::Framing(framing) => format!("{}{}", FRAMING_PREFIX, framing.wire_name()),
        }
    }

    /// Whether a name section follows the command line
    pub fn has_name_section(self) -> bool {
        matches!(self, Command::Download | Command::Upload | Command::Delete)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// A framed client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,

    /// File name carried in the name section
    pub name: String,

    /// Content lines (UPLOAD only)
    pub content: Option<Vec<String>>,
}

impl Request {
    pub fn download(name: impl Into<String>) -> Self {
        Self {
            command: Command::Download,
            name: name.into(),
            content: None,
        }
    }

    pub fn upload(name: impl Into<String>, content: Vec<String>) -> Self {
        Self {
            command: Command::Upload,
            name: name.into(),
            content: Some(content),
        }
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self {
            command: Command::Delete,
            name: name.into(),
            content: None,
        }
    }
}
