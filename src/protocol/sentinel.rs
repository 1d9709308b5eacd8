//! Sentinel definitions
//!
//! Reserved line values that delimit sections. They are never valid payload
//! in the legacy framing.

use std::fmt;

/// Reserved framing lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentinel {
    /// End of the file name section
    DataNameSent,

    /// End of the file content section
    DataTextSent,

    /// Request completed; a message line follows
    FinishedRequest,

    /// Request failed; a message line follows
    Error,
}

impl Sentinel {
    /// Every sentinel, in wire order of appearance
    pub const ALL: [Sentinel; 4] = [
        Sentinel::DataNameSent,
        Sentinel::DataTextSent,
        Sentinel::FinishedRequest,
        Sentinel::Error,
    ];

    /// The exact line sent on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            Sentinel::DataNameSent => "DATA_NAME_SENT",
            Sentinel::DataTextSent => "DATA_TEXT_SENT",
            Sentinel::FinishedRequest => "FINISHED_REQUEST",
            Sentinel::Error => "ERROR",
        }
    }

    /// Match a received line against the sentinel vocabulary
    pub fn parse(line: &str) -> Option<Sentinel> {
        Self::ALL.into_iter().find(|s| s.as_str() == line)
    }

    /// True if the line collides with any sentinel
    pub fn is_sentinel(line: &str) -> bool {
        Self::parse(line).is_some()
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
