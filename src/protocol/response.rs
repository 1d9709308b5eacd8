//! Response definitions
//!
//! Every request ends with an outcome pair: a status line and one message
//! line.

use super::Sentinel;

/// Outcome status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `FINISHED_REQUEST`
    Finished,

    /// `ERROR`
    Error,
}

impl Status {
    /// Sentinel carrying this status on the wire
    pub fn sentinel(self) -> Sentinel {
        match self {
            Status::Finished => Sentinel::FinishedRequest,
            Status::Error => Sentinel::Error,
        }
    }

    /// Map a sentinel to a status, if it is one
    pub fn from_sentinel(sentinel: Sentinel) -> Option<Status> {
        match sentinel {
            Sentinel::FinishedRequest => Some(Status::Finished),
            Sentinel::Error => Some(Status::Error),
            _ => None,
        }
    }
}

/// The `(status, message)` pair ending a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: Status,

    /// Human-readable, always a single line
    pub message: String,
}

impl Outcome {
    /// Create an outcome, flattening the message onto one line
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        let message: String = message.into();
        let is_break = |c: char| c == '\n' || c == '\r';
        let message = if message.contains(is_break) {
            message.replace(is_break, " ")
        } else {
            message
        };
        Self { status, message }
    }

    /// Create a FINISHED_REQUEST outcome
    pub fn finished(message: impl Into<String>) -> Self {
        Self::new(Status::Finished, message)
    }

    /// Create an ERROR outcome
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Finished
    }
}
