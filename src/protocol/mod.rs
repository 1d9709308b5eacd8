//! Protocol Module
//!
//! Defines the line-oriented wire protocol between client and server.
//!
//! ## Request Format (legacy framing)
//! ```text
//! DOWNLOAD | UPLOAD | DELETE        command line
//! <file name>                       name section
//! DATA_NAME_SENT
//! <content line 1>                  content section (UPLOAD only)
//! ...
//! DATA_TEXT_SENT
//! ```
//!
//! ## Response Format
//! ```text
//! <content line 1>                  DOWNLOAD success only
//! ...
//! DATA_TEXT_SENT
//! FINISHED_REQUEST | ERROR          outcome pair
//! <message>
//! FINISHED_REQUEST                  DOWNLOAD failure only
//! ```
//!
//! `EXIT` ends the session and has no response. `FRAMING COUNTED` switches
//! both ends to counted framing, where every section starts with `LINES <n>`.

mod channel;
mod codec;
mod command;
mod response;
mod sentinel;

pub use channel::{LineChannel, Transport};
pub use codec::{Framing, LineCodec, LineSink, LineSource, COUNT_HEADER};
pub use command::{Command, Request};
pub use response::{Outcome, Status};
pub use sentinel::Sentinel;
