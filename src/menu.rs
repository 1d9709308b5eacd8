//! Interactive client menu
//!
//! Line-oriented console front end for `Client`. Generic over its input and
//! output so it runs the same against a terminal or a test buffer.

use std::io::{BufRead, Write};

use crate::error::{Result, TransferError};
use crate::network::Client;
use crate::protocol::Transport;

const MENU: &str = "\n-----------------
Enter the nr to:
1: Download from the server
2: Upload to the server
3: Delete from the server
4: Delete from the client
5: Exit
-----------------";

/// A menu selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Download,
    Upload,
    DeleteRemote,
    DeleteLocal,
    Exit,
}

impl MenuChoice {
    /// Parse a menu line; anything unknown is `None`
    pub fn parse(input: &str) -> Option<MenuChoice> {
        match input.trim() {
            "1" => Some(MenuChoice::Download),
            "2" => Some(MenuChoice::Upload),
            "3" => Some(MenuChoice::DeleteRemote),
            "4" => Some(MenuChoice::DeleteLocal),
            "5" => Some(MenuChoice::Exit),
            _ => None,
        }
    }

    fn prompt(self) -> &'static str {
        match self {
            MenuChoice::Download => "Enter the file name that you wish to download:",
            MenuChoice::Upload => "Enter the file name that you wish to upload to the server:",
            MenuChoice::DeleteRemote => {
                "Enter the file name that you wish to delete from the server:"
            }
            MenuChoice::DeleteLocal => {
                "Enter the file name that you wish to delete from the client:"
            }
            MenuChoice::Exit => "",
        }
    }
}

/// Run the menu until the user exits, input ends or the channel closes
///
/// Every operation prints exactly one message. Any choice outside the menu
/// ends the session like `5`.
pub fn run_menu<S, R, W>(mut client: Client<S>, input: &mut R, output: &mut W) -> Result<()>
where
    S: Transport,
    R: BufRead,
    W: Write,
{
    loop {
        writeln!(output, "{}", MENU)?;

        let choice = match read_input(input)? {
            Some(line) => MenuChoice::parse(&line).unwrap_or(MenuChoice::Exit),
            None => MenuChoice::Exit,
        };

        if choice == MenuChoice::Exit {
            writeln!(output, "Exiting the program.")?;
            return client.exit();
        }

        writeln!(output, "{}", choice.prompt())?;
        let Some(name) = read_input(input)? else {
            writeln!(output, "Exiting the program.")?;
            return client.exit();
        };

        let message = match choice {
            MenuChoice::Download => report(client.download(&name)),
            MenuChoice::Upload => report(client.upload(&name)),
            MenuChoice::DeleteRemote => report(client.delete(&name)),
            MenuChoice::DeleteLocal => {
                if name.is_empty() {
                    continue;
                }
                match client.delete_local(&name) {
                    Ok(()) => Ok(format!("The file {} was deleted from the client.", name)),
                    Err(_) => Ok(format!(
                        "An error occurred when trying to delete the file {} from the client.",
                        name
                    )),
                }
            }
            MenuChoice::Exit => unreachable!("exit handled above"),
        };

        match message {
            Ok(message) => writeln!(output, "{}", message)?,
            Err(e) => {
                writeln!(output, "The connection to the server was lost.")?;
                return Err(e);
            }
        }
    }
}

/// Message for the console; only a closed channel ends the menu
fn report(result: Result<crate::protocol::Outcome>) -> Result<String> {
    match result {
        Ok(outcome) => Ok(outcome.message),
        Err(TransferError::ChannelClosed) => Err(TransferError::ChannelClosed),
        Err(e) => Ok(e.to_string()),
    }
}

fn read_input<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string()))
}
