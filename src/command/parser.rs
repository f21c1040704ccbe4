//! Command Parsing

use std::net::IpAddr;

use thiserror::Error;

/// A fully parsed user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MyIp,
    MyPort,
    Connect { ip: IpAddr, port: u16 },
    List,
    Terminate { id: usize },
    Send { id: usize, message: String },
    Exit,
}

/// The line did not match any command form.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid command")]
pub struct ParseError;

/// Parses one line of user input. The message argument of `send` keeps its
/// interior spacing; everything else is whitespace-delimited.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let (word, rest) = split_word(line);
    match word {
        "myip" if rest.is_empty() => Ok(Command::MyIp),
        "myport" if rest.is_empty() => Ok(Command::MyPort),
        "list" if rest.is_empty() => Ok(Command::List),
        "exit" if rest.is_empty() => Ok(Command::Exit),
        "connect" => {
            let (ip, rest) = split_word(rest);
            let (port, rest) = split_word(rest);
            if !rest.is_empty() {
                return Err(ParseError);
            }
            let ip = ip.parse().map_err(|_| ParseError)?;
            let port = port.parse().map_err(|_| ParseError)?;
            Ok(Command::Connect { ip, port })
        }
        "terminate" => {
            let (id, rest) = split_word(rest);
            if !rest.is_empty() {
                return Err(ParseError);
            }
            Ok(Command::Terminate {
                id: id.parse().map_err(|_| ParseError)?,
            })
        }
        "send" => {
            let (id, message) = split_word(rest);
            let id = id.parse().map_err(|_| ParseError)?;
            if message.is_empty() {
                return Err(ParseError);
            }
            Ok(Command::Send {
                id,
                message: message.to_string(),
            })
        }
        _ => Err(ParseError),
    }
}

/// Splits the leading word off `s`, trimming the separator run.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(at) => (&s[..at], s[at..].trim_start()),
        None => (s, ""),
    }
}
