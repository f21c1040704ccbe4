//! Interactive Command Module
//!
//! Parses newline-delimited commands from standard input and maps each one
//! onto a table operation.

pub mod executor;
pub mod parser;

pub use executor::CommandExecutor;
pub use parser::{Command, ParseError};
