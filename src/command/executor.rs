//! Command Executor
//!
//! The foreground task: reads commands from standard input and issues the
//! corresponding table operations, one-to-one.

use std::io::Write as _;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error};

use super::parser::{self, Command};
use crate::connection::{DialError, Dialer, PeerTable, TableError};
use crate::{console, netinfo, Result};

pub struct CommandExecutor {
    table: Arc<PeerTable>,
    dialer: Dialer,
    listen_port: u16,
}

impl CommandExecutor {
    pub fn new(table: Arc<PeerTable>, listen_port: u16) -> Self {
        let dialer = Dialer::new(Arc::clone(&table));
        Self {
            table,
            dialer,
            listen_port,
        }
    }

    /// Reads commands until `exit` or end of input, then tears down every
    /// remaining connection.
    pub async fn run(&self) -> Result<()> {
        console::print_menu();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            prompt();
            let Some(line) = lines.next_line().await? else {
                debug!("standard input closed, exiting");
                break;
            };
            match parser::parse(&line) {
                Ok(Command::Exit) => {
                    println!("Exiting application...");
                    break;
                }
                Ok(command) => self.execute(command).await,
                Err(_) => println!("Invalid command. Please try again."),
            }
        }
        self.close_all().await;
        Ok(())
    }

    async fn execute(&self, command: Command) {
        match command {
            Command::MyIp => match netinfo::local_ipv4_interfaces() {
                Ok(interfaces) => {
                    println!("IP Addresses:");
                    for (name, addr) in interfaces {
                        println!("- {name}: {addr}");
                    }
                }
                Err(e) => error!("could not enumerate interfaces: {e:#}"),
            },
            Command::MyPort => println!("Listening on port: {}", self.listen_port),
            Command::Connect { ip, port } => match self.dialer.dial(ip, port).await {
                Ok(_) => println!("Connected to {ip}:{port}"),
                Err(DialError::ConnectionLimitReached { .. }) => {
                    println!("Connection limit reached!")
                }
                Err(DialError::ConnectFailed { source, .. }) => {
                    println!("Connection failed: {source}")
                }
            },
            Command::List => {
                let connections = self.table.list().await;
                if connections.is_empty() {
                    println!("No active connections.");
                } else {
                    println!("ID\tIP Address\tPort");
                    for (id, peer) in connections {
                        println!("{id}\t{}\t{}", peer.ip(), peer.port());
                    }
                }
            }
            Command::Terminate { id } => match self.table.terminate_by_id(id).await {
                Ok(peer) => println!("Terminated connection {id} ({peer})"),
                Err(_) => println!("Invalid connection ID."),
            },
            Command::Send { id, message } => {
                match self.table.send_by_id(id, message.as_bytes()).await {
                    Ok(peer) => println!("Message sent to {peer} - {message}"),
                    Err(TableError::NotFound(_)) => println!("Invalid connection ID."),
                    Err(TableError::Io(e)) => println!("Failed to send message: {e}"),
                }
            }
            // `Exit` is intercepted by `run` before `execute` is called.
            Command::Exit => unreachable!("Exit is handled in run()"),
        }
    }

    /// Drains the table in ascending order. Removal renumbers, so repeatedly
    /// taking id 1 visits every entry.
    pub async fn close_all(&self) {
        while let Ok(peer) = self.table.terminate_by_id(1).await {
            println!("Terminated connection ({peer})");
        }
    }
}

fn prompt() {
    print!("Enter your command: ");
    let _ = std::io::stdout().flush();
}
