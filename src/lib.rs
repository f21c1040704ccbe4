//! Peerchat Library
//!
//! Peer-to-peer command-line chat over raw TCP. Every running instance is
//! both a server accepting inbound peers and a client dialing out to other
//! instances; the heart of the crate is the shared connection table and the
//! per-connection receive loops that mutate it concurrently.

pub mod command;
pub mod config;
pub mod connection;
pub mod console;
pub mod netinfo;
pub mod shutdown;

pub use config::Config;
pub use connection::{Dialer, Listener, PeerTable};
pub use shutdown::ShutdownCoordinator;

/// Common error type for the application
pub type Result<T> = anyhow::Result<T>;
