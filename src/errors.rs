//! Error types for the directory server.
//!
//! This module defines the error types used throughout the DNS and HTTP front ends.

use std::net::SocketAddr;

use thiserror::Error;

/// Represents errors that can occur in the directory server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// I/O errors from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors raised while reading the record data file.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A data row that cannot be turned into a record.
    #[error("Malformed record on line {line}: {reason}")]
    Record { line: u64, reason: String },

    /// Errors related to DNS message parsing or encoding.
    #[error("DNS protocol error: {0}")]
    Protocol(#[from] hickory_proto::error::ProtoError),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A listener could not bind its socket.
    #[error("{listener} listener could not bind {addr}: {source}")]
    Bind {
        listener: &'static str,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Every listener has exited.
    #[error("All listeners have stopped")]
    ListenersStopped,
}
