//! Vanity DNS Server Library
//!
//! A small personal directory: records loaded from a CSV file are answered as
//! synthetic DNS records (A, AAAA, CNAME, TXT, URI) and as HTTP redirects.
//! Records are found by numeric id, short alias (`e-42`) or name.

// Define modules
pub mod config;
pub mod dns;
pub mod errors;
pub mod handlers;
pub mod http;
pub mod names;
pub mod resolver;
pub mod store;
pub mod utils;

// Re-export commonly used items
pub use config::ServerConfig;
pub use errors::ServerError;
pub use store::{Record, RecordStore};
