//! Configuration for the directory server.
//!
//! This module defines the configuration structure and methods to load
//! configuration from environment variables.

use std::{
    env,
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use axum::http::uri::Authority;

use crate::errors::ServerError;

/// Time-to-live for every synthesized record. Answers are never meant to be cached.
pub const RECORD_TTL: u32 = 0;

/// Maximum size of DNS packets in bytes.
pub const MAX_PACKET_SIZE: usize = 4096;

/// Prefix stripped and re-applied by the URL sanitizer unless `URLPREFIX` says otherwise.
pub const DEFAULT_URL_PREFIX: &str = "https://de.wikipedia.org/wiki/";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base domain without surrounding dots, e.g. `e-nr.de`.
    pub base_domain: String,

    /// Path to the record data file.
    pub csv_file: PathBuf,

    /// Address of the DNS listeners.
    pub dns_addr: SocketAddr,

    /// Address of the HTTP listener.
    pub http_addr: SocketAddr,

    /// Whether DNS is also answered over TCP.
    pub dns_tcp: bool,

    /// Prefix handled by the URL sanitizer.
    pub url_prefix: String,

    /// Static page served when an HTTP lookup finds nothing.
    pub index_file: PathBuf,

    /// Redirect target for hosts outside the base domain.
    pub canonical_root: String,

    /// Maximum size of DNS packets.
    pub max_packet_size: usize,
}

impl ServerConfig {
    /// Load server configuration from environment variables.
    ///
    /// # Returns
    /// A `Result` containing either the loaded `ServerConfig` or a `ServerError`.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let bind_ip: IpAddr = var("BINDADDR", "0.0.0.0")
            .parse()
            .map_err(|_| ServerError::Config("Invalid BINDADDR address".into()))?;
        let dns_port = parse_port(&var("DNSPORT", "53"), "DNSPORT")?;
        let http_port = parse_port(&var("HTTPPORT", "80"), "HTTPPORT")?;

        let base_domain = var("BASEDOMAIN", ".e-nr.de.")
            .trim_matches('.')
            .to_ascii_lowercase();
        if base_domain.is_empty() {
            return Err(ServerError::Config("BASEDOMAIN must not be empty".into()));
        }

        let canonical_root = lookup("CANONICALROOT").unwrap_or_else(|| format!("//{base_domain}"));

        Ok(Self {
            csv_file: var("CSVFILE", "dns.csv").into(),
            dns_addr: SocketAddr::new(bind_ip, dns_port),
            http_addr: SocketAddr::new(bind_ip, http_port),
            dns_tcp: lookup("DNSTCP")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            url_prefix: var("URLPREFIX", DEFAULT_URL_PREFIX),
            index_file: var("INDEXFILE", "index.html").into(),
            max_packet_size: MAX_PACKET_SIZE,
            canonical_root,
            base_domain,
        })
    }

    /// Whether an HTTP host header names the base domain or one of its subdomains.
    pub fn owns_host(&self, host: &str) -> bool {
        let host = host_without_port(host).trim_end_matches('.').to_ascii_lowercase();
        host == self.base_domain
            || host
                .strip_suffix(self.base_domain.as_str())
                .is_some_and(|rest| rest.ends_with('.'))
    }
}

/// Strip an optional `:port` from a host header value.
pub fn host_without_port(host: &str) -> String {
    host.parse::<Authority>()
        .map(|authority| authority.host().to_string())
        .unwrap_or_else(|_| host.to_string())
}

fn parse_port(value: &str, key: &str) -> Result<u16, ServerError> {
    value
        .trim()
        .parse()
        .map_err(|_| ServerError::Config(format!("Invalid {key} port: {value}")))
}
