//! Request handlers for the DNS listeners.
//!
//! This module provides functions for handling DNS requests over UDP and TCP.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream, UdpSocket},
    task,
};

use crate::config::ServerConfig;
use crate::dns::handle_packet;
use crate::errors::ServerError;
use crate::store::RecordStore;

/// Size of a DNS header; anything shorter is dropped unanswered.
const DNS_HEADER_SIZE: usize = 12;

/// Run the UDP DNS server.
///
/// # Arguments
/// * `config` - The server configuration.
/// * `store` - The shared record store.
///
/// # Returns
/// A `Result` that is only ever an error: the socket could not be bound.
pub async fn run_udp_server(
    config: Arc<ServerConfig>,
    store: Arc<RecordStore>,
) -> Result<(), ServerError> {
    let socket = UdpSocket::bind(config.dns_addr)
        .await
        .map_err(|source| ServerError::Bind {
            listener: "DNS/UDP",
            addr: config.dns_addr,
            source,
        })?;
    info!("UDP DNS server listening on {}", config.dns_addr);
    let socket = Arc::new(socket);
    let mut buf = vec![0u8; config.max_packet_size];

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((amt, src)) => {
                let query = buf[..amt].to_vec();
                let socket = socket.clone();
                let config = config.clone();
                let store = store.clone();
                task::spawn(async move {
                    if let Err(e) = handle_udp_query(query, src, socket, &config, &store).await {
                        warn!("UDP query error from {}: {}", src, e);
                    }
                });
            }
            Err(e) => error!("UDP receive error: {}", e),
        }
    }
}

/// Handle a UDP DNS query.
///
/// # Arguments
/// * `query` - The DNS query.
/// * `src` - The source address of the query.
/// * `socket` - The UDP socket to send the response on.
/// * `config` - The server configuration.
/// * `store` - The record store.
///
/// # Returns
/// A `Result` indicating success or failure.
pub async fn handle_udp_query(
    query: Vec<u8>,
    src: SocketAddr,
    socket: Arc<UdpSocket>,
    config: &ServerConfig,
    store: &RecordStore,
) -> Result<(), ServerError> {
    if query.len() < DNS_HEADER_SIZE {
        debug!("Received malformed query from {}", src);
        return Ok(());
    }

    let response = handle_packet(&query, store, config)?;
    socket.send_to(&response, src).await?;
    Ok(())
}

/// Run the TCP DNS server.
///
/// # Arguments
/// * `config` - The server configuration.
/// * `store` - The shared record store.
///
/// # Returns
/// A `Result` that is only ever an error: the listener could not be bound.
pub async fn run_tcp_server(
    config: Arc<ServerConfig>,
    store: Arc<RecordStore>,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind(config.dns_addr)
        .await
        .map_err(|source| ServerError::Bind {
            listener: "DNS/TCP",
            addr: config.dns_addr,
            source,
        })?;
    info!("TCP DNS server listening on {}", config.dns_addr);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let config = config.clone();
                let store = store.clone();
                task::spawn(async move {
                    if let Err(e) = handle_tcp_connection(stream, addr, &config, &store).await {
                        warn!("TCP connection error from {}: {}", addr, e);
                    }
                });
            }
            Err(e) => error!("TCP accept error: {}", e),
        }
    }
}

/// Handle a TCP DNS connection.
///
/// Queries are read until the client closes the connection.
///
/// # Arguments
/// * `stream` - The TCP stream.
/// * `addr` - The client address.
/// * `config` - The server configuration.
/// * `store` - The record store.
///
/// # Returns
/// A `Result` indicating success or failure.
pub async fn handle_tcp_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    config: &ServerConfig,
    store: &RecordStore,
) -> Result<(), ServerError> {
    loop {
        // Read the 2-byte length prefix
        let mut len_buf = [0u8; 2];
        match stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        let len = u16::from_be_bytes(len_buf) as usize;

        let mut query = vec![0u8; len];
        stream.read_exact(&mut query).await?;

        if query.len() < DNS_HEADER_SIZE {
            debug!("Received malformed TCP query from {}", addr);
            return Ok(());
        }

        let response = handle_packet(&query, store, config)?;
        send_tcp_response(&mut stream, &response).await?;
    }
}

/// Send a DNS response over TCP.
///
/// # Arguments
/// * `stream` - The TCP stream to send the response on.
/// * `response` - The DNS response to send.
///
/// # Returns
/// A `Result` indicating success or failure.
pub async fn send_tcp_response(stream: &mut TcpStream, response: &[u8]) -> io::Result<()> {
    stream
        .write_all(&(response.len() as u16).to_be_bytes())
        .await?;
    stream.write_all(response).await
}
