//! Vanity DNS Server
//!
//! Answers DNS queries and HTTP requests for a fixed set of directory records
//! loaded from a CSV file at startup.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use log::{error, info};
use tokio::task::JoinSet;

use vanity_dns_server::{
    config::ServerConfig,
    errors::ServerError,
    handlers::{run_tcp_server, run_udp_server},
    http::run_http_server,
    store::RecordStore,
};

type Listener = Pin<Box<dyn Future<Output = Result<(), ServerError>> + Send>>;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    // Load configuration from environment variables
    let config = Arc::new(ServerConfig::from_env()?);

    // The store is complete before any listener starts and never changes afterwards
    let store = Arc::new(RecordStore::load_csv(&config.csv_file, &config.url_prefix)?);

    let mut listeners: Vec<(&'static str, Listener)> = vec![
        (
            "DNS/UDP",
            Box::pin(run_udp_server(config.clone(), store.clone())) as Listener,
        ),
        (
            "HTTP",
            Box::pin(run_http_server(config.clone(), store.clone())) as Listener,
        ),
    ];
    if config.dns_tcp {
        let tcp: Listener = Box::pin(run_tcp_server(config.clone(), store.clone()));
        listeners.push(("DNS/TCP", tcp));
    }

    let mut tasks = JoinSet::new();
    for (name, listener) in listeners {
        tasks.spawn(async move { (name, listener.await) });
    }

    // Wait for a shutdown signal; a failed listener only takes itself down
    loop {
        tokio::select! {
            _ = shutdown_signal() => {
                info!("Shutdown signal received, stopping");
                return Ok(());
            }
            joined = tasks.join_next() => match joined {
                Some(Ok((name, Ok(())))) => info!("{} listener stopped", name),
                Some(Ok((name, Err(e)))) => error!("{} listener failed: {}", name, e),
                Some(Err(e)) => error!("Listener task aborted: {}", e),
                None => return Err(ServerError::ListenersStopped),
            },
        }
    }
}

/// Resolve on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
