//! HTTP redirect front end.
//!
//! Every request is looked up by its path, or by the first label of its host
//! when the path is empty. Hits are redirected to the record's URL.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Router,
};
use log::{debug, info, warn};
use tokio::net::TcpListener;

use crate::config::{host_without_port, ServerConfig};
use crate::errors::ServerError;
use crate::resolver::find_record;
use crate::store::RecordStore;
use crate::utils::decode_path;

/// Shared state of the HTTP handler.
#[derive(Clone)]
pub struct HttpState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<RecordStore>,
}

/// What an HTTP request resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpOutcome {
    /// Permanent redirect to a record's URL.
    Redirect(String),
    /// Serve the local fallback page.
    FallbackPage,
    /// Permanent redirect to the canonical site root.
    CanonicalRoot(String),
}

/// Decide how to answer a request for `host` and `path`.
///
/// # Arguments
/// * `store` - The record store.
/// * `config` - The server configuration.
/// * `host` - The request's host header, possibly with a port.
/// * `path` - The raw, percent-encoded request path.
pub fn route_request(
    store: &RecordStore,
    config: &ServerConfig,
    host: &str,
    path: &str,
) -> HttpOutcome {
    let path_token = decode_path(path).replace('/', "");
    let token = if path_token.is_empty() {
        host_without_port(host)
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string()
    } else {
        path_token
    };

    // a record whose URL did not survive sanitizing has nowhere to redirect to
    match find_record(store, &token).filter(|record| !record.target_url.is_empty()) {
        Some(record) => {
            debug!("{}{} -> {}", host, path, record.target_url);
            HttpOutcome::Redirect(record.target_url.clone())
        }
        // never serve local content to a host outside the base domain
        None if !config.owns_host(host) => {
            HttpOutcome::CanonicalRoot(config.canonical_root.clone())
        }
        None => HttpOutcome::FallbackPage,
    }
}

/// Build the router serving every path with [`handle_request`].
pub fn router(state: HttpState) -> Router {
    Router::new().fallback(handle_request).with_state(state)
}

async fn handle_request(
    State(state): State<HttpState>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| uri.host())
        .unwrap_or_default();

    match route_request(&state.store, &state.config, host, uri.path()) {
        HttpOutcome::Redirect(location) | HttpOutcome::CanonicalRoot(location) => {
            (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
        }
        HttpOutcome::FallbackPage => fallback_page(&state.config).await,
    }
}

async fn fallback_page(config: &ServerConfig) -> Response {
    match tokio::fs::read_to_string(&config.index_file).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            warn!(
                "Could not read fallback page {}: {}",
                config.index_file.display(),
                e
            );
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Run the HTTP server.
///
/// # Arguments
/// * `config` - The server configuration.
/// * `store` - The shared record store.
///
/// # Returns
/// A `Result` indicating why the server stopped.
pub async fn run_http_server(
    config: Arc<ServerConfig>,
    store: Arc<RecordStore>,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind(config.http_addr)
        .await
        .map_err(|source| ServerError::Bind {
            listener: "HTTP",
            addr: config.http_addr,
            source,
        })?;
    info!("HTTP server listening on {}", config.http_addr);

    axum::serve(listener, router(HttpState { config, store })).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    use crate::store::Record;

    const ACME_URL: &str = "https://de.wikipedia.org/wiki/acme";

    fn store() -> RecordStore {
        RecordStore::from_records([Record::new(42, "acme", ACME_URL, "descr", "d1")])
    }

    fn config() -> ServerConfig {
        ServerConfig::from_lookup(|_| None).unwrap()
    }

    #[test]
    fn test_path_lookup() {
        let outcome = route_request(&store(), &config(), "e-nr.de", "/acme");
        assert_eq!(outcome, HttpOutcome::Redirect(ACME_URL.into()));

        let outcome = route_request(&store(), &config(), "e-nr.de", "/e-42/");
        assert_eq!(outcome, HttpOutcome::Redirect(ACME_URL.into()));
    }

    #[test]
    fn test_host_lookup() {
        let outcome = route_request(&store(), &config(), "acme.e-nr.de", "/");
        assert_eq!(outcome, HttpOutcome::Redirect(ACME_URL.into()));

        let outcome = route_request(&store(), &config(), "42.e-nr.de:8080", "");
        assert_eq!(outcome, HttpOutcome::Redirect(ACME_URL.into()));
    }

    #[test]
    fn test_path_wins_over_host() {
        let outcome = route_request(&store(), &config(), "nothing.e-nr.de", "/42");
        assert_eq!(outcome, HttpOutcome::Redirect(ACME_URL.into()));
    }

    #[test]
    fn test_unknown_host_in_domain_gets_fallback() {
        let outcome = route_request(&store(), &config(), "unknown.e-nr.de", "/");
        assert_eq!(outcome, HttpOutcome::FallbackPage);
    }

    #[test]
    fn test_foreign_host_gets_canonical_root() {
        let outcome = route_request(&store(), &config(), "example.com", "/");
        assert_eq!(outcome, HttpOutcome::CanonicalRoot("//e-nr.de".into()));

        let outcome = route_request(&store(), &config(), "127.0.0.1:80", "/nothing");
        assert_eq!(outcome, HttpOutcome::CanonicalRoot("//e-nr.de".into()));
    }

    #[test]
    fn test_found_record_redirects_from_any_host() {
        let outcome = route_request(&store(), &config(), "example.com", "/acme");
        assert_eq!(outcome, HttpOutcome::Redirect(ACME_URL.into()));
    }

    #[test]
    fn test_record_without_url_is_not_redirected() {
        let store = RecordStore::from_records([Record::new(815, "broken", "", "", "")]);

        let outcome = route_request(&store, &config(), "broken.e-nr.de", "/");
        assert_eq!(outcome, HttpOutcome::FallbackPage);

        let outcome = route_request(&store, &config(), "example.com", "/815");
        assert_eq!(outcome, HttpOutcome::CanonicalRoot("//e-nr.de".into()));
    }

    fn app(index_file: &std::path::Path) -> Router {
        let mut config = config();
        config.index_file = index_file.to_path_buf();
        router(HttpState {
            config: Arc::new(config),
            store: Arc::new(store()),
        })
    }

    fn get(host: &str, path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_redirect_is_permanent() {
        let response = app(std::path::Path::new("index.html"))
            .oneshot(get("acme.e-nr.de", "/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], ACME_URL);
    }

    #[tokio::test]
    async fn test_fallback_page_is_served() {
        let mut page = NamedTempFile::new().unwrap();
        write!(page, "<h1>directory</h1>").unwrap();

        let response = app(page.path())
            .oneshot(get("unknown.e-nr.de", "/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<h1>directory</h1>");
    }

    #[tokio::test]
    async fn test_missing_fallback_page_is_not_found() {
        let response = app(std::path::Path::new("/nonexistent/index.html"))
            .oneshot(get("unknown.e-nr.de", "/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_foreign_host_redirects_to_root() {
        let response = app(std::path::Path::new("index.html"))
            .oneshot(get("localhost", "/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "//e-nr.de");
    }
}
