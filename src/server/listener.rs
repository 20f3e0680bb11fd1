//! TCP accept loop
//!
//! Connections are served by hyper directly rather than `axum::serve` so a
//! request can be refused by failing the service: hyper then drops the
//! connection without writing a response. That is how unknown paths and
//! upgrades over the per-address quota are handled.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Request};
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tower::ServiceExt;
use tracing::{debug, error, info, warn};

use crate::constants::server::CURRENCY_RATE_PATH;
use crate::errors::{ServerError, ServerResult};

use super::manager::ConnectionManager;

/// Bind the listening socket
///
/// # Errors
///
/// Returns `ServerError::Bind` if the address is unavailable.
pub async fn bind(addr: SocketAddr) -> ServerResult<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    if let Ok(local) = listener.local_addr() {
        info!("Ready and listening on {}", local);
    }
    Ok(listener)
}

/// Accept connections until shutdown is broadcast
pub async fn serve(
    listener: TcpListener,
    app: Router,
    manager: Arc<ConnectionManager>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, remote)) => {
                    tokio::spawn(serve_connection(stream, remote, app.clone(), Arc::clone(&manager)));
                }
                Err(e) => warn!("{}", ServerError::Accept(e)),
            },
            _ = shutdown.recv() => {
                info!("Listener stopped");
                return;
            }
        }
    }
}

/// Why a request may not reach the router
fn admit(headers: &HeaderMap, path: &str, remote: SocketAddr, manager: &ConnectionManager) -> Result<(), ServerError> {
    if path == CURRENCY_RATE_PATH {
        return Ok(());
    }
    if !is_upgrade_request(headers) {
        return Err(ServerError::Rejected {
            remote,
            reason: format!("no route for {}", path),
        });
    }
    if !manager.allow_upgrade(remote.ip()) {
        return Err(ServerError::Rejected {
            remote,
            reason: "upgrade rate limit exceeded".to_string(),
        });
    }
    Ok(())
}

/// `Connection: upgrade` together with `Upgrade: websocket`
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
    let websocket = headers
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("websocket"));
    connection_upgrade && websocket
}

async fn serve_connection(stream: TcpStream, remote: SocketAddr, app: Router, manager: Arc<ConnectionManager>) {
    let service = service_fn(move |mut request: Request<Incoming>| {
        let app = app.clone();
        let manager = Arc::clone(&manager);
        async move {
            if let Err(rejection) = admit(request.headers(), request.uri().path(), remote, &manager) {
                error!("{}", rejection);
                return Err(rejection);
            }
            request.extensions_mut().insert(ConnectInfo(remote));
            match app.oneshot(request).await {
                Ok(response) => Ok(response),
                Err(infallible) => match infallible {},
            }
        }
    });

    if let Err(e) = http1::Builder::new()
        .serve_connection(TokioIo::new(stream), service)
        .with_upgrades()
        .await
    {
        debug!("({}) Connection closed: {}", remote, e);
    }
}
