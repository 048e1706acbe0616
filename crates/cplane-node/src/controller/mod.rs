// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller-side messaging plane (C5): accepts Worker connections,
//! authenticates them, tracks sessions and managed objects, and exposes
//! the request/reply API the cluster-facing handlers call into.

pub mod api;
pub mod auth;
pub mod hub;
pub mod managed_objects;
pub mod session;

pub use auth::WorkerAuthRegistry;
pub use hub::ControllerHub;
pub use managed_objects::{cascade_delete_secrets, ManagedObject, ManagedObjectRegistry};
pub use session::{SessionEntry, SessionMap};

use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tracing::{info, warn};

/// Reads the `{name, secret}` auth fields off the upgrade request's query
/// string (`?name=...&secret=...`), mirroring the original's Socket.IO
/// `auth` handshake payload.
fn parse_auth_query(query: &str) -> Option<(String, String)> {
    let mut name = None;
    let mut secret = None;
    for pair in query.split('&') {
        if let Some((k, v)) = pair.split_once('=') {
            match k {
                "name" => name = Some(v.to_string()),
                "secret" => secret = Some(v.to_string()),
                _ => {}
            }
        }
    }
    Some((name?, secret?))
}

/// Runs the Controller's accept loop on `addr` until the process exits.
pub async fn serve(addr: SocketAddr, hub: ControllerHub) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "controller listening");
    loop {
        let (stream, peer) = listener.accept().await?;
        let hub = hub.clone();
        tokio::spawn(async move {
            let captured_query = Arc::new(StdMutex::new(None));
            let captured = captured_query.clone();
            let callback = move |req: &Request, resp: Response| {
                if let Ok(mut slot) = captured.lock() {
                    *slot = req.uri().query().map(str::to_string);
                }
                Ok(resp)
            };

            let ws_stream = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!(%peer, error = %e, "websocket handshake failed");
                    return;
                }
            };

            let query = captured_query.lock().ok().and_then(|g| g.clone());
            let Some((name, secret)) = query.as_deref().and_then(parse_auth_query) else {
                warn!(%peer, "worker handshake missing name/secret");
                return;
            };
            if !hub.auth.verify(&name, &secret) {
                warn!(%peer, name, "worker auth failed");
                return;
            }

            hub.handle_connection(ws_stream, name).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_auth_query_reads_both_fields() {
        let (name, secret) = parse_auth_query("name=worker-a&secret=topsecret").unwrap();
        assert_eq!(name, "worker-a");
        assert_eq!(secret, "topsecret");
    }

    #[test]
    fn parse_auth_query_missing_secret_is_none() {
        assert!(parse_auth_query("name=worker-a").is_none());
    }
}
