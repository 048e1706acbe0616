// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side messaging plane (C5): a single persistent connection to the
//! Controller, reconnecting with backoff, that reports its managed-object
//! inventory on connect and dispatches inbound requests to [`handlers`].

pub mod handlers;
pub mod inventory;
pub mod state;

pub use state::{WorkerState, WorkerStateError};

use std::sync::Arc;
use std::time::Duration;

use cplane_wire::{read_envelope, Envelope, MessageType, ReplyEnvelope};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{info, warn};

const INITIAL_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Runs the Worker's connect-serve-reconnect loop until the process exits.
/// Never returns under normal operation.
pub async fn run(state: WorkerState) {
    let state = Arc::new(state);
    let mut backoff = INITIAL_BACKOFF;

    loop {
        match connect_and_serve(&state).await {
            Ok(()) => backoff = INITIAL_BACKOFF,
            Err(e) => warn!(error = %e, "controller connection lost, reconnecting"),
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn connect_and_serve(state: &Arc<WorkerState>) -> Result<(), String> {
    let identity = &state.config.config.node;
    let base = identity.controller_url.as_deref().ok_or("config.node.controller_url is not set")?;
    let name = &identity.name;
    let secret = identity.secret.as_deref().unwrap_or_default();
    let url = format!("{}/?name={name}&secret={secret}", base.trim_end_matches('/'));

    let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str()).await.map_err(|e| e.to_string())?;
    info!(%base, %name, "connected to controller");
    let (mut sink, mut source) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let writer = tokio::spawn(async move {
        use futures_util::SinkExt;
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    let inventory = inventory::snapshot(&state.config);
    let info_envelope = Envelope::new(
        MessageType::WorkerInfo,
        serde_json::json!({ "managed_objects": inventory }),
    );
    let text = serde_json::to_string(&info_envelope).unwrap_or_default();
    if tx.send(WsMessage::Text(text)).is_err() {
        writer.abort();
        return Err("writer task closed before WORKER_INFO could be sent".to_string());
    }

    let result = loop {
        match read_envelope(&mut source).await {
            Ok(envelope) => {
                let state = Arc::clone(state);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let message_type = envelope.message_type;
                    let request_id = envelope.request_id;
                    let reply = dispatch(&state, message_type, envelope.data).await;
                    let out = Envelope {
                        message_type,
                        request_id,
                        data: serde_json::to_value(reply).unwrap_or_default(),
                    };
                    let text = serde_json::to_string(&out).unwrap_or_default();
                    let _ = tx.send(WsMessage::Text(text));
                });
            }
            // An unrecognized `type` fails to decode, but the frame itself was
            // well-formed transport; log and keep serving this connection.
            Err(cplane_wire::TransportError::Decode(e)) => {
                warn!(error = %e, "dropping frame with unknown message type");
            }
            Err(e) => break Err(e.to_string()),
        }
    };

    writer.abort();
    result
}

async fn dispatch(state: &WorkerState, message_type: MessageType, data: serde_json::Value) -> ReplyEnvelope {
    match message_type {
        MessageType::QueryChangeLog => handlers::query_change_log(state, data).await,
        MessageType::DeleteChangeLog => handlers::delete_change_log(state, data).await,
        MessageType::EditChangeLog => handlers::edit_change_log(state, data).await,
        MessageType::QueryChangeSet => handlers::query_change_set(state, data).await,
        MessageType::QuerySecret => handlers::query_secret(state, data).await,
        MessageType::UpgradeWorker => handlers::upgrade_worker(state, data).await,
        MessageType::WorkerInfo | MessageType::ManagedObjects => {
            ReplyEnvelope::error(format!("{message_type} is not a worker-inbound request"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cplane_core::Config;
    use cplane_ledger::LedgerStore;
    use std::collections::HashMap;

    async fn test_state() -> WorkerState {
        let config = Config::parse(
            r#"
            [config]
            database-uri = "sqlite::memory:"

            [config.node]
            role = "worker"
            name = "w1"
            "#,
        )
        .unwrap();
        let store = LedgerStore::connect("sqlite::memory:").await.unwrap();
        WorkerState {
            config,
            store,
            http: reqwest::Client::new(),
            registry_clients: HashMap::new(),
            search_executors: HashMap::new(),
            graph_targets: HashMap::new(),
            migration_readers: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn dispatch_rejects_worker_info_as_inbound_request() {
        let state = test_state().await;
        let reply = dispatch(&state, MessageType::WorkerInfo, serde_json::json!({})).await;
        assert!(!reply.is_ok());
    }

    #[tokio::test]
    async fn dispatch_routes_query_secret_to_handler() {
        let state = test_state().await;
        let data = serde_json::json!({ "system_id": "sys-1", "system_type": "registry", "page": 1, "size": 10 });
        let reply = dispatch(&state, MessageType::QuerySecret, data).await;
        assert!(reply.is_ok());
        assert_eq!(reply.total, Some(0));
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let mut backoff = INITIAL_BACKOFF;
        for _ in 0..10 {
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
        assert_eq!(backoff, MAX_BACKOFF);
    }
}
