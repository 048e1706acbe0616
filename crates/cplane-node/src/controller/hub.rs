// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Controller's messaging hub: accepts Worker WebSocket connections,
//! authenticates them, and routes outbound requests to the right session
//! via [`PendingReplies`].
//!
//! Each connection's write half is owned by a small writer task fed by an
//! unbounded channel, so `send_to_worker` never blocks on socket I/O.

use std::collections::HashMap;
use std::sync::Arc;

use cplane_core::{RequestId, SessionId, WorkerId};
use cplane_ledger::LedgerStore;
use cplane_wire::{read_envelope, Envelope, MessageType, PendingReplies, ReplyEnvelope, SendError, TransportError};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{info, warn};

use super::auth::WorkerAuthRegistry;
use super::managed_objects::{cascade_delete_secrets, ManagedObject, ManagedObjectRegistry};
use super::session::{SessionEntry, SessionMap};

/// Shared controller state, cloned into every connection task.
#[derive(Clone)]
pub struct ControllerHub {
    pub sessions: Arc<SessionMap>,
    pub managed_objects: Arc<ManagedObjectRegistry>,
    pub pending: Arc<PendingReplies>,
    pub auth: WorkerAuthRegistry,
    pub store: LedgerStore,
    outbound: Arc<Mutex<HashMap<SessionId, mpsc::UnboundedSender<WsMessage>>>>,
}

impl ControllerHub {
    pub fn new(auth: WorkerAuthRegistry, store: LedgerStore) -> Self {
        Self {
            sessions: Arc::new(SessionMap::new()),
            managed_objects: Arc::new(ManagedObjectRegistry::new()),
            pending: Arc::new(PendingReplies::new()),
            auth,
            store,
            outbound: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Sends `envelope` to `worker_id`'s current session and awaits the
    /// reply, or completes immediately with `offline` if the worker has
    /// no open session.
    pub async fn send_to_worker(
        &self,
        worker_id: &WorkerId,
        message_type: MessageType,
        data: serde_json::Value,
    ) -> Result<ReplyEnvelope, SendError> {
        let Some(session_id) = self.sessions.session_for_worker(worker_id) else {
            return Ok(ReplyEnvelope::offline());
        };
        let envelope = Envelope::new(message_type, data);
        let request_id: RequestId = envelope.request_id.clone();
        let wait = self.pending.wait_for(request_id);

        let sent = {
            let outbound = self.outbound.lock();
            match outbound.get(&session_id) {
                Some(sender) => {
                    let text = serde_json::to_string(&envelope).unwrap_or_default();
                    sender.send(WsMessage::Text(text)).is_ok()
                }
                None => false,
            }
        };
        if !sent {
            return Ok(ReplyEnvelope::offline());
        }

        match wait.await {
            Ok(reply) => Ok(reply),
            Err(SendError::Timeout) => Ok(ReplyEnvelope::timeout()),
            Err(SendError::Offline) => Ok(ReplyEnvelope::offline()),
            Err(SendError::Cancelled) => Ok(ReplyEnvelope::error("request cancelled")),
        }
    }

    /// Serves an already-authenticated Worker connection until it
    /// disconnects. The caller (see [`super::serve`]) performs the
    /// handshake and the `{name, secret}` check.
    pub async fn handle_connection(
        &self,
        ws_stream: tokio_tungstenite::WebSocketStream<TcpStream>,
        name: String,
    ) {
        let (mut sink, mut source) = ws_stream.split();
        let session_id = SessionId::new();
        let worker_id = WorkerId::new();

        let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
        self.sessions.insert(session_id.clone(), SessionEntry { worker_id: worker_id.clone(), name: name.clone() });
        self.outbound.lock().insert(session_id.clone(), tx);
        info!(name, %session_id, "worker connected");

        let writer = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
        });

        loop {
            match read_envelope(&mut source).await {
                Ok(envelope) => self.dispatch_inbound(envelope, &worker_id).await,
                // An unrecognized `type` fails to decode, but the frame itself was
                // well-formed transport; log and keep serving this connection.
                Err(TransportError::Decode(e)) => {
                    warn!(name, error = %e, "dropping frame with unknown message type");
                }
                Err(_) => break,
            }
        }

        writer.abort();
        let removed = self.managed_objects.remove_worker(&worker_id);
        if !removed.is_empty() {
            info!(name, removed = removed.len(), "worker disconnected, clearing managed objects");
            cascade_delete_secrets(&self.store, &removed).await;
        }
        self.sessions.remove(&session_id);
        self.outbound.lock().remove(&session_id);
        info!(name, %session_id, "worker disconnected");
    }

    async fn dispatch_inbound(&self, envelope: Envelope, worker_id: &WorkerId) {
        if envelope.message_type == MessageType::WorkerInfo {
            let objects = envelope
                .data
                .get("managed_objects")
                .cloned()
                .unwrap_or_default();
            if let Ok(objects) = serde_json::from_value::<Vec<ManagedObject>>(objects) {
                let removed = self.managed_objects.reconcile(worker_id, objects);
                if !removed.is_empty() {
                    info!(worker_id = %worker_id, removed = removed.len(), "managed objects removed");
                    cascade_delete_secrets(&self.store, &removed).await;
                }
            }
            return;
        }

        if let Ok(reply) = serde_json::from_value::<ReplyEnvelope>(envelope.data) {
            self.pending.complete(envelope.request_id, reply);
        }
    }
}
