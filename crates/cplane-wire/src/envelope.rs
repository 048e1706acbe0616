// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message envelope and the closed set of message kinds.

use cplane_core::id::RequestId;
use serde::{Deserialize, Serialize};

/// The closed set of messages exchanged over the cluster messaging plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    WorkerInfo,
    ManagedObjects,
    QueryChangeLog,
    DeleteChangeLog,
    EditChangeLog,
    QueryChangeSet,
    QuerySecret,
    UpgradeWorker,
}

cplane_core::simple_display! {
    MessageType {
        WorkerInfo => "WORKER_INFO",
        ManagedObjects => "MANAGED_OBJECTS",
        QueryChangeLog => "QUERY_CHANGE_LOG",
        DeleteChangeLog => "DELETE_CHANGE_LOG",
        EditChangeLog => "EDIT_CHANGE_LOG",
        QueryChangeSet => "QUERY_CHANGE_SET",
        QuerySecret => "QUERY_SECRET",
        UpgradeWorker => "UPGRADE_WORKER",
    }
}

/// A single frame on the cluster messaging plane.
///
/// `request_id` correlates a reply with its originating request; a sender
/// that expects no reply (e.g. `WORKER_INFO`) still fills in a fresh one so
/// any error frame the peer emits can be matched back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub request_id: RequestId,
    pub data: serde_json::Value,
}

impl Envelope {
    pub fn new(message_type: MessageType, data: serde_json::Value) -> Self {
        Self {
            message_type,
            request_id: RequestId::new(),
            data,
        }
    }

    pub fn reply_to(&self, data: serde_json::Value) -> Self {
        Self {
            message_type: self.message_type,
            request_id: self.request_id,
            data,
        }
    }
}

/// Reply `data` shape: `code: 0` on success, `code: -1` plus `msg` on
/// failure. Used by handlers that don't already have a richer payload type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl ReplyEnvelope {
    pub fn ok(data: serde_json::Value) -> Self {
        Self { code: 0, msg: None, data: Some(data), total: None }
    }

    pub fn ok_page(data: serde_json::Value, total: u64) -> Self {
        Self { code: 0, msg: None, data: Some(data), total: Some(total) }
    }

    pub fn ok_empty() -> Self {
        Self { code: 0, msg: None, data: None, total: None }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self { code: -1, msg: Some(msg.into()), data: None, total: None }
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    /// The fixed wording used for a Controller-side timeout, matching the
    /// wording callers should be able to match on.
    pub fn timeout() -> Self {
        Self::error("timed out waiting for worker reply")
    }

    pub fn offline() -> Self {
        Self::error("worker is offline")
    }
}
