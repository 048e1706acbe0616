// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed request builders over [`ControllerHub::send_to_worker`], one per
//! message kind in the external interface table. Each wraps the envelope's
//! `data` shape so Controller-side API handlers don't hand-build JSON.

use cplane_core::WorkerId;
use cplane_wire::{MessageType, ReplyEnvelope, SendError};
use serde::Serialize;
use serde_json::json;

use super::hub::ControllerHub;

#[derive(Debug, Clone, Serialize, Default)]
pub struct PageQuery {
    pub system_id: String,
    pub system_type: String,
    pub page: u32,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

pub async fn query_change_log(
    hub: &ControllerHub,
    worker_id: &WorkerId,
    req: &PageQuery,
) -> Result<ReplyEnvelope, SendError> {
    let data = serde_json::to_value(req).unwrap_or_else(|_| json!({}));
    hub.send_to_worker(worker_id, MessageType::QueryChangeLog, data).await
}

pub async fn delete_change_log(
    hub: &ControllerHub,
    worker_id: &WorkerId,
    system_id: &str,
    system_type: &str,
    change_set_ids: &[String],
) -> Result<ReplyEnvelope, SendError> {
    let data = json!({
        "system_id": system_id,
        "system_type": system_type,
        "change_set_ids": change_set_ids,
    });
    hub.send_to_worker(worker_id, MessageType::DeleteChangeLog, data).await
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeSetEdit {
    pub change_set_id: String,
    pub exec_status: String,
}

pub async fn edit_change_log(
    hub: &ControllerHub,
    worker_id: &WorkerId,
    system_id: &str,
    system_type: &str,
    change_sets: &[ChangeSetEdit],
) -> Result<ReplyEnvelope, SendError> {
    let data = json!({
        "system_id": system_id,
        "system_type": system_type,
        "change_sets": change_sets,
    });
    hub.send_to_worker(worker_id, MessageType::EditChangeLog, data).await
}

pub async fn query_change_set(
    hub: &ControllerHub,
    worker_id: &WorkerId,
    system_id: &str,
    system_type: &str,
    change_set_id: &str,
) -> Result<ReplyEnvelope, SendError> {
    let data = json!({
        "system_id": system_id,
        "system_type": system_type,
        "change_set_id": change_set_id,
    });
    hub.send_to_worker(worker_id, MessageType::QueryChangeSet, data).await
}

pub async fn query_secret(
    hub: &ControllerHub,
    worker_id: &WorkerId,
    req: &PageQuery,
) -> Result<ReplyEnvelope, SendError> {
    let data = serde_json::to_value(req).unwrap_or_else(|_| json!({}));
    hub.send_to_worker(worker_id, MessageType::QuerySecret, data).await
}

pub async fn upgrade_worker(
    hub: &ControllerHub,
    worker_id: &WorkerId,
    url: &str,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<ReplyEnvelope, SendError> {
    let data = json!({ "url": url, "username": username, "password": password });
    hub.send_to_worker(worker_id, MessageType::UpgradeWorker, data).await
}
