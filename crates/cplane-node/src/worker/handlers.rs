// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side handlers for the inbound message kinds (§6): each reads the
//! incoming envelope's `data`, does the work against the ledger or a
//! downstream system, and returns the [`ReplyEnvelope`] to send back.

use chrono::{DateTime, Utc};
use cplane_changelog::{force_mark_checksum, parse_tree, TargetKind};
use cplane_ledger::ChangeLogQuery;
use cplane_wire::ReplyEnvelope;
use serde::Deserialize;
use serde_json::json;

use super::state::{not_found, WorkerState};

fn target_kind(system_type: &str) -> Option<TargetKind> {
    match system_type {
        "registry" => Some(TargetKind::Registry),
        "search" => Some(TargetKind::Search),
        "graph" => Some(TargetKind::Graph),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct PageRequest {
    system_id: String,
    system_type: String,
    #[serde(default)]
    page: u32,
    #[serde(default)]
    size: u32,
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    end_time: Option<DateTime<Utc>>,
}

impl From<PageRequest> for ChangeLogQuery {
    fn from(req: PageRequest) -> Self {
        ChangeLogQuery {
            start_time: req.start_time,
            end_time: req.end_time,
            search: req.q,
            page: req.page,
            size: req.size,
        }
    }
}

/// `QUERY_CHANGE_LOG`: database systems are read through the external
/// migration tool's own ledger; everything else through this store's.
pub async fn query_change_log(state: &WorkerState, data: serde_json::Value) -> ReplyEnvelope {
    let req: PageRequest = match serde_json::from_value(data) {
        Ok(r) => r,
        Err(e) => return ReplyEnvelope::error(format!("bad request: {e}")),
    };
    let (system_id, system_type) = (req.system_id.clone(), req.system_type.clone());
    let query: ChangeLogQuery = req.into();

    if system_type == "database" {
        let Some(reader) = state.migration_readers.get(&system_id) else {
            return not_found(&system_type, &system_id);
        };
        return match reader.query(&query).await {
            Ok((rows, total)) => {
                let data = rows
                    .into_iter()
                    .map(|r| {
                        json!({
                            "changeSetId": r.change_set_id,
                            "author": r.author,
                            "filename": r.filename,
                            "dateExecuted": r.date_executed,
                            "exectype": r.exectype,
                            "checksum": r.checksum,
                            "comment": r.comment,
                        })
                    })
                    .collect::<Vec<_>>();
                ReplyEnvelope::ok_page(json!(data), total as u64)
            }
            Err(e) => ReplyEnvelope::error(e.to_string()),
        };
    }

    match state.store.list_records(&system_type, &system_id, &query).await {
        Ok((rows, total)) => {
            let data = rows
                .into_iter()
                .map(|r| {
                    json!({
                        "changeSetId": r.change_set_id,
                        "author": r.author,
                        "filename": r.filename,
                        "exectype": r.exectype.to_string(),
                        "checksum": r.checksum,
                        "comment": r.comment,
                    })
                })
                .collect::<Vec<_>>();
            ReplyEnvelope::ok_page(json!(data), total as u64)
        }
        Err(e) => ReplyEnvelope::error(e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct DeleteRequest {
    system_id: String,
    system_type: String,
    change_set_ids: Vec<String>,
}

/// `DELETE_CHANGE_LOG`: same database-vs-store dispatch as above.
pub async fn delete_change_log(state: &WorkerState, data: serde_json::Value) -> ReplyEnvelope {
    let req: DeleteRequest = match serde_json::from_value(data) {
        Ok(r) => r,
        Err(e) => return ReplyEnvelope::error(format!("bad request: {e}")),
    };

    if req.system_type == "database" {
        let Some(reader) = state.migration_readers.get(&req.system_id) else {
            return not_found(&req.system_type, &req.system_id);
        };
        return match reader.delete(&req.change_set_ids).await {
            Ok(()) => ReplyEnvelope::ok_empty(),
            Err(e) => ReplyEnvelope::error(e.to_string()),
        };
    }

    match state.store.delete_records(&req.system_type, &req.system_id, &req.change_set_ids).await {
        Ok(()) => ReplyEnvelope::ok_empty(),
        Err(e) => ReplyEnvelope::error(e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct ChangeSetEdit {
    change_set_id: String,
    exec_status: String,
}

#[derive(Debug, Deserialize)]
struct EditRequest {
    system_id: String,
    system_type: String,
    change_sets: Vec<ChangeSetEdit>,
}

/// `EDIT_CHANGE_LOG`: force-marks a row's `exectype`, rewriting its
/// checksum to the legacy-prefixed form so the next natural run recomputes
/// cleanly instead of treating the force-mark as a drift.
pub async fn edit_change_log(state: &WorkerState, data: serde_json::Value) -> ReplyEnvelope {
    let req: EditRequest = match serde_json::from_value(data) {
        Ok(r) => r,
        Err(e) => return ReplyEnvelope::error(format!("bad request: {e}")),
    };
    if req.system_type == "database" {
        return ReplyEnvelope::error("database systems are edited through the migration tool directly");
    }

    for edit in req.change_sets {
        let Ok(exectype) = edit.exec_status.parse() else {
            return ReplyEnvelope::error(format!("unknown exec status {:?}", edit.exec_status));
        };
        let existing = match state.store.find_record(&req.system_type, &req.system_id, &edit.change_set_id).await {
            Ok(Some(r)) => r,
            Ok(None) => return ReplyEnvelope::error(format!("no such change set {:?}", edit.change_set_id)),
            Err(e) => return ReplyEnvelope::error(e.to_string()),
        };
        let mut updated = existing;
        updated.exectype = exectype;
        updated.checksum = force_mark_checksum(&updated.checksum);
        if let Err(e) = state.store.upsert_record(&updated).await {
            return ReplyEnvelope::error(e.to_string());
        }
    }
    ReplyEnvelope::ok_empty()
}

#[derive(Debug, Deserialize)]
struct ChangeSetRequest {
    system_id: String,
    system_type: String,
    change_set_id: String,
}

/// `QUERY_CHANGE_SET`: re-parses the system's change-log tree from disk and
/// returns the named change set's changes.
pub async fn query_change_set(state: &WorkerState, data: serde_json::Value) -> ReplyEnvelope {
    let req: ChangeSetRequest = match serde_json::from_value(data) {
        Ok(r) => r,
        Err(e) => return ReplyEnvelope::error(format!("bad request: {e}")),
    };
    let Some(kind) = target_kind(&req.system_type) else {
        return ReplyEnvelope::error(format!("unknown system type {:?}", req.system_type));
    };
    let root = state.changelog_root(&req.system_type, &req.system_id);
    let tree = match parse_tree(&root, kind, &[]) {
        Ok(t) => t,
        Err(e) => return ReplyEnvelope::error(e.to_string()),
    };
    match tree.by_id.get(&req.change_set_id) {
        Some(change_set) => ReplyEnvelope::ok(serde_json::to_value(change_set).unwrap_or(json!({}))),
        None => ReplyEnvelope::error(format!("no such change set {:?}", req.change_set_id)),
    }
}

/// `QUERY_SECRET`: lists provisioned `(username, object_list)` pairs.
pub async fn query_secret(state: &WorkerState, data: serde_json::Value) -> ReplyEnvelope {
    let req: PageRequest = match serde_json::from_value(data) {
        Ok(r) => r,
        Err(e) => return ReplyEnvelope::error(format!("bad request: {e}")),
    };
    let (system_id, system_type) = (req.system_id.clone(), req.system_type.clone());
    let query: ChangeLogQuery = req.into();
    match state.store.list_provision_secrets(&system_type, &system_id, &query).await {
        Ok((rows, total)) => {
            let data = rows
                .into_iter()
                .map(|(username, object_list)| json!({ "username": username, "objectList": object_list }))
                .collect::<Vec<_>>();
            ReplyEnvelope::ok_page(json!(data), total as u64)
        }
        Err(e) => ReplyEnvelope::error(e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct UpgradeRequest {
    url: String,
    username: Option<String>,
    password: Option<String>,
}

/// `UPGRADE_WORKER`: downloads the upgrade artifact to
/// `{home}/upgrade/<basename>`. Applying it (replacing the running binary)
/// is left to the operator's own deploy tooling.
pub async fn upgrade_worker(state: &WorkerState, data: serde_json::Value) -> ReplyEnvelope {
    let req: UpgradeRequest = match serde_json::from_value(data) {
        Ok(r) => r,
        Err(e) => return ReplyEnvelope::error(format!("bad request: {e}")),
    };

    let mut builder = state.http.get(&req.url);
    if let Some(username) = &req.username {
        builder = builder.basic_auth(username, req.password.as_deref());
    }
    let response = match builder.send().await {
        Ok(r) => r,
        Err(e) => return ReplyEnvelope::error(e.to_string()),
    };
    if !response.status().is_success() {
        return ReplyEnvelope::error(format!("upgrade download failed with status {}", response.status()));
    }
    let bytes = match response.bytes().await {
        Ok(b) => b,
        Err(e) => return ReplyEnvelope::error(e.to_string()),
    };

    let basename = req.url.rsplit('/').next().unwrap_or("upgrade.bin");
    let dir = std::path::PathBuf::from(state.config.home_dir()).join("upgrade");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        return ReplyEnvelope::error(e.to_string());
    }
    let dest = dir.join(basename);
    if let Err(e) = std::fs::write(&dest, &bytes) {
        return ReplyEnvelope::error(e.to_string());
    }

    ReplyEnvelope::ok(json!({ "path": dest.display().to_string(), "bytes": bytes.len() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cplane_core::Config;
    use cplane_ledger::{ExecType, LedgerRecord, LedgerStore};
    use std::collections::HashMap;

    fn minimal_config() -> Config {
        Config::parse(
            r#"
            [config]
            database-uri = "sqlite::memory:"

            [config.node]
            role = "worker"
            name = "w1"
            "#,
        )
        .unwrap()
    }

    async fn test_state() -> WorkerState {
        let config = minimal_config();
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
    async fn query_change_log_returns_empty_page_for_unknown_system() {
        let state = test_state().await;
        let data = json!({ "system_id": "sys-1", "system_type": "registry", "page": 1, "size": 10 });
        let reply = query_change_log(&state, data).await;
        assert!(reply.is_ok());
        assert_eq!(reply.total, Some(0));
    }

    #[tokio::test]
    async fn query_change_log_rejects_bad_request() {
        let state = test_state().await;
        let reply = query_change_log(&state, json!({ "bogus": true })).await;
        assert!(!reply.is_ok());
    }

    #[tokio::test]
    async fn edit_change_log_force_marks_checksum() {
        let state = test_state().await;
        state
            .store
            .upsert_record(&LedgerRecord {
                system_type: "registry".into(),
                system_id: "sys-1".into(),
                change_set_id: "cs-1".into(),
                exectype: ExecType::Failed,
                checksum: "2:abc123".into(),
                author: None,
                filename: "a.yaml".into(),
                comment: None,
            })
            .await
            .unwrap();

        let data = json!({
            "system_id": "sys-1",
            "system_type": "registry",
            "change_sets": [{ "change_set_id": "cs-1", "exec_status": "EXECUTED" }],
        });
        let reply = edit_change_log(&state, data).await;
        assert!(reply.is_ok());

        let updated = state.store.find_record("registry", "sys-1", "cs-1").await.unwrap().unwrap();
        assert_eq!(updated.exectype, ExecType::Executed);
        assert_eq!(updated.checksum, "0:abc123");
    }

    #[tokio::test]
    async fn edit_change_log_rejects_unknown_change_set() {
        let state = test_state().await;
        let data = json!({
            "system_id": "sys-1",
            "system_type": "registry",
            "change_sets": [{ "change_set_id": "missing", "exec_status": "EXECUTED" }],
        });
        let reply = edit_change_log(&state, data).await;
        assert!(!reply.is_ok());
    }

    #[tokio::test]
    async fn query_secret_paginates_provisioned_users() {
        let state = test_state().await;
        state
            .store
            .upsert_provision_secret("registry", "sys-1", "svc-user", b"cipher", "obj-a")
            .await
            .unwrap();
        let data = json!({ "system_id": "sys-1", "system_type": "registry", "page": 1, "size": 10 });
        let reply = query_secret(&state, data).await;
        assert!(reply.is_ok());
        assert_eq!(reply.total, Some(1));
    }
}
