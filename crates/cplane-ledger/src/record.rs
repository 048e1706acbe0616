// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ledger row shape and its execution-state machine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecType {
    Init,
    Executed,
    Failed,
}

cplane_core::simple_display! {
    ExecType {
        Init => "INIT",
        Executed => "EXECUTED",
        Failed => "FAILED",
    }
}

impl std::str::FromStr for ExecType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INIT" => Ok(Self::Init),
            "EXECUTED" => Ok(Self::Executed),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown exectype {other:?}")),
        }
    }
}

/// One row in `change_log`, identified by `(system_type, system_id,
/// change_set_id)`.
#[derive(Debug, Clone)]
pub struct LedgerRecord {
    pub system_type: String,
    pub system_id: String,
    pub change_set_id: String,
    pub exectype: ExecType,
    pub checksum: String,
    pub author: Option<String>,
    pub filename: String,
    pub comment: Option<String>,
}

/// What the gate decided for one change set, and the record state that
/// must be persisted alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Run,
    Skip,
}

/// Filters shared by [`crate::store::LedgerStore::list_records`] and
/// [`crate::migration_tool::MigrationToolReader::query`], mirroring
/// `QUERY_CHANGE_LOG`'s request fields.
#[derive(Debug, Clone, Default)]
pub struct ChangeLogQuery {
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub search: Option<String>,
    pub page: u32,
    pub size: u32,
}
