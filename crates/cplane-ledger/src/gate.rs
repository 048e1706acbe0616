// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The gate decision (§4.3): given the existing ledger row (if any) for a
//! `(system_type, system_id, change_set_id)` triple and the change set's
//! freshly computed checksum, decide whether it must run.
//!
//! This module is pure — no I/O — so it can be exercised without a
//! database. [`crate::store::LedgerStore`] wires it to persistence.

use crate::error::LedgerError;
use crate::record::{ExecType, GateDecision, LedgerRecord};
use cplane_changelog::{checksum_unchanged, ChangeSet};

/// Decides whether `change_set` should run against `(system_type,
/// system_id)`, given the row currently on file (`existing`) and the
/// change set's computed checksum. Returns the decision and the record
/// state that must be written back before returning control to the
/// caller (regardless of RUN/SKIP).
pub fn decide(
    existing: Option<&LedgerRecord>,
    system_type: &str,
    system_id: &str,
    change_set: &ChangeSet,
    computed_checksum: &str,
) -> Result<(GateDecision, LedgerRecord), LedgerError> {
    let Some(existing) = existing else {
        let record = LedgerRecord {
            system_type: system_type.to_string(),
            system_id: system_id.to_string(),
            change_set_id: change_set.id.clone(),
            exectype: ExecType::Init,
            checksum: computed_checksum.to_string(),
            author: change_set.author.clone(),
            filename: change_set.filename.clone(),
            comment: change_set.comment.clone(),
        };
        return Ok((GateDecision::Run, record));
    };

    if !existing.filename.is_empty() && existing.filename != change_set.filename {
        return Err(LedgerError::FilenameMismatch {
            change_set_id: change_set.id.clone(),
            first_filename: existing.filename.clone(),
            other_filename: change_set.filename.clone(),
        });
    }

    let mut record = existing.clone();
    record.comment = change_set.comment.clone();

    match existing.exectype {
        ExecType::Init | ExecType::Failed => {
            record.checksum = computed_checksum.to_string();
            Ok((GateDecision::Run, record))
        }
        ExecType::Executed => {
            if change_set.run_on_change && !checksum_unchanged(&existing.checksum, computed_checksum) {
                record.exectype = ExecType::Init;
                record.checksum = computed_checksum.to_string();
                Ok((GateDecision::Run, record))
            } else {
                record.checksum = computed_checksum.to_string();
                Ok((GateDecision::Skip, record))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cplane_changelog::ChangeSet;

    fn change_set(filename: &str, run_on_change: bool) -> ChangeSet {
        ChangeSet {
            id: "cs-1".into(),
            author: Some("alice".into()),
            comment: None,
            context: String::new(),
            ignore: false,
            run_on_change,
            filename: filename.to_string(),
            changes: vec![],
        }
    }

    fn record(exectype: ExecType, checksum: &str, filename: &str) -> LedgerRecord {
        LedgerRecord {
            system_type: "registry".into(),
            system_id: "sys-1".into(),
            change_set_id: "cs-1".into(),
            exectype,
            checksum: checksum.to_string(),
            author: Some("alice".into()),
            filename: filename.to_string(),
            comment: None,
        }
    }

    #[test]
    fn no_record_runs_and_creates_init_row() {
        let cs = change_set("a.yaml", false);
        let (decision, record) = decide(None, "registry", "sys-1", &cs, "2:abc").unwrap();
        assert_eq!(decision, GateDecision::Run);
        assert_eq!(record.exectype, ExecType::Init);
    }

    #[test]
    fn init_row_always_reruns() {
        let existing = record(ExecType::Init, "2:old", "a.yaml");
        let cs = change_set("a.yaml", false);
        let (decision, record) = decide(Some(&existing), "registry", "sys-1", &cs, "2:new").unwrap();
        assert_eq!(decision, GateDecision::Run);
        assert_eq!(record.checksum, "2:new");
    }

    #[test]
    fn failed_row_always_reruns() {
        let existing = record(ExecType::Failed, "2:old", "a.yaml");
        let cs = change_set("a.yaml", false);
        let (decision, _) = decide(Some(&existing), "registry", "sys-1", &cs, "2:new").unwrap();
        assert_eq!(decision, GateDecision::Run);
    }

    #[test]
    fn executed_row_skips_when_checksum_unchanged() {
        let existing = record(ExecType::Executed, "2:same", "a.yaml");
        let cs = change_set("a.yaml", true);
        let (decision, _) = decide(Some(&existing), "registry", "sys-1", &cs, "2:same").unwrap();
        assert_eq!(decision, GateDecision::Skip);
    }

    #[test]
    fn executed_row_without_run_on_change_never_reruns() {
        let existing = record(ExecType::Executed, "2:old", "a.yaml");
        let cs = change_set("a.yaml", false);
        let (decision, _) = decide(Some(&existing), "registry", "sys-1", &cs, "2:new").unwrap();
        assert_eq!(decision, GateDecision::Skip);
    }

    #[test]
    fn executed_row_with_run_on_change_reruns_on_checksum_change() {
        let existing = record(ExecType::Executed, "2:old", "a.yaml");
        let cs = change_set("a.yaml", true);
        let (decision, record) = decide(Some(&existing), "registry", "sys-1", &cs, "2:new").unwrap();
        assert_eq!(decision, GateDecision::Run);
        assert_eq!(record.exectype, ExecType::Init);
    }

    #[test]
    fn filename_mismatch_after_executed_is_hard_error() {
        let existing = record(ExecType::Executed, "2:old", "a.yaml");
        let cs = change_set("b.yaml", false);
        let err = decide(Some(&existing), "registry", "sys-1", &cs, "2:old").unwrap_err();
        assert!(matches!(err, LedgerError::FilenameMismatch { .. }));
    }
}
