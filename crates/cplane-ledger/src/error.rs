// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(
        "changeSetId {change_set_id:?} was defined in {first_filename:?}, cannot redefine in {other_filename:?}"
    )]
    FilenameMismatch {
        change_set_id: String,
        first_filename: String,
        other_filename: String,
    },

    #[error("changelog codec error: {0}")]
    Codec(#[from] cplane_changelog::CodecError),

    #[error("apply failed for change set {change_set_id:?}: {detail}")]
    ApplyFailed { change_set_id: String, detail: String },
}
