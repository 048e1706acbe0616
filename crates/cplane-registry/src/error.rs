// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("changelog error: {0}")]
    ChangeLog(#[from] cplane_changelog::ChangeLogError),

    #[error("content error: {0}")]
    Content(#[from] cplane_changelog::ContentError),

    #[error("ledger error: {0}")]
    Ledger(#[from] cplane_ledger::LedgerError),

    #[error("missing template variable {0:?}")]
    VariableMissing(String),

    #[error(
        "coordinate {coordinate:?} is not in the allow-list (file {file:?}, change set {change_set_id:?})"
    )]
    NotAllowed {
        file: String,
        change_set_id: String,
        coordinate: String,
    },

    #[error("remote format {remote:?} does not match change format {change:?} for {coordinate:?}")]
    FormatMismatch {
        coordinate: String,
        remote: String,
        change: String,
    },

    #[error("remote content for {0:?} does not parse under its declared format")]
    RemoteContentInvalid(String),

    #[error("mutation content for {0:?} is empty or does not parse under its format")]
    MutationContentInvalid(String),

    #[error("registry client error: {0}")]
    Client(String),
}
