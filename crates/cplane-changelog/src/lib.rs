// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cplane-changelog: parsing, validation, checksumming, and context/variable
//! resolution for change-log trees.
//!
//! This crate is pure with respect to the ledger and any downstream
//! system — it turns a directory of YAML files into an ordered,
//! fully-validated list of change sets, and provides the canonicalisation
//! and checksum primitives the gate (in `cplane-ledger`) uses to decide
//! whether each one runs.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod codec;
pub mod content;
pub mod context;
pub mod error;
pub mod model;
pub mod parser;
pub mod schema;
pub mod version;

pub use codec::{checksum, checksum_unchanged, force_mark_checksum, pack, unpack, CodecError};
pub use content::{apply_delete, apply_patch, delete_then_patch, ConfigValue, ContentError};
pub use context::{expand_variables, matches_context};
pub use error::ChangeLogError;
pub use model::{
    Change, ChangeSet, ContentFormat, GraphChange, GraphQueryType, HttpMethod, RegistryChange,
    SearchChange, TargetKind,
};
pub use parser::{parse_tree, ParsedTree};
pub use version::{extract_version, sort_by_version, Version};
