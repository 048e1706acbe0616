// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChangeLogError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: invalid YAML: {source}")]
    Yaml {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{file}: schema validation failed: {detail}")]
    SchemaInvalid { file: String, detail: String },

    #[error("{file}: duplicate change set id {change_set_id:?}")]
    DuplicateChangeSetId { file: String, change_set_id: String },

    #[error("{file}: repeated include {include:?}")]
    RepeatedInclude { file: String, include: String },

    #[error("{file}: include cycle detected at {include:?}")]
    IncludeCycle { file: String, include: String },

    #[error(
        "{file}: changeSetId {change_set_id:?}, namespace {namespace:?}, group {group:?}, dataId {data_id:?}: repeated change in the same change set"
    )]
    DuplicateRegistryChange {
        file: String,
        change_set_id: String,
        namespace: String,
        group: String,
        data_id: String,
    },

    #[error("{file}: changeSetId {change_set_id:?}: format is required for a non-delete change")]
    FormatRequired { file: String, change_set_id: String },

    #[error(
        "{file}: changeSetId {change_set_id:?}: {field} is invalid for format {format}: {detail}"
    )]
    ContentInvalid {
        file: String,
        change_set_id: String,
        field: &'static str,
        format: String,
        detail: String,
    },

    #[error("changeSetId {change_set_id:?} was defined in {first_file:?}, cannot redefine in {other_file:?}")]
    FilenameMismatch {
        change_set_id: String,
        first_file: String,
        other_file: String,
    },

    #[error("changeSetId {change_set_id:?} references coordinate {coordinate:?} which is not in the allowed list")]
    NotAllowed { change_set_id: String, coordinate: String },

    #[error("changeSetId {change_set_id:?}: missing variable binding for ${{{name}}}")]
    VariableMissing { change_set_id: String, name: String },

    #[error("changelog path does not exist: {0}")]
    PathNotFound(String),

    #[error("checksum codec error: {0}")]
    Codec(String),
}
