// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsed change-log data model.

use serde::{Deserialize, Serialize};

/// Which downstream kind a change log targets. Each kind has its own
/// change shape and its own JSON Schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Registry,
    Search,
    Graph,
}

cplane_core::simple_display! {
    TargetKind {
        Registry => "registry",
        Search => "search",
        Graph => "graph",
    }
}

/// A fully parsed change set, carrying its source file name for the
/// "bound to first filename" invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSet {
    pub id: String,
    pub author: Option<String>,
    pub comment: Option<String>,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub run_on_change: bool,
    pub filename: String,
    pub changes: Vec<Change>,
}

impl ChangeSet {
    /// Comma-separated context tags, trimmed and with empties dropped.
    pub fn context_tags(&self) -> Vec<&str> {
        self.context
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// A single mutation within a change set, targeting one downstream
/// coordinate. The shape is a tagged union over [`TargetKind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Change {
    Registry(RegistryChange),
    Search(SearchChange),
    Graph(GraphChange),
}

impl Change {
    pub fn kind(&self) -> TargetKind {
        match self {
            Change::Registry(_) => TargetKind::Registry,
            Change::Search(_) => TargetKind::Search,
            Change::Graph(_) => TargetKind::Graph,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Yaml,
    Properties,
    Json,
    Text,
}

cplane_core::simple_display! {
    ContentFormat {
        Yaml => "yaml",
        Properties => "properties",
        Json => "json",
        Text => "text",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryChange {
    #[serde(default)]
    pub namespace: String,
    pub group: String,
    #[serde(rename = "dataId")]
    pub data_id: String,
    pub format: Option<ContentFormat>,
    #[serde(rename = "patchContent", default)]
    pub patch_content: String,
    #[serde(rename = "deleteContent", default)]
    pub delete_content: String,
    #[serde(default)]
    pub delete: bool,
}

impl RegistryChange {
    /// Aggregation key `(namespace, group, dataId)`.
    pub fn config_key(&self) -> (String, String, String) {
        (self.namespace.clone(), self.group.clone(), self.data_id.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Head,
    Patch,
    Options,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchChange {
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GraphQueryType {
    Gremlin,
    OpenCypher,
    Sparql,
}

cplane_core::simple_display! {
    GraphQueryType {
        Gremlin => "gremlin",
        OpenCypher => "openCypher",
        Sparql => "sparql",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphChange {
    #[serde(rename = "type")]
    pub query_type: GraphQueryType,
    pub dataset: Option<String>,
    pub query: String,
}
