// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON Schema validation of a raw parsed change-log document, one schema
//! per [`TargetKind`], run before the document is mapped onto the typed
//! model in [`crate::model`].

use crate::error::ChangeLogError;
use crate::model::TargetKind;
use serde_json::{json, Value};
use std::sync::OnceLock;

fn change_set_envelope(changes_schema: Value) -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "changeSet": {
                    "type": "object",
                    "properties": {
                        "id": { "type": ["string", "number"] },
                        "author": { "type": "string" },
                        "comment": { "type": "string" },
                        "context": { "type": "string" },
                        "ignore": { "type": "boolean" },
                        "runOnChange": { "type": "boolean" },
                        "changes": changes_schema,
                    },
                    "required": ["changes"],
                },
                "include": {
                    "type": "object",
                    "properties": {
                        "file": { "type": "string" },
                        "ignore": { "type": "boolean" },
                    },
                    "required": ["file"],
                },
            },
        },
    })
}

fn registry_schema() -> &'static Value {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        change_set_envelope(json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "namespace": { "type": "string" },
                    "group": { "type": "string" },
                    "dataId": { "type": "string" },
                    "delete": { "type": "boolean" },
                    "format": { "type": "string", "pattern": "^(yaml|properties|json|text)$" },
                    "patchContent": { "type": "string" },
                    "deleteContent": { "type": "string" },
                },
                "required": ["group", "dataId"],
            },
        }))
    })
}

fn search_schema() -> &'static Value {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        change_set_envelope(json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "method": {
                        "type": "string",
                        "pattern": "^(GET|PUT|POST|DELETE|HEAD|PATCH|OPTIONS)$",
                    },
                    "path": { "type": "string" },
                    "body": { "type": "string" },
                },
                "required": ["method", "path"],
            },
        }))
    })
}

fn graph_schema() -> &'static Value {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        change_set_envelope(json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "type": { "type": "string", "pattern": "^(gremlin|openCypher|sparql)$" },
                    "dataset": { "type": "string" },
                    "query": { "type": "string" },
                },
                "required": ["type", "query"],
            },
        }))
    })
}

fn schema_for(kind: TargetKind) -> &'static Value {
    match kind {
        TargetKind::Registry => registry_schema(),
        TargetKind::Search => search_schema(),
        TargetKind::Graph => graph_schema(),
    }
}

/// Validates `document` (the raw `changeLog` array, already extracted from
/// its wrapper key) against the schema for `kind`. Collects every
/// validation error into one message so the caller reports them all at
/// once, matching how a single YAML file is a single unit of review.
pub fn validate(kind: TargetKind, document: &Value, file: &str) -> Result<(), ChangeLogError> {
    let schema = schema_for(kind);
    let validator = jsonschema::validator_for(schema).map_err(|e| ChangeLogError::SchemaInvalid {
        file: file.to_string(),
        detail: format!("invalid schema: {e}"),
    })?;

    let errors: Vec<String> = validator.iter_errors(document).map(|e| e.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ChangeLogError::SchemaInvalid { file: file.to_string(), detail: errors.join("; ") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_minimal_registry_document() {
        let doc = json!([
            {
                "changeSet": {
                    "id": "1",
                    "changes": [
                        { "group": "DEFAULT_GROUP", "dataId": "app.yaml", "format": "yaml", "patchContent": "a: 1" }
                    ]
                }
            }
        ]);
        assert!(validate(TargetKind::Registry, &doc, "f.yaml").is_ok());
    }

    #[test]
    fn rejects_registry_change_missing_data_id() {
        let doc = json!([
            { "changeSet": { "id": "1", "changes": [ { "group": "DEFAULT_GROUP" } ] } }
        ]);
        assert!(validate(TargetKind::Registry, &doc, "f.yaml").is_err());
    }

    #[test]
    fn rejects_unknown_format_value() {
        let doc = json!([
            { "changeSet": { "id": "1", "changes": [
                { "group": "g", "dataId": "d", "format": "xml", "patchContent": "x" }
            ] } }
        ]);
        assert!(validate(TargetKind::Registry, &doc, "f.yaml").is_err());
    }

    #[test]
    fn accepts_include_entry() {
        let doc = json!([{ "include": { "file": "child.yaml" } }]);
        assert!(validate(TargetKind::Registry, &doc, "f.yaml").is_ok());
    }

    #[test]
    fn accepts_minimal_graph_document() {
        let doc = json!([
            { "changeSet": { "id": "1", "changes": [ { "type": "gremlin", "query": "g.V()" } ] } }
        ]);
        assert!(validate(TargetKind::Graph, &doc, "f.yaml").is_ok());
    }
}
