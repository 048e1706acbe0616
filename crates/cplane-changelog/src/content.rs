// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-format content parsing, validation, and patch/delete merge semantics
//! for the registry fetch/apply pipeline.

use crate::model::ContentFormat;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content does not parse as {0}")]
    Parse(ContentFormat),
}

/// An in-memory parsed representation of registry content, one variant per
/// declared [`ContentFormat`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Yaml(Value),
    Properties(BTreeMap<String, String>),
    Json(Value),
    Text(String),
}

pub fn parse(content: &str, format: ContentFormat) -> Result<ConfigValue, ContentError> {
    match format {
        ContentFormat::Yaml => {
            let v: Value = serde_yaml_to_json(content).map_err(|_| ContentError::Parse(format))?;
            Ok(ConfigValue::Yaml(v))
        }
        ContentFormat::Json => {
            let v: Value = serde_json::from_str(content).map_err(|_| ContentError::Parse(format))?;
            Ok(ConfigValue::Json(v))
        }
        ContentFormat::Properties => Ok(ConfigValue::Properties(parse_properties(content))),
        ContentFormat::Text => Ok(ConfigValue::Text(content.to_string())),
    }
}

pub fn validate(content: &str, format: ContentFormat) -> Result<(), ContentError> {
    parse(content, format).map(|_| ())
}

fn serde_yaml_to_json(content: &str) -> Result<Value, serde_yaml::Error> {
    let y: serde_yaml::Value = serde_yaml::from_str(content)?;
    Ok(serde_json::to_value(y).unwrap_or(Value::Null))
}

fn parse_properties(content: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        if let Some((key, value)) = trimmed.split_once(['=', ':']) {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    map
}

fn properties_to_string(map: &BTreeMap<String, String>) -> String {
    map.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("\n")
}

fn render(value: &ConfigValue) -> String {
    match value {
        ConfigValue::Yaml(v) => serde_yaml::to_string(v).unwrap_or_default(),
        ConfigValue::Json(v) => serde_json::to_string_pretty(v).unwrap_or_default(),
        ConfigValue::Properties(m) => properties_to_string(m),
        ConfigValue::Text(s) => s.clone(),
    }
}

/// Recursive mapping merge used by both `yaml` and `json` patch: leaf values
/// replace leaf values, nested objects recurse, object/leaf-type conflicts
/// are left untouched.
fn merge_patch(current: &mut Value, patch: &Value) {
    let (Value::Object(current_map), Value::Object(patch_map)) = (current, patch) else {
        return;
    };
    for (key, patch_value) in patch_map {
        match current_map.get_mut(key) {
            Some(existing) if existing.is_object() && patch_value.is_object() => {
                merge_patch(existing, patch_value);
            }
            Some(existing) if !existing.is_object() && !patch_value.is_object() => {
                *existing = patch_value.clone();
            }
            Some(_) => {} // type mismatch: no-op
            None => {
                current_map.insert(key.clone(), patch_value.clone());
            }
        }
    }
}

/// Recursive mapping delete: `null` removes the key; nested objects
/// recurse; any other present value at a non-object key removes it too.
fn merge_delete(current: &mut Value, delete: &Value) {
    let (Value::Object(current_map), Value::Object(delete_map)) = (current, delete) else {
        return;
    };
    for (key, delete_value) in delete_map {
        let Some(existing) = current_map.get(key) else { continue };
        if delete_value.is_null() {
            current_map.remove(key);
            continue;
        }
        if existing.is_object() && delete_value.is_object() {
            let mut nested = existing.clone();
            merge_delete(&mut nested, delete_value);
            current_map.insert(key.clone(), nested);
        } else if !existing.is_object() && !delete_value.is_object() {
            current_map.remove(key);
        }
    }
}

fn json_union_merge(current: &mut Value, patch: &Value) {
    if let (Value::Array(a), Value::Array(b)) = (&mut *current, patch) {
        for item in b {
            if !a.contains(item) {
                a.push(item.clone());
            }
        }
        return;
    }
    merge_patch(current, patch);
}

fn json_set_difference_delete(current: &mut Value, delete: &Value) {
    if let (Value::Array(a), Value::Array(b)) = (&mut *current, delete) {
        a.retain(|item| !b.contains(item));
        return;
    }
    merge_delete(current, delete);
}

/// Applies `delete_content` then `patch_content` (in that order) to `base`,
/// both expressed in `format`, returning the rendered result.
pub fn delete_then_patch(
    base: &str,
    delete_content: &str,
    patch_content: &str,
    format: ContentFormat,
) -> Result<String, ContentError> {
    let deleted = apply_delete(base, delete_content, format)?;
    apply_patch(&deleted, patch_content, format)
}

pub fn apply_patch(base: &str, patch_content: &str, format: ContentFormat) -> Result<String, ContentError> {
    if patch_content.trim().is_empty() {
        return Ok(base.to_string());
    }
    let mut current = parse_or_empty(base, format)?;
    let patch = parse(patch_content, format)?;
    match (&mut current, &patch) {
        (ConfigValue::Yaml(c), ConfigValue::Yaml(p)) => merge_patch(c, p),
        (ConfigValue::Json(c), ConfigValue::Json(p)) => json_union_merge(c, p),
        (ConfigValue::Properties(c), ConfigValue::Properties(p)) => {
            for (k, v) in p {
                c.insert(k.clone(), v.clone());
            }
        }
        (ConfigValue::Text(_), ConfigValue::Text(p)) => current = ConfigValue::Text(p.clone()),
        _ => unreachable!("parse() always returns the matching variant for `format`"),
    }
    Ok(render(&current))
}

pub fn apply_delete(base: &str, delete_content: &str, format: ContentFormat) -> Result<String, ContentError> {
    if delete_content.trim().is_empty() {
        return Ok(base.to_string());
    }
    let mut current = parse_or_empty(base, format)?;
    let delete = parse(delete_content, format)?;
    match (&mut current, &delete) {
        (ConfigValue::Yaml(c), ConfigValue::Yaml(d)) => merge_delete(c, d),
        (ConfigValue::Json(c), ConfigValue::Json(d)) => json_set_difference_delete(c, d),
        (ConfigValue::Properties(c), ConfigValue::Properties(d)) => {
            for k in d.keys() {
                c.remove(k);
            }
        }
        (ConfigValue::Text(c), ConfigValue::Text(d)) => {
            if c == d {
                current = ConfigValue::Text(String::new());
            }
        }
        _ => unreachable!("parse() always returns the matching variant for `format`"),
    }
    Ok(render(&current))
}

fn parse_or_empty(base: &str, format: ContentFormat) -> Result<ConfigValue, ContentError> {
    if base.trim().is_empty() {
        return Ok(match format {
            ContentFormat::Yaml => ConfigValue::Yaml(Value::Object(Map::new())),
            ContentFormat::Json => ConfigValue::Json(Value::Object(Map::new())),
            ContentFormat::Properties => ConfigValue::Properties(BTreeMap::new()),
            ContentFormat::Text => ConfigValue::Text(String::new()),
        });
    }
    parse(base, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_patch_adds_and_overwrites_leaf_keys() {
        let base = "a: 1\nb:\n  c: 2\n";
        let patch = "a: 9\nb:\n  d: 3\n";
        let result = apply_patch(base, patch, ContentFormat::Yaml).unwrap();
        let parsed: Value = serde_yaml::from_str(&result).unwrap();
        assert_eq!(parsed["a"], 9);
        assert_eq!(parsed["b"]["c"], 2);
        assert_eq!(parsed["b"]["d"], 3);
    }

    #[test]
    fn yaml_delete_removes_null_keys() {
        let base = "a: 1\nb: 2\n";
        let delete = "a: null\n";
        let result = apply_delete(base, delete, ContentFormat::Yaml).unwrap();
        let parsed: Value = serde_yaml::from_str(&result).unwrap();
        assert!(parsed.get("a").is_none());
        assert_eq!(parsed["b"], 2);
    }

    #[test]
    fn yaml_delete_then_patch_order_matches_original() {
        let base = "a: 1\nb: 2\n";
        let result = delete_then_patch(base, "a: null\n", "a: 5\n", ContentFormat::Yaml).unwrap();
        let parsed: Value = serde_yaml::from_str(&result).unwrap();
        assert_eq!(parsed["a"], 5);
        assert_eq!(parsed["b"], 2);
    }

    #[test]
    fn properties_patch_overlays_keys() {
        let base = "a=1\nb=2\n";
        let result = apply_patch(base, "a=9\nc=3\n", ContentFormat::Properties).unwrap();
        let map = parse_properties(&result);
        assert_eq!(map.get("a"), Some(&"9".to_string()));
        assert_eq!(map.get("b"), Some(&"2".to_string()));
        assert_eq!(map.get("c"), Some(&"3".to_string()));
    }

    #[test]
    fn properties_delete_removes_named_keys() {
        let base = "a=1\nb=2\n";
        let result = apply_delete(base, "a=anything\n", ContentFormat::Properties).unwrap();
        let map = parse_properties(&result);
        assert!(!map.contains_key("a"));
        assert_eq!(map.get("b"), Some(&"2".to_string()));
    }

    #[test]
    fn json_patch_unions_arrays() {
        let base = r#"{"tags": ["a", "b"]}"#;
        let result = apply_patch(base, r#"{"tags": ["b", "c"]}"#, ContentFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&result).unwrap();
        let tags = parsed["tags"].as_array().unwrap();
        assert_eq!(tags.len(), 3);
    }

    #[test]
    fn json_delete_removes_array_elements() {
        let base = r#"{"tags": ["a", "b", "c"]}"#;
        let result = apply_delete(base, r#"{"tags": ["b"]}"#, ContentFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&result).unwrap();
        let tags = parsed["tags"].as_array().unwrap();
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn text_patch_replaces_entirely() {
        let result = apply_patch("old", "new", ContentFormat::Text).unwrap();
        assert_eq!(result, "new");
    }

    #[test]
    fn text_delete_clears_on_exact_match() {
        let result = apply_delete("same", "same", ContentFormat::Text).unwrap();
        assert_eq!(result, "");
    }

    #[test]
    fn text_delete_leaves_mismatch_untouched() {
        let result = apply_delete("same", "other", ContentFormat::Text).unwrap();
        assert_eq!(result, "same");
    }

    #[test]
    fn empty_patch_and_delete_are_no_ops() {
        let base = "a: 1\n";
        assert_eq!(apply_patch(base, "", ContentFormat::Yaml).unwrap(), base);
        assert_eq!(apply_delete(base, "  \n", ContentFormat::Yaml).unwrap(), base);
    }

    #[test]
    fn validate_rejects_malformed_json() {
        assert!(validate("{not json", ContentFormat::Json).is_err());
    }
}
