// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change-log tree parser (§4.2): walks a file or directory, validates
//! against the target kind's schema, resolves includes, detects duplicate
//! ids, and orders change sets by embedded file version.

use crate::content;
use crate::error::ChangeLogError;
use crate::model::{Change, ChangeSet, ContentFormat, RegistryChange, TargetKind};
use crate::schema;
use crate::version::sort_by_version;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// The result of parsing one change-log tree: every change set keyed by
/// id (for duplicate detection across files), plus the ordered,
/// non-ignored list used for gating.
#[derive(Debug, Default)]
pub struct ParsedTree {
    pub by_id: IndexMap<String, ChangeSet>,
    pub ordered: Vec<ChangeSet>,
}

#[derive(Debug, serde::Deserialize)]
struct RawDocument {
    #[serde(rename = "changeLog", default)]
    change_log: Vec<serde_yaml::Value>,
}

#[derive(Debug, serde::Deserialize)]
struct RawEntry {
    #[serde(default, rename = "changeSet")]
    change_set: Option<RawChangeSet>,
    #[serde(default)]
    include: Option<RawInclude>,
}

#[derive(Debug, serde::Deserialize)]
struct RawChangeSet {
    #[serde(default)]
    id: Option<serde_yaml::Value>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    context: String,
    #[serde(default)]
    ignore: bool,
    #[serde(default, rename = "runOnChange")]
    run_on_change: bool,
    changes: Vec<serde_json::Value>,
}

#[derive(Debug, serde::Deserialize)]
struct RawInclude {
    file: String,
    #[serde(default)]
    ignore: bool,
}

/// Parses `path` (a file or a directory) as a change-log tree of the given
/// kind. `allowed_coordinates`, when non-empty, restricts which registry
/// config keys (or search paths / graph datasets — kind-dependent) may
/// appear; anything else is a hard error.
pub fn parse_tree(
    path: &Path,
    kind: TargetKind,
    allowed_coordinates: &[String],
) -> Result<ParsedTree, ChangeLogError> {
    let mut stack = Vec::new();
    let mut tree = ParsedTree::default();
    parse_node(path, kind, allowed_coordinates, &mut stack, &mut tree)?;
    Ok(tree)
}

fn parse_node(
    path: &Path,
    kind: TargetKind,
    allowed_coordinates: &[String],
    stack: &mut Vec<PathBuf>,
    tree: &mut ParsedTree,
) -> Result<(), ChangeLogError> {
    if path.is_file() {
        parse_file(path, kind, allowed_coordinates, stack, tree)
    } else if path.is_dir() {
        parse_dir(path, kind, allowed_coordinates, stack, tree)
    } else {
        Err(ChangeLogError::PathNotFound(path.display().to_string()))
    }
}

fn parse_dir(
    dir: &Path,
    kind: TargetKind,
    allowed_coordinates: &[String],
    stack: &mut Vec<PathBuf>,
    tree: &mut ParsedTree,
) -> Result<(), ChangeLogError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|source| ChangeLogError::Io {
        path: dir.display().to_string(),
        source,
    })? {
        let entry = entry.map_err(|source| ChangeLogError::Io { path: dir.display().to_string(), source })?;
        let p = entry.path();
        if p.is_file() {
            let ext_is_yaml = p
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yaml" || e == "yml")
                .unwrap_or(false);
            if ext_is_yaml {
                files.push(p);
            }
        }
    }
    let names: Vec<String> = files
        .into_iter()
        .map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default())
        .collect();
    let sorted = sort_by_version(names);
    for name in sorted {
        let child = dir.join(&name);
        parse_file(&child, kind, allowed_coordinates, stack, tree)?;
    }
    Ok(())
}

fn parse_file(
    file: &Path,
    kind: TargetKind,
    allowed_coordinates: &[String],
    stack: &mut Vec<PathBuf>,
    tree: &mut ParsedTree,
) -> Result<(), ChangeLogError> {
    let canonical = std::fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
    if stack.contains(&canonical) {
        return Err(ChangeLogError::IncludeCycle {
            file: file.display().to_string(),
            include: file.display().to_string(),
        });
    }
    stack.push(canonical);

    let text = std::fs::read_to_string(file).map_err(|source| ChangeLogError::Io {
        path: file.display().to_string(),
        source,
    })?;
    let filename = file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();

    let raw_value: serde_yaml::Value =
        serde_yaml::from_str(&text).map_err(|source| ChangeLogError::Yaml { file: filename.clone(), source })?;

    let entries_value = raw_value
        .get("changeLog")
        .cloned()
        .unwrap_or(serde_yaml::Value::Sequence(Vec::new()));
    let json_entries: serde_json::Value =
        serde_json::to_value(&entries_value).unwrap_or(serde_json::Value::Array(Vec::new()));
    schema::validate(kind, &json_entries, &filename)?;

    let document: RawDocument =
        serde_yaml::from_value(raw_value).map_err(|source| ChangeLogError::Yaml { file: filename.clone(), source })?;

    let mut include_files = Vec::new();
    for entry_value in document.change_log {
        let entry: RawEntry = serde_yaml::from_value(entry_value)
            .map_err(|source| ChangeLogError::Yaml { file: filename.clone(), source })?;

        if let Some(raw_cs) = entry.change_set {
            let change_set = build_change_set(raw_cs, &filename, kind, allowed_coordinates)?;
            if tree.by_id.contains_key(&change_set.id) {
                return Err(ChangeLogError::DuplicateChangeSetId {
                    file: filename.clone(),
                    change_set_id: change_set.id.clone(),
                });
            }
            let ignore = change_set.ignore;
            tree.by_id.insert(change_set.id.clone(), change_set.clone());
            if !ignore {
                tree.ordered.push(change_set);
            }
        } else if let Some(include) = entry.include {
            if include_files.contains(&include.file) {
                return Err(ChangeLogError::RepeatedInclude {
                    file: filename.clone(),
                    include: include.file.clone(),
                });
            }
            include_files.push(include.file.clone());
            if include.ignore {
                continue;
            }
            let base_dir = file.parent().unwrap_or_else(|| Path::new("."));
            let child_path = base_dir.join(&include.file);
            parse_node(&child_path, kind, allowed_coordinates, stack, tree)?;
        }
    }

    stack.pop();
    Ok(())
}

fn build_change_set(
    raw: RawChangeSet,
    filename: &str,
    kind: TargetKind,
    allowed_coordinates: &[String],
) -> Result<ChangeSet, ChangeLogError> {
    let id = raw
        .id
        .map(|v| match v {
            serde_yaml::Value::String(s) => s,
            other => serde_yaml::to_string(&other).unwrap_or_default().trim().to_string(),
        })
        .unwrap_or_else(|| filename.trim_end_matches(".yaml").trim_end_matches(".yml").to_string());

    let mut seen_keys = std::collections::HashSet::new();
    let mut changes = Vec::with_capacity(raw.changes.len());
    for raw_change in raw.changes {
        let change = build_change(raw_change, kind, &id, filename)?;
        let key = coordinate_of(&change);
        if !seen_keys.insert(key.clone()) {
            return duplicate_change_error(&change, &id, filename);
        }
        if !allowed_coordinates.is_empty() && !allowed_coordinates.contains(&key) {
            return Err(ChangeLogError::NotAllowed { change_set_id: id, coordinate: key });
        }
        validate_change_content(&change, &id, filename)?;
        changes.push(change);
    }

    Ok(ChangeSet {
        id,
        author: raw.author,
        comment: raw.comment,
        context: raw.context,
        ignore: raw.ignore,
        run_on_change: raw.run_on_change,
        filename: filename.to_string(),
        changes,
    })
}

fn duplicate_change_error(change: &Change, change_set_id: &str, filename: &str) -> Result<ChangeSet, ChangeLogError> {
    if let Change::Registry(r) = change {
        return Err(ChangeLogError::DuplicateRegistryChange {
            file: filename.to_string(),
            change_set_id: change_set_id.to_string(),
            namespace: r.namespace.clone(),
            group: r.group.clone(),
            data_id: r.data_id.clone(),
        });
    }
    Err(ChangeLogError::DuplicateRegistryChange {
        file: filename.to_string(),
        change_set_id: change_set_id.to_string(),
        namespace: String::new(),
        group: String::new(),
        data_id: coordinate_of(change),
    })
}

fn coordinate_of(change: &Change) -> String {
    match change {
        Change::Registry(c) => format!("{}/{}/{}", c.namespace, c.group, c.data_id),
        Change::Search(c) => format!("{:?} {}", c.method, c.path),
        Change::Graph(c) => format!("{} {}", c.query_type, c.dataset.clone().unwrap_or_default()),
    }
}

fn build_change(
    raw: serde_json::Value,
    kind: TargetKind,
    _change_set_id: &str,
    filename: &str,
) -> Result<Change, ChangeLogError> {
    let change = match kind {
        TargetKind::Registry => Change::Registry(
            serde_json::from_value::<RegistryChange>(raw)
                .map_err(|e| ChangeLogError::SchemaInvalid { file: filename.to_string(), detail: e.to_string() })?,
        ),
        TargetKind::Search => Change::Search(
            serde_json::from_value(raw)
                .map_err(|e| ChangeLogError::SchemaInvalid { file: filename.to_string(), detail: e.to_string() })?,
        ),
        TargetKind::Graph => Change::Graph(
            serde_json::from_value(raw)
                .map_err(|e| ChangeLogError::SchemaInvalid { file: filename.to_string(), detail: e.to_string() })?,
        ),
    };
    Ok(change)
}

fn validate_change_content(change: &Change, change_set_id: &str, filename: &str) -> Result<(), ChangeLogError> {
    let Change::Registry(c) = change else { return Ok(()) };
    if c.delete {
        return Ok(());
    }
    let Some(format) = c.format else {
        return Err(ChangeLogError::FormatRequired {
            file: filename.to_string(),
            change_set_id: change_set_id.to_string(),
        });
    };
    if !c.patch_content.trim().is_empty() {
        validate_field(&c.patch_content, format, "patchContent", change_set_id, filename)?;
    }
    if !c.delete_content.trim().is_empty() {
        validate_field(&c.delete_content, format, "deleteContent", change_set_id, filename)?;
    }
    Ok(())
}

fn validate_field(
    value: &str,
    format: ContentFormat,
    field: &'static str,
    change_set_id: &str,
    filename: &str,
) -> Result<(), ChangeLogError> {
    content::validate(value, format).map_err(|e| ChangeLogError::ContentInvalid {
        file: filename.to_string(),
        change_set_id: change_set_id.to_string(),
        field,
        format: format.to_string(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parses_single_file_with_one_change_set() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "a.yaml",
            r#"
changeLog:
  - changeSet:
      id: "1"
      changes:
        - group: DEFAULT_GROUP
          dataId: app.yaml
          format: yaml
          patchContent: "a: 1"
"#,
        );
        let tree = parse_tree(&file, TargetKind::Registry, &[]).unwrap();
        assert_eq!(tree.ordered.len(), 1);
        assert_eq!(tree.ordered[0].id, "1");
        assert_eq!(tree.ordered[0].filename, "a.yaml");
    }

    #[test]
    fn duplicate_change_set_id_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "a.yaml",
            r#"
changeLog:
  - changeSet:
      id: "1"
      changes:
        - group: g
          dataId: d1
          format: yaml
          patchContent: "a: 1"
  - changeSet:
      id: "1"
      changes:
        - group: g
          dataId: d2
          format: yaml
          patchContent: "a: 1"
"#,
        );
        let err = parse_tree(&file, TargetKind::Registry, &[]).unwrap_err();
        assert!(matches!(err, ChangeLogError::DuplicateChangeSetId { .. }));
    }

    #[test]
    fn duplicate_config_key_within_change_set_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "a.yaml",
            r#"
changeLog:
  - changeSet:
      id: "1"
      changes:
        - group: g
          dataId: d1
          format: yaml
          patchContent: "a: 1"
        - group: g
          dataId: d1
          format: yaml
          patchContent: "b: 2"
"#,
        );
        let err = parse_tree(&file, TargetKind::Registry, &[]).unwrap_err();
        assert!(matches!(err, ChangeLogError::DuplicateRegistryChange { .. }));
    }

    #[test]
    fn ignored_change_set_is_indexed_but_not_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "a.yaml",
            r#"
changeLog:
  - changeSet:
      id: "1"
      ignore: true
      changes:
        - group: g
          dataId: d1
          format: yaml
          patchContent: "a: 1"
"#,
        );
        let tree = parse_tree(&file, TargetKind::Registry, &[]).unwrap();
        assert!(tree.ordered.is_empty());
        assert!(tree.by_id.contains_key("1"));
    }

    #[test]
    fn missing_format_on_non_delete_change_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "a.yaml",
            r#"
changeLog:
  - changeSet:
      id: "1"
      changes:
        - group: g
          dataId: d1
"#,
        );
        let err = parse_tree(&file, TargetKind::Registry, &[]).unwrap_err();
        assert!(matches!(err, ChangeLogError::FormatRequired { .. }));
    }

    #[test]
    fn include_resolves_child_file_and_merges_ids() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "child.yaml",
            r#"
changeLog:
  - changeSet:
      id: "child-1"
      changes:
        - group: g
          dataId: d2
          format: yaml
          patchContent: "a: 1"
"#,
        );
        let parent = write_file(
            dir.path(),
            "parent.yaml",
            r#"
changeLog:
  - include:
      file: child.yaml
  - changeSet:
      id: "parent-1"
      changes:
        - group: g
          dataId: d1
          format: yaml
          patchContent: "a: 1"
"#,
        );
        let tree = parse_tree(&parent, TargetKind::Registry, &[]).unwrap();
        assert!(tree.by_id.contains_key("child-1"));
        assert!(tree.by_id.contains_key("parent-1"));
        assert_eq!(tree.ordered.len(), 2);
    }

    #[test]
    fn repeated_include_of_same_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "child.yaml", "changeLog: []\n");
        let parent = write_file(
            dir.path(),
            "parent.yaml",
            r#"
changeLog:
  - include:
      file: child.yaml
  - include:
      file: child.yaml
"#,
        );
        let err = parse_tree(&parent, TargetKind::Registry, &[]).unwrap_err();
        assert!(matches!(err, ChangeLogError::RepeatedInclude { .. }));
    }

    #[test]
    fn directory_tree_orders_files_by_version() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "x-1.10.yaml",
            r#"
changeLog:
  - changeSet:
      id: "v110"
      changes:
        - group: g
          dataId: d
          format: yaml
          patchContent: "a: 1"
"#,
        );
        write_file(
            dir.path(),
            "x-1.2.yaml",
            r#"
changeLog:
  - changeSet:
      id: "v12"
      changes:
        - group: g
          dataId: d2
          format: yaml
          patchContent: "a: 1"
"#,
        );
        let tree = parse_tree(dir.path(), TargetKind::Registry, &[]).unwrap();
        assert_eq!(tree.ordered[0].id, "v12");
        assert_eq!(tree.ordered[1].id, "v110");
    }

    #[test]
    fn allowed_coordinates_rejects_unknown_coordinate() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "a.yaml",
            r#"
changeLog:
  - changeSet:
      id: "1"
      changes:
        - group: g
          dataId: d1
          format: yaml
          patchContent: "a: 1"
"#,
        );
        let err = parse_tree(&file, TargetKind::Registry, &["other/g/d2".to_string()]).unwrap_err();
        assert!(matches!(err, ChangeLogError::NotAllowed { .. }));
    }
}
