// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context filtering and `${name}` variable expansion.

use crate::error::ChangeLogError;
use crate::model::{Change, ChangeSet};
use std::collections::HashMap;

/// True if `change_set` should be considered under the caller's `contexts`
/// filter. An empty filter matches every change set.
pub fn matches_context(change_set: &ChangeSet, contexts: &[&str]) -> bool {
    if contexts.is_empty() {
        return true;
    }
    let tags = change_set.context_tags();
    if tags.is_empty() {
        return false;
    }
    tags.iter().any(|tag| contexts.contains(tag))
}

/// Expands every `${name}` occurrence in a change set's templated fields
/// using `variables`. A reference with no binding is a hard error.
pub fn expand_variables(
    change_set: &ChangeSet,
    variables: &HashMap<String, String>,
) -> Result<ChangeSet, ChangeLogError> {
    let mut expanded = change_set.clone();
    for change in &mut expanded.changes {
        expand_change(change, &change_set.id, variables)?;
    }
    Ok(expanded)
}

fn expand_change(
    change: &mut Change,
    change_set_id: &str,
    variables: &HashMap<String, String>,
) -> Result<(), ChangeLogError> {
    match change {
        Change::Registry(c) => {
            c.namespace = expand_str(&c.namespace, change_set_id, variables)?;
            c.group = expand_str(&c.group, change_set_id, variables)?;
            c.data_id = expand_str(&c.data_id, change_set_id, variables)?;
        }
        Change::Search(c) => {
            c.path = expand_str(&c.path, change_set_id, variables)?;
        }
        Change::Graph(_) => {}
    }
    Ok(())
}

fn expand_str(
    input: &str,
    change_set_id: &str,
    variables: &HashMap<String, String>,
) -> Result<String, ChangeLogError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();
    while let Some((_, ch)) = chars.next() {
        if ch == '$' {
            if let Some(&(_, '{')) = chars.peek() {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    out.push_str("${");
                    out.push_str(&name);
                    continue;
                }
                match variables.get(&name) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(ChangeLogError::VariableMissing {
                            change_set_id: change_set_id.to_string(),
                            name,
                        })
                    }
                }
                continue;
            }
        }
        out.push(ch);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegistryChange;

    fn change_set(context: &str) -> ChangeSet {
        ChangeSet {
            id: "1".into(),
            author: None,
            comment: None,
            context: context.into(),
            ignore: false,
            run_on_change: false,
            filename: "f.yaml".into(),
            changes: vec![Change::Registry(RegistryChange {
                namespace: "${env}".into(),
                group: "grp".into(),
                data_id: "app-${env}.yaml".into(),
                format: None,
                patch_content: String::new(),
                delete_content: String::new(),
                delete: false,
            })],
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(matches_context(&change_set(""), &[]));
        assert!(matches_context(&change_set("dev"), &[]));
    }

    #[test]
    fn filter_matches_intersecting_tag() {
        assert!(matches_context(&change_set("dev,staging"), &["staging"]));
    }

    #[test]
    fn filter_rejects_disjoint_tags() {
        assert!(!matches_context(&change_set("dev"), &["prod"]));
    }

    #[test]
    fn filter_rejects_untagged_change_set_with_nonempty_filter() {
        assert!(!matches_context(&change_set(""), &["prod"]));
    }

    #[test]
    fn expand_variables_substitutes_all_references() {
        let mut vars = HashMap::new();
        vars.insert("env".to_string(), "prod".to_string());
        let expanded = expand_variables(&change_set(""), &vars).unwrap();
        let Change::Registry(c) = &expanded.changes[0] else { panic!("wrong variant") };
        assert_eq!(c.namespace, "prod");
        assert_eq!(c.data_id, "app-prod.yaml");
    }

    #[test]
    fn expand_variables_errors_on_missing_binding() {
        let vars = HashMap::new();
        let err = expand_variables(&change_set(""), &vars).unwrap_err();
        assert!(matches!(err, ChangeLogError::VariableMissing { .. }));
    }

    #[test]
    fn expand_variables_leaves_unterminated_reference_untouched() {
        let mut cs = change_set("");
        if let Change::Registry(c) = &mut cs.changes[0] {
            c.namespace = "${unterminated".into();
        }
        let expanded = expand_variables(&cs, &HashMap::new()).unwrap();
        let Change::Registry(c) = &expanded.changes[0] else { panic!("wrong variant") };
        assert_eq!(c.namespace, "${unterminated");
    }
}
