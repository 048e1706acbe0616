// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-config-key accumulation for the fetch phase (§4.4).

use std::collections::HashMap;

use cplane_changelog::{delete_then_patch, ContentFormat};

use crate::error::RegistryError;

/// Config key identifying one registry entry.
pub type ConfigKey = (String, String, String);

/// Running state for one config key across the change sets that touch it.
#[derive(Debug, Clone)]
pub struct Accumulated {
    pub format: ContentFormat,
    pub next_content: String,
    pub patch_content: String,
    pub delete_content: String,
    pub deleted: bool,
    pub change_set_ids: Vec<String>,
}

/// Accumulates one non-delete change onto `state` (or seeds it from
/// `remote_content` on first touch).
#[allow(clippy::too_many_arguments)]
pub fn accumulate_change(
    state: &mut HashMap<ConfigKey, Accumulated>,
    key: ConfigKey,
    remote_content: &str,
    format: ContentFormat,
    patch_content: &str,
    delete_content: &str,
    change_set_id: &str,
) -> Result<(), RegistryError> {
    let entry = state.entry(key).or_insert_with(|| Accumulated {
        format,
        next_content: remote_content.to_string(),
        patch_content: String::new(),
        delete_content: String::new(),
        deleted: false,
        change_set_ids: Vec::new(),
    });
    if entry.deleted {
        entry.next_content = remote_content.to_string();
    }
    entry.deleted = false;

    entry.next_content = delete_then_patch(&entry.next_content, delete_content, patch_content, format)?;
    entry.patch_content =
        delete_then_patch(&entry.patch_content, delete_content, patch_content, format)
            .unwrap_or_else(|_| entry.patch_content.clone());
    entry.delete_content =
        delete_then_patch(&entry.delete_content, patch_content, delete_content, format)
            .unwrap_or_else(|_| entry.delete_content.clone());

    entry.change_set_ids.push(change_set_id.to_string());
    Ok(())
}

/// Marks a config key for deletion, clearing any prior accumulated state.
pub fn mark_deleted(
    state: &mut HashMap<ConfigKey, Accumulated>,
    key: ConfigKey,
    format: ContentFormat,
    change_set_id: &str,
) {
    state.insert(
        key,
        Accumulated {
            format,
            next_content: String::new(),
            patch_content: String::new(),
            delete_content: String::new(),
            deleted: true,
            change_set_ids: vec![change_set_id.to_string()],
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_applies_delete_then_patch() {
        let mut state = HashMap::new();
        let key = ("ns".to_string(), "grp".to_string(), "data".to_string());
        accumulate_change(
            &mut state,
            key.clone(),
            "a: 1\nb: 2\n",
            ContentFormat::Yaml,
            "c: 3\n",
            "a: null\n",
            "cs-1",
        )
        .unwrap();
        let acc = &state[&key];
        assert!(acc.next_content.contains("b: 2"));
        assert!(acc.next_content.contains("c: 3"));
        assert!(!acc.next_content.contains("a:"));
        assert!(!acc.deleted);
        assert_eq!(acc.change_set_ids, vec!["cs-1"]);
    }

    #[test]
    fn mark_deleted_clears_prior_state() {
        let mut state = HashMap::new();
        let key = ("ns".to_string(), "grp".to_string(), "data".to_string());
        accumulate_change(&mut state, key.clone(), "a: 1\n", ContentFormat::Yaml, "", "", "cs-1").unwrap();
        mark_deleted(&mut state, key.clone(), ContentFormat::Yaml, "cs-2");
        let acc = &state[&key];
        assert!(acc.deleted);
        assert_eq!(acc.change_set_ids, vec!["cs-2"]);
    }

    #[test]
    fn non_delete_after_delete_supersedes() {
        let mut state = HashMap::new();
        let key = ("ns".to_string(), "grp".to_string(), "data".to_string());
        mark_deleted(&mut state, key.clone(), ContentFormat::Yaml, "cs-1");
        accumulate_change(
            &mut state,
            key.clone(),
            "",
            ContentFormat::Yaml,
            "c: 3\n",
            "",
            "cs-2",
        )
        .unwrap();
        let acc = &state[&key];
        assert!(!acc.deleted);
        assert!(acc.next_content.contains("c: 3"));
    }
}
