// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrates the registry fetch and apply phases (§4.4) over a parsed
//! change-log tree, the gate, and a [`RegistryClient`].

use std::collections::HashMap;

use cplane_changelog::{
    checksum, expand_variables, matches_context, Change, ChangeSet, ParsedTree,
};
use cplane_ledger::{decide, ExecType, GateDecision, LedgerStore};
use tracing::{info, warn};

use crate::aggregate::{accumulate_change, mark_deleted, Accumulated, ConfigKey};
use crate::client::RegistryClient;
use crate::error::RegistryError;

/// Result of the fetch phase: the vetted mutations/deletions and the
/// change-set ids whose gate said RUN.
pub struct FetchResult {
    pub mutations: Vec<Mutation>,
    pub deletions: Vec<Deletion>,
    pub ran_change_set_ids: Vec<String>,
}

pub struct Mutation {
    pub key: ConfigKey,
    pub content: String,
    pub format: cplane_changelog::ContentFormat,
    pub change_set_ids: Vec<String>,
}

pub struct Deletion {
    pub key: ConfigKey,
    pub change_set_ids: Vec<String>,
}

/// Runs the fetch phase described in §4.4 over every change set in `tree`
/// for `(system_type, system_id)`.
#[allow(clippy::too_many_arguments)]
pub async fn fetch(
    tree: &ParsedTree,
    client: &dyn RegistryClient,
    store: &LedgerStore,
    system_type: &str,
    system_id: &str,
    contexts: &[&str],
    allowed_data_ids: &[String],
    variables: &HashMap<String, String>,
) -> Result<FetchResult, RegistryError> {
    let mut state: HashMap<ConfigKey, Accumulated> = HashMap::new();
    let mut remote_cache: HashMap<ConfigKey, Option<crate::client::RemoteContent>> = HashMap::new();
    let mut ran_change_set_ids = Vec::new();

    for change_set in &tree.ordered {
        if change_set.ignore {
            continue;
        }
        if !matches_context(change_set, contexts) {
            continue;
        }
        if let Some(coordinate) = first_disallowed_coordinate(change_set, allowed_data_ids) {
            return Err(RegistryError::NotAllowed {
                file: change_set.filename.clone(),
                change_set_id: change_set.id.clone(),
                coordinate,
            });
        }

        let existing = store
            .find_record(system_type, system_id, &change_set.id)
            .await?;
        let computed = checksum(&change_set.changes);
        let (decision, record) = decide(
            existing.as_ref(),
            system_type,
            system_id,
            change_set,
            &computed,
        )?;
        store.upsert_record(&record).await?;

        if decision == GateDecision::Skip {
            continue;
        }

        let expanded = expand_variables(change_set, variables)?;
        for change in &expanded.changes {
            let Change::Registry(c) = change else { continue };
            let key: ConfigKey = c.config_key();

            if c.delete {
                let format = c.format.unwrap_or(cplane_changelog::ContentFormat::Text);
                mark_deleted(&mut state, key, format, &change_set.id);
                continue;
            }

            let Some(format) = c.format else {
                return Err(RegistryError::MutationContentInvalid(format!(
                    "{}/{}/{}",
                    c.namespace, c.group, c.data_id
                )));
            };
            let remote = match remote_cache.get(&key) {
                Some(cached) => cached.clone(),
                None => {
                    let fetched = client
                        .fetch(&c.namespace, &c.group, &c.data_id)
                        .await
                        .map_err(RegistryError::Client)?;
                    remote_cache.insert(key.clone(), fetched.clone());
                    fetched
                }
            };

            let remote_content = match &remote {
                Some(r) => {
                    if r.format != format {
                        return Err(RegistryError::FormatMismatch {
                            coordinate: format!("{}/{}/{}", c.namespace, c.group, c.data_id),
                            remote: r.format.to_string(),
                            change: format.to_string(),
                        });
                    }
                    cplane_changelog::content::validate(&r.content, format).map_err(|_| {
                        RegistryError::RemoteContentInvalid(format!(
                            "{}/{}/{}",
                            c.namespace, c.group, c.data_id
                        ))
                    })?;
                    r.content.clone()
                }
                None => String::new(),
            };

            accumulate_change(
                &mut state,
                key,
                &remote_content,
                format,
                &c.patch_content,
                &c.delete_content,
                &change_set.id,
            )?;
        }

        ran_change_set_ids.push(change_set.id.clone());
    }

    let mut mutations = Vec::new();
    let mut deletions = Vec::new();
    for (key, acc) in state {
        if acc.deleted {
            deletions.push(Deletion { key, change_set_ids: acc.change_set_ids });
        } else {
            mutations.push(Mutation {
                key,
                content: acc.next_content,
                format: acc.format,
                change_set_ids: acc.change_set_ids,
            });
        }
    }

    Ok(FetchResult { mutations, deletions, ran_change_set_ids })
}

/// Runs the apply phase: executes every deletion then every mutation
/// against `client`, transitioning ledger rows to EXECUTED or FAILED.
pub async fn apply(
    fetch_result: &FetchResult,
    client: &dyn RegistryClient,
    store: &LedgerStore,
    system_type: &str,
    system_id: &str,
) -> Result<(), RegistryError> {
    let mut touched: HashMap<String, bool> = HashMap::new();

    for deletion in &fetch_result.deletions {
        let (namespace, group, data_id) = &deletion.key;
        let outcome = client.remove(namespace, group, data_id).await;
        let ok = outcome.is_ok();
        if let Err(e) = outcome {
            warn!(namespace, group, data_id, error = %e, "registry remove failed");
        }
        for id in &deletion.change_set_ids {
            touched.entry(id.clone()).and_modify(|v| *v = *v && ok).or_insert(ok);
        }
    }

    for mutation in &fetch_result.mutations {
        let (namespace, group, data_id) = &mutation.key;
        if mutation.content.trim().is_empty() {
            return Err(RegistryError::MutationContentInvalid(format!(
                "{namespace}/{group}/{data_id}"
            )));
        }
        cplane_changelog::content::validate(&mutation.content, mutation.format).map_err(|_| {
            RegistryError::MutationContentInvalid(format!("{namespace}/{group}/{data_id}"))
        })?;

        let outcome = client
            .publish(namespace, group, data_id, &mutation.content, mutation.format)
            .await;
        let ok = outcome.is_ok();
        if let Err(e) = &outcome {
            warn!(namespace, group, data_id, error = %e, "registry publish failed");
        }
        for id in &mutation.change_set_ids {
            touched.entry(id.clone()).and_modify(|v| *v = *v && ok).or_insert(ok);
        }
    }

    for change_set_id in &fetch_result.ran_change_set_ids {
        let succeeded = touched.get(change_set_id).copied().unwrap_or(true);
        if let Some(mut record) = store.find_record(system_type, system_id, change_set_id).await? {
            record.exectype = if succeeded { ExecType::Executed } else { ExecType::Failed };
            store.upsert_record(&record).await?;
            if succeeded {
                info!(change_set_id, "registry change set applied");
            }
        }
    }

    Ok(())
}

fn first_disallowed_coordinate(change_set: &ChangeSet, allowed_data_ids: &[String]) -> Option<String> {
    if allowed_data_ids.is_empty() {
        return None;
    }
    for change in &change_set.changes {
        if let Change::Registry(c) = change {
            if !allowed_data_ids.contains(&c.data_id) {
                return Some(c.data_id.clone());
            }
        }
    }
    None
}
