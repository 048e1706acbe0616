// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation of a worker's managed-object inventory, received on
//! `WORKER_INFO`. Rows with no counterpart in the fresh snapshot are
//! deleted, cascading to any provisioning secrets keyed on the same
//! object id.

use std::collections::{HashMap, HashSet};

use cplane_core::WorkerId;
use cplane_ledger::{ChangeLogQuery, LedgerStore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedObject {
    pub id: String,
    pub system_type: String,
    pub url: String,
    pub dialect: Option<String>,
}

#[derive(Default)]
pub struct ManagedObjectRegistry {
    by_worker: parking_lot::RwLock<HashMap<WorkerId, Vec<ManagedObject>>>,
}

impl ManagedObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects_for(&self, worker_id: &WorkerId) -> Vec<ManagedObject> {
        self.by_worker.read().get(worker_id).cloned().unwrap_or_default()
    }

    pub fn all(&self) -> Vec<(WorkerId, ManagedObject)> {
        self.by_worker
            .read()
            .iter()
            .flat_map(|(worker_id, objects)| objects.iter().map(move |o| (worker_id.clone(), o.clone())))
            .collect()
    }

    /// Replaces `worker_id`'s inventory with `fresh`, returning the
    /// objects that were removed (no longer present) so callers can
    /// cascade-delete by `(system_type, id)`.
    pub fn reconcile(&self, worker_id: &WorkerId, fresh: Vec<ManagedObject>) -> Vec<ManagedObject> {
        let mut by_worker = self.by_worker.write();
        let previous = by_worker.get(worker_id).cloned().unwrap_or_default();
        let fresh_ids: HashSet<String> = fresh.iter().map(|o| o.id.clone()).collect();
        let removed: Vec<ManagedObject> = previous.into_iter().filter(|o| !fresh_ids.contains(&o.id)).collect();
        by_worker.insert(worker_id.clone(), fresh);
        removed
    }

    pub fn remove_worker(&self, worker_id: &WorkerId) -> Vec<ManagedObject> {
        self.by_worker.write().remove(worker_id).unwrap_or_default()
    }
}

/// Deletes provisioning secrets for every managed object no longer
/// present. `system_id` is the managed-object id itself; usernames are
/// enumerated per `(system_type, system_id)` via [`LedgerStore::list_provision_secrets`]
/// rather than assumed, since `username` is matched exactly by the store.
pub async fn cascade_delete_secrets(store: &LedgerStore, removed: &[ManagedObject]) {
    for object in removed {
        let query = ChangeLogQuery { page: 1, size: u32::MAX, ..Default::default() };
        let usernames = match store.list_provision_secrets(&object.system_type, &object.id, &query).await {
            Ok((rows, _total)) => rows.into_iter().map(|(username, _object_list)| username).collect::<Vec<_>>(),
            Err(e) => {
                tracing::warn!(system_type = %object.system_type, system_id = %object.id, error = %e, "failed to enumerate provision secrets for cascade delete");
                continue;
            }
        };
        for username in usernames {
            if let Err(e) = store.delete_provision_secret(&object.system_type, &object.id, &username).await {
                tracing::warn!(system_type = %object.system_type, system_id = %object.id, username, error = %e, "failed to cascade-delete provision secret");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconcile_reports_removed_ids() {
        let registry = ManagedObjectRegistry::new();
        let worker_id = WorkerId::new();
        registry.reconcile(
            &worker_id,
            vec![
                ManagedObject { id: "a".into(), system_type: "registry".into(), url: "u1".into(), dialect: None },
                ManagedObject { id: "b".into(), system_type: "registry".into(), url: "u2".into(), dialect: None },
            ],
        );
        let removed = registry.reconcile(
            &worker_id,
            vec![ManagedObject { id: "a".into(), system_type: "registry".into(), url: "u1".into(), dialect: None }],
        );
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, "b");
        assert_eq!(registry.objects_for(&worker_id).len(), 1);
    }

    #[tokio::test]
    async fn cascade_delete_secrets_removes_every_provisioned_username() {
        let store = LedgerStore::connect("sqlite::memory:").await.unwrap();
        store.upsert_provision_secret("registry", "sys-1", "user-a", b"x", "obj-a").await.unwrap();
        store.upsert_provision_secret("registry", "sys-1", "user-b", b"y", "obj-b").await.unwrap();

        let removed = vec![ManagedObject {
            id: "sys-1".into(),
            system_type: "registry".into(),
            url: "u1".into(),
            dialect: None,
        }];
        cascade_delete_secrets(&store, &removed).await;

        assert!(store.find_provision_secret("registry", "sys-1", "user-a").await.unwrap().is_none());
        assert!(store.find_provision_secret("registry", "sys-1", "user-b").await.unwrap().is_none());
    }
}
