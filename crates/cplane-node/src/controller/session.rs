// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process session map: `session_id → {worker_id, name}`, plus the
//! linear `worker_id → session_id` scan mirroring the original's
//! `is_worker_online` check over `worker_map.values()`.

use std::collections::HashMap;

use cplane_core::{SessionId, WorkerId};
use parking_lot::RwLock;

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub worker_id: WorkerId,
    pub name: String,
}

#[derive(Default)]
pub struct SessionMap {
    inner: RwLock<HashMap<SessionId, SessionEntry>>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session_id: SessionId, entry: SessionEntry) {
        self.inner.write().insert(session_id, entry);
    }

    pub fn remove(&self, session_id: &SessionId) -> Option<SessionEntry> {
        self.inner.write().remove(session_id)
    }

    pub fn get(&self, session_id: &SessionId) -> Option<SessionEntry> {
        self.inner.read().get(session_id).cloned()
    }

    /// Linear scan for the session currently bound to `worker_id`, matching
    /// the original's O(workers) `is_worker_online` lookup.
    pub fn session_for_worker(&self, worker_id: &WorkerId) -> Option<SessionId> {
        self.inner
            .read()
            .iter()
            .find(|(_, entry)| &entry.worker_id == worker_id)
            .map(|(session_id, _)| session_id.clone())
    }

    pub fn is_worker_online(&self, worker_id: &WorkerId) -> bool {
        self.session_for_worker(worker_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
