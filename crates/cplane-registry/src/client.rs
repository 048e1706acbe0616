// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seam between the fetch/apply pipeline and a concrete registry
//! (nacos or similar). Implementations live in `cplane-adapters`.

use async_trait::async_trait;
use cplane_changelog::ContentFormat;

/// Current remote state for one config key, as returned by a registry's
/// read primitive.
#[derive(Debug, Clone)]
pub struct RemoteContent {
    pub content: String,
    pub format: ContentFormat,
}

/// Read/write access to a registry's config keys, keyed by
/// `(namespace, group, dataId)`.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn fetch(
        &self,
        namespace: &str,
        group: &str,
        data_id: &str,
    ) -> Result<Option<RemoteContent>, String>;

    async fn publish(
        &self,
        namespace: &str,
        group: &str,
        data_id: &str,
        content: &str,
        format: ContentFormat,
    ) -> Result<(), String>;

    async fn remove(&self, namespace: &str, group: &str, data_id: &str) -> Result<(), String>;
}
