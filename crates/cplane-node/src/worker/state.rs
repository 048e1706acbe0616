// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-Worker runtime state: one downstream adapter per configured system,
//! the ledger store, and the on-disk layout for each system's change-log
//! tree.

use std::collections::HashMap;
use std::path::PathBuf;

use cplane_adapters::graph::signing::SigningContext;
use cplane_adapters::{GraphDialect, GraphTarget, NacosClient, NacosConfig, SearchConfig, SearchExecutor};
use cplane_core::Config;
use cplane_ledger::{LedgerStore, MigrationToolReader};
use cplane_wire::ReplyEnvelope;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerStateError {
    #[error(transparent)]
    Config(#[from] cplane_core::CoreError),
    #[error(transparent)]
    Ledger(#[from] cplane_ledger::LedgerError),
    #[error("unsupported graph dialect {0:?}")]
    UnsupportedDialect(String),
}

pub struct WorkerState {
    pub config: Config,
    pub store: LedgerStore,
    pub http: reqwest::Client,
    pub registry_clients: HashMap<String, NacosClient>,
    pub search_executors: HashMap<String, SearchExecutor>,
    pub graph_targets: HashMap<String, GraphTarget>,
    pub migration_readers: HashMap<String, MigrationToolReader>,
}

impl WorkerState {
    /// Connects the ledger store and builds one adapter per configured
    /// downstream system. Each `database` section is read through the
    /// external migration tool's own ledger (§6) rather than this store.
    pub async fn from_config(config: Config) -> Result<Self, WorkerStateError> {
        let store = LedgerStore::connect(&config.database_uri()?).await?;
        let http = reqwest::Client::new();

        let mut registry_clients = HashMap::new();
        for (system_id, section) in &config.nacos {
            registry_clients.insert(
                system_id.clone(),
                NacosClient::new(NacosConfig {
                    server_addr: section.server_addr.clone(),
                    username: section.username.clone(),
                    password: section.password.clone(),
                }),
            );
        }

        let mut search_executors = HashMap::new();
        for (system_id, section) in &config.elasticsearch {
            search_executors.insert(
                system_id.clone(),
                SearchExecutor::new(SearchConfig {
                    url: section.url.clone(),
                    username: section.username.clone(),
                    password: section.password.clone(),
                }),
            );
        }

        let mut graph_targets = HashMap::new();
        for (system_id, section) in &config.graphdb {
            let dialect = match section.dialect.as_str() {
                "neptune" => GraphDialect::Neptune,
                "neo4j" => GraphDialect::Neo4j,
                "jenafuseki" => GraphDialect::JenaFuseki,
                "janusgraph" => GraphDialect::JanusGraph,
                other => return Err(WorkerStateError::UnsupportedDialect(other.to_string())),
            };
            let signing = if section.aws_iam_authentication.unwrap_or(false) {
                config.aws.as_ref().map(|aws| SigningContext {
                    region: section.region.clone().or_else(|| aws.region.clone()).unwrap_or_default(),
                    access_key: aws.access_key.clone().unwrap_or_default(),
                    secret_key: aws.secret_key.clone().unwrap_or_default(),
                    session_token: None,
                })
            } else {
                None
            };
            graph_targets.insert(
                system_id.clone(),
                GraphTarget {
                    dialect,
                    url: section.url.clone(),
                    username: section.username.clone(),
                    password: section.password.clone(),
                    signing,
                },
            );
        }

        let mut migration_readers = HashMap::new();
        for (system_id, section) in &config.database {
            migration_readers.insert(system_id.clone(), MigrationToolReader::connect(&section.url).await?);
        }

        Ok(Self {
            config,
            store,
            http,
            registry_clients,
            search_executors,
            graph_targets,
            migration_readers,
        })
    }

    /// Root of the on-disk change-log tree for one managed system: a file
    /// or directory at `{home}/changelog/{system_type}/{system_id}`.
    pub fn changelog_root(&self, system_type: &str, system_id: &str) -> PathBuf {
        PathBuf::from(self.config.home_dir()).join("changelog").join(system_type).join(system_id)
    }
}

pub fn not_found(system_type: &str, system_id: &str) -> ReplyEnvelope {
    ReplyEnvelope::error(format!("no {system_type} system configured with id {system_id:?}"))
}
