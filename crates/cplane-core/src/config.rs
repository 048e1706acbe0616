// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The operator-supplied configuration document.
//!
//! Loaded from a file path (`CONFIGOPS_CONFIG_FILE`) or an inline TOML value
//! (`CONFIGOPS_CONFIG_VALUE`); one of the two must be set. Only the `config`
//! section's node-identity keys are interpreted here — the `nacos`,
//! `database`, `elasticsearch`, `graphdb`, and `aws` sections are carried
//! through verbatim for the adapter crates to interpret.

use crate::error::CoreError;
use crate::role::NodeRole;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const ENV_CONFIG_FILE: &str = "CONFIGOPS_CONFIG_FILE";
pub const ENV_CONFIG_VALUE: &str = "CONFIGOPS_CONFIG_VALUE";
pub const ENV_HOME: &str = "CONFIGOPS_HOME";
pub const ENV_DATABASE_URI: &str = "CONFIGOPS_DATABASE_URI";

/// Root configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub config: NodeSection,
    #[serde(default)]
    pub nacos: HashMap<String, NacosSection>,
    #[serde(default)]
    pub database: HashMap<String, DatabaseSection>,
    #[serde(default)]
    pub elasticsearch: HashMap<String, ElasticsearchSection>,
    #[serde(default)]
    pub graphdb: HashMap<String, GraphdbSection>,
    #[serde(default)]
    pub aws: Option<AwsSection>,
    /// Controller-only: `worker name -> secret` pairs accepted at connect
    /// time. Ignored on a Worker node, where `config.node.secret` is the
    /// single outgoing credential instead.
    #[serde(default)]
    pub workers: HashMap<String, String>,
}

/// `[config]` — node identity and cluster wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSection {
    pub node: NodeIdentity,
    #[serde(rename = "database-uri")]
    pub database_uri: Option<String>,
    pub home: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub role: NodeRole,
    pub name: String,
    pub controller_url: Option<String>,
    pub secret: Option<String>,
    /// Base64-encoded key used to encrypt stored change payloads and
    /// provisioning secrets. Absent means payloads are stored unencrypted.
    pub node_secret: Option<String>,
    /// Controller-side bind address; ignored on a Worker node.
    pub listen_addr: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NacosSection {
    pub server_addr: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchSection {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphdbSection {
    pub dialect: String,
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub region: Option<String>,
    pub aws_iam_authentication: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsSection {
    pub profile: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
}

impl Config {
    /// Load from the path or inline value found in the environment, per
    /// the precedence documented on [`ENV_CONFIG_FILE`]/[`ENV_CONFIG_VALUE`].
    pub fn load_from_env() -> Result<Self, CoreError> {
        if let Ok(inline) = std::env::var(ENV_CONFIG_VALUE) {
            return Self::parse(&inline);
        }
        if let Ok(path) = std::env::var(ENV_CONFIG_FILE) {
            return Self::load_from_path(&path);
        }
        Err(CoreError::MissingKey(format!(
            "neither {ENV_CONFIG_FILE} nor {ENV_CONFIG_VALUE} is set"
        )))
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let config: Config = toml::from_str(text)?;
        Ok(config)
    }

    /// Resolves the database URI, falling back to the environment variable
    /// when the document itself doesn't carry one.
    pub fn database_uri(&self) -> Result<String, CoreError> {
        if let Some(uri) = &self.config.database_uri {
            return Ok(uri.clone());
        }
        std::env::var(ENV_DATABASE_URI)
            .map_err(|_| CoreError::MissingKey("config.database-uri".to_string()))
    }

    pub fn home_dir(&self) -> String {
        self.config
            .home
            .clone()
            .or_else(|| std::env::var(ENV_HOME).ok())
            .unwrap_or_else(|| ".configops".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [config]
        database-uri = "sqlite://ledger.db"

        [config.node]
        role = "controller"
        name = "ctrl-1"
    "#;

    #[test]
    fn parses_minimal_controller_config() {
        let cfg = Config::parse(MINIMAL).unwrap();
        assert_eq!(cfg.config.node.role, NodeRole::Controller);
        assert_eq!(cfg.config.node.name, "ctrl-1");
        assert_eq!(cfg.database_uri().unwrap(), "sqlite://ledger.db");
    }

    #[test]
    #[serial_test::serial(cplane_core_database_uri_env)]
    fn missing_database_uri_falls_back_to_env_error() {
        let text = r#"
            [config]

            [config.node]
            role = "worker"
            name = "w1"
        "#;
        std::env::remove_var(ENV_DATABASE_URI);
        let cfg = Config::parse(text).unwrap();
        assert!(cfg.database_uri().is_err());

        std::env::set_var(ENV_DATABASE_URI, "sqlite://fallback.db");
        assert_eq!(cfg.database_uri().unwrap(), "sqlite://fallback.db");
        std::env::remove_var(ENV_DATABASE_URI);
    }

    #[test]
    fn rejects_unknown_role() {
        let text = r#"
            [config]
            [config.node]
            role = "admin"
            name = "x"
        "#;
        assert!(Config::parse(text).is_err());
    }

    #[test]
    fn home_dir_defaults_when_unset() {
        let cfg = Config::parse(MINIMAL).unwrap();
        assert_eq!(cfg.home_dir(), ".configops");
    }
}
