// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Computes the `WORKER_INFO` managed-object snapshot from the node's
//! configuration: one entry per downstream system the Worker is
//! configured to manage.

use cplane_core::Config;

use crate::controller::ManagedObject;

/// Builds the managed-object list a Worker reports on connect, one entry
/// per configured downstream system across all four section kinds.
pub fn snapshot(config: &Config) -> Vec<ManagedObject> {
    let mut objects = Vec::new();

    for (system_id, section) in &config.nacos {
        objects.push(ManagedObject {
            id: system_id.clone(),
            system_type: "registry".to_string(),
            url: section.server_addr.clone(),
            dialect: None,
        });
    }
    for (system_id, section) in &config.database {
        objects.push(ManagedObject {
            id: system_id.clone(),
            system_type: "database".to_string(),
            url: section.url.clone(),
            dialect: None,
        });
    }
    for (system_id, section) in &config.elasticsearch {
        objects.push(ManagedObject {
            id: system_id.clone(),
            system_type: "search".to_string(),
            url: section.url.clone(),
            dialect: None,
        });
    }
    for (system_id, section) in &config.graphdb {
        objects.push(ManagedObject {
            id: system_id.clone(),
            system_type: "graph".to_string(),
            url: section.url.clone(),
            dialect: Some(section.dialect.clone()),
        });
    }

    objects
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn minimal_config() -> Config {
        Config::parse(
            r#"
            [config]
            [config.node]
            role = "worker"
            name = "w1"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn snapshot_is_empty_with_no_downstream_sections() {
        assert!(snapshot(&minimal_config()).is_empty());
    }

    #[test]
    fn snapshot_includes_one_entry_per_section() {
        let mut config = minimal_config();
        config.nacos = HashMap::from([(
            "sys-1".to_string(),
            cplane_core::NacosSection { server_addr: "127.0.0.1:8848".into(), username: None, password: None },
        )]);
        let objects = snapshot(&config);
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].system_type, "registry");
        assert_eq!(objects[0].id, "sys-1");
    }
}
