// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graph apply orchestrator: dispatches each [`GraphChange`] to a
//! dialect-specific executor, splitting `;`-separated statements.

pub mod gremlin;
pub mod http_dialects;
pub mod signing;

use cplane_changelog::{GraphChange, GraphQueryType};

use crate::error::AdapterError;
use http_dialects::{JenaFusekiConfig, Neo4jConfig};
use signing::SigningContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphDialect {
    Neptune,
    Neo4j,
    JenaFuseki,
    JanusGraph,
}

/// Connection details for one managed graph database. Exactly the fields
/// the dialect it serves needs are populated by the caller.
#[derive(Debug, Clone)]
pub struct GraphTarget {
    pub dialect: GraphDialect,
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub signing: Option<SigningContext>,
}

fn split_statements(query: &str) -> Vec<&str> {
    query.split(';').map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Applies a change's query against `target`, splitting on `;` and
/// executing each statement in order. Aborts on the first failure.
pub async fn apply(http: &reqwest::Client, target: &GraphTarget, change: &GraphChange) -> Result<(), AdapterError> {
    let statements = split_statements(&change.query);
    for statement in statements {
        match (target.dialect, change.query_type) {
            (GraphDialect::Neptune, GraphQueryType::Gremlin) => {
                let ws_url = format!("{}/gremlin", target.url.trim_end_matches('/'));
                gremlin::execute(&ws_url, statement, target.signing.as_ref()).await?;
            }
            (GraphDialect::Neptune, GraphQueryType::OpenCypher) => {
                let url = format!("{}/openCypher", target.url.trim_end_matches('/'));
                http_dialects::post_signed(http, &url, "query", statement, target.signing.as_ref())
                    .await?;
            }
            (GraphDialect::Neptune, GraphQueryType::Sparql) => {
                let url = format!("{}/sparql", target.url.trim_end_matches('/'));
                http_dialects::post_signed(http, &url, "query", statement, target.signing.as_ref())
                    .await?;
            }
            (GraphDialect::JanusGraph, GraphQueryType::Gremlin) => {
                let ws_url = format!("{}/gremlin", target.url.trim_end_matches('/'));
                gremlin::execute(&ws_url, statement, None).await?;
            }
            (GraphDialect::Neo4j, GraphQueryType::OpenCypher) => {
                let config = Neo4jConfig {
                    url: target.url.clone(),
                    username: target.username.clone(),
                    password: target.password.clone(),
                };
                let dataset = change.dataset.as_deref().unwrap_or("neo4j");
                http_dialects::execute_neo4j(http, &config, dataset, statement).await?;
            }
            (GraphDialect::JenaFuseki, GraphQueryType::Sparql) => {
                let config = JenaFusekiConfig {
                    url: target.url.clone(),
                    username: target.username.clone(),
                    password: target.password.clone(),
                };
                http_dialects::execute_jenafuseki(http, &config, statement).await?;
            }
            (dialect, query_type) => {
                return Err(AdapterError::GraphStatement(format!(
                    "{dialect:?} does not support {query_type} queries"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_statements_drops_empty_parts() {
        let parts = split_statements("g.V().count(); ; g.E().count()");
        assert_eq!(parts, vec!["g.V().count()", "g.E().count()"]);
    }

    #[test]
    fn split_statements_on_empty_query_is_empty() {
        assert!(split_statements("   ").is_empty());
    }
}
