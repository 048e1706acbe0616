// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP-transported graph dialects: Neptune's openCypher/sparql
//! endpoints (SigV4-signed), neo4j's transactional HTTP endpoint, and
//! Jena Fuseki's SPARQL endpoint.

use reqwest::Client;

use crate::error::AdapterError;
use crate::graph::signing::{sign_headers, SigningContext};

/// Posts `body` (form-encoded as `query=...` or `cypher=...` per `field`)
/// to `url`, signed for `neptune-db` when `signing` is set.
pub async fn post_signed(
    http: &Client,
    url: &str,
    field: &str,
    body: &str,
    signing: Option<&SigningContext>,
) -> Result<(), AdapterError> {
    let form = format!("{field}={}", urlencoding::encode(body));
    let mut req = http.post(url).header("Content-Type", "application/x-www-form-urlencoded");
    if let Some(ctx) = signing {
        for (name, value) in sign_headers(ctx, "POST", url, form.as_bytes())? {
            req = req.header(name, value);
        }
    }
    let resp = req.body(form).send().await?;
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(AdapterError::HttpStatus { status, body });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Executes one openCypher statement against `/db/{dataset}/tx/commit`.
pub async fn execute_neo4j(
    http: &Client,
    config: &Neo4jConfig,
    dataset: &str,
    statement: &str,
) -> Result<(), AdapterError> {
    let url = format!(
        "{}/db/{}/tx/commit",
        config.url.trim_end_matches('/'),
        dataset
    );
    let mut req = http.post(&url).json(&serde_json::json!({
        "statements": [{ "statement": statement }],
    }));
    if let (Some(u), Some(p)) = (&config.username, &config.password) {
        req = req.basic_auth(u, Some(p));
    }
    let resp = req.send().await?;
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(AdapterError::HttpStatus { status, body });
    }
    let body: serde_json::Value = resp.json().await?;
    let errors = body.get("errors").and_then(|e| e.as_array());
    if let Some(errors) = errors {
        if !errors.is_empty() {
            return Err(AdapterError::GraphStatement(errors.to_string()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct JenaFusekiConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Executes one SPARQL update/query against the dataset's endpoint.
pub async fn execute_jenafuseki(
    http: &Client,
    config: &JenaFusekiConfig,
    statement: &str,
) -> Result<(), AdapterError> {
    let mut req = http
        .post(&config.url)
        .header("Content-Type", "application/sparql-update")
        .body(statement.to_string());
    if let (Some(u), Some(p)) = (&config.username, &config.password) {
        req = req.basic_auth(u, Some(p));
    }
    let resp = req.send().await?;
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(AdapterError::HttpStatus { status, body });
    }
    Ok(())
}
