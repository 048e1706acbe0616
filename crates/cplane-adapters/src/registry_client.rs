// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Nacos-dialect `RegistryClient`: read/publish/remove a config key over
//! its HTTP `/nacos/v1/cs/configs` API.

use async_trait::async_trait;
use cplane_changelog::ContentFormat;
use cplane_registry::{RegistryClient, RemoteContent};

/// Connection details for one Nacos registry endpoint.
#[derive(Debug, Clone)]
pub struct NacosConfig {
    pub server_addr: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub struct NacosClient {
    http: reqwest::Client,
    config: NacosConfig,
}

impl NacosClient {
    pub fn new(config: NacosConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    fn base_url(&self) -> String {
        format!("http://{}/nacos/v1/cs/configs", self.config.server_addr)
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.config.username, &self.config.password) {
            (Some(u), Some(p)) => req.basic_auth(u, Some(p)),
            _ => req,
        }
    }
}

fn format_type(format: ContentFormat) -> &'static str {
    match format {
        ContentFormat::Yaml => "yaml",
        ContentFormat::Properties => "properties",
        ContentFormat::Json => "json",
        ContentFormat::Text => "text",
    }
}

fn parse_format_type(s: &str) -> ContentFormat {
    match s {
        "yaml" | "yml" => ContentFormat::Yaml,
        "json" => ContentFormat::Json,
        "text" | "txt" => ContentFormat::Text,
        _ => ContentFormat::Properties,
    }
}

#[async_trait]
impl RegistryClient for NacosClient {
    async fn fetch(
        &self,
        namespace: &str,
        group: &str,
        data_id: &str,
    ) -> Result<Option<RemoteContent>, String> {
        let req = self.http.get(self.base_url()).query(&[
            ("tenant", namespace),
            ("group", group),
            ("dataId", data_id),
        ]);
        let resp = self.with_auth(req).send().await.map_err(|e| e.to_string())?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(format!("nacos fetch returned {}", resp.status()));
        }
        let format = resp
            .headers()
            .get("Config-Type")
            .and_then(|v| v.to_str().ok())
            .map(parse_format_type)
            .unwrap_or(ContentFormat::Text);
        let content = resp.text().await.map_err(|e| e.to_string())?;
        Ok(Some(RemoteContent { content, format }))
    }

    async fn publish(
        &self,
        namespace: &str,
        group: &str,
        data_id: &str,
        content: &str,
        format: ContentFormat,
    ) -> Result<(), String> {
        let req = self.http.post(self.base_url()).form(&[
            ("tenant", namespace),
            ("group", group),
            ("dataId", data_id),
            ("content", content),
            ("type", format_type(format)),
        ]);
        let resp = self.with_auth(req).send().await.map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("nacos publish returned {}", resp.status()));
        }
        Ok(())
    }

    async fn remove(&self, namespace: &str, group: &str, data_id: &str) -> Result<(), String> {
        let req = self.http.delete(self.base_url()).query(&[
            ("tenant", namespace),
            ("group", group),
            ("dataId", data_id),
        ]);
        let resp = self.with_auth(req).send().await.map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("nacos remove returned {}", resp.status()));
        }
        Ok(())
    }
}
