// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Search apply orchestrator: issues an Elasticsearch-style HTTP request
//! per change.

use cplane_changelog::{HttpMethod, SearchChange};

use crate::error::AdapterError;

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub struct SearchExecutor {
    http: reqwest::Client,
    config: SearchConfig,
}

impl SearchExecutor {
    pub fn new(config: SearchConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    pub async fn apply(&self, change: &SearchChange) -> Result<(), AdapterError> {
        let url = format!("{}{}", self.config.url.trim_end_matches('/'), change.path);
        let method = to_reqwest_method(change.method);
        let mut req = self.http.request(method, url);
        if let (Some(u), Some(p)) = (&self.config.username, &self.config.password) {
            req = req.basic_auth(u, Some(p));
        }
        if let Some(body) = &change.body {
            req = req.header("Content-Type", "application/json").body(body.clone());
        }
        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AdapterError::HttpStatus { status, body });
        }
        Ok(())
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Options => reqwest::Method::OPTIONS,
    }
}
