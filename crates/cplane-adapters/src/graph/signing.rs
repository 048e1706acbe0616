// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AWS SigV4 request signing for the `neptune-db` service. This is the
//! one narrow AWS-adapter interface the graph executors own; secret
//! retrieval for the credentials themselves is out of scope.

use std::time::SystemTime;

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;

use crate::error::AdapterError;

#[derive(Debug, Clone)]
pub struct SigningContext {
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

/// Returns the extra headers a caller must attach to the request at
/// `method url` with `body` to satisfy `neptune-db` SigV4 auth.
pub fn sign_headers(
    ctx: &SigningContext,
    method: &str,
    url: &str,
    body: &[u8],
) -> Result<Vec<(String, String)>, AdapterError> {
    let identity = Credentials::new(
        ctx.access_key.clone(),
        ctx.secret_key.clone(),
        ctx.session_token.clone(),
        None,
        "cplane-graph",
    )
    .into();

    let signing_params = v4::SigningParams::builder()
        .identity(&identity)
        .region(&ctx.region)
        .name("neptune-db")
        .time(SystemTime::now())
        .settings(SigningSettings::default())
        .build()
        .map_err(|e| AdapterError::Signing(e.to_string()))?
        .into();

    let signable_request =
        SignableRequest::new(method, url, std::iter::empty(), SignableBody::Bytes(body))
            .map_err(|e| AdapterError::Signing(e.to_string()))?;

    let (instructions, _signature) = sign(signable_request, &signing_params)
        .map_err(|e| AdapterError::Signing(e.to_string()))?
        .into_parts();

    Ok(instructions
        .headers()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect())
}
