// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gremlin script-submission over a Gremlin Server websocket, shared by
//! the `neptune` and `janusgraph` dialects.

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::error::AdapterError;
use crate::graph::signing::{sign_headers, SigningContext};

/// Submits one gremlin script to `ws_url` and waits for a success status.
/// `signing` is set for the `neptune` dialect, absent for `janusgraph`.
pub async fn execute(
    ws_url: &str,
    script: &str,
    signing: Option<&SigningContext>,
) -> Result<(), AdapterError> {
    let mut request = ws_url.into_client_request()?;
    if let Some(ctx) = signing {
        for (name, value) in sign_headers(ctx, "GET", ws_url, b"")? {
            request.headers_mut().insert(
                HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| AdapterError::Signing(e.to_string()))?,
                HeaderValue::from_str(&value).map_err(|e| AdapterError::Signing(e.to_string()))?,
            );
        }
    }

    let (mut stream, _response) = tokio_tungstenite::connect_async(request).await?;

    let request_id = Uuid::new_v4().to_string();
    let frame = json!({
        "requestId": request_id,
        "op": "eval",
        "processor": "",
        "args": {
            "gremlin": script,
            "language": "gremlin-groovy",
        },
    });
    stream.send(Message::Text(frame.to_string())).await?;

    while let Some(msg) = stream.next().await {
        let msg = msg?;
        let Message::Text(text) = msg else { continue };
        let parsed: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| AdapterError::BadResponse(e.to_string()))?;
        let status_code = parsed
            .get("status")
            .and_then(|s| s.get("code"))
            .and_then(|c| c.as_i64())
            .ok_or_else(|| AdapterError::BadResponse("missing status.code".to_string()))?;
        let _ = stream.close(None).await;
        return if (200..300).contains(&status_code) {
            Ok(())
        } else {
            let message = parsed
                .get("status")
                .and_then(|s| s.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("gremlin request failed")
                .to_string();
            Err(AdapterError::GraphStatement(message))
        };
    }

    Err(AdapterError::BadResponse("connection closed before a response arrived".to_string()))
}
