// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("graph statement failed: {0}")]
    GraphStatement(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("unexpected response shape: {0}")]
    BadResponse(String),
}
