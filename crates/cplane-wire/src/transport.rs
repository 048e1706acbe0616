// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing helpers over a WebSocket text-message stream.

use crate::envelope::Envelope;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Message as WsMessage;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed envelope: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Reads the next [`Envelope`] from a WebSocket stream, skipping ping/pong
/// and binary frames, and surfacing `Close`/stream-end as
/// [`TransportError::Closed`].
pub async fn read_envelope<S>(stream: &mut S) -> Result<Envelope, TransportError>
where
    S: Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(WsMessage::Text(text))) => return Ok(serde_json::from_str(&text)?),
            Some(Ok(WsMessage::Close(_))) | None => return Err(TransportError::Closed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(TransportError::Ws(e)),
        }
    }
}

/// Writes an [`Envelope`] as a single WebSocket text frame.
pub async fn write_envelope<S>(stream: &mut S, envelope: &Envelope) -> Result<(), TransportError>
where
    S: Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(envelope)?;
    stream.send(WsMessage::Text(text.into())).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::MessageType;
    use futures_util::stream;

    #[tokio::test]
    async fn read_envelope_decodes_text_frame() {
        let env = Envelope::new(MessageType::WorkerInfo, serde_json::json!({"version": "1"}));
        let text = serde_json::to_string(&env).unwrap();
        let mut s = stream::iter(vec![Ok(WsMessage::Text(text.into()))]);
        let decoded = read_envelope(&mut s).await.unwrap();
        assert_eq!(decoded.message_type, MessageType::WorkerInfo);
    }

    #[tokio::test]
    async fn read_envelope_skips_ping_then_reads_text() {
        let env = Envelope::new(MessageType::WorkerInfo, serde_json::json!({}));
        let text = serde_json::to_string(&env).unwrap();
        let mut s = stream::iter(vec![
            Ok(WsMessage::Ping(Vec::new().into())),
            Ok(WsMessage::Text(text.into())),
        ]);
        let decoded = read_envelope(&mut s).await.unwrap();
        assert_eq!(decoded.message_type, MessageType::WorkerInfo);
    }

    #[tokio::test]
    async fn read_envelope_reports_closed_on_stream_end() {
        let mut s = stream::iter(Vec::<Result<WsMessage, tokio_tungstenite::tungstenite::Error>>::new());
        let err = read_envelope(&mut s).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }
}
