// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/reply correlation for the cluster messaging plane.
//!
//! The Controller registers a oneshot sender before dispatching a request to
//! a worker; the transport read loop completes it by `request_id` when the
//! matching reply frame arrives. A 5-second deadline bounds the wait.

use crate::envelope::ReplyEnvelope;
use cplane_core::id::RequestId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Fixed round-trip deadline for a Controller→Worker request.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SendError {
    #[error("worker is offline")]
    Offline,
    #[error("timed out waiting for worker reply")]
    Timeout,
    #[error("reply channel closed before a reply arrived")]
    Cancelled,
}

/// Thread-safe table of in-flight requests awaiting a reply.
#[derive(Default, Clone)]
pub struct PendingReplies {
    inner: Arc<Mutex<HashMap<RequestId, oneshot::Sender<ReplyEnvelope>>>>,
}

impl PendingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new wait for `request_id` and returns a future that
    /// resolves with the reply or [`SendError::Timeout`] after
    /// [`REPLY_TIMEOUT`].
    pub fn wait_for(&self, request_id: RequestId) -> impl std::future::Future<Output = Result<ReplyEnvelope, SendError>> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().insert(request_id, tx);
        let table = self.inner.clone();
        async move {
            let result = tokio::time::timeout(REPLY_TIMEOUT, rx).await;
            table.lock().remove(&request_id);
            match result {
                Ok(Ok(reply)) => Ok(reply),
                Ok(Err(_)) => Err(SendError::Cancelled),
                Err(_) => Err(SendError::Timeout),
            }
        }
    }

    /// Completes the pending wait for `request_id`, if one is registered.
    /// A reply with no matching entry (already timed out, or unsolicited)
    /// is dropped silently.
    pub fn complete(&self, request_id: RequestId, reply: ReplyEnvelope) {
        if let Some(tx) = self.inner.lock().remove(&request_id) {
            let _ = tx.send(reply);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_resolves_the_waiting_future() {
        let table = PendingReplies::new();
        let request_id = RequestId::new();
        let wait = table.wait_for(request_id);
        table.complete(request_id, ReplyEnvelope::ok_empty());
        let reply = wait.await.unwrap();
        assert!(reply.is_ok());
    }

    #[tokio::test]
    async fn unmatched_complete_is_dropped_silently() {
        let table = PendingReplies::new();
        table.complete(RequestId::new(), ReplyEnvelope::ok_empty());
        assert_eq!(table.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_times_out_without_a_reply() {
        let table = PendingReplies::new();
        let request_id = RequestId::new();
        let wait = table.wait_for(request_id);
        tokio::time::advance(REPLY_TIMEOUT + Duration::from_millis(1)).await;
        let err = wait.await.unwrap_err();
        assert!(matches!(err, SendError::Timeout));
        assert_eq!(table.pending_count(), 0);
    }
}
