//! # Transport
//!
//! Narrow seam to whatever carries events between processes. The bus only
//! needs topic-addressed byte publishing and a callback subscription.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised by a transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport connect failed: {0}")]
    Connect(String),

    #[error("publish to '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("subscribe to '{topic}' failed: {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("transport is closed")]
    Closed,
}

/// Callback invoked with the raw bytes of every message on a topic.
pub type TransportCallback = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

/// Cross-process message transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    async fn subscribe(&self, topic: &str, callback: TransportCallback)
        -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
struct InMemoryState {
    connected: bool,
    subscriptions: HashMap<String, Vec<TransportCallback>>,
    published: Vec<(String, Vec<u8>)>,
}

/// In-process transport.
///
/// Publishing loops the message back to every local subscriber of the
/// topic and records it. Failure toggles let tests exercise error paths.
#[derive(Default)]
pub struct InMemoryTransport {
    state: Mutex<InMemoryState>,
    fail_connect: AtomicBool,
    fail_publish: AtomicBool,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `connect` calls fail.
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Make `publish` fail until reset.
    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Messages published so far, oldest first.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().published.clone()
    }

    /// Deliver bytes to subscribers of `topic` as if they came from a peer.
    /// Returns the number of callbacks invoked.
    pub fn inject(&self, topic: &str, payload: Vec<u8>) -> usize {
        let callbacks = self
            .state
            .lock()
            .subscriptions
            .get(topic)
            .cloned()
            .unwrap_or_default();
        for callback in &callbacks {
            callback(payload.clone());
        }
        callbacks.len()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("connection refused".to_string()));
        }
        self.state.lock().connected = true;
        debug!("In-memory transport connected");
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(TransportError::Publish {
                topic: topic.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        {
            let mut state = self.state.lock();
            if !state.connected {
                return Err(TransportError::Closed);
            }
            state.published.push((topic.to_string(), payload.clone()));
        }
        self.inject(topic, payload);
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        callback: TransportCallback,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(TransportError::Subscribe {
                topic: topic.to_string(),
                reason: "not connected".to_string(),
            });
        }
        state
            .subscriptions
            .entry(topic.to_string())
            .or_default()
            .push(callback);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.connected = false;
        state.subscriptions.clear();
        debug!("In-memory transport closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_publish_requires_connect() {
        let transport = InMemoryTransport::new();
        assert_eq!(
            transport.publish("t", vec![1]).await,
            Err(TransportError::Closed)
        );
        transport.connect().await.unwrap();
        transport.publish("t", vec![1]).await.unwrap();
        assert_eq!(transport.published(), vec![("t".to_string(), vec![1])]);
    }

    #[tokio::test]
    async fn test_loopback_to_subscribers() {
        let transport = InMemoryTransport::new();
        transport.connect().await.unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        transport
            .subscribe(
                "orders",
                Arc::new(move |_bytes| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

        transport.publish("orders", b"{}".to_vec()).await.unwrap();
        transport.publish("other", b"{}".to_vec()).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(transport.inject("orders", vec![]), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_toggles() {
        let transport = InMemoryTransport::new();
        transport.set_fail_connect(true);
        assert!(matches!(
            transport.connect().await,
            Err(TransportError::Connect(_))
        ));
        transport.set_fail_connect(false);
        transport.connect().await.unwrap();

        transport.set_fail_publish(true);
        assert!(matches!(
            transport.publish("t", vec![]).await,
            Err(TransportError::Publish { .. })
        ));
    }

    #[tokio::test]
    async fn test_close_drops_subscriptions() {
        let transport = InMemoryTransport::new();
        transport.connect().await.unwrap();
        transport
            .subscribe("t", Arc::new(|_| {}))
            .await
            .unwrap();
        transport.close().await.unwrap();
        assert!(!transport.is_connected());
        assert_eq!(transport.inject("t", vec![]), 0);
    }
}
