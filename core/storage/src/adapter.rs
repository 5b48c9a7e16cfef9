//! Lazily created, memoized client handle.

use tokio::sync::OnceCell;
use tracing::debug;

use assetstore_common::Result;

/// Factory that builds a backend's native client handle.
pub type Connector<C> = Box<dyn Fn() -> Result<C> + Send + Sync>;

/// Owns the single client handle of one provider instance.
///
/// The handle is built on first use and reused afterwards. Concurrent first
/// calls run the connector once; the others wait for its result. A failed
/// connector call leaves the adapter empty.
pub struct ClientAdapter<C> {
    backend: String,
    handle: OnceCell<C>,
    connector: Connector<C>,
}

impl<C> ClientAdapter<C> {
    /// Create an adapter around a connector.
    pub fn new(backend: impl Into<String>, connector: Connector<C>) -> Self {
        Self {
            backend: backend.into(),
            handle: OnceCell::new(),
            connector,
        }
    }

    /// Get the handle, connecting on first use.
    pub async fn get(&self) -> Result<&C> {
        self.handle
            .get_or_try_init(|| async {
                debug!("Creating {} client handle", self.backend);
                (self.connector)()
            })
            .await
    }

    /// Whether the handle has been created.
    pub fn is_connected(&self) -> bool {
        self.handle.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetstore_common::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_adapter(count: Arc<AtomicUsize>) -> ClientAdapter<usize> {
        ClientAdapter::new(
            "test",
            Box::new(move || Ok(count.fetch_add(1, Ordering::SeqCst) + 1)),
        )
    }

    #[tokio::test]
    async fn test_handle_is_memoized() {
        let count = Arc::new(AtomicUsize::new(0));
        let adapter = counting_adapter(count.clone());

        assert!(!adapter.is_connected());
        assert_eq!(*adapter.get().await.unwrap(), 1);
        assert_eq!(*adapter.get().await.unwrap(), 1);
        assert!(adapter.is_connected());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_creates_one_handle() {
        let count = Arc::new(AtomicUsize::new(0));
        let adapter = Arc::new(counting_adapter(count.clone()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let adapter = adapter.clone();
            handles.push(tokio::spawn(async move { *adapter.get().await.unwrap() }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 1);
        }

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_is_not_memoized() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let adapter: ClientAdapter<()> = ClientAdapter::new(
            "test",
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::Connection("refused".to_string()))
            }),
        );

        assert!(adapter.get().await.is_err());
        assert!(adapter.get().await.is_err());
        assert!(!adapter.is_connected());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
