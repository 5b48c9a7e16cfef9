//! Provider lifecycle state machine.
//!
//! `Uninitialized -> Initializing -> Ready | Failed`. Only `initialize()`
//! leaves `Uninitialized`, and `Failed` is terminal for an instance.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::{PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use assetstore_common::{Error, Result};

/// Lifecycle state of a provider instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Tracks and guards the state of one provider instance.
pub struct Lifecycle {
    backend: String,
    state: RwLock<ProviderState>,
    /// Serializes `initialize()` calls.
    gate: Mutex<()>,
}

impl Lifecycle {
    /// Create a lifecycle in the `Uninitialized` state.
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            state: RwLock::new(ProviderState::Uninitialized),
            gate: Mutex::new(()),
        }
    }

    /// Current state.
    pub fn state(&self) -> ProviderState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, next: ProviderState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Fail with `NotReady` unless the provider is `Ready`.
    pub fn ensure_ready(&self) -> Result<()> {
        match self.state() {
            ProviderState::Ready => Ok(()),
            state => Err(Error::NotReady(format!(
                "{} provider is {}; call initialize() first",
                self.backend, state
            ))),
        }
    }

    /// Run `probe` once to move from `Uninitialized` to `Ready` or `Failed`.
    ///
    /// Calls on a `Ready` lifecycle succeed without probing again. Calls on
    /// a `Failed` lifecycle fail without probing; a new provider instance
    /// is required to retry. Probe errors other than `Config` are reported
    /// as `Connection`.
    pub async fn initialize<F, Fut>(&self, probe: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let _guard = self.gate.lock().await;

        match self.state() {
            ProviderState::Ready => {
                debug!("{} provider already initialized", self.backend);
                return Ok(());
            }
            ProviderState::Failed => {
                return Err(Error::Connection(format!(
                    "{} provider failed to initialize earlier; construct a new instance",
                    self.backend
                )));
            }
            ProviderState::Uninitialized | ProviderState::Initializing => {}
        }

        self.set(ProviderState::Initializing);

        match probe().await {
            Ok(()) => {
                self.set(ProviderState::Ready);
                info!("{} provider ready", self.backend);
                Ok(())
            }
            Err(e) => {
                self.set(ProviderState::Failed);
                warn!("{} provider failed to initialize: {}", self.backend, e);
                Err(match e {
                    Error::Config(_) | Error::Connection(_) => e,
                    other => Error::Connection(other.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_not_ready_before_initialize() {
        let lifecycle = Lifecycle::new("test");
        assert_eq!(lifecycle.state(), ProviderState::Uninitialized);
        assert!(matches!(lifecycle.ensure_ready(), Err(Error::NotReady(_))));
    }

    #[tokio::test]
    async fn test_initialize_success() {
        let lifecycle = Lifecycle::new("test");
        lifecycle.initialize(|| async { Ok(()) }).await.unwrap();

        assert_eq!(lifecycle.state(), ProviderState::Ready);
        assert!(lifecycle.ensure_ready().is_ok());
    }

    #[tokio::test]
    async fn test_failure_is_terminal() {
        let lifecycle = Lifecycle::new("test");
        let probes = AtomicUsize::new(0);

        let first = lifecycle
            .initialize(|| async {
                probes.fetch_add(1, Ordering::SeqCst);
                Err(Error::NotFound("bucket".to_string()))
            })
            .await;
        assert!(matches!(first, Err(Error::Connection(_))));
        assert_eq!(lifecycle.state(), ProviderState::Failed);

        let second = lifecycle
            .initialize(|| async {
                probes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(second, Err(Error::Connection(_))));
        assert_eq!(probes.load(Ordering::SeqCst), 1);
        assert!(matches!(lifecycle.ensure_ready(), Err(Error::NotReady(_))));
    }

    #[tokio::test]
    async fn test_config_error_passes_through() {
        let lifecycle = Lifecycle::new("test");
        let result = lifecycle
            .initialize(|| async { Err(Error::Config("missing bucket".to_string())) })
            .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_concurrent_initialize_probes_once() {
        let lifecycle = Arc::new(Lifecycle::new("test"));
        let probes = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lifecycle = lifecycle.clone();
            let probes = probes.clone();
            handles.push(tokio::spawn(async move {
                lifecycle
                    .initialize(|| async move {
                        probes.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(probes.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.state(), ProviderState::Ready);
    }
}
