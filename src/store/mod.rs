//! The derived-data cache store abstraction.
//!
//! [`DerivedDataCache`] is the key-value seam this subsystem builds on. A
//! backend only has to move bytes: a miss is not an error, it is the normal
//! trigger for rebuilding from source. Backends must be process-wide and
//! thread-safe; because keys are content-addressed, concurrent writers to
//! the same key always carry identical bytes and never disagree.
//!
//! Asynchronous gets are modeled as [`DdcHandle`]s: an owned handle to a
//! spawned fetch. Dropping a handle abandons the fetch (the task still runs
//! to completion); awaiting it via [`DdcHandle::wait`] is the only
//! suspension point.

mod memory;

pub use memory::{MemoryDdc, DEFAULT_MEMORY_DDC_CAPACITY};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::warn;

// =============================================================================
// Cache Trait
// =============================================================================

/// Abstract get/put store for derived data.
///
/// Implementations must be cheap to share behind an `Arc` and safe to call
/// from any task.
#[async_trait]
pub trait DerivedDataCache: Send + Sync {
    /// Store bytes under a key. Idempotent: writing the same key with the
    /// same bytes twice is a no-op in effect.
    async fn put(&self, key: &str, data: Bytes);

    /// Fetch the bytes stored under a key, or `None` on a miss.
    async fn get(&self, key: &str) -> Option<Bytes>;

    /// Probe for existence without transferring bytes. May err on the side
    /// of `true` (hence "probably"); callers use it to decide whether a
    /// blocking load is likely to succeed, never for correctness.
    async fn probably_exists(&self, key: &str) -> bool;

    /// Advisory hint that a key's value is cheap to regenerate and may be
    /// evicted early. Not correctness-critical.
    async fn mark_transient(&self, key: &str);
}

// =============================================================================
// Asynchronous Gets
// =============================================================================

/// Owned handle to an in-flight asynchronous get.
pub struct DdcHandle {
    handle: JoinHandle<Option<Bytes>>,
}

impl DdcHandle {
    /// Start an asynchronous get against a shared cache.
    pub fn spawn(ddc: &Arc<dyn DerivedDataCache>, key: &str) -> Self {
        let ddc = Arc::clone(ddc);
        let key = key.to_string();
        Self {
            handle: tokio::spawn(async move { ddc.get(&key).await }),
        }
    }

    /// Wait for the fetch to complete and take its result.
    ///
    /// A fetch task that died (panicked backend) reads as a miss.
    pub async fn wait(self) -> Option<Bytes> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) => {
                warn!("asynchronous cache get failed: {}", err);
                None
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
