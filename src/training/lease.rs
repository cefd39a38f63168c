//! Single-flight cycle lease.
//!
//! At most one retraining cycle may run at a time against a given
//! feedback store. The lease must be held before the threshold is
//! evaluated and until marking completes or the cycle aborts; a held
//! lease turns the invocation into a no-op.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::CycleError;

/// Mutual-exclusion lease over the retraining pipeline.
#[derive(Debug, Clone, Default)]
pub struct CycleLease {
    inner: Arc<Mutex<()>>,
}

/// Guard proving the lease is held. Released on drop.
#[derive(Debug)]
pub struct LeaseGuard {
    _guard: OwnedMutexGuard<()>,
}

impl CycleLease {
    /// Create a new lease.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to acquire the lease without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError::ConcurrencyConflict`] when another cycle
    /// already holds it.
    pub fn try_acquire(&self) -> Result<LeaseGuard, CycleError> {
        Arc::clone(&self.inner)
            .try_lock_owned()
            .map(|guard| LeaseGuard { _guard: guard })
            .map_err(|_| CycleError::ConcurrencyConflict)
    }
}
