use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use holdup_types::TraceOpts;

use crate::TraceLock;
use crate::config::TraceConfig;
use crate::tracer::LockTracer;

/// A `tokio::sync::Mutex` that times its own contention.
///
/// Same protocol as [`crate::Mutex`], with the await-lock phase covering the
/// `.await` of the native acquire future. Dropping that future before it
/// resolves leaves a stale await-start timestamp behind, which the next
/// acquisition overwrites.
pub struct AsyncMutex<T> {
    tracer: LockTracer,
    inner: tokio::sync::Mutex<T>,
}

impl<T> AsyncMutex<T> {
    /// A traced async mutex resolving against the process-wide defaults
    /// store.
    pub fn new(value: T) -> Self {
        Self::with_defaults(value, Arc::clone(TraceConfig::global()))
    }

    /// A traced async mutex resolving against an explicit defaults store.
    pub fn with_defaults(value: T, defaults: Arc<TraceConfig>) -> Self {
        Self {
            tracer: LockTracer::new(defaults),
            inner: tokio::sync::Mutex::new(value),
        }
    }

    /// Resolves once the lock is acquired. The guard carries the tracing
    /// state resolved at entry, exactly as the sync variant does.
    pub async fn lock(&self) -> AsyncMutexGuard<'_, T> {
        let threshold_ns = self.tracer.active_threshold();
        if threshold_ns.is_some() {
            self.tracer.begin_await_lock();
        }
        let inner = self.inner.lock().await;
        if let Some(threshold) = threshold_ns {
            self.tracer.end_await_lock(threshold);
        }
        AsyncMutexGuard {
            tracer: &self.tracer,
            inner: Some(inner),
            threshold_ns,
        }
    }

    /// Acquires the lock only if it is free, starting the critical-section
    /// clock on success.
    pub fn try_lock(&self) -> Result<AsyncMutexGuard<'_, T>, tokio::sync::TryLockError> {
        let threshold_ns = self.tracer.active_threshold();
        let inner = self.inner.try_lock()?;
        if threshold_ns.is_some() {
            self.tracer.note_obtained();
        }
        Ok(AsyncMutexGuard {
            tracer: &self.tracer,
            inner: Some(inner),
            threshold_ns,
        })
    }
}

impl<T> TraceLock for AsyncMutex<T> {
    fn enable_tracer(&self) {
        self.tracer.enable();
    }

    fn enable_tracer_with(&self, opts: TraceOpts) {
        self.tracer.enable_with(opts);
    }

    fn disable_tracer(&self) {
        self.tracer.disable();
    }
}

impl<T: fmt::Debug> fmt::Debug for AsyncMutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

/// RAII guard for [`AsyncMutex`].
pub struct AsyncMutexGuard<'a, T> {
    tracer: &'a LockTracer,
    inner: Option<tokio::sync::MutexGuard<'a, T>>,
    threshold_ns: Option<u64>,
}

impl<T> Deref for AsyncMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner.as_ref().expect("guard accessed after release")
    }
}

impl<T> DerefMut for AsyncMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.inner.as_mut().expect("guard accessed after release")
    }
}

impl<T> Drop for AsyncMutexGuard<'_, T> {
    fn drop(&mut self) {
        if self.threshold_ns.is_some() {
            self.tracer.begin_await_unlock();
        }
        self.inner = None;
        if let Some(threshold) = self.threshold_ns {
            self.tracer.end_await_unlock(threshold);
        }
    }
}
