use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use holdup_types::TraceOpts;

use crate::TraceLock;
use crate::config::TraceConfig;
use crate::tracer::LockTracer;

/// A `tokio::sync::RwLock` that times its own contention.
///
/// Carries the same read-path approximation as [`crate::RwLock`]: concurrent
/// readers share one `lock_obtained` scalar, so overlapping read holds are
/// measured from the last reader to enter.
pub struct AsyncRwLock<T> {
    tracer: LockTracer,
    inner: tokio::sync::RwLock<T>,
}

impl<T> AsyncRwLock<T> {
    /// A traced async rwlock resolving against the process-wide defaults
    /// store.
    pub fn new(value: T) -> Self {
        Self::with_defaults(value, Arc::clone(TraceConfig::global()))
    }

    /// A traced async rwlock resolving against an explicit defaults store.
    pub fn with_defaults(value: T, defaults: Arc<TraceConfig>) -> Self {
        Self {
            tracer: LockTracer::new(defaults),
            inner: tokio::sync::RwLock::new(value),
        }
    }

    /// Resolves once shared access is obtained.
    pub async fn read(&self) -> AsyncRwLockReadGuard<'_, T> {
        let threshold_ns = self.tracer.active_threshold();
        if threshold_ns.is_some() {
            self.tracer.begin_await_lock();
        }
        let inner = self.inner.read().await;
        if let Some(threshold) = threshold_ns {
            self.tracer.end_await_lock(threshold);
        }
        AsyncRwLockReadGuard {
            tracer: &self.tracer,
            inner: Some(inner),
            threshold_ns,
        }
    }

    /// Resolves once exclusive access is obtained.
    pub async fn write(&self) -> AsyncRwLockWriteGuard<'_, T> {
        let threshold_ns = self.tracer.active_threshold();
        if threshold_ns.is_some() {
            self.tracer.begin_await_lock();
        }
        let inner = self.inner.write().await;
        if let Some(threshold) = threshold_ns {
            self.tracer.end_await_lock(threshold);
        }
        AsyncRwLockWriteGuard {
            tracer: &self.tracer,
            inner: Some(inner),
            threshold_ns,
        }
    }

    /// Obtains shared access only if no writer holds the lock, starting the
    /// critical-section clock on success.
    pub fn try_read(&self) -> Result<AsyncRwLockReadGuard<'_, T>, tokio::sync::TryLockError> {
        let threshold_ns = self.tracer.active_threshold();
        let inner = self.inner.try_read()?;
        if threshold_ns.is_some() {
            self.tracer.note_obtained();
        }
        Ok(AsyncRwLockReadGuard {
            tracer: &self.tracer,
            inner: Some(inner),
            threshold_ns,
        })
    }

    /// Obtains exclusive access only if the lock is free, starting the
    /// critical-section clock on success.
    pub fn try_write(&self) -> Result<AsyncRwLockWriteGuard<'_, T>, tokio::sync::TryLockError> {
        let threshold_ns = self.tracer.active_threshold();
        let inner = self.inner.try_write()?;
        if threshold_ns.is_some() {
            self.tracer.note_obtained();
        }
        Ok(AsyncRwLockWriteGuard {
            tracer: &self.tracer,
            inner: Some(inner),
            threshold_ns,
        })
    }
}

impl<T> TraceLock for AsyncRwLock<T> {
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

impl<T: fmt::Debug> fmt::Debug for AsyncRwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

/// Shared-access RAII guard for [`AsyncRwLock`].
pub struct AsyncRwLockReadGuard<'a, T> {
    tracer: &'a LockTracer,
    inner: Option<tokio::sync::RwLockReadGuard<'a, T>>,
    threshold_ns: Option<u64>,
}

impl<T> Deref for AsyncRwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner.as_ref().expect("guard accessed after release")
    }
}

impl<T> Drop for AsyncRwLockReadGuard<'_, T> {
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

/// Exclusive-access RAII guard for [`AsyncRwLock`].
pub struct AsyncRwLockWriteGuard<'a, T> {
    tracer: &'a LockTracer,
    inner: Option<tokio::sync::RwLockWriteGuard<'a, T>>,
    threshold_ns: Option<u64>,
}

impl<T> Deref for AsyncRwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner.as_ref().expect("guard accessed after release")
    }
}

impl<T> DerefMut for AsyncRwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.inner.as_mut().expect("guard accessed after release")
    }
}

impl<T> Drop for AsyncRwLockWriteGuard<'_, T> {
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
