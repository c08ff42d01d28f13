use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use holdup_types::TraceOpts;

use crate::TraceLock;
use crate::config::TraceConfig;
use crate::tracer::LockTracer;

/// A `parking_lot::RwLock` that times its own contention.
///
/// The write path follows the same protocol as [`crate::Mutex`]. Read
/// acquisitions share the one tracer with the write path: under concurrent
/// readers `lock_obtained` holds the instant the *last* reader entered, so
/// read-hold measurements are an approximation while readers overlap.
pub struct RwLock<T> {
    tracer: LockTracer,
    inner: parking_lot::RwLock<T>,
}

impl<T> RwLock<T> {
    /// A traced rwlock resolving against the process-wide defaults store.
    pub fn new(value: T) -> Self {
        Self::with_defaults(value, Arc::clone(TraceConfig::global()))
    }

    /// A traced rwlock resolving against an explicit defaults store.
    pub fn with_defaults(value: T, defaults: Arc<TraceConfig>) -> Self {
        Self {
            tracer: LockTracer::new(defaults),
            inner: parking_lot::RwLock::new(value),
        }
    }

    /// Blocks until shared access is obtained.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        let threshold_ns = self.tracer.active_threshold();
        if threshold_ns.is_some() {
            self.tracer.begin_await_lock();
        }
        let inner = self.inner.read();
        if let Some(threshold) = threshold_ns {
            self.tracer.end_await_lock(threshold);
        }
        RwLockReadGuard {
            tracer: &self.tracer,
            inner: Some(inner),
            threshold_ns,
        }
    }

    /// Blocks until exclusive access is obtained.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        let threshold_ns = self.tracer.active_threshold();
        if threshold_ns.is_some() {
            self.tracer.begin_await_lock();
        }
        let inner = self.inner.write();
        if let Some(threshold) = threshold_ns {
            self.tracer.end_await_lock(threshold);
        }
        RwLockWriteGuard {
            tracer: &self.tracer,
            inner: Some(inner),
            threshold_ns,
        }
    }

    /// Obtains shared access only if no writer holds or is waiting for the
    /// lock. Starts the critical-section clock on success.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
        let threshold_ns = self.tracer.active_threshold();
        let inner = self.inner.try_read()?;
        if threshold_ns.is_some() {
            self.tracer.note_obtained();
        }
        Some(RwLockReadGuard {
            tracer: &self.tracer,
            inner: Some(inner),
            threshold_ns,
        })
    }

    /// Obtains exclusive access only if the lock is free. Starts the
    /// critical-section clock on success.
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
        let threshold_ns = self.tracer.active_threshold();
        let inner = self.inner.try_write()?;
        if threshold_ns.is_some() {
            self.tracer.note_obtained();
        }
        Some(RwLockWriteGuard {
            tracer: &self.tracer,
            inner: Some(inner),
            threshold_ns,
        })
    }
}

impl<T> TraceLock for RwLock<T> {
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

impl<T: fmt::Debug> fmt::Debug for RwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

/// Shared-access RAII guard for [`RwLock`].
pub struct RwLockReadGuard<'a, T> {
    tracer: &'a LockTracer,
    inner: Option<parking_lot::RwLockReadGuard<'a, T>>,
    threshold_ns: Option<u64>,
}

impl<T> Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner.as_ref().expect("guard accessed after release")
    }
}

impl<T> Drop for RwLockReadGuard<'_, T> {
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

/// Exclusive-access RAII guard for [`RwLock`].
pub struct RwLockWriteGuard<'a, T> {
    tracer: &'a LockTracer,
    inner: Option<parking_lot::RwLockWriteGuard<'a, T>>,
    threshold_ns: Option<u64>,
}

impl<T> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner.as_ref().expect("guard accessed after release")
    }
}

impl<T> DerefMut for RwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.inner.as_mut().expect("guard accessed after release")
    }
}

impl<T> Drop for RwLockWriteGuard<'_, T> {
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
