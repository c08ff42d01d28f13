use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use holdup_types::TraceOpts;

use crate::TraceLock;
use crate::config::TraceConfig;
use crate::tracer::LockTracer;

/// A `parking_lot::Mutex` that times its own contention.
///
/// Locking behaves exactly like the native primitive; when tracing is active
/// the wrapper additionally measures the wait for the lock and the length of
/// the critical section, reporting threshold crossings to the configured
/// sink.
pub struct Mutex<T> {
    tracer: LockTracer,
    inner: parking_lot::Mutex<T>,
}

impl<T> Mutex<T> {
    /// A traced mutex resolving against the process-wide defaults store.
    pub fn new(value: T) -> Self {
        Self::with_defaults(value, Arc::clone(TraceConfig::global()))
    }

    /// A traced mutex resolving against an explicit defaults store.
    pub fn with_defaults(value: T, defaults: Arc<TraceConfig>) -> Self {
        Self {
            tracer: LockTracer::new(defaults),
            inner: parking_lot::Mutex::new(value),
        }
    }

    /// Blocks until the lock is acquired.
    ///
    /// The guard releases the lock on drop and carries the tracing state
    /// resolved here, so toggling the tracer mid-hold cannot change how this
    /// critical section is measured.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        let threshold_ns = self.tracer.active_threshold();
        if threshold_ns.is_some() {
            self.tracer.begin_await_lock();
        }
        let inner = self.inner.lock();
        if let Some(threshold) = threshold_ns {
            self.tracer.end_await_lock(threshold);
        }
        MutexGuard {
            tracer: &self.tracer,
            inner: Some(inner),
            threshold_ns,
        }
    }

    /// Acquires the lock only if it is free.
    ///
    /// A successful non-blocking acquisition starts the critical-section
    /// clock but, having waited for nothing, never produces an await-lock
    /// violation.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        let threshold_ns = self.tracer.active_threshold();
        let inner = self.inner.try_lock()?;
        if threshold_ns.is_some() {
            self.tracer.note_obtained();
        }
        Some(MutexGuard {
            tracer: &self.tracer,
            inner: Some(inner),
            threshold_ns,
        })
    }
}

impl<T> TraceLock for Mutex<T> {
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

impl<T: fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

/// RAII guard for [`Mutex`]; dropping it runs the release side of the tracer
/// protocol around the native unlock.
pub struct MutexGuard<'a, T> {
    tracer: &'a LockTracer,
    // `Some` until drop; taken there so the release hooks bracket the native
    // unlock.
    inner: Option<parking_lot::MutexGuard<'a, T>>,
    threshold_ns: Option<u64>,
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner.as_ref().expect("guard accessed after release")
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.inner.as_mut().expect("guard accessed after release")
    }
}

impl<T> Drop for MutexGuard<'_, T> {
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
