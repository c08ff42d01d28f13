//! The timing core composed into every lock wrapper.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use holdup_types::{TraceOpts, ViolationKind};

use crate::clock;
use crate::config::{TraceConfig, duration_to_ns};

/// Per-lock timestamp bookkeeping and threshold resolution.
///
/// Each field is a single shared scalar, deliberately: when several threads
/// wait on the same lock they overwrite `await_lock_start`, and the winning
/// thread may compute its wait from another waiter's start. The imprecision
/// is bounded — durations clamp at zero — and buys a tracer that never takes
/// a lock of its own. Mutual exclusion is entirely the wrapped primitive's
/// business.
pub(crate) struct LockTracer {
    /// Zero means "defer to the defaults store".
    threshold_ns: AtomicU64,
    await_lock_start: AtomicU64,
    /// Release-begin instant; the critical-section math reads
    /// `lock_obtained`, this bounds a stalled native release.
    await_unlock_start: AtomicU64,
    /// Zero until a traced acquisition completes.
    lock_obtained: AtomicU64,
    id: OnceLock<Arc<str>>,
    defaults: Arc<TraceConfig>,
}

impl LockTracer {
    pub(crate) fn new(defaults: Arc<TraceConfig>) -> Self {
        Self {
            threshold_ns: AtomicU64::new(0),
            await_lock_start: AtomicU64::new(0),
            await_unlock_start: AtomicU64::new(0),
            lock_obtained: AtomicU64::new(0),
            id: OnceLock::new(),
            defaults,
        }
    }

    /// The threshold gating the measurement about to start, or `None` when
    /// tracing is off. This is the entire disabled fast path: one relaxed
    /// load, two when deferring to the defaults store.
    #[inline]
    pub(crate) fn active_threshold(&self) -> Option<u64> {
        match self.threshold_ns.load(Ordering::Relaxed) {
            0 => self.defaults.resolve(),
            t => Some(t),
        }
    }

    /// Adopts the defaults store's current resolution as the instance
    /// threshold. A disabled store resolves to zero, which keeps the instance
    /// deferring.
    pub(crate) fn enable(&self) {
        self.threshold_ns
            .store(self.defaults.resolve().unwrap_or(0), Ordering::Relaxed);
    }

    /// Sets the instance threshold, and the identifier if one is supplied
    /// and none stuck before.
    pub(crate) fn enable_with(&self, opts: TraceOpts) {
        if let Some(id) = opts.id {
            let _ = self.id.set(Arc::from(id.as_str()));
        }
        self.threshold_ns
            .store(duration_to_ns(opts.threshold), Ordering::Relaxed);
    }

    /// Clears the instance threshold. Not a full stop: the instance traces
    /// again whenever the defaults store is enabled.
    pub(crate) fn disable(&self) {
        self.threshold_ns.store(0, Ordering::Relaxed);
    }

    pub(crate) fn begin_await_lock(&self) {
        self.await_lock_start.store(clock::now_ns(), Ordering::Relaxed);
    }

    pub(crate) fn end_await_lock(&self, threshold_ns: u64) {
        let ts = clock::now_ns();
        let start = self.await_lock_start.load(Ordering::Relaxed);
        self.lock_obtained.store(ts, Ordering::Relaxed);
        // A start recorded after `ts` — clock anomaly or a racing waiter —
        // must clamp rather than underflow.
        let took = ts.saturating_sub(start);
        if took >= threshold_ns {
            self.defaults.report(
                self.id.get().cloned(),
                ViolationKind::AwaitLock,
                threshold_ns,
                took,
            );
        }
    }

    /// Starts the critical-section clock without the await-phase bookkeeping.
    /// Non-blocking acquisitions use this: they waited for nothing, so there
    /// is no await-lock measurement to make.
    pub(crate) fn note_obtained(&self) {
        self.lock_obtained.store(clock::now_ns(), Ordering::Relaxed);
    }

    pub(crate) fn begin_await_unlock(&self) {
        self.await_unlock_start
            .store(clock::now_ns(), Ordering::Relaxed);
    }

    pub(crate) fn end_await_unlock(&self, threshold_ns: u64) {
        let ts = clock::now_ns();
        let obtained = self.lock_obtained.load(Ordering::Relaxed);
        let took = ts.saturating_sub(obtained);
        // `obtained == 0` means tracing came on while the lock was already
        // held: there is no valid start to measure from, so never fire.
        if took >= threshold_ns && obtained != 0 {
            self.defaults.report(
                self.id.get().cloned(),
                ViolationKind::CriticalSection,
                threshold_ns,
                took,
            );
        }
    }
}
