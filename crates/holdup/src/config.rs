//! Shared tracing defaults and the violation delivery path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, SystemTime};

use holdup_types::{TraceDefaults, Violation, ViolationKind, ViolationSink};

/// Defaults store consulted by every lock whose own threshold is unset, plus
/// the sink that violations are delivered to.
///
/// One process-wide instance backs the drop-in use case
/// ([`TraceConfig::global`]); tests and embedders construct their own and
/// wire them in through `with_defaults` on the wrappers. Both fields are
/// independently atomic — a change is eventually visible to every lock
/// resolving against this store, with no transaction across the two.
pub struct TraceConfig {
    threshold_ns: AtomicU64,
    enabled: AtomicBool,
    // Cold path: read only when a violation is actually emitted.
    sink: parking_lot::RwLock<Arc<dyn ViolationSink>>,
}

impl TraceConfig {
    /// A fresh store: disabled, zero threshold, logging sink.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            threshold_ns: AtomicU64::new(0),
            enabled: AtomicBool::new(false),
            sink: parking_lot::RwLock::new(Arc::new(LogSink)),
        })
    }

    /// The process-wide store used by plainly-constructed locks.
    pub fn global() -> &'static Arc<TraceConfig> {
        static GLOBAL: LazyLock<Arc<TraceConfig>> = LazyLock::new(TraceConfig::new);
        &GLOBAL
    }

    /// Replaces the default threshold and enabled flag. Deferring locks pick
    /// the change up on their next acquire or release; in-flight waits keep
    /// the state they started with.
    pub fn set_defaults(&self, defaults: TraceDefaults) {
        self.threshold_ns
            .store(duration_to_ns(defaults.threshold), Ordering::Relaxed);
        self.enabled.store(defaults.enabled, Ordering::Relaxed);
    }

    /// Back to disabled with a zero threshold.
    pub fn reset(&self) {
        self.set_defaults(TraceDefaults::default());
    }

    /// The current defaults, as a snapshot.
    pub fn snapshot(&self) -> TraceDefaults {
        TraceDefaults {
            threshold: Duration::from_nanos(self.threshold_ns.load(Ordering::Relaxed)),
            enabled: self.enabled.load(Ordering::Relaxed),
        }
    }

    /// Replaces the violation sink for every lock resolving against this
    /// store.
    pub fn set_sink(&self, sink: Arc<dyn ViolationSink>) {
        *self.sink.write() = sink;
    }

    /// `None` when disabled; otherwise the stored default threshold, where
    /// zero means "fire on every measurement".
    pub(crate) fn resolve(&self) -> Option<u64> {
        if !self.enabled.load(Ordering::Relaxed) {
            return None;
        }
        Some(self.threshold_ns.load(Ordering::Relaxed))
    }

    pub(crate) fn report(
        &self,
        id: Option<Arc<str>>,
        kind: ViolationKind,
        threshold_ns: u64,
        took_ns: u64,
    ) {
        let violation = Violation {
            id,
            kind,
            threshold: Duration::from_nanos(threshold_ns),
            actual: Duration::from_nanos(took_ns),
            observed_at: SystemTime::now(),
        };
        self.sink.read().report(&violation);
    }
}

/// Replaces the process-wide defaults.
pub fn set_global_defaults(defaults: TraceDefaults) {
    TraceConfig::global().set_defaults(defaults);
}

/// Restores the process-wide defaults to disabled / zero.
pub fn reset_global_defaults() {
    TraceConfig::global().reset();
}

pub(crate) fn duration_to_ns(duration: Duration) -> u64 {
    duration.as_nanos().min(u64::MAX as u128) as u64
}

/// The default sink: one `tracing` warning per violation.
pub struct LogSink;

impl ViolationSink for LogSink {
    fn report(&self, violation: &Violation) {
        tracing::warn!("{}", violation);
    }
}
