//! Shared types for the holdup lock tracers.
//!
//! Kept dependency-free so that sink implementors can depend on this crate
//! alone.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Which timed phase crossed its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// The wait between requesting a lock and acquiring it.
    AwaitLock,
    /// The span between acquiring a lock and releasing it.
    CriticalSection,
}

impl ViolationKind {
    /// The literal used on the log line.
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::AwaitLock => "await-lock",
            ViolationKind::CriticalSection => "critical",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single threshold crossing, produced by a lock tracer and handed
/// synchronously to the configured [`ViolationSink`]. Never stored by the
/// tracer itself.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Identifier of the offending lock, if one was configured.
    pub id: Option<Arc<str>>,
    pub kind: ViolationKind,
    /// The threshold in force for this measurement.
    pub threshold: Duration,
    /// The measured duration. Clamped to zero on clock anomalies, never
    /// negative.
    pub actual: Duration,
    /// Wall-clock time at which the violation was observed.
    pub observed_at: SystemTime,
}

impl fmt::Display for Violation {
    /// Formats the canonical log line:
    ///
    /// ```text
    /// api.users critical section took 150ms 150000000 (threshold 100ms)
    /// ```
    ///
    /// The identifier and its trailing space are omitted entirely when no
    /// identifier was configured.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = &self.id {
            write!(f, "{id} ")?;
        }
        write!(
            f,
            "{} section took {:?} {} (threshold {:?})",
            self.kind,
            self.actual,
            self.actual.as_nanos(),
            self.threshold
        )
    }
}

/// Receives fully-formed violation records.
///
/// Called synchronously from the releasing or acquiring thread, so
/// implementations should not block for long. Failures stay inside the sink;
/// the tracer has no error channel and never retries.
pub trait ViolationSink: Send + Sync {
    fn report(&self, violation: &Violation);
}

/// Per-instance tracer options.
#[derive(Debug, Clone, Default)]
pub struct TraceOpts {
    /// Threshold for both timed phases. Zero keeps the instance deferring to
    /// its defaults store.
    pub threshold: Duration,
    /// Identifier prefixed onto every violation line from the instance.
    /// Applied only if the instance has no identifier yet (first write wins).
    pub id: Option<String>,
}

/// Default options shared by every lock instance that resolves against the
/// same defaults store.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceDefaults {
    /// Threshold applied to instances whose own threshold is zero. A zero
    /// threshold with `enabled` set fires on every measurement.
    pub threshold: Duration,
    /// Master switch; when false the stored threshold is ignored and
    /// default-based tracing is fully off.
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_line_with_identifier() {
        let violation = Violation {
            id: Some(Arc::from("testLock")),
            kind: ViolationKind::CriticalSection,
            threshold: Duration::from_millis(100),
            actual: Duration::from_millis(150),
            observed_at: SystemTime::UNIX_EPOCH,
        };
        assert_eq!(
            violation.to_string(),
            "testLock critical section took 150ms 150000000 (threshold 100ms)"
        );
    }

    #[test]
    fn violation_line_without_identifier_has_no_leading_space() {
        let violation = Violation {
            id: None,
            kind: ViolationKind::AwaitLock,
            threshold: Duration::from_millis(10),
            actual: Duration::from_millis(25),
            observed_at: SystemTime::UNIX_EPOCH,
        };
        assert_eq!(
            violation.to_string(),
            "await-lock section took 25ms 25000000 (threshold 10ms)"
        );
    }

    #[test]
    fn sub_millisecond_durations_keep_their_unit() {
        let violation = Violation {
            id: None,
            kind: ViolationKind::CriticalSection,
            threshold: Duration::ZERO,
            actual: Duration::from_micros(250),
            observed_at: SystemTime::UNIX_EPOCH,
        };
        assert_eq!(
            violation.to_string(),
            "critical section took 250µs 250000 (threshold 0ns)"
        );
    }
}
