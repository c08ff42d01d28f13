use std::sync::LazyLock;
use std::time::Instant;

static ANCHOR: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Nanoseconds elapsed since the process-wide anchor, never zero: the tracer
/// reserves 0 as its "never recorded" sentinel.
pub(crate) fn now_ns() -> u64 {
    (ANCHOR.elapsed().as_nanos().min(u64::MAX as u128) as u64).max(1)
}
