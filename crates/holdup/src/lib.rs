//! Lock wrappers that warn when waiting for or holding a lock exceeds a
//! threshold.
//!
//! Substitute [`Mutex`] / [`RwLock`] (or the `tokio`-backed [`AsyncMutex`] /
//! [`AsyncRwLock`]) for the native type, pick a threshold, and every
//! acquisition whose wait or critical section meets it produces one warning
//! line through the configured sink:
//!
//! ```text
//! api.users critical section took 150ms 150000000 (threshold 100ms)
//! ```
//!
//! # Enabling tracing
//!
//! Tracing is off by default and costs one relaxed atomic load per
//! acquisition while off. Enable it per instance:
//!
//! ```
//! use std::time::Duration;
//! use holdup::{Mutex, TraceLock, TraceOpts};
//!
//! let accounts = Mutex::new(Vec::<u64>::new());
//! accounts.enable_tracer_with(TraceOpts {
//!     threshold: Duration::from_millis(100),
//!     id: Some("accounts".into()),
//! });
//!
//! let mut guard = accounts.lock();
//! guard.push(1);
//! // guard drop measures the critical section
//! ```
//!
//! or process-wide via [`set_global_defaults`], which every instance without
//! its own threshold follows. Note the asymmetry:
//! [`TraceLock::disable_tracer`] means "defer to the defaults store", not
//! "never trace" — a deferring instance traces again whenever the store is
//! enabled.
//!
//! The mutual-exclusion semantics are exactly those of the wrapped
//! `parking_lot` / `tokio::sync` primitive; this crate only measures around
//! them, without ever taking a lock of its own.

mod async_mutex;
mod async_rwlock;
mod clock;
mod config;
mod mutex;
mod rwlock;
mod tracer;


pub use async_mutex::{AsyncMutex, AsyncMutexGuard};
pub use async_rwlock::{AsyncRwLock, AsyncRwLockReadGuard, AsyncRwLockWriteGuard};
pub use config::{LogSink, TraceConfig, reset_global_defaults, set_global_defaults};
pub use mutex::{Mutex, MutexGuard};
pub use rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use holdup_types::{TraceDefaults, TraceOpts, Violation, ViolationKind, ViolationSink};

/// Tracer control shared by every lock wrapper, so heterogeneous collections
/// of traced locks can be toggled uniformly.
pub trait TraceLock {
    /// Adopts the defaults store's current resolution as the instance
    /// threshold.
    fn enable_tracer(&self);

    /// Sets the instance threshold directly. An identifier, if supplied,
    /// sticks on first write and is never replaced.
    fn enable_tracer_with(&self, opts: TraceOpts);

    /// Clears the instance threshold, reverting to defaults-store
    /// resolution. Not a full stop: disable the defaults store too for that.
    fn disable_tracer(&self);
}
