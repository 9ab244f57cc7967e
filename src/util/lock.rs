//! Poison-tolerant access to the memo locks.
//!
//! A panic while a memo guard is held poisons the lock. The memoized values
//! here are all recomputable from their sources, so recovery is always safe:
//! log it and keep going with whatever state is inside.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn recover<G>(
    result: Result<G, PoisonError<G>>,
    target: &'static str,
    op: &'static str,
    kind: &'static str,
) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            op,
            target_module = target,
            lock_kind = kind,
            "Recovered from poisoned memo lock; memoized value may be stale"
        );
        poisoned.into_inner()
    })
}

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), target, op, "read")
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), target, op, "write")
}
