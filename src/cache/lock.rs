use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

// A panic while holding a store lock poisons it; readers must keep serving
// rather than propagate the panic, so guards are always recovered.

pub(crate) fn read_guard<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                target = "vetrina::cache",
                op,
                lock_kind = "rwlock.read",
                "recovered poisoned query store lock"
            );
            poisoned.into_inner()
        }
    }
}

pub(crate) fn write_guard<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                target = "vetrina::cache",
                op,
                lock_kind = "rwlock.write",
                "recovered poisoned query store lock"
            );
            poisoned.into_inner()
        }
    }
}
