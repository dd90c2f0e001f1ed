//! Debug-only ledger of managed addresses.
//!
//! The runtime cannot universally know an allocation's provenance, so
//! wrapping one raw allocation into two owners is undefined behavior that
//! normally surfaces as a double free much later. In debug builds we keep
//! a process-wide set of currently managed addresses and panic at the
//! second wrap instead, which points at the actual defect.
//!
//! Zero-sized objects are exempt: their addresses are not unique, so
//! membership in the set means nothing for them.

#[cfg(debug_assertions)]
mod imp {
    use crate::error::DoubleOwnershipError;
    use std::collections::HashSet;
    use std::sync::{Mutex, OnceLock};

    static LEDGER: OnceLock<Mutex<HashSet<usize>>> = OnceLock::new();

    fn ledger() -> std::sync::MutexGuard<'static, HashSet<usize>> {
        LEDGER
            .get_or_init(Default::default)
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Records `addr` as managed. Panics if it already is.
    pub(crate) fn claim(addr: usize, size: usize) {
        if size == 0 {
            return;
        }
        if !ledger().insert(addr) {
            panic!("{}", DoubleOwnershipError { addr });
        }
    }

    /// Removes `addr` from the ledger (release, reset, or destruction).
    pub(crate) fn disclaim(addr: usize, size: usize) {
        if size == 0 {
            return;
        }
        ledger().remove(&addr);
    }
}

#[cfg(not(debug_assertions))]
mod imp {
    pub(crate) fn claim(_addr: usize, _size: usize) {}
    pub(crate) fn disclaim(_addr: usize, _size: usize) {}
}

pub(crate) use imp::{claim, disclaim};
