//! Error types for the ownership handles.
//!
//! Failure to upgrade a [`Weak`][crate::shared::Weak] observer is *not* an
//! error; it is the expected outcome of losing the race against
//! destruction, and is reported as `None`.

use thiserror::Error;

/// Returned when accessing an empty handle.
///
/// An empty handle manages nothing, so there is no object to hand out.
/// The panicking accessors (`Deref`, `DerefMut`) use this type's display
/// text as their panic message, so the failure is identical whichever
/// surface is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("accessed an empty ownership handle")]
pub struct NullAccessError;

/// A single raw allocation was wrapped into two independent owners.
///
/// This is a programming defect, not a recoverable condition: once two
/// owners believe they hold the same allocation, one of them will destroy
/// it out from under the other. Detection is best-effort and only active
/// in debug builds (see `ledger`); when tripped, the offending `adopt` or
/// `from_raw*` call panics with this message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("double ownership violation: object at {addr:#x} is already managed by another handle")]
pub struct DoubleOwnershipError {
    /// Address of the allocation that was wrapped twice.
    pub addr: usize,
}
