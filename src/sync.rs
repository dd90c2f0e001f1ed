//! Thread-safe ownership handles, counted with `AtomicUsize`.
//!
//! Independent copies of one `sync::Shared<T>` (and observers of it) may
//! be cloned, dropped, and upgraded from parallel threads; the counter
//! transitions are atomic read-modify-write operations, so exactly one
//! thread observes the last strong handle disappear and runs the
//! destruction action.
//!
//! Only the counters and the is-it-still-alive question are protected;
//! concurrent access to the managed object's own state is the caller's
//! business, which is why crossing threads requires `T: Send + Sync`.
//!
//! ## See also
//!
//! [`local`][crate::local] in this crate is the nonatomic version for
//! single-threaded use.

use core::sync::atomic::AtomicUsize;

pub type Shared<T> = crate::shared::Shared<T, AtomicUsize>;
pub type Weak<T> = crate::shared::Weak<T, AtomicUsize>;
