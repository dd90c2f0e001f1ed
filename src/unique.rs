//! `Unique<T, D>` is the sole-ownership handle: no control block, no
//! counts, just the managed address and its destruction policy.
//!
//! Ownership is never duplicated, only relocated: `Unique` does not
//! implement `Clone`, so the type system enforces at-most-one live owner.
//! Moving the handle (assignment, passing by value, [`take`][Unique::take])
//! is the only way ownership changes hands.

use core::fmt;
use core::ptr::NonNull;

use crate::block::{self, BoxDrop, Deleter};
use crate::error::NullAccessError;

struct Slot<T: ?Sized, D> {
    target: NonNull<T>,
    deleter: D,
}

/// An exclusive owning handle, or empty. Destroys the managed object when
/// dropped, cleared, or reassigned.
pub struct Unique<T: ?Sized, D: Deleter<T> = BoxDrop> {
    slot: Option<Slot<T, D>>,
}

unsafe impl<T: ?Sized + Send, D: Deleter<T> + Send> Send for Unique<T, D> {}
unsafe impl<T: ?Sized + Sync, D: Deleter<T> + Sync> Sync for Unique<T, D> {}

impl<T: ?Sized> Unique<T> {
    /// Takes ownership of a heap allocation with the default ([`BoxDrop`])
    /// destruction policy.
    pub fn adopt(value: Box<T>) -> Self {
        let target = unsafe { NonNull::new_unchecked(Box::into_raw(value)) };
        unsafe { Unique::from_raw(target) }
    }

    /// Takes ownership of a raw allocation with the default destruction
    /// policy.
    ///
    /// # Safety
    ///
    /// `target` must have come from [`Box::into_raw`], must be live, and
    /// must not be owned by any other handle or code path.
    pub unsafe fn from_raw(target: NonNull<T>) -> Self {
        Unique::from_raw_with(target, BoxDrop)
    }

    /// Destroys the currently managed object (if any), then adopts
    /// `value` in its place.
    pub fn reset_to(this: &mut Self, value: Box<T>) {
        Unique::reset(this);
        *this = Unique::adopt(value);
    }
}

impl<T: ?Sized, D: Deleter<T>> Unique<T, D> {
    /// Constructs an empty handle, managing nothing.
    pub fn empty() -> Self {
        Unique { slot: None }
    }

    /// Like [`adopt`][Unique::adopt], but with a caller-supplied
    /// destruction policy.
    pub fn adopt_with(value: Box<T>, deleter: D) -> Self {
        let target = unsafe { NonNull::new_unchecked(Box::into_raw(value)) };
        unsafe { Unique::from_raw_with(target, deleter) }
    }

    /// Takes ownership of a raw allocation with a caller-supplied
    /// destruction policy.
    ///
    /// # Safety
    ///
    /// `target` must be live, must not be owned by any other handle or
    /// code path, and `deleter` must fully release it.
    pub unsafe fn from_raw_with(target: NonNull<T>, deleter: D) -> Self {
        block::claim_target(target);
        log::trace!("unique handle adopted object {:p}", target.cast::<u8>().as_ptr());
        Unique {
            slot: Some(Slot { target, deleter }),
        }
    }

    /// Returns a reference to the managed object, or [`NullAccessError`]
    /// if the handle is empty.
    pub fn get(this: &Self) -> Result<&T, NullAccessError> {
        match &this.slot {
            Some(slot) => Ok(unsafe { slot.target.as_ref() }),
            None => Err(NullAccessError),
        }
    }

    /// Mutable counterpart of [`get`][Unique::get]. Always available on a
    /// non-empty handle: exclusivity is static, no counts to consult.
    pub fn get_mut(this: &mut Self) -> Result<&mut T, NullAccessError> {
        match &mut this.slot {
            Some(slot) => Ok(unsafe { slot.target.as_mut() }),
            None => Err(NullAccessError),
        }
    }

    /// True if the handle manages nothing.
    pub fn is_empty(this: &Self) -> bool {
        this.slot.is_none()
    }

    /// The managed address, or `None` if empty. Advisory only; the caller
    /// must not release it.
    pub fn as_ptr(this: &Self) -> Option<NonNull<T>> {
        this.slot.as_ref().map(|slot| slot.target)
    }

    /// Detaches and returns the managed address *without* destroying the
    /// object; the handle becomes empty and the caller now owns the
    /// allocation by convention. The captured deleter is discarded
    /// without running.
    pub fn release(this: &mut Self) -> Option<NonNull<T>> {
        let slot = this.slot.take()?;
        unsafe { block::disclaim_target(slot.target) };
        log::trace!(
            "unique handle released object {:p} without destroying it",
            slot.target.cast::<u8>().as_ptr(),
        );
        Some(slot.target)
    }

    /// Destroys the currently managed object (if any) and leaves the
    /// handle empty. A no-op on an already-empty handle, so calling it
    /// twice never runs a destruction action twice.
    pub fn reset(this: &mut Self) {
        if let Some(slot) = this.slot.take() {
            unsafe {
                block::disclaim_target(slot.target);
                slot.deleter.release(slot.target);
            }
        }
    }

    /// Relocates ownership out of `this`, leaving it empty.
    pub fn take(this: &mut Self) -> Self {
        Unique {
            slot: this.slot.take(),
        }
    }
}

impl<T> Unique<[T]> {
    /// Adopts `values` as a managed slice. Destruction releases every
    /// element, then the allocation.
    pub fn adopt_slice(values: Vec<T>) -> Self {
        Unique::adopt(values.into_boxed_slice())
    }
}

impl<T: ?Sized, D: Deleter<T>> Default for Unique<T, D> {
    fn default() -> Self {
        Unique::empty()
    }
}

impl<T: ?Sized, D: Deleter<T>> Drop for Unique<T, D> {
    fn drop(&mut self) {
        Unique::reset(self);
    }
}

impl<T: ?Sized, D: Deleter<T>> core::ops::Deref for Unique<T, D> {
    type Target = T;

    /// Panics with [`NullAccessError`]'s message if the handle is empty;
    /// use [`Unique::get`] to branch instead.
    fn deref(&self) -> &T {
        match Unique::get(self) {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T: ?Sized, D: Deleter<T>> core::ops::DerefMut for Unique<T, D> {
    fn deref_mut(&mut self) -> &mut T {
        match Unique::get_mut(self) {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T: ?Sized, D: Deleter<T>> AsRef<T> for Unique<T, D> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: ?Sized + fmt::Debug, D: Deleter<T>> fmt::Debug for Unique<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Unique::get(self) {
            Ok(v) => fmt::Debug::fmt(v, f),
            Err(_) => f.write_str("(empty)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct DropCounter(Rc<Cell<usize>>);
    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn adopt_and_access() {
        let u = Unique::adopt(Box::new(41));
        assert_eq!(*Unique::get(&u).unwrap(), 41);
        assert_eq!(*u, 41);
        assert!(!Unique::is_empty(&u));
    }

    #[test]
    fn empty_access_fails() {
        let u: Unique<i32> = Unique::empty();
        assert_eq!(Unique::get(&u), Err(NullAccessError));
        assert!(Unique::as_ptr(&u).is_none());
    }

    #[test]
    #[should_panic(expected = "empty ownership handle")]
    fn empty_deref_panics() {
        let u: Unique<i32> = Unique::empty();
        let _ = *u;
    }

    #[test]
    fn mutate_through_handle() {
        let mut u = Unique::adopt(Box::new(1));
        *u += 41;
        assert_eq!(*u, 42);
    }

    #[test]
    fn drop_destroys_once() {
        let n = Rc::new(Cell::new(0));
        let u = Unique::adopt(Box::new(DropCounter(n.clone())));
        assert_eq!(n.get(), 0);
        drop(u);
        assert_eq!(n.get(), 1);
    }

    #[test]
    fn relocation_empties_source() {
        let n = Rc::new(Cell::new(0));
        let mut a = Unique::adopt(Box::new(DropCounter(n.clone())));
        let b = Unique::take(&mut a);
        assert!(Unique::is_empty(&a));
        assert!(!Unique::is_empty(&b));
        assert_eq!(n.get(), 0);
        drop(a);
        assert_eq!(n.get(), 0);
        drop(b);
        assert_eq!(n.get(), 1);
    }

    #[test]
    fn reassignment_destroys_previous() {
        let n = Rc::new(Cell::new(0));
        let mut a = Unique::adopt(Box::new(DropCounter(n.clone())));
        let b = Unique::adopt(Box::new(DropCounter(n.clone())));
        a = b;
        assert_eq!(n.get(), 1);
        drop(a);
        assert_eq!(n.get(), 2);
    }

    #[test]
    fn release_then_rewrap_round_trips() {
        let mut a = Unique::adopt(Box::new(7));
        let addr = Unique::as_ptr(&a);
        let raw = Unique::release(&mut a).unwrap();
        assert!(Unique::is_empty(&a));

        let b = unsafe { Unique::from_raw(raw) };
        assert_eq!(Unique::as_ptr(&b), addr);
        assert_eq!(*b, 7);
    }

    #[test]
    fn release_skips_destruction() {
        let n = Rc::new(Cell::new(0));
        let mut a = Unique::adopt(Box::new(DropCounter(n.clone())));
        let raw = Unique::release(&mut a).unwrap();
        drop(a);
        assert_eq!(n.get(), 0);
        drop(unsafe { Box::from_raw(raw.as_ptr()) });
        assert_eq!(n.get(), 1);
    }

    #[test]
    fn reset_twice_is_a_noop() {
        let n = Rc::new(Cell::new(0));
        let mut a = Unique::adopt(Box::new(DropCounter(n.clone())));
        Unique::reset(&mut a);
        assert_eq!(n.get(), 1);
        Unique::reset(&mut a);
        assert_eq!(n.get(), 1);
        assert!(Unique::is_empty(&a));
    }

    #[test]
    fn reset_to_swaps_managed_object() {
        let mut a = Unique::adopt(Box::new(99));
        Unique::reset_to(&mut a, Box::new(123));
        assert_eq!(*a, 123);
    }

    #[test]
    fn custom_deleter_runs_instead_of_box_drop() {
        let n = Rc::new(Cell::new(0));
        let m = n.clone();
        let u = Unique::adopt_with(Box::new(5), move |p: NonNull<i32>| {
            m.set(m.get() + 1);
            drop(unsafe { Box::from_raw(p.as_ptr()) });
        });
        assert_eq!(*u, 5);
        drop(u);
        assert_eq!(n.get(), 1);
    }

    #[test]
    fn slice_destruction_is_element_wise() {
        let n = Rc::new(Cell::new(0));
        let u = Unique::adopt_slice(vec![
            DropCounter(n.clone()),
            DropCounter(n.clone()),
            DropCounter(n.clone()),
            DropCounter(n.clone()),
        ]);
        assert_eq!(u.len(), 4);
        drop(u);
        assert_eq!(n.get(), 4);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "double ownership violation")]
    fn double_wrap_is_detected_in_debug() {
        let raw = NonNull::new(Box::into_raw(Box::new(3u64))).unwrap();
        let _a = unsafe { Unique::from_raw(raw) };
        let _b = unsafe { Unique::from_raw(raw) };
    }
}
