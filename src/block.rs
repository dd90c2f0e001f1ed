//! The control block behind shared ownership, and the destruction policy
//! machinery shared by every handle type.
//!
//! A `Header<C>` holds the two counters plus two type-erased actions:
//! one that destroys the managed object (by running the captured
//! [`Deleter`]), and one that frees the block allocation itself. The
//! header is colocated with the deleter and the managed address in a
//! `Block`, so erasing the object and deleter types costs one function
//! pointer each rather than a separate boxed closure.
//!
//! Nothing in this module is public API except [`Count`], [`Deleter`],
//! and [`BoxDrop`]; the handle types in [`shared`][crate::shared] are the
//! only code that touches a live header.

use core::cell::Cell;
use core::mem::{self, MaybeUninit};
use core::ptr::NonNull;
use core::sync::atomic::{
    AtomicUsize,
    Ordering::{Acquire, Relaxed, Release},
};

use crate::ledger;

/// Trait over the reference counter representation, distinguishing the
/// single-threaded handles ([`local`][crate::local], `Cell<usize>`) from
/// the thread-safe ones ([`sync`][crate::sync], `AtomicUsize`).
///
/// It is `pub` so you can write code generic over atomicity, but there is
/// no reason to implement it for other types, and the seal prevents it.
///
/// # Safety
///
/// The counter operations are relied on for destruction ordering:
/// `inc_if_nonzero` must be atomic with respect to concurrent `dec` calls
/// on the same counter (for the `Sync` implementers), and `dec` followed
/// by `acquire_fence` must synchronize with every preceding decrement.
pub unsafe trait Count: private::Sealed {
    #[doc(hidden)]
    fn new(v: usize) -> Self;
    #[doc(hidden)]
    fn get(&self) -> usize;
    #[doc(hidden)]
    fn inc_relaxed(&self) -> usize;
    #[doc(hidden)]
    fn inc_if_nonzero(&self) -> bool;
    #[doc(hidden)]
    fn dec(&self) -> usize;
    #[doc(hidden)]
    fn acquire_fence(&self);
}

unsafe impl Count for Cell<usize> {
    fn new(v: usize) -> Self {
        Cell::new(v)
    }

    fn get(&self) -> usize {
        Cell::get(self)
    }

    fn inc_relaxed(&self) -> usize {
        let i = self.get();
        self.set(i + 1);
        i
    }

    fn inc_if_nonzero(&self) -> bool {
        let i = self.get();
        if i != 0 {
            self.set(i + 1);
            true
        } else {
            false
        }
    }

    fn dec(&self) -> usize {
        let i = self.get();
        self.set(i - 1);
        i
    }

    fn acquire_fence(&self) {}
}

unsafe impl Count for AtomicUsize {
    fn new(v: usize) -> Self {
        AtomicUsize::new(v)
    }

    fn get(&self) -> usize {
        // relaxed ordering as this is only advisory
        self.load(Relaxed)
    }

    fn inc_relaxed(&self) -> usize {
        self.fetch_add(1, Relaxed)
    }

    fn inc_if_nonzero(&self) -> bool {
        // See std::sync::Arc<T> for explanation of atomic logic
        self.fetch_update(
            Acquire,
            Relaxed,
            |n| {
                if n == 0 {
                    None
                } else {
                    Some(n + 1)
                }
            },
        )
        .is_ok()
    }

    fn dec(&self) -> usize {
        self.fetch_sub(1, Release)
    }

    fn acquire_fence(&self) {
        // either `fence()` or `load()` would work here, and either may be
        // more performant depending on platform details.
        self.load(Acquire);
    }
}

mod private {
    use core::cell::Cell;
    use core::sync::atomic::AtomicUsize;

    pub trait Sealed {}
    impl Sealed for Cell<usize> {}
    impl Sealed for AtomicUsize {}
}

/// A destruction policy: the procedure run exactly once on the managed
/// address when the last strong owner disappears.
///
/// The default policy is [`BoxDrop`]. Any `FnOnce(NonNull<T>)` closure is
/// also a deleter, which covers custom cleanup such as returning a handle
/// to a pool instead of freeing memory.
///
/// # Safety
///
/// An implementation must fully release whatever resource the target
/// address stands for, exactly once, and must not retain the pointer
/// afterwards. The runtime guarantees it calls `release` at most once per
/// managed object, with no other handle able to reach the object.
pub unsafe trait Deleter<T: ?Sized> {
    /// Releases the managed object at `target`.
    ///
    /// # Safety
    ///
    /// `target` must be the address this deleter was captured for, still
    /// live, and unreachable from any other handle.
    unsafe fn release(self, target: NonNull<T>);
}

/// The default destruction policy: the managed address came from
/// [`Box::into_raw`], so reconstitute the box and drop it.
///
/// For slice targets (`T = [U]`) this is already the element-wise
/// release: dropping a `Box<[U]>` drops every element before freeing the
/// allocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxDrop;

unsafe impl<T: ?Sized> Deleter<T> for BoxDrop {
    unsafe fn release(self, target: NonNull<T>) {
        drop(Box::from_raw(target.as_ptr()));
    }
}

unsafe impl<T: ?Sized, F: FnOnce(NonNull<T>)> Deleter<T> for F {
    unsafe fn release(self, target: NonNull<T>) {
        self(target)
    }
}

// Counts and destruction actions for one shared-owned object. `C` is the
// only type parameter: the object and deleter types are erased behind the
// two function pointers, which downcast to the containing `Block`.
pub(crate) struct Header<C> {
    pub(crate) strong: C,
    pub(crate) weak: C,
    destroy: unsafe fn(*mut Header<C>),
    dealloc: unsafe fn(*mut Header<C>),
}

#[repr(C)]
struct Block<T: ?Sized, C, D> {
    header: Header<C>,
    target: NonNull<T>,
    deleter: MaybeUninit<D>,
}

impl<C: Count> Header<C> {
    /// Allocates a control block for `target`, with `strong = 1` and the
    /// implicit weak reference collectively owned by the strong handles.
    pub(crate) fn allocate<T: ?Sized, D: Deleter<T>>(
        target: NonNull<T>,
        deleter: D,
    ) -> NonNull<Header<C>> {
        let b = Box::into_raw(Box::new(Block {
            header: Header {
                strong: C::new(1),
                weak: C::new(1),
                destroy: destroy_erased::<T, C, D>,
                dealloc: dealloc_erased::<T, C, D>,
            },
            target,
            deleter: MaybeUninit::new(deleter),
        }));
        log::trace!(
            "control block {:p} allocated for object {:p}",
            b,
            target.cast::<u8>().as_ptr(),
        );
        unsafe { NonNull::new_unchecked(b as *mut Header<C>) }
    }

    /// Runs the captured deleter on the managed object.
    ///
    /// # Safety
    ///
    /// Must be called exactly once per block, by the decrement that
    /// observed `strong` reach zero, after an acquire fence.
    pub(crate) unsafe fn destroy_value(h: NonNull<Header<C>>) {
        let f = h.as_ref().destroy;
        f(h.as_ptr());
    }

    /// Frees the block allocation itself.
    ///
    /// # Safety
    ///
    /// Must be called exactly once per block, by the decrement that
    /// observed `weak` reach zero, after `destroy_value` has completed.
    pub(crate) unsafe fn dealloc(h: NonNull<Header<C>>) {
        let f = h.as_ref().dealloc;
        f(h.as_ptr());
    }
}

unsafe fn destroy_erased<T: ?Sized, C, D: Deleter<T>>(h: *mut Header<C>) {
    let b = h as *mut Block<T, C, D>;
    let target = (*b).target;
    let deleter = (*b).deleter.assume_init_read();
    log::trace!(
        "control block {:p}: strong count reached zero, destroying object {:p}",
        h,
        target.cast::<u8>().as_ptr(),
    );
    disclaim_target(target);
    deleter.release(target);
}

unsafe fn dealloc_erased<T: ?Sized, C, D>(h: *mut Header<C>) {
    log::trace!("control block {:p} freed", h);
    drop(Box::from_raw(h as *mut Block<T, C, D>));
}

/// Records `target` in the debug ownership ledger, panicking with
/// [`DoubleOwnershipError`][crate::error::DoubleOwnershipError] if some
/// other handle already manages it.
///
/// # Safety
///
/// `target` must point to a live object.
pub(crate) unsafe fn claim_target<T: ?Sized>(target: NonNull<T>) {
    ledger::claim(
        target.cast::<u8>().as_ptr() as usize,
        mem::size_of_val(target.as_ref()),
    );
}

/// Removes `target` from the debug ownership ledger.
///
/// # Safety
///
/// `target` must point to a live object.
pub(crate) unsafe fn disclaim_target<T: ?Sized>(target: NonNull<T>) {
    ledger::disclaim(
        target.cast::<u8>().as_ptr() as usize,
        mem::size_of_val(target.as_ref()),
    );
}
