//! `Shared<T, C>` and `Weak<T, C>` implement the counted owner and its
//! non-owning observer generically across the counter type (atomic vs.
//! nonatomic).
//!
//! You normally want the aliases in [`local`][crate::local] (single
//! threaded) or [`sync`][crate::sync] (thread safe) rather than these
//! types directly.
//!
//! Unlike `std::rc::Rc`, a `Shared` can be *empty*: it manages nothing,
//! reports a strong count of zero, and fails loudly on access. Empty
//! handles are what `reset` and `take` leave behind, mirroring a null
//! `shared_ptr`.

use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;

use crate::block::{self, BoxDrop, Count, Deleter, Header};
use crate::error::NullAccessError;

// One live attachment to a control block: the block pointer plus the
// managed address, which the header itself cannot name once type-erased.
struct Raw<T: ?Sized, C> {
    header: NonNull<Header<C>>,
    target: NonNull<T>,
}

impl<T: ?Sized, C> Clone for Raw<T, C> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: ?Sized, C> Copy for Raw<T, C> {}

/// A counted owning handle; the object lives until the last `Shared`
/// attached to its control block is gone.
pub struct Shared<T: ?Sized, C: Count> {
    inner: Option<Raw<T, C>>,
    phantom: PhantomData<T>,
}

/// A non-owning observer of a [`Shared`]'s control block. Never keeps the
/// object alive; can report expiry and attempt [`upgrade`][Weak::upgrade].
pub struct Weak<T: ?Sized, C: Count> {
    inner: Option<Raw<T, C>>,
    phantom: PhantomData<T>,
}

// The counter type decides thread safety: `AtomicUsize` is Sync, so the
// sync aliases cross threads; `Cell<usize>` is not, so the local aliases
// cannot. Deleters are required to be Send + Sync at capture time because
// the last handle may drop on any thread.
unsafe impl<T: ?Sized + Send + Sync, C: Count + Send + Sync> Send for Shared<T, C> {}
unsafe impl<T: ?Sized + Send + Sync, C: Count + Send + Sync> Sync for Shared<T, C> {}
unsafe impl<T: ?Sized + Send + Sync, C: Count + Send + Sync> Send for Weak<T, C> {}
unsafe impl<T: ?Sized + Send + Sync, C: Count + Send + Sync> Sync for Weak<T, C> {}

impl<T: ?Sized, C: Count> Shared<T, C> {
    /// Constructs an empty handle, managing nothing.
    pub fn empty() -> Self {
        Shared {
            inner: None,
            phantom: PhantomData,
        }
    }

    /// Takes ownership of a heap allocation, with the default
    /// ([`BoxDrop`]) destruction policy. Allocates the control block with
    /// a strong count of 1.
    ///
    /// For `T = [U]` this adopts a boxed slice and the release is
    /// element-wise; see also [`adopt_slice`][Shared::adopt_slice].
    pub fn adopt(value: Box<T>) -> Self {
        let target = unsafe { NonNull::new_unchecked(Box::into_raw(value)) };
        unsafe { Shared::from_raw_with(target, BoxDrop) }
    }

    /// Like [`adopt`][Shared::adopt], but with a caller-supplied
    /// destruction policy captured into the control block.
    ///
    /// The deleter receives the address that `value` boxed, and is
    /// responsible for releasing it; the default box release does *not*
    /// also run.
    pub fn adopt_with<D>(value: Box<T>, deleter: D) -> Self
    where
        D: Deleter<T> + Send + Sync,
    {
        let target = unsafe { NonNull::new_unchecked(Box::into_raw(value)) };
        unsafe { Shared::from_raw_with(target, deleter) }
    }

    /// Takes ownership of a raw allocation with the default destruction
    /// policy.
    ///
    /// # Safety
    ///
    /// `target` must have come from [`Box::into_raw`] (so [`BoxDrop`] can
    /// release it), must be live, and must not be owned by any other
    /// handle or code path.
    pub unsafe fn from_raw(target: NonNull<T>) -> Self {
        Shared::from_raw_with(target, BoxDrop)
    }

    /// Takes ownership of a raw allocation with a caller-supplied
    /// destruction policy.
    ///
    /// # Safety
    ///
    /// `target` must be live, must not be owned by any other handle or
    /// code path, and `deleter` must fully release it.
    pub unsafe fn from_raw_with<D>(target: NonNull<T>, deleter: D) -> Self
    where
        D: Deleter<T> + Send + Sync,
    {
        block::claim_target(target);
        let header = Header::allocate(target, deleter);
        Shared {
            inner: Some(Raw { header, target }),
            phantom: PhantomData,
        }
    }

    /// Returns a reference to the managed object, or
    /// [`NullAccessError`] if the handle is empty.
    pub fn get(this: &Self) -> Result<&T, NullAccessError> {
        match &this.inner {
            Some(raw) => Ok(unsafe { raw.target.as_ref() }),
            None => Err(NullAccessError),
        }
    }

    /// Returns a mutable reference, but only if `this` is the sole handle
    /// of any kind attached to the block (one strong, no observers), so
    /// no other path can reach the object.
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        let raw = this.inner.as_mut()?;
        let h = unsafe { raw.header.as_ref() };
        // weak == 1 is just the implicit reference owned by the strong
        // handles; no observer can appear while we hold the only handle.
        if h.strong.get() == 1 && h.weak.get() == 1 {
            Some(unsafe { raw.target.as_mut() })
        } else {
            None
        }
    }

    /// True if the handle manages nothing.
    pub fn is_empty(this: &Self) -> bool {
        this.inner.is_none()
    }

    /// Number of strong handles currently attached to this block; 0 for
    /// an empty handle. Advisory under concurrency.
    pub fn strong_count(this: &Self) -> usize {
        match &this.inner {
            Some(raw) => unsafe { raw.header.as_ref() }.strong.get(),
            None => 0,
        }
    }

    /// Number of observers currently attached to this block; 0 for an
    /// empty handle. Advisory under concurrency.
    pub fn weak_count(this: &Self) -> usize {
        match &this.inner {
            // Subtract one to hide the implicit weak reference owned by
            // the strong handles, which is an implementation detail.
            Some(raw) => unsafe { raw.header.as_ref() }.weak.get() - 1,
            None => 0,
        }
    }

    /// True if `this` is the only strong handle attached to its block.
    pub fn is_unique(this: &Self) -> bool {
        Shared::strong_count(this) == 1
    }

    /// The managed address, or `None` if empty. Advisory only: the caller
    /// must never release it, and must not use it past the life of the
    /// last strong handle.
    pub fn as_ptr(this: &Self) -> Option<NonNull<T>> {
        this.inner.map(|raw| raw.target)
    }

    /// True if both handles manage the same object (or are both empty).
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        match (&this.inner, &other.inner) {
            (Some(a), Some(b)) => core::ptr::eq(a.target.as_ptr(), b.target.as_ptr()),
            (None, None) => true,
            _ => false,
        }
    }

    /// Detaches from the current block (destroying the object if this was
    /// the last strong handle), leaving the handle empty. A no-op on an
    /// already-empty handle.
    pub fn reset(this: &mut Self) {
        *this = Shared::empty();
    }

    /// [`reset`][Shared::reset], then adopt `value` into a fresh block.
    pub fn reset_to(this: &mut Self, value: Box<T>) {
        *this = Shared::adopt(value);
    }

    /// Relocates ownership out of `this`, leaving it empty. The returned
    /// handle is attached to the same block with no count change.
    pub fn take(this: &mut Self) -> Self {
        mem::take(this)
    }

    /// Creates a [`Weak`] observer of this handle's block. Observing an
    /// empty handle yields an empty, perpetually expired observer.
    pub fn downgrade(this: &Self) -> Weak<T, C> {
        match &this.inner {
            Some(raw) => {
                unsafe { raw.header.as_ref() }.weak.inc_relaxed();
                Weak {
                    inner: Some(*raw),
                    phantom: PhantomData,
                }
            }
            None => Weak::empty(),
        }
    }
}

impl<T, C: Count> Shared<[T], C> {
    /// Adopts `values` as a managed slice. Destruction releases every
    /// element, then the allocation.
    pub fn adopt_slice(values: Vec<T>) -> Self {
        Shared::adopt(values.into_boxed_slice())
    }
}

impl<T: ?Sized, C: Count> Clone for Shared<T, C> {
    /// Attaches another strong handle to the same block, incrementing the
    /// strong count. Cloning an empty handle yields an empty handle.
    fn clone(&self) -> Self {
        if let Some(raw) = &self.inner {
            unsafe { raw.header.as_ref() }.strong.inc_relaxed();
        }
        Shared {
            inner: self.inner,
            phantom: PhantomData,
        }
    }

    /// Re-points `self` at `source`'s block. The new block is retained
    /// before the old one is released, so the managed object survives
    /// even if `self` held the last handle to something `source` depends
    /// on.
    fn clone_from(&mut self, source: &Self) {
        let next = source.clone();
        *self = next;
    }
}

impl<T: ?Sized, C: Count> Default for Shared<T, C> {
    fn default() -> Self {
        Shared::empty()
    }
}

impl<T: ?Sized, C: Count> Drop for Shared<T, C> {
    fn drop(&mut self) {
        let Some(raw) = self.inner else { return };
        let h = unsafe { raw.header.as_ref() };
        if h.strong.dec() != 1 {
            return;
        }
        // last strong handle was just dropped
        h.strong.acquire_fence();
        unsafe { Header::destroy_value(raw.header) };

        // drop the weak reference collectively owned by the strong
        // handles; observers keep the block alive past this point so
        // they can still report expiry.
        //
        // note: the acquire in `Weak::drop` is to ensure that it
        // happens-after this release, and therefore after the destroy
        // action is done.
        if h.weak.dec() != 1 {
            return;
        }
        unsafe { Header::dealloc(raw.header) };
    }
}

impl<T: ?Sized, C: Count> core::ops::Deref for Shared<T, C> {
    type Target = T;

    /// Panics with [`NullAccessError`]'s message if the handle is empty;
    /// use [`Shared::get`] to branch instead.
    fn deref(&self) -> &T {
        match Shared::get(self) {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T: ?Sized, C: Count> AsRef<T> for Shared<T, C> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: ?Sized + PartialEq, C: Count> PartialEq for Shared<T, C> {
    fn eq(&self, other: &Self) -> bool {
        match (Shared::get(self), Shared::get(other)) {
            (Ok(a), Ok(b)) => a == b,
            (Err(_), Err(_)) => true,
            _ => false,
        }
    }
}

impl<T: ?Sized + Eq, C: Count> Eq for Shared<T, C> {}

impl<T: ?Sized + fmt::Debug, C: Count> fmt::Debug for Shared<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Shared::get(self) {
            Ok(v) => fmt::Debug::fmt(v, f),
            Err(_) => f.write_str("(empty)"),
        }
    }
}

impl<T: ?Sized, C: Count> Weak<T, C> {
    /// Constructs an observer bound to nothing; always expired.
    pub fn empty() -> Self {
        Weak {
            inner: None,
            phantom: PhantomData,
        }
    }

    /// True if the managed object has been destroyed (or this observer
    /// was never bound to one). From the moment this first returns true,
    /// it returns true forever.
    pub fn is_expired(&self) -> bool {
        self.strong_count() == 0
    }

    /// Attempts to produce a strong handle to the observed object.
    ///
    /// Succeeds only if the object is still alive at the instant of the
    /// attempt; the liveness check and the strong increment are a single
    /// atomic step, so an upgrade can never land on an object whose
    /// destruction has begun. Losing that race is not an error: the
    /// caller branches on `None`.
    pub fn upgrade(&self) -> Option<Shared<T, C>> {
        let raw = self.inner?;
        let h = unsafe { raw.header.as_ref() };
        if h.strong.inc_if_nonzero() {
            Some(Shared {
                inner: Some(raw),
                phantom: PhantomData,
            })
        } else {
            None
        }
    }

    /// Strong count of the observed block; 0 if unbound or expired.
    pub fn strong_count(&self) -> usize {
        match &self.inner {
            Some(raw) => unsafe { raw.header.as_ref() }.strong.get(),
            None => 0,
        }
    }

    /// Number of observers attached to the observed block (including
    /// this one); 0 if unbound.
    pub fn weak_count(&self) -> usize {
        match &self.inner {
            Some(raw) => {
                let h = unsafe { raw.header.as_ref() };
                if h.strong.get() == 0 {
                    // the implicit weak reference is gone; every
                    // remaining count is an observer.
                    h.weak.get()
                } else {
                    h.weak.get() - 1
                }
            }
            None => 0,
        }
    }
}

impl<T: ?Sized, C: Count> Clone for Weak<T, C> {
    fn clone(&self) -> Self {
        if let Some(raw) = &self.inner {
            unsafe { raw.header.as_ref() }.weak.inc_relaxed();
        }
        Weak {
            inner: self.inner,
            phantom: PhantomData,
        }
    }
}

impl<T: ?Sized, C: Count> Default for Weak<T, C> {
    fn default() -> Self {
        Weak::empty()
    }
}

impl<T: ?Sized, C: Count> Drop for Weak<T, C> {
    fn drop(&mut self) {
        let Some(raw) = self.inner else { return };
        let h = unsafe { raw.header.as_ref() };
        if h.weak.dec() != 1 {
            return;
        }
        // If we free the block, ensure that it happens-after the destroy
        // action has completed in `Shared::drop`.
        h.weak.acquire_fence();
        unsafe { Header::dealloc(raw.header) };
    }
}

impl<T: ?Sized, C: Count> fmt::Debug for Weak<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(Weak)")
    }
}
