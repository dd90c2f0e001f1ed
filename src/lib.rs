/*!
Ownership handles for heap allocations, modeled on C++'s smart pointer
family: exclusive ownership ([`Unique<T>`]), counted shared ownership
([`local::Shared<T>`][local::Shared] / [`sync::Shared<T>`][sync::Shared]),
and non-owning observation ([`local::Weak<T>`][local::Weak] /
[`sync::Weak<T>`][sync::Weak]), with pluggable destruction policies
([`Deleter`]) and element-wise release for owned slices.

Rust's own `Box`/`Rc`/`Arc` cover most of this ground; what this crate
adds is the `shared_ptr` surface the std types deliberately leave out:

- **Empty handles.** Every handle type has a null state. [`reset`] and
  [`release`] leave one behind, accessors report it as
  [`NullAccessError`] instead of handing out a stale pointer, and `Deref`
  panics with the same message.
- **Custom deleters.** The destruction action is captured per object at
  wrap time and stored, type-erased, in the control block. Any
  `FnOnce(NonNull<T>)` works, so cleanup can mean returning a handle to a
  pool rather than freeing memory.
- **Adoption of raw allocations.** The runtime never allocates the
  managed object itself, only (for shared ownership) the control block
  next to its counters.

# Exclusive ownership

[`Unique<T>`] owns exactly one object, or nothing. It has no control
block and does not implement `Clone`: ownership only relocates.

```
use holdfast::Unique;

let mut u = Unique::adopt(Box::new(5));
*u += 1;

// release() detaches without destroying; re-wrapping the returned raw
// address reproduces an equivalent owner.
let raw = Unique::release(&mut u).unwrap();
assert!(Unique::is_empty(&u));
let u = unsafe { Unique::from_raw(raw) };
assert_eq!(*u, 6);
```

# Shared ownership and observation

A `Shared` clone attaches another strong handle to the same control
block; the object is destroyed exactly when the last strong handle
detaches. A `Weak` observer never keeps the object alive, but can always
answer whether it is still there, and [`upgrade`][shared::Weak::upgrade]
atomically converts observation back into ownership while it is.

```
use holdfast::local::Shared;

let a = Shared::adopt(Box::new(1));
let b = a.clone();
assert_eq!(Shared::strong_count(&a), 2);

let w = Shared::downgrade(&a);
drop(a);
assert!(!w.is_expired());      // b still owns the object
drop(b);
assert!(w.is_expired());       // permanently
assert!(w.upgrade().is_none());
```

Use [`sync::Shared`] to share handles across threads; the counter
transitions are atomic, so exactly one thread runs the destruction
action no matter how clones, drops, and upgrades interleave. The
[`local`] variant uses plain cells and is `!Send` by construction.

# Destruction policies

```
use holdfast::local::Shared;
use std::ptr::NonNull;

let p = Shared::adopt_with(Box::new(10), |q: NonNull<i32>| {
    // this replaces the default release entirely
    unsafe { drop(Box::from_raw(q.as_ptr())) }
});
assert_eq!(*p, 10);
```

Owned slices get element-wise release through the same machinery; no
separate handle type, just a policy decided at wrap time:

```
use holdfast::Unique;

let s = Unique::adopt_slice(vec![1, 2, 3, 4]);
assert_eq!(s.len(), 4);
// dropping `s` releases all four elements, then the allocation
```

# What this crate does not do

- **Cycle detection.** Two objects that share-own each other keep each
  other alive forever. Break cycles by hand with `Weak`, as with `Rc`.
- **Object-level synchronization.** Only the counters and the liveness
  question are race-free; the managed object's own state is the
  caller's responsibility (hence `T: Send + Sync` to move [`sync`]
  handles across threads).
- **Provenance tracking.** Wrapping one allocation into two independent
  owners is a defect the runtime cannot catch in general; debug builds
  keep a best-effort ledger and panic with [`DoubleOwnershipError`] at
  the second wrap.

[`reset`]: Unique::reset
[`release`]: Unique::release
*/

pub mod block;
pub mod error;
pub mod local;
pub mod shared;
pub mod sync;
pub mod unique;

mod ledger;

pub use self::block::{BoxDrop, Count, Deleter};
pub use self::error::{DoubleOwnershipError, NullAccessError};
pub use self::unique::Unique;
