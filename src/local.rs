//! Single-threaded ownership handles, counted with `Cell<usize>`.
//!
//! `local::Shared<T>` is to [`sync::Shared<T>`][crate::sync] what
//! `std::rc::Rc` is to `std::sync::Arc`: the same contract, cheaper
//! counter operations, and deliberately `!Send` so the counts can never
//! race.
//!
//! ## See also
//!
//! [`sync`][crate::sync] in this crate is the atomic version for sharing
//! handles across threads.

use core::cell::Cell;

pub type Shared<T> = crate::shared::Shared<T, Cell<usize>>;
pub type Weak<T> = crate::shared::Weak<T, Cell<usize>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NullAccessError;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counts<T>(x: &Shared<T>) -> (usize, usize) {
        (Shared::strong_count(x), Shared::weak_count(x))
    }

    struct DropCounter(Rc<Cell<usize>>);
    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn adopt_and_access() {
        let x = Shared::adopt(Box::new(2));
        assert_eq!(*Shared::get(&x).unwrap(), 2);
        assert_eq!(*x, 2);
        assert_eq!(counts(&x), (1, 0));
        assert!(Shared::is_unique(&x));
    }

    #[test]
    fn clone_shares_one_object() {
        let x = Shared::adopt(Box::new(2));
        let y = x.clone();
        assert_eq!(counts(&x), (2, 0));
        assert!(!Shared::is_unique(&x));
        assert!(Shared::ptr_eq(&x, &y));
        drop(x);
        assert_eq!(counts(&y), (1, 0));
        assert_eq!(*y, 2);
    }

    #[test]
    fn count_tracks_live_copies_and_destroys_once() {
        let n = Rc::new(Cell::new(0));
        let a = Shared::adopt(Box::new(DropCounter(n.clone())));
        let b = a.clone();
        let c = b.clone();
        assert_eq!(Shared::strong_count(&a), 3);
        drop(b);
        assert_eq!(Shared::strong_count(&a), 2);
        drop(a);
        assert_eq!(Shared::strong_count(&c), 1);
        assert_eq!(n.get(), 0);
        drop(c);
        assert_eq!(n.get(), 1);
    }

    #[test]
    fn weak_observes_without_owning() {
        // wrap O into A; clone into B; observe from A; then tear down.
        let n = Rc::new(Cell::new(0));
        let a = Shared::adopt(Box::new(DropCounter(n.clone())));
        assert_eq!(Shared::strong_count(&a), 1);

        let b = a.clone();
        assert_eq!(Shared::strong_count(&a), 2);

        let w = Shared::downgrade(&a);
        assert_eq!(Shared::weak_count(&a), 1);
        assert_eq!(w.strong_count(), 2);

        drop(a);
        assert_eq!(w.strong_count(), 1);
        assert!(!w.is_expired());
        assert_eq!(n.get(), 0);

        drop(b);
        assert_eq!(n.get(), 1);
        assert!(w.is_expired());
        assert!(w.upgrade().is_none());
    }

    #[test]
    fn upgrade_extends_lifetime() {
        let x = Shared::adopt(Box::new(5));
        let w = Shared::downgrade(&x);
        let y = w.upgrade().unwrap();
        assert_eq!(*y, 5);
        assert_eq!(counts(&x), (2, 1));
        drop(x);
        // the upgraded handle keeps the object alive on its own.
        assert!(!w.is_expired());
        assert_eq!(*y, 5);
        drop(y);
        assert!(w.is_expired());
    }

    #[test]
    fn observer_of_empty_handle_is_always_expired() {
        let x: Shared<i32> = Shared::empty();
        let w = Shared::downgrade(&x);
        assert!(w.is_expired());
        assert!(w.upgrade().is_none());
        assert_eq!(w.weak_count(), 0);
    }

    #[test]
    fn cloned_observers_count_separately() {
        let x = Shared::adopt(Box::new(1));
        let w1 = Shared::downgrade(&x);
        let w2 = w1.clone();
        assert_eq!(Shared::weak_count(&x), 2);
        drop(w1);
        assert_eq!(Shared::weak_count(&x), 1);
        drop(w2);
        assert_eq!(Shared::weak_count(&x), 0);
    }

    #[test]
    fn block_outlives_object_for_observers() {
        // the observer must still answer is_expired() after the object
        // is gone; dropping it last frees the block.
        let n = Rc::new(Cell::new(0));
        let a = Shared::adopt(Box::new(DropCounter(n.clone())));
        let w = Shared::downgrade(&a);
        drop(a);
        assert_eq!(n.get(), 1);
        assert!(w.is_expired());
        assert_eq!(w.weak_count(), 1);
        drop(w);
    }

    #[test]
    fn empty_access_fails() {
        let x: Shared<i32> = Shared::empty();
        assert_eq!(Shared::get(&x), Err(NullAccessError));
        assert_eq!(counts(&x), (0, 0));
        assert!(Shared::is_empty(&x));
        assert!(!Shared::is_unique(&x));
        assert!(Shared::as_ptr(&x).is_none());
    }

    #[test]
    #[should_panic(expected = "empty ownership handle")]
    fn empty_deref_panics() {
        let x: Shared<i32> = Shared::empty();
        let _ = *x;
    }

    #[test]
    fn reset_twice_is_a_noop() {
        let n = Rc::new(Cell::new(0));
        let mut a = Shared::adopt(Box::new(DropCounter(n.clone())));
        Shared::reset(&mut a);
        assert_eq!(n.get(), 1);
        Shared::reset(&mut a);
        assert_eq!(n.get(), 1);
        assert!(Shared::is_empty(&a));
    }

    #[test]
    fn reset_releases_only_this_handle() {
        let n = Rc::new(Cell::new(0));
        let mut a = Shared::adopt(Box::new(DropCounter(n.clone())));
        let b = a.clone();
        Shared::reset(&mut a);
        assert_eq!(n.get(), 0);
        assert_eq!(Shared::strong_count(&b), 1);
        drop(b);
        assert_eq!(n.get(), 1);
    }

    #[test]
    fn reassignment_reorders_safely() {
        // the new block is retained before the old one is released.
        let n = Rc::new(Cell::new(0));
        let mut a = Shared::adopt(Box::new(DropCounter(n.clone())));
        let b = Shared::adopt(Box::new(DropCounter(n.clone())));
        a.clone_from(&b);
        assert_eq!(n.get(), 1);
        assert!(Shared::ptr_eq(&a, &b));
        assert_eq!(Shared::strong_count(&b), 2);
        drop(a);
        drop(b);
        assert_eq!(n.get(), 2);
    }

    #[test]
    fn take_relocates_without_count_change() {
        let mut a = Shared::adopt(Box::new(9));
        let w = Shared::downgrade(&a);
        let b = Shared::take(&mut a);
        assert!(Shared::is_empty(&a));
        assert_eq!(counts(&b), (1, 1));
        assert!(!w.is_expired());
        drop(b);
        assert!(w.is_expired());
    }

    #[test]
    fn raw_address_matches_access() {
        let x = Shared::adopt(Box::new(7));
        let p = Shared::as_ptr(&x).unwrap();
        assert!(std::ptr::eq(p.as_ptr(), &*x));
    }

    #[test]
    fn get_mut_requires_sole_handle() {
        let mut x = Shared::adopt(Box::new(1));
        *Shared::get_mut(&mut x).unwrap() = 10;
        assert_eq!(*x, 10);

        let y = x.clone();
        assert!(Shared::get_mut(&mut x).is_none());
        drop(y);

        let w = Shared::downgrade(&x);
        assert!(Shared::get_mut(&mut x).is_none());
        drop(w);
        assert!(Shared::get_mut(&mut x).is_some());
    }

    #[test]
    fn custom_deleter_runs_exactly_once() {
        use std::ptr::NonNull;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let n = Arc::new(AtomicUsize::new(0));
        let m = n.clone();
        let a = Shared::adopt_with(Box::new(1122), move |p: NonNull<i32>| {
            m.fetch_add(1, Ordering::Relaxed);
            drop(unsafe { Box::from_raw(p.as_ptr()) });
        });
        let b = a.clone();
        drop(a);
        assert_eq!(n.load(Ordering::Relaxed), 0);
        drop(b);
        assert_eq!(n.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn slice_destruction_is_element_wise() {
        let n = Rc::new(Cell::new(0));
        let a = Shared::adopt_slice(vec![
            DropCounter(n.clone()),
            DropCounter(n.clone()),
            DropCounter(n.clone()),
            DropCounter(n.clone()),
        ]);
        let b = a.clone();
        assert_eq!(a.len(), 4);
        drop(a);
        assert_eq!(n.get(), 0);
        drop(b);
        assert_eq!(n.get(), 4);
    }

    #[test]
    fn equality_is_by_value() {
        let a = Shared::adopt(Box::new(3));
        let b = Shared::adopt(Box::new(3));
        assert_eq!(a, b);
        assert!(!Shared::ptr_eq(&a, &b));
        let e1: Shared<i32> = Shared::empty();
        let e2: Shared<i32> = Shared::empty();
        assert_eq!(e1, e2);
        assert!(Shared::ptr_eq(&e1, &e2));
        assert_ne!(a, e1);
    }

    #[test]
    fn debug_formats_value_or_empty() {
        let a = Shared::adopt(Box::new(2));
        assert_eq!(format!("{a:?}"), "2");
        let e: Shared<i32> = Shared::empty();
        assert_eq!(format!("{e:?}"), "(empty)");
        let w = Shared::downgrade(&a);
        assert_eq!(format!("{w:?}"), "(Weak)");
    }
}
