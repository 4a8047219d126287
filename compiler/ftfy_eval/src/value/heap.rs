//! Shared heap allocation for values.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// Reference-counted storage for heap values.
///
/// The constructor is private to the `value` module, so every allocation
/// goes through a `Value` factory method. Cloning shares the allocation;
/// identity comparisons use [`Heap::ptr_eq`].
#[repr(transparent)]
pub struct Heap<T: ?Sized>(Rc<T>);

impl<T> Heap<T> {
    #[inline]
    pub(super) fn new(value: T) -> Self {
        Heap(Rc::new(value))
    }
}

impl Heap<str> {
    #[inline]
    pub(super) fn from_str(text: &str) -> Self {
        Heap(Rc::from(text))
    }
}

impl<T: ?Sized> Heap<T> {
    /// Whether two handles point at the same allocation.
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Address of the allocation, used as an identity key.
    #[inline]
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl<T: ?Sized> Clone for Heap<T> {
    #[inline]
    fn clone(&self) -> Self {
        Heap(Rc::clone(&self.0))
    }
}

impl<T: ?Sized> Deref for Heap<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
