//! Scope chain for variable bindings.
//!
//! Frames are shared, reference-counted and mutable. A closure holds a
//! handle to the frame it was created in, so later writes to an outer
//! variable are visible inside it. `var`, `let` and `const` all bind in the
//! innermost frame; blocks do not open a new one.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::value::Value;

/// Error returned by [`Scope::assign`] when no frame binds the name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Unbound;

/// A single-threaded shared handle with interior mutability.
///
/// All frame allocations go through [`LocalScope::new`]. The handle is not
/// `Send`; frames never leave the thread that runs interpreted code.
#[repr(transparent)]
pub struct LocalScope<T>(Rc<RefCell<T>>);

impl<T> LocalScope<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        LocalScope(Rc::new(RefCell::new(value)))
    }

    /// Whether two handles refer to the same frame.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for LocalScope<T> {
    #[inline]
    fn clone(&self) -> Self {
        LocalScope(Rc::clone(&self.0))
    }
}

impl<T> fmt::Debug for LocalScope<T> {
    // Frames can reach themselves through closures; print the handle only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalScope")
            .field(&Rc::as_ptr(&self.0))
            .finish()
    }
}

impl<T: Default> Default for LocalScope<T> {
    fn default() -> Self {
        LocalScope::new(T::default())
    }
}

impl<T> Deref for LocalScope<T> {
    type Target = RefCell<T>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// One frame: local bindings plus the enclosing frame.
#[derive(Default)]
pub struct Scope {
    bindings: FxHashMap<Rc<str>, Value>,
    parent: Option<LocalScope<Scope>>,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    pub fn with_parent(parent: LocalScope<Scope>) -> Self {
        Scope {
            bindings: FxHashMap::default(),
            parent: Some(parent),
        }
    }

    /// Bind `name` in this frame, replacing any existing binding here.
    #[inline]
    pub fn define(&mut self, name: Rc<str>, value: Value) {
        self.bindings.insert(name, value);
    }

    /// Innermost binding of `name`.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref()?.borrow().lookup(name)
    }

    /// Overwrite the innermost binding of `name`.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), Unbound> {
        if let Some(slot) = self.bindings.get_mut(name) {
            *slot = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.borrow_mut().assign(name, value),
            None => Err(Unbound),
        }
    }

    /// Whether this frame (ignoring parents) binds `name`.
    pub fn has_local(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Drop every binding in this frame. Used to break reference cycles
    /// between frames and the closures stored in them once a run ends.
    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}

/// Evaluation context: the current frame, the active `this` and the call
/// depth. Passed explicitly to every evaluation step.
#[derive(Clone)]
pub struct Env {
    pub scope: LocalScope<Scope>,
    pub this: Value,
    pub depth: usize,
}

impl Env {
    pub fn new(scope: LocalScope<Scope>, this: Value) -> Self {
        Env {
            scope,
            this,
            depth: 0,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.scope.borrow().lookup(name)
    }

    pub fn define(&self, name: Rc<str>, value: Value) {
        self.scope.borrow_mut().define(name, value);
    }

    pub fn assign(&self, name: &str, value: Value) -> Result<(), Unbound> {
        self.scope.borrow_mut().assign(name, value)
    }

    /// Environment for a call: a fresh frame under `captured`.
    #[must_use]
    pub fn call_frame(&self, captured: &LocalScope<Scope>, this: Value) -> Self {
        Env {
            scope: LocalScope::new(Scope::with_parent(captured.clone())),
            this,
            depth: self.depth + 1,
        }
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("scope", &self.scope)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}
