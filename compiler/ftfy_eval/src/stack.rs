//! Stack safety for deeply nested evaluation.
//!
//! The evaluator is a tree of boxed futures; polling the outermost one polls
//! every active level below it on the same native stack. [`GrowStack`] runs
//! each poll under [`ensure_sufficient_stack`] so deep programs grow the
//! stack instead of overflowing it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Ensure sufficient stack space is available before executing `f`.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// A boxed future whose polls are stack-guarded.
pub struct GrowStack<'a, T> {
    inner: Pin<Box<dyn Future<Output = T> + 'a>>,
}

impl<'a, T> GrowStack<'a, T> {
    pub fn new(future: impl Future<Output = T> + 'a) -> Self {
        GrowStack {
            inner: Box::pin(future),
        }
    }
}

impl<T> Future for GrowStack<'_, T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let inner = self.inner.as_mut();
        ensure_sufficient_stack(|| inner.poll(cx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_recursion_does_not_overflow() {
        fn depth(n: u32) -> u32 {
            ensure_sufficient_stack(|| if n == 0 { 0 } else { 1 + depth(n - 1) })
        }
        assert_eq!(depth(200_000), 200_000);
    }
}
