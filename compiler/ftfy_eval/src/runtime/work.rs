//! Blocking work handed to workers, and the futures that wait for it.

use std::fs;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::Runtime;
use crate::errors::{native_failure, EvalError};

/// Where a worker leaves its result for the consumer.
pub type Slot<T> = Arc<Mutex<Option<T>>>;

type BoxedJob<T> = Box<dyn FnOnce() -> T + Send + 'static>;

/// Work a task may wait for.
pub enum Work<T> {
    /// Already done; the waiting task is queued straight away.
    Immediate(T),
    /// Runs on a worker thread.
    Background(BoxedJob<T>),
}

impl Work<()> {
    /// Wait out `delay`. A zero delay needs no worker.
    pub fn sleep(delay: Duration) -> Self {
        if delay.is_zero() {
            Work::Immediate(())
        } else {
            Work::Background(Box::new(move || thread::sleep(delay)))
        }
    }
}

impl Work<io::Result<String>> {
    pub fn read_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Work::Background(Box::new(move || fs::read_to_string(path)))
    }
}

/// Future that starts `work` on first poll and resolves with its output.
///
/// The first poll always returns `Pending`, even for immediate work, so the
/// awaiting task goes to the back of the queue.
pub struct Deferred<T> {
    runtime: Runtime,
    work: Option<Work<T>>,
    slot: Slot<T>,
    native: &'static str,
}

impl<T> Deferred<T> {
    /// `native` names the built-in that is waiting, for error messages.
    pub fn new(runtime: Runtime, work: Work<T>, native: &'static str) -> Self {
        Deferred {
            runtime,
            work: Some(work),
            slot: Slot::default(),
            native,
        }
    }
}

impl<T> Unpin for Deferred<T> {}

impl<T: Send + 'static> Future for Deferred<T> {
    type Output = Result<T, EvalError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(work) = self.work.take() {
            let slot = Arc::clone(&self.slot);
            return match self.runtime.dispatch(work, slot, cx.waker().clone()) {
                Ok(()) => Poll::Pending,
                Err(err) => Poll::Ready(Err(native_failure(
                    self.native,
                    format!("could not start worker: {err}"),
                ))),
            };
        }
        match self.slot.lock().take() {
            Some(output) => Poll::Ready(Ok(output)),
            None => Poll::Pending,
        }
    }
}
