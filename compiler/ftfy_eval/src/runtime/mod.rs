//! Single-consumer task runtime.
//!
//! Interpreted code runs as tasks: boxed futures polled one at a time by
//! [`Runtime::run`]. A task that has to wait (a timer, a file read) hands
//! its waker to a background worker and returns `Pending`; the worker does
//! the blocking part and wakes the task, which appends its id to the queue.
//! Workers never touch interpreter state. The only thing they share with
//! the consumer is the queue and the result slot they fill.
//!
//! A run ends when the queue is empty and no worker is still alive.

mod work;

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::errors::EvalError;
use crate::value::Value;

pub use work::{Deferred, Slot, Work};

/// Identifies a task for the lifetime of a run.
pub type TaskId = u64;

/// A unit of schedulable work.
pub type Task = Pin<Box<dyn Future<Output = Result<Value, EvalError>>>>;

/// How long the consumer waits on an empty queue before re-checking
/// whether any worker is still alive.
const IDLE_POLL: Duration = Duration::from_millis(5);

/// Name given to background worker threads.
const WORKER_NAME: &str = "ftfy-worker";

/// Handle to the task queue. Cloning shares it.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<Inner>,
}

struct Inner {
    tasks: RefCell<FxHashMap<TaskId, Task>>,
    next_id: Cell<TaskId>,
    queue: Sender<TaskId>,
    ready: Receiver<TaskId>,
    workers: RefCell<Vec<JoinHandle<()>>>,
}

/// Wakes a task by queueing its id.
struct TaskWaker {
    id: TaskId,
    queue: Sender<TaskId>,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        // The receiver is gone only after the run has ended.
        let _ = self.queue.send(self.id);
    }
}

impl Runtime {
    pub fn new() -> Self {
        let (queue, ready) = channel::unbounded();
        Runtime {
            inner: Rc::new(Inner {
                tasks: RefCell::new(FxHashMap::default()),
                next_id: Cell::new(0),
                queue,
                ready,
                workers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Add a task and queue it to run.
    pub fn spawn(&self, task: impl Future<Output = Result<Value, EvalError>> + 'static) -> TaskId {
        let id = self.insert(Box::pin(task));
        // The runtime owns the receiver, so the channel is open.
        let _ = self.inner.queue.send(id);
        debug!(task = id, "task spawned");
        id
    }

    /// Add a task without queueing it. It first runs when something wakes
    /// it through [`Runtime::waker`].
    pub fn spawn_parked(
        &self,
        task: impl Future<Output = Result<Value, EvalError>> + 'static,
    ) -> TaskId {
        let id = self.insert(Box::pin(task));
        debug!(task = id, "task parked");
        id
    }

    /// Run `work`, then run `continuation` with its result as a new task.
    ///
    /// The work starts now; the continuation is parked until it finishes.
    pub fn spawn_after<T, F, Fut>(&self, work: Work<T>, continuation: F) -> io::Result<TaskId>
    where
        T: Send + 'static,
        F: FnOnce(T) -> Fut + 'static,
        Fut: Future<Output = Result<Value, EvalError>> + 'static,
    {
        let slot = Slot::default();
        let filled = Arc::clone(&slot);
        let id = self.spawn_parked(async move {
            let output = filled.lock().take();
            match output {
                Some(output) => continuation(output).await,
                None => Ok(Value::Null),
            }
        });
        if let Err(err) = self.dispatch(work, slot, self.waker(id)) {
            self.inner.tasks.borrow_mut().remove(&id);
            return Err(err);
        }
        Ok(id)
    }

    /// A waker that queues task `id`.
    pub fn waker(&self, id: TaskId) -> Waker {
        Waker::from(Arc::new(TaskWaker {
            id,
            queue: self.inner.queue.clone(),
        }))
    }

    /// Start `work`, filling `slot` and waking `waker` when it is done.
    ///
    /// Immediate work completes before this returns; background work gets
    /// its own worker thread.
    pub fn dispatch<T: Send + 'static>(
        &self,
        work: Work<T>,
        slot: Slot<T>,
        waker: Waker,
    ) -> io::Result<()> {
        match work {
            Work::Immediate(output) => {
                *slot.lock() = Some(output);
                waker.wake();
            }
            Work::Background(job) => {
                let handle = thread::Builder::new()
                    .name(WORKER_NAME.to_string())
                    .spawn(move || {
                        let output = job();
                        *slot.lock() = Some(output);
                        waker.wake();
                    })?;
                self.inner.workers.borrow_mut().push(handle);
                debug!(workers = self.live_workers(), "worker spawned");
            }
        }
        Ok(())
    }

    /// Drive `main` and every task it spawns until nothing is left to do.
    ///
    /// Returns the completion value of `main`. The first task to fail aborts
    /// the run; workers still sleeping are left to finish on their own.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(
        &self,
        main: impl Future<Output = Result<Value, EvalError>> + 'static,
    ) -> Result<Value, EvalError> {
        let main_id = self.spawn(main);
        let mut completion = Value::Null;
        let outcome = loop {
            let Some(id) = self.next_ready() else {
                debug!("queue drained");
                break Ok(());
            };
            let Some(mut task) = self.inner.tasks.borrow_mut().remove(&id) else {
                continue;
            };
            debug!(task = id, "task resumed");
            let waker = self.waker(id);
            let mut cx = Context::from_waker(&waker);
            match task.as_mut().poll(&mut cx) {
                Poll::Ready(Ok(value)) => {
                    debug!(task = id, "task completed");
                    if id == main_id {
                        completion = value;
                    }
                }
                Poll::Ready(Err(err)) => {
                    debug!(task = id, error = %err, "task failed");
                    break Err(err);
                }
                Poll::Pending => {
                    debug!(task = id, "task suspended");
                    self.inner.tasks.borrow_mut().insert(id, task);
                }
            }
        };
        self.shutdown();
        outcome.map(|()| completion)
    }

    /// Next task id to run, waiting while workers are alive. `None` once the
    /// queue is empty and every worker has finished.
    fn next_ready(&self) -> Option<TaskId> {
        loop {
            self.prune_workers();
            match self.inner.ready.try_recv() {
                Ok(id) => return Some(id),
                Err(TryRecvError::Disconnected) => return None,
                Err(TryRecvError::Empty) => {}
            }
            if self.live_workers() == 0 {
                return None;
            }
            match self.inner.ready.recv_timeout(IDLE_POLL) {
                Ok(id) => return Some(id),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn prune_workers(&self) {
        self.inner
            .workers
            .borrow_mut()
            .retain(|handle| !handle.is_finished());
    }

    fn live_workers(&self) -> usize {
        self.inner.workers.borrow().len()
    }

    fn insert(&self, task: Task) -> TaskId {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.tasks.borrow_mut().insert(id, task);
        id
    }

    /// Drop every remaining task. Tasks hold interpreter handles that point
    /// back at the runtime; dropping them releases those cycles.
    fn shutdown(&self) {
        let remaining = std::mem::take(&mut *self.inner.tasks.borrow_mut());
        if !remaining.is_empty() {
            debug!(tasks = remaining.len(), "dropping unfinished tasks");
        }
        drop(remaining);
        while self.inner.ready.try_recv().is_ok() {}
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
