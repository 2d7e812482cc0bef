//! Bounded concurrent task queue.
//!
//! Work items are futures that either succeed or fail with one error. The
//! queue runs at most `max_workers` of them at a time, accepts new work
//! while running (including appends made from inside a task), records the
//! first failure and drops everything still pending after it, and fires a
//! one-shot signal when the last worker drains the queue.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

type Task = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

#[derive(Default)]
struct State {
    workers: usize,
    tasks: VecDeque<Task>,
    waiter: Option<oneshot::Sender<()>>,
    last_error: Option<anyhow::Error>,
}

/// Bounded pool of concurrently running tasks.
pub struct TaskQueue {
    max_workers: usize,
    state: Mutex<State>,
}

impl TaskQueue {
    /// Build a queue running up to `worker_limit` tasks at a time.
    ///
    /// A limit of zero selects the default of twice the CPU count.
    pub fn new(worker_limit: usize) -> Arc<Self> {
        let max_workers = if worker_limit == 0 {
            num_cpus::get() * 2
        } else {
            worker_limit
        };

        Arc::new(Self {
            max_workers,
            state: Mutex::new(State::default()),
        })
    }

    /// Add work to the queue.
    ///
    /// Dispatches a new worker when under the limit, otherwise the task
    /// waits in FIFO order. Safe to call from inside a running task.
    pub fn append<F>(self: &Arc<Self>, task: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let task: Task = Box::pin(task);
        {
            let mut state = self.state.lock().unwrap();
            if state.workers == self.max_workers {
                state.tasks.push_back(task);
                return;
            }
            state.workers += 1;
        }

        let queue = Arc::clone(self);
        tokio::spawn(queue.work(task));
    }

    /// A one-shot signal that fires when the queue drains.
    ///
    /// Fires immediately when no workers are running. Only one waiter is
    /// supported at a time; a new call replaces the previous signal.
    pub fn wait(&self) -> oneshot::Receiver<()> {
        let mut state = self.state.lock().unwrap();
        let (tx, rx) = oneshot::channel();

        if state.workers == 0 {
            let _ = tx.send(());
        } else {
            state.waiter = Some(tx);
        }

        rx
    }

    /// Record a failure and discard all pending tasks.
    ///
    /// Only the first error is kept; later calls are no-ops. Tasks already
    /// running are not interrupted.
    pub fn abort(&self, err: anyhow::Error) {
        let mut state = self.state.lock().unwrap();
        if state.last_error.is_some() {
            return;
        }
        state.last_error = Some(err);
        state.tasks.clear();
    }

    /// Take the first recorded error, if any task failed.
    pub fn take_error(&self) -> Option<anyhow::Error> {
        self.state.lock().unwrap().last_error.take()
    }

    /// Worker loop: run the assigned task, then keep pulling from the
    /// pending list until it is empty.
    async fn work(self: Arc<Self>, mut task: Task) {
        loop {
            if let Err(err) = task.await {
                self.abort(err);
            }

            let mut state = self.state.lock().unwrap();
            match state.tasks.pop_front() {
                Some(next) => task = next,
                None => {
                    state.workers -= 1;
                    if state.workers == 0 {
                        if let Some(waiter) = state.waiter.take() {
                            let _ = waiter.send(());
                        }
                    }
                    return;
                }
            }
        }
    }
}
