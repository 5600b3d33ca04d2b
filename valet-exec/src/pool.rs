//! Fixed-size worker pool: threads plus a mutex-guarded queue and two
//! condition variables — one for "work is available", one for "quiescent".
//!
//! This is the one component that intentionally does not use an async
//! runtime: compiling and linking is synchronous, bounded-parallel work by
//! nature, not something an async executor buys us anything for.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use tracing::trace;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    tasks: Mutex<VecDeque<Job>>,
    tasks_cond: Condvar,
    wait_mutex: Mutex<()>,
    wait_cond: Condvar,
    task_count: AtomicUsize,
    running: AtomicBool,
}

/// A bounded pool of worker threads draining a shared task queue.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let shared = Arc::new(Shared {
            tasks: Mutex::new(VecDeque::new()),
            tasks_cond: Condvar::new(),
            wait_mutex: Mutex::new(()),
            wait_cond: Condvar::new(),
            task_count: AtomicUsize::new(0),
            running: AtomicBool::new(true),
        });

        let workers = (0..num_threads)
            .map(|id| {
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("valet-worker-{id}"))
                    .spawn(move || worker_loop(shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self { shared, workers }
    }

    /// Enqueue `task`. Returns `false` (without running it) if the pool has
    /// already been stopped.
    pub fn enqueue<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.shared.running.load(Ordering::Acquire) {
            return false;
        }
        self.shared.task_count.fetch_add(1, Ordering::SeqCst);
        {
            let mut queue = self.shared.tasks.lock().unwrap();
            queue.push_back(Box::new(task));
        }
        self.shared.tasks_cond.notify_one();
        true
    }

    /// Block until every enqueued task (including ones enqueued from
    /// within another task) has run to completion.
    pub fn wait(&self) {
        let guard = self.shared.wait_mutex.lock().unwrap();
        let _guard = self
            .shared
            .wait_cond
            .wait_while(guard, |_| self.shared.task_count.load(Ordering::SeqCst) != 0)
            .unwrap();
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut queue = shared.tasks.lock().unwrap();
            loop {
                if let Some(task) = queue.pop_front() {
                    break Some(task);
                }
                if !shared.running.load(Ordering::Acquire) {
                    break None;
                }
                queue = shared.tasks_cond.wait(queue).unwrap();
            }
        };
        let Some(task) = task else {
            trace!("worker exiting");
            return;
        };
        task();
        if shared.task_count.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _guard = shared.wait_mutex.lock().unwrap();
            shared.wait_cond.notify_all();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.wait();
        self.shared.running.store(false, Ordering::Release);
        self.shared.tasks_cond.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    #[test]
    fn runs_every_enqueued_task_exactly_once() {
        let pool = WorkerPool::new(4);
        let counter = Arc::new(StdAtomicUsize::new(0));
        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            pool.enqueue(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn wait_is_safe_to_call_with_no_pending_work() {
        let pool = WorkerPool::new(2);
        pool.wait();
        pool.wait();
    }

    #[test]
    fn worker_count_is_at_least_one_even_if_zero_requested() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.worker_count(), 1);
    }

    #[test]
    fn tasks_enqueued_from_within_a_task_are_waited_on() {
        let pool = Arc::new(WorkerPool::new(2));
        let counter = Arc::new(StdAtomicUsize::new(0));
        let pool_clone = Arc::clone(&pool);
        let counter_clone = Arc::clone(&counter);
        pool.enqueue(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            let counter_inner = Arc::clone(&counter_clone);
            pool_clone.enqueue(move || {
                counter_inner.fetch_add(1, Ordering::SeqCst);
            });
        });
        pool.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
