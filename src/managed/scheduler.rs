use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// A handle that can cancel a task scheduled with [`Scheduler::schedule`].
pub trait Cancellable: Send {
    /// Returns `true` if the task was still pending and has been removed,
    /// `false` if it already ran (or is running right now).
    fn cancel(&self) -> bool;
}

/// A place to schedule a delayed, cancellable closure.
///
/// This is the consumed "scheduler" collaborator the `Connect`-with-timeout
/// path relies on: a `Connect` update arms a timeout task here when it
/// registers the channel, and cancels it on completion.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, task: Box<dyn FnOnce() + Send>, delay: Duration) -> Box<dyn Cancellable>;
}

struct Inner {
    heap: BinaryHeap<Reverse<(Instant, u64)>>,
    tasks: HashMap<u64, Box<dyn FnOnce() + Send>>,
    next_id: u64,
    shutdown: bool,
}

/// A single background thread driving a min-heap of deadlines.
///
/// Cancellation is lazy: a cancelled id is simply removed from `tasks`, so
/// when its heap entry is eventually popped there is nothing left to run.
pub struct TimerScheduler {
    shared: Arc<(Mutex<Inner>, Condvar)>,
    thread: Option<thread::JoinHandle<()>>,
}

impl TimerScheduler {
    pub fn new() -> TimerScheduler {
        let shared = Arc::new((
            Mutex::new(Inner {
                heap: BinaryHeap::new(),
                tasks: HashMap::new(),
                next_id: 0,
                shutdown: false,
            }),
            Condvar::new(),
        ));

        let worker_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("managed-selector-scheduler".to_string())
            .spawn(move || run(worker_shared))
            .expect("failed to spawn managed selector scheduler thread");

        TimerScheduler {
            shared,
            thread: Some(thread),
        }
    }
}

impl Default for TimerScheduler {
    fn default() -> TimerScheduler {
        TimerScheduler::new()
    }
}

fn run(shared: Arc<(Mutex<Inner>, Condvar)>) {
    let (lock, cv) = &*shared;
    let mut guard = lock.lock().unwrap();
    loop {
        if guard.shutdown {
            return;
        }
        match guard.heap.peek().copied() {
            None => {
                guard = cv.wait(guard).unwrap();
            }
            Some(Reverse((deadline, id))) => {
                let now = Instant::now();
                if deadline <= now {
                    guard.heap.pop();
                    let task = guard.tasks.remove(&id);
                    if let Some(task) = task {
                        drop(guard);
                        task();
                        guard = lock.lock().unwrap();
                    }
                } else {
                    let (g, _) = cv.wait_timeout(guard, deadline - now).unwrap();
                    guard = g;
                }
            }
        }
    }
}

impl Scheduler for TimerScheduler {
    fn schedule(&self, task: Box<dyn FnOnce() + Send>, delay: Duration) -> Box<dyn Cancellable> {
        let (lock, cv) = &*self.shared;
        let id = {
            let mut guard = lock.lock().unwrap();
            let id = guard.next_id;
            guard.next_id += 1;
            guard.heap.push(Reverse((Instant::now() + delay, id)));
            guard.tasks.insert(id, task);
            id
        };
        cv.notify_all();
        Box::new(ScheduledTask {
            shared: Arc::clone(&self.shared),
            id,
        })
    }
}

impl fmt::Debug for TimerScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerScheduler").finish()
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        {
            let (lock, cv) = &*self.shared;
            lock.lock().unwrap().shutdown = true;
            cv.notify_all();
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct ScheduledTask {
    shared: Arc<(Mutex<Inner>, Condvar)>,
    id: u64,
}

impl Cancellable for ScheduledTask {
    fn cancel(&self) -> bool {
        let (lock, cv) = &*self.shared;
        let removed = lock.lock().unwrap().tasks.remove(&self.id).is_some();
        cv.notify_all();
        removed
    }
}
