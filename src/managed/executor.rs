use std::fmt;
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread;

use super::selectable::Runnable;

/// A sink for handing work off to other threads.
///
/// This is the consumed "executor" collaborator named in the design: the
/// managed selector layer never decides how tasks are actually scheduled, it
/// only needs a place to hand a produced task to so the loop thread can go
/// back to producing. `execute` returns the task back to the caller when the
/// executor is saturated, so the caller can fall back to running it inline.
pub trait Executor: Send + Sync {
    fn execute(&self, task: Box<dyn Runnable>) -> Result<(), Box<dyn Runnable>>;
}

/// A small fixed-size thread pool behind a bounded queue.
///
/// This is not meant to be a general-purpose thread pool: it exists so the
/// end-to-end tests have a concrete `Executor` to dispatch accepted
/// connections and connect completions through. Submission beyond
/// `queue_capacity` is rejected rather than queued unboundedly, matching the
/// "saturated executor" path the design explicitly plans for.
pub struct ThreadPoolExecutor {
    sender: Option<SyncSender<Box<dyn Runnable>>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl ThreadPoolExecutor {
    pub fn new(num_threads: usize, queue_capacity: usize) -> ThreadPoolExecutor {
        let (sender, receiver) = sync_channel::<Box<dyn Runnable>>(queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..num_threads)
            .map(|idx| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("managed-selector-worker-{idx}"))
                    .spawn(move || loop {
                        let task = receiver.lock().unwrap().recv();
                        match task {
                            Ok(task) => task.run(),
                            Err(_) => return,
                        }
                    })
                    .expect("failed to spawn managed selector worker thread")
            })
            .collect();

        ThreadPoolExecutor {
            sender: Some(sender),
            workers,
        }
    }
}

impl Executor for ThreadPoolExecutor {
    fn execute(&self, task: Box<dyn Runnable>) -> Result<(), Box<dyn Runnable>> {
        let Some(sender) = self.sender.as_ref() else {
            return Err(task);
        };
        match sender.try_send(task) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(task)) | Err(TrySendError::Disconnected(task)) => Err(task),
        }
    }
}

impl fmt::Debug for ThreadPoolExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPoolExecutor")
            .field("workers", &self.workers.len())
            .finish()
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        // Close the channel first so worker threads fall out of `recv`.
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
