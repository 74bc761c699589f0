use std::collections::HashSet;
use std::io;
use std::mem;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::net::{TcpListener, TcpStream};
use crate::{Token, Waker};

use super::latch::Latch;
use super::manager::SelectorManager;
use super::selectable::Selectable;

/// A deferred mutation of the selector's registration set.
///
/// Every change to what a `ManagedSelector` is watching — registering a
/// freshly accepted or connected channel, arming a listener, tearing
/// everything down — goes through this instead of touching the selector
/// handle directly, so the handle is only ever touched from the loop thread.
pub(crate) enum Update<M: SelectorManager> {
    /// Register a listening channel for `OP_ACCEPT`-equivalent readiness.
    Acceptor(TcpListener),
    /// Register an already-accepted channel, to be wrapped as an endpoint.
    Accept(TcpStream),
    /// Register a non-blocking connect in progress, with a timeout.
    Connect {
        stream: TcpStream,
        attachment: M::Attachment,
        timeout: Duration,
    },
    /// A scheduled connect timeout fired; check whether it's still pending.
    ConnectTimeout { token: Token },
    /// An endpoint finished construction off the producer thread; attach it
    /// to its reserved token now that we're back on the producer thread.
    Attach {
        token: Token,
        endpoint: Arc<dyn Selectable>,
    },
    /// Close every open connection, then release `done`.
    CloseConnections {
        already_closed: Option<Arc<Mutex<HashSet<Token>>>>,
        done: Arc<Latch>,
    },
    /// Stop the producer loop for good, then release `done`.
    StopSelector { done: Arc<Latch> },
    /// Append a human-readable summary of every registered key into `sink`,
    /// then release `done`.
    DumpKeys {
        sink: Arc<Mutex<Vec<String>>>,
        done: Arc<Latch>,
    },
}

/// The capability `UpdateQueue` needs from a selector handle: the ability to
/// be woken from another thread. Implemented by the real [`Waker`] and, in
/// tests, by a counting fake so the coalescing property can be asserted
/// directly instead of inferred from `epoll` behavior.
pub(crate) trait WakeUp: Send + Sync {
    fn wake_up(&self) -> io::Result<()>;
}

impl WakeUp for Waker {
    fn wake_up(&self) -> io::Result<()> {
        self.wake()
    }
}

impl<T: WakeUp + ?Sized> WakeUp for Arc<T> {
    fn wake_up(&self) -> io::Result<()> {
        (**self).wake_up()
    }
}

struct Inner<M: SelectorManager> {
    active: Vec<Update<M>>,
    selecting: bool,
}

/// The coalescing queue updates are submitted through.
///
/// `submit` only calls `wakeup()` on the selector handle when the loop
/// thread is actually blocked in `select()` (`selecting == true`); callers
/// racing to submit while the loop thread is still busy draining earlier
/// updates share a single wakeup.
pub(crate) struct UpdateQueue<M: SelectorManager> {
    inner: Mutex<Inner<M>>,
}

impl<M: SelectorManager> UpdateQueue<M> {
    pub(crate) fn new() -> UpdateQueue<M> {
        UpdateQueue {
            inner: Mutex::new(Inner {
                active: Vec::new(),
                selecting: false,
            }),
        }
    }

    /// Submit an update, waking the selector if (and only if) it is
    /// currently blocked waiting for readiness events.
    pub(crate) fn submit(&self, update: Update<M>, waker: &dyn WakeUp) -> io::Result<()> {
        let needs_wakeup = {
            let mut inner = self.inner.lock().unwrap();
            inner.active.push(update);
            if inner.selecting {
                inner.selecting = false;
                true
            } else {
                false
            }
        };
        if needs_wakeup {
            waker.wake_up()?;
        }
        Ok(())
    }

    /// Take every update submitted since the last drain, in FIFO order.
    pub(crate) fn drain(&self) -> Vec<Update<M>> {
        mem::take(&mut self.inner.lock().unwrap().active)
    }

    /// Called right before the loop thread is about to block in `select()`.
    ///
    /// Returns `true` if it is safe to block: no update arrived between the
    /// last `drain()` and now. Returns `false` if one did, in which case the
    /// caller must issue a self-wakeup instead of relying on `select()`
    /// blocking to ever return.
    pub(crate) fn prepare_to_wait(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.active.is_empty() {
            inner.selecting = true;
            true
        } else {
            false
        }
    }

    /// Called right after `select()` returns, before processing events.
    pub(crate) fn clear_selecting(&self) {
        self.inner.lock().unwrap().selecting = false;
    }

    /// Non-consuming check used when a producer thread is giving up
    /// production duty, to catch a submit that raced the handoff.
    pub(crate) fn has_pending(&self) -> bool {
        !self.inner.lock().unwrap().active.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn is_selecting(&self) -> bool {
        self.inner.lock().unwrap().selecting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managed::tests::NullManager;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// A counting fake selector handle: records how many times `wake_up` was
    /// actually called instead of inferring it from `epoll`/eventfd behavior.
    #[derive(Default)]
    struct CountingWake {
        calls: AtomicUsize,
    }

    impl WakeUp for CountingWake {
        fn wake_up(&self) -> io::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn dummy_listener() -> TcpListener {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        TcpListener::bind(addr).unwrap()
    }

    #[test]
    fn submit_wakes_only_when_selecting() {
        let queue: UpdateQueue<NullManager> = UpdateQueue::new();
        let waker = CountingWake::default();

        // Not selecting yet: submit must not need a wakeup.
        assert!(!queue.is_selecting());
        queue.submit(Update::Acceptor(dummy_listener()), &waker).unwrap();
        assert_eq!(queue.drain().len(), 1);
        assert_eq!(waker.calls.load(Ordering::SeqCst), 0);

        // Now simulate the loop thread about to block.
        assert!(queue.prepare_to_wait());
        assert!(queue.is_selecting());

        // A concurrent submit must clear `selecting` and trigger a wakeup.
        queue.submit(Update::Acceptor(dummy_listener()), &waker).unwrap();
        assert!(!queue.is_selecting());
        assert_eq!(waker.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn prepare_to_wait_detects_pending_work() {
        let queue: UpdateQueue<NullManager> = UpdateQueue::new();
        let waker = CountingWake::default();
        queue.submit(Update::Acceptor(dummy_listener()), &waker).unwrap();
        // Work is already queued: it is not safe to block.
        assert!(!queue.prepare_to_wait());
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.prepare_to_wait());
    }

    /// Testable property #3 / spec scenario E4: with the loop parked in
    /// `prepare_to_wait`, 100 updates submitted concurrently from 10 threads
    /// must coalesce to at most one real wakeup, and every update must still
    /// land in the drain.
    #[test]
    fn concurrent_submits_coalesce_to_at_most_one_wakeup() {
        let queue = Arc::new(UpdateQueue::<NullManager>::new());
        let waker = Arc::new(CountingWake::default());
        assert!(queue.prepare_to_wait());

        let threads: Vec<_> = (0..10)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let waker = Arc::clone(&waker);
                thread::spawn(move || {
                    for _ in 0..10 {
                        queue.submit(Update::Acceptor(dummy_listener()), waker.as_ref()).unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert!(waker.calls.load(Ordering::SeqCst) <= 1);
        assert_eq!(queue.drain().len(), 100);
    }
}
