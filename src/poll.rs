use crate::{event, sys, Interest, Token};

use std::io;
#[cfg(unix)]
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::{fmt, usize};

use crate::event::Events;

/// Polls for readiness events on all registered values.
///
/// `Poll` allows a program to monitor a large number of [`event::Source`]s,
/// waiting until one or more become ready for some class of operation; e.g.
/// reading or writing. A type is considered ready if a corresponding
/// operation can be performed without blocking.
///
/// To use `Poll`, an [`event::Source`] must first be registered with the
/// `Poll` instance using the [`register`] method on its associated
/// [`Registry`], supplying readiness interest. The readiness interest tells
/// `Poll` which specific operations on the handle to monitor for readiness.
/// A [`Token`] is also passed to the [`register`] function. When `Poll`
/// returns a readiness event, it will include this token, associating the
/// event with the handle that generated it.
///
/// [`register`]: Registry::register
pub struct Poll {
    registry: Registry,
}

/// Registers I/O resources.
#[derive(Clone)]
pub struct Registry {
    selector: Arc<sys::Selector>,
}

impl Poll {
    /// Return a new `Poll` handle.
    ///
    /// This function will make a syscall to the operating system to create
    /// the system selector. If this syscall fails, `Poll::new` returns with
    /// the error.
    pub fn new() -> io::Result<Poll> {
        is_send::<Poll>();
        is_sync::<Poll>();

        sys::Selector::new().map(|selector| Poll {
            registry: Registry {
                selector: Arc::new(selector),
            },
        })
    }

    /// Return a reference to the associated [`Registry`].
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Wait for readiness events.
    ///
    /// Blocks the current thread and waits for readiness events for any of
    /// the [`event::Source`]s that have been registered with this `Poll`
    /// instance. The function blocks until either at least one readiness
    /// event has been received or `timeout` has elapsed. A `timeout` of
    /// `None` means that `poll` blocks until a readiness event is received.
    ///
    /// The supplied `events` will be cleared and newly received readiness
    /// events pushed onto the end. At most `events.capacity()` events will
    /// be returned; further pending events are returned on the next call.
    pub fn poll(&mut self, events: &mut Events, timeout: Option<Duration>) -> io::Result<()> {
        self.poll2(events, timeout, false)
    }

    /// Like [`poll`](Poll::poll), but retries indefinitely when interrupted
    /// by a signal rather than returning `ErrorKind::Interrupted`.
    pub fn poll_interruptible(
        &mut self,
        events: &mut Events,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        self.poll2(events, timeout, true)
    }

    fn poll2(
        &mut self,
        events: &mut Events,
        mut timeout: Option<Duration>,
        interruptible: bool,
    ) -> io::Result<()> {
        loop {
            let now = Instant::now();
            match self.registry.selector.select(events.sys(), timeout) {
                Ok(()) => return Ok(()),
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted && !interruptible => {
                    if let Some(to) = timeout {
                        let elapsed = now.elapsed();
                        if elapsed >= to {
                            return Ok(());
                        }
                        timeout = Some(to - elapsed);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl fmt::Debug for Poll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poll").finish()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").finish()
    }
}

#[cfg(unix)]
impl AsRawFd for Poll {
    fn as_raw_fd(&self) -> RawFd {
        self.registry.selector.as_raw_fd()
    }
}

impl Registry {
    /// Register an [`event::Source`] with the `Poll` instance.
    ///
    /// Once registered, the `Poll` instance will monitor the source for
    /// readiness state changes. When it notices a state change, it returns
    /// a readiness event for the source the next time [`Poll::poll`] is
    /// called.
    ///
    /// `token` cannot be `Token(usize::MAX)` as it is reserved for internal
    /// usage.
    pub fn register<S>(&self, source: &mut S, token: Token, interests: Interest) -> io::Result<()>
    where
        S: event::Source + ?Sized,
    {
        source.register(self, token, interests)
    }

    /// Re-register an [`event::Source`] with the `Poll` instance.
    ///
    /// Re-registering allows changing the details of a registration,
    /// including the associated `token` and `interests`. The new values
    /// fully override the previous ones.
    pub fn reregister<S>(
        &self,
        source: &mut S,
        token: Token,
        interests: Interest,
    ) -> io::Result<()>
    where
        S: event::Source + ?Sized,
    {
        source.reregister(self, token, interests)
    }

    /// Deregister an [`event::Source`] with the `Poll` instance.
    ///
    /// When a source is deregistered, the `Poll` instance will no longer
    /// monitor it for readiness state changes.
    pub fn deregister<S>(&self, source: &mut S) -> io::Result<()>
    where
        S: event::Source + ?Sized,
    {
        source.deregister(self)
    }

    /// Creates a new independent `Registry` referring to the same selector.
    pub fn try_clone(&self) -> io::Result<Registry> {
        self.selector
            .try_clone()
            .map(|selector| Registry {
                selector: Arc::new(selector),
            })
    }
}

#[cfg(unix)]
impl AsRawFd for Registry {
    fn as_raw_fd(&self) -> RawFd {
        self.selector.as_raw_fd()
    }
}

// ===== Accessors for internal usage =====

pub(crate) fn selector(registry: &Registry) -> &sys::Selector {
    &registry.selector
}

fn is_send<T: Send>() {}
fn is_sync<T: Sync>() {}
