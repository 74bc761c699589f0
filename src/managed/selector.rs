use log::{debug, error, trace, warn};
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::event::Events;
use crate::net::TcpStream;
use crate::{Interest, Poll, Registry, Token, Waker};

use super::config::Config;
use super::executor::Executor;
use super::latch::Latch;
use super::manager::SelectorManager;
use super::scheduler::{Cancellable, Scheduler};
use super::selectable::{Ready, Runnable, Selectable};
use super::update::{Update, UpdateQueue};

/// The token reserved for the internal wakeup fd; never handed out to a
/// registered channel.
const WAKE_TOKEN: Token = Token(usize::MAX);

/// A single managed selector shard: one `Poll` instance, driven by a rotating
/// producer thread under an eat-what-you-kill execution strategy.
///
/// Registrations are never mutated directly. Callers go through [`submit`],
/// [`accept`] and [`connect`], which enqueue an [`Update`] that is applied on
/// whichever thread currently holds producer duty.
///
/// [`submit`]: ManagedSelector::submit
/// [`accept`]: ManagedSelector::accept
/// [`connect`]: ManagedSelector::connect
pub struct ManagedSelector<M: SelectorManager> {
    registry: Registry,
    waker: Arc<Waker>,
    queue: Arc<UpdateQueue<M>>,
    manager: Arc<M>,
    executor: Arc<dyn Executor>,
    scheduler: Arc<dyn Scheduler>,
    config: Config,
    core: Mutex<Core<M>>,
    producing: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    size: Arc<AtomicUsize>,
}

impl<M: SelectorManager> ManagedSelector<M> {
    pub fn new(
        manager: Arc<M>,
        executor: Arc<dyn Executor>,
        scheduler: Arc<dyn Scheduler>,
        config: Config,
    ) -> io::Result<Arc<ManagedSelector<M>>> {
        let poll = Poll::new()?;
        let registry = poll.registry().try_clone()?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN)?);
        let queue = Arc::new(UpdateQueue::new());
        let running = Arc::new(AtomicBool::new(true));
        let size = Arc::new(AtomicUsize::new(0));
        let force_select_now = config.force_select_now;

        let core = Core {
            poll,
            events: Events::with_capacity(256),
            ready: Vec::new(),
            cursor: 0,
            touched: HashSet::new(),
            attachments: HashMap::new(),
            next_token: 0,
            registry: registry.clone(),
            queue: Arc::clone(&queue),
            waker: Arc::clone(&waker),
            manager: Arc::clone(&manager),
            executor: Arc::clone(&executor),
            scheduler: Arc::clone(&scheduler),
            running: Arc::clone(&running),
            size: Arc::clone(&size),
            force_select_now,
        };

        let selector = Arc::new(ManagedSelector {
            registry,
            waker,
            queue,
            manager,
            executor,
            scheduler,
            config,
            core: Mutex::new(core),
            producing: Arc::new(AtomicBool::new(false)),
            running,
            size,
        });

        selector.kickoff();
        Ok(selector)
    }

    /// Spawn the first producer thread. Subsequent production happens on
    /// whichever executor thread the running producer hands off to; no
    /// dedicated thread is kept alive beyond this kickoff.
    fn kickoff(self: &Arc<Self>) {
        let selector = Arc::clone(self);
        thread::Builder::new()
            .name("managed-selector".to_string())
            .spawn(move || selector.try_produce())
            .expect("failed to spawn managed selector producer thread");
    }

    /// Register a listening channel; accepted connections are handed to
    /// [`SelectorManager::new_end_point`] as they arrive.
    ///
    /// Takes `self` through its `Arc` because submitting may need to spawn
    /// this selector back into producer duty (see [`try_produce`]).
    ///
    /// [`try_produce`]: ManagedSelector::try_produce
    pub fn accept_on(self: &Arc<Self>, listener: crate::net::TcpListener) -> Result<(), super::Error> {
        self.submit(Update::Acceptor(listener))
    }

    /// Register an already non-blocking connect in progress, with the
    /// configured `connect_timeout`.
    pub fn connect(self: &Arc<Self>, stream: TcpStream, attachment: M::Attachment) -> Result<(), super::Error> {
        self.submit(Update::Connect {
            stream,
            attachment,
            timeout: self.config.connect_timeout,
        })
    }

    /// Enqueue a raw [`Update`]; mostly for internal use, exposed so tests
    /// can drive the queue directly.
    pub(crate) fn submit(self: &Arc<Self>, update: Update<M>) -> Result<(), super::Error> {
        if !self.running.load(Ordering::Acquire) {
            return Err(super::Error::Closed);
        }
        self.queue.submit(update, &self.waker)?;
        self.try_produce();
        Ok(())
    }

    /// The number of endpoints currently registered with this selector.
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Append a one-line summary of every registered key to a diagnostic
    /// dump.
    pub fn dump(self: &Arc<Self>) -> Vec<String> {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Latch::new());
        if self
            .submit(Update::DumpKeys {
                sink: Arc::clone(&sink),
                done: Arc::clone(&done),
            })
            .is_ok()
        {
            done.await_for(self.config.stop_timeout);
        }
        Arc::try_unwrap(sink)
            .map(|m| m.into_inner().unwrap())
            .unwrap_or_default()
    }

    /// Close every registered connection but keep the loop running.
    pub fn close_connections(self: &Arc<Self>) {
        let done = Arc::new(Latch::new());
        if self
            .submit(Update::CloseConnections {
                already_closed: None,
                done: Arc::clone(&done),
            })
            .is_ok()
        {
            done.await_for(self.config.stop_timeout);
        }
    }

    /// Close every connection and stop the producer loop for good.
    ///
    /// Idempotent: calling this more than once (or concurrently) is safe,
    /// the second caller just observes `running == false` immediately.
    pub fn stop(self: &Arc<Self>) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let closed = Arc::new(Latch::new());
        let _ = self.queue.submit(
            Update::CloseConnections {
                already_closed: None,
                done: Arc::clone(&closed),
            },
            &self.waker,
        );
        closed.await_for(self.config.stop_timeout);

        let stopped = Arc::new(Latch::new());
        let _ = self.queue.submit(
            Update::StopSelector {
                done: Arc::clone(&stopped),
            },
            &self.waker,
        );
        self.try_produce();
        stopped.await_for(self.config.stop_timeout);
    }

    /// CAS into producer duty and run the produce/consume loop until the
    /// selector stops or a handoff succeeds. A no-op if another thread is
    /// already producing.
    fn try_produce(self: &Arc<Self>) {
        if self
            .producing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.run_produce_loop();
    }

    fn run_produce_loop(self: &Arc<Self>) {
        loop {
            let task = {
                let mut core = self.core.lock().unwrap();
                match core.produce() {
                    Ok(Some(task)) => task,
                    Ok(None) => break,
                    Err(err) => {
                        error!("managed selector wait failed: {err}");
                        self.manager.on_select_failed(&err);
                        self.running.store(false, Ordering::Release);
                        break;
                    }
                }
            };

            let handoff: Box<dyn Runnable> = Box::new(ProduceHandoff {
                selector: Arc::clone(self),
            });
            match self.executor.execute(handoff) {
                Ok(()) => {
                    // Another thread now owns producer duty; eat this task
                    // and return.
                    task.run();
                    return;
                }
                Err(_rejected) => {
                    debug!("executor saturated, running produced task inline and continuing to produce");
                    task.run();
                }
            }
        }
        self.producing.store(false, Ordering::Release);

        // Re-check: a submit may have raced the `producing` flip to `false`
        // above and found nobody to wake.
        if self.running.load(Ordering::Acquire) && self.queue.has_pending() {
            self.try_produce();
        }
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// A no-op task whose only purpose is to carry "you are now the producer" to
/// whichever executor thread picks it up.
struct ProduceHandoff<M: SelectorManager> {
    selector: Arc<ManagedSelector<M>>,
}

impl<M: SelectorManager> Runnable for ProduceHandoff<M> {
    fn run(self: Box<Self>) {
        self.selector.run_produce_loop();
    }

    fn close(self: Box<Self>) {
        // Rejected before it could even be queued (shouldn't happen: this is
        // the task we just successfully handed to `execute`), but if it
        // does, release producer duty so someone else can pick it back up.
        self.selector.producing.store(false, Ordering::Release);
    }
}

enum Attachment<M: SelectorManager> {
    Selectable(Arc<dyn Selectable>),
    Connect(Arc<ConnectState<M>>),
}

struct ConnectState<M: SelectorManager> {
    stream: Mutex<Option<TcpStream>>,
    attachment: Mutex<Option<M::Attachment>>,
    timeout_task: Mutex<Option<Box<dyn Cancellable>>>,
    timeout: Duration,
}

enum ReadyAttachment<M: SelectorManager> {
    Endpoint(Arc<dyn Selectable>),
    Connect(Arc<ConnectState<M>>),
}

#[derive(Copy, Clone)]
struct ReadySummary {
    token: Token,
    readable: bool,
    writable: bool,
    error: bool,
}

/// Everything touched only by whichever thread currently holds producer
/// duty: the `Poll` handle, the registration table, and the cursor into the
/// current batch of ready keys.
struct Core<M: SelectorManager> {
    poll: Poll,
    events: Events,
    ready: Vec<ReadySummary>,
    cursor: usize,
    touched: HashSet<Token>,
    attachments: HashMap<Token, Attachment<M>>,
    next_token: usize,
    registry: Registry,
    queue: Arc<UpdateQueue<M>>,
    waker: Arc<Waker>,
    manager: Arc<M>,
    executor: Arc<dyn Executor>,
    scheduler: Arc<dyn Scheduler>,
    running: Arc<AtomicBool>,
    size: Arc<AtomicUsize>,
    force_select_now: bool,
}

impl<M: SelectorManager> Core<M> {
    /// The three-phase produce loop: process whatever is left of the
    /// current ready batch, apply queued updates, then (if nothing
    /// produced a task) block in `select()` and loop back.
    fn produce(&mut self) -> io::Result<Option<Box<dyn Runnable>>> {
        loop {
            if let Some(task) = self.process_selected_keys()? {
                return Ok(Some(task));
            }
            self.process_updates();
            if !self.select_once()? {
                return Ok(None);
            }
        }
    }

    fn process_selected_keys(&mut self) -> io::Result<Option<Box<dyn Runnable>>> {
        while self.cursor < self.ready.len() {
            let summary = self.ready[self.cursor];
            self.cursor += 1;

            if summary.token == WAKE_TOKEN {
                continue;
            }

            let ready = match self.attachments.get(&summary.token) {
                Some(Attachment::Selectable(endpoint)) => Some(ReadyAttachment::Endpoint(Arc::clone(endpoint))),
                Some(Attachment::Connect(state)) => Some(ReadyAttachment::Connect(Arc::clone(state))),
                None => None,
            };

            match ready {
                None => {
                    trace!("ignoring event for unknown or already-closed key {:?}", summary.token);
                }
                Some(ReadyAttachment::Connect(state)) => {
                    self.finish_connect(summary.token, state);
                }
                Some(ReadyAttachment::Endpoint(endpoint)) => {
                    self.touched.insert(summary.token);
                    let ready = Ready {
                        readable: summary.readable,
                        writable: summary.writable,
                        error: summary.error,
                    };
                    match endpoint.on_selected(ready) {
                        Ok(Some(task)) => return Ok(Some(task)),
                        Ok(None) => {}
                        Err(err) => {
                            warn!("endpoint callback error on {:?}: {err}", summary.token);
                            self.close_and_remove(summary.token);
                        }
                    }
                }
            }
        }

        // Batch exhausted: give every touched endpoint one chance to
        // re-arm its interest before the next `select()`.
        for token in self.touched.drain().collect::<Vec<_>>() {
            if let Some(Attachment::Selectable(endpoint)) = self.attachments.get(&token) {
                if let Err(err) = endpoint.update_interest() {
                    warn!("update_interest failed for {token:?}: {err}");
                    let endpoint = endpoint.clone();
                    self.attachments.remove(&token);
                    self.close_endpoint(&endpoint);
                }
            }
        }
        Ok(None)
    }

    fn process_updates(&mut self) {
        for update in self.queue.drain() {
            if let Err(err) = self.apply_update(update) {
                warn!("update application error: {err}");
            }
        }

        if !self.queue.prepare_to_wait() {
            // More updates arrived while we were applying the ones we just
            // drained; issue a self-wakeup instead of trusting `select()` to
            // ever see them via the waker fd it raced with.
            let _ = self.waker.wake();
        }
    }

    fn select_once(&mut self) -> io::Result<bool> {
        if !self.running.load(Ordering::Acquire) {
            return Ok(false);
        }
        match self.poll.poll(&mut self.events, None) {
            Ok(()) => {
                self.queue.clear_selecting();
                self.refresh_ready();
                if self.force_select_now && self.ready.is_empty() {
                    // The blocking wait returned with nothing ready; issue a
                    // non-blocking follow-up to force progress instead of
                    // trusting that a genuinely empty wakeup can't happen.
                    self.poll.poll(&mut self.events, Some(Duration::ZERO))?;
                    self.refresh_ready();
                }
                Ok(true)
            }
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => Ok(true),
            Err(err) => Err(err),
        }
    }

    fn refresh_ready(&mut self) {
        self.ready.clear();
        for event in self.events.iter() {
            self.ready.push(ReadySummary {
                token: event.token(),
                readable: event.is_readable(),
                writable: event.is_writable(),
                error: event.is_error(),
            });
        }
        self.cursor = 0;
    }

    fn next_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }

    fn apply_update(&mut self, update: Update<M>) -> io::Result<()> {
        match update {
            Update::Acceptor(listener) => self.apply_acceptor(listener),
            Update::Accept(stream) => self.apply_accept(stream),
            Update::Connect {
                stream,
                attachment,
                timeout,
            } => self.apply_connect(stream, attachment, timeout),
            Update::ConnectTimeout { token } => {
                self.apply_connect_timeout(token);
                Ok(())
            }
            Update::Attach { token, endpoint } => {
                self.attachments.insert(token, Attachment::Selectable(endpoint));
                self.size.fetch_add(1, Ordering::Release);
                Ok(())
            }
            Update::CloseConnections {
                already_closed,
                done,
            } => {
                self.apply_close_connections(already_closed);
                done.count_down();
                Ok(())
            }
            Update::StopSelector { done } => {
                self.running.store(false, Ordering::Release);
                done.count_down();
                Ok(())
            }
            Update::DumpKeys { sink, done } => {
                self.apply_dump_keys(&sink);
                done.count_down();
                Ok(())
            }
        }
    }

    fn apply_acceptor(&mut self, mut listener: crate::net::TcpListener) -> io::Result<()> {
        let token = self.next_token();
        self.registry.register(&mut listener, token, Interest::READABLE)?;
        let acceptor: Arc<dyn Selectable> = Arc::new(AcceptorEndpoint {
            listener,
            manager: Arc::clone(&self.manager),
            queue: Arc::clone(&self.queue),
            waker: Arc::clone(&self.waker),
        });
        self.attachments.insert(token, Attachment::Selectable(acceptor));
        debug!("registered acceptor as {token:?}");
        Ok(())
    }

    fn apply_accept(&mut self, stream: TcpStream) -> io::Result<()> {
        let token = self.next_token();
        let task: Box<dyn Runnable> = Box::new(EndPointTask {
            kind: EndPointTaskKind::Accept,
            manager: Arc::clone(&self.manager),
            registry: self.registry.clone(),
            queue: Arc::clone(&self.queue),
            waker: Arc::clone(&self.waker),
            stream,
            token,
        });
        if let Err(rejected) = self.executor.execute(task) {
            rejected.close();
        }
        Ok(())
    }

    fn apply_connect(
        &mut self,
        mut stream: TcpStream,
        attachment: M::Attachment,
        timeout: Duration,
    ) -> io::Result<()> {
        let token = self.next_token();
        self.registry.register(&mut stream, token, Interest::WRITABLE)?;

        let state = Arc::new(ConnectState {
            stream: Mutex::new(Some(stream)),
            attachment: Mutex::new(Some(attachment)),
            timeout_task: Mutex::new(None),
            timeout,
        });
        self.arm_connect_timeout(token, &state);

        self.attachments.insert(token, Attachment::Connect(state));
        Ok(())
    }

    fn arm_connect_timeout(&self, token: Token, state: &Arc<ConnectState<M>>) {
        let queue = Arc::clone(&self.queue);
        let waker = Arc::clone(&self.waker);
        let timer = self.scheduler.schedule(
            Box::new(move || {
                let _ = queue.submit(Update::ConnectTimeout { token }, &waker);
            }),
            state.timeout,
        );
        *state.timeout_task.lock().unwrap() = Some(timer);
    }

    fn apply_connect_timeout(&mut self, token: Token) {
        let state = match self.attachments.get(&token) {
            Some(Attachment::Connect(state)) => Arc::clone(state),
            _ => return,
        };
        self.attachments.remove(&token);
        let stream = state.stream.lock().unwrap().take();
        let attachment = state.attachment.lock().unwrap().take();
        if let (Some(stream), Some(attachment)) = (stream, attachment) {
            let cause = io::Error::new(io::ErrorKind::TimedOut, "connect timed out");
            self.manager.connection_failed(stream, cause, attachment);
        }
    }

    fn finish_connect(&mut self, token: Token, state: Arc<ConnectState<M>>) {
        // Cancel the scheduled timeout: if that fails, the timeout task has
        // already fired (or is in flight) and owns this connect instead.
        let timer_cancelled = match state.timeout_task.lock().unwrap().take() {
            Some(timer) => timer.cancel(),
            None => true,
        };
        if !timer_cancelled {
            return;
        }

        let result = {
            let mut guard = state.stream.lock().unwrap();
            match guard.as_mut() {
                Some(stream) => check_connect(stream),
                None => return,
            }
        };

        match result {
            Ok(true) => {
                self.attachments.remove(&token);
                let stream = state.stream.lock().unwrap().take().unwrap();
                let attachment = state.attachment.lock().unwrap().take().unwrap();
                let task: Box<dyn Runnable> = Box::new(EndPointTask {
                    kind: EndPointTaskKind::Connect { attachment },
                    manager: Arc::clone(&self.manager),
                    registry: self.registry.clone(),
                    queue: Arc::clone(&self.queue),
                    waker: Arc::clone(&self.waker),
                    stream,
                    token,
                });
                if let Err(rejected) = self.executor.execute(task) {
                    rejected.close();
                }
            }
            Ok(false) => {
                // Spurious writable wakeup before the connect actually
                // finished; stay registered and re-arm the timeout we just
                // cancelled (this restarts the clock rather than preserving
                // the original deadline, a deliberate simplification since
                // this path is only hit by pathological kernels).
                self.arm_connect_timeout(token, &state);
            }
            Err(err) => {
                self.attachments.remove(&token);
                let stream = state.stream.lock().unwrap().take().unwrap();
                let attachment = state.attachment.lock().unwrap().take().unwrap();
                self.manager.connection_failed(stream, err, attachment);
            }
        }
    }

    fn apply_close_connections(&mut self, already_closed: Option<Arc<Mutex<HashSet<Token>>>>) {
        debug!("CloseConnections begun: {} keys", self.attachments.len());
        let tokens: Vec<Token> = self.attachments.keys().copied().collect();
        for token in tokens {
            if let Some(set) = &already_closed {
                if !set.lock().unwrap().insert(token) {
                    continue;
                }
            }
            if let Some(Attachment::Selectable(endpoint)) = self.attachments.remove(&token) {
                self.close_endpoint(&endpoint);
            }
        }
        debug!("CloseConnections finished");
    }

    fn apply_dump_keys(&self, sink: &Arc<Mutex<Vec<String>>>) {
        let mut lines = sink.lock().unwrap();
        for (token, attachment) in &self.attachments {
            let kind = match attachment {
                Attachment::Selectable(_) => "endpoint",
                Attachment::Connect(_) => "connect",
            };
            lines.push(format!("{token:?}: {kind}"));
        }
    }

    fn close_and_remove(&mut self, token: Token) {
        if let Some(Attachment::Selectable(endpoint)) = self.attachments.remove(&token) {
            self.close_endpoint(&endpoint);
        }
    }

    fn close_endpoint(&self, endpoint: &Arc<dyn Selectable>) {
        self.manager.connection_closed(endpoint);
        self.manager.end_point_closed(endpoint);
        endpoint.close();
        self.size.fetch_sub(1, Ordering::Release);
    }
}

/// Checks whether a non-blocking connect has completed, matching it against
/// the pending socket's `SO_ERROR` the way `libstd`'s own connect-then-poll
/// helpers do.
fn check_connect(stream: &mut TcpStream) -> io::Result<bool> {
    match stream.take_error()? {
        Some(err) => Err(err),
        None => match stream.peer_addr() {
            Ok(_) => Ok(true),
            Err(ref err) if err.kind() == io::ErrorKind::NotConnected => Ok(false),
            Err(err) => Err(err),
        },
    }
}

/// The listening-channel endpoint: itself `Selectable`, draining `accept()`
/// in a tight loop and handing each accepted channel back onto the same
/// selector's queue as an `Accept` update.
struct AcceptorEndpoint<M: SelectorManager> {
    listener: crate::net::TcpListener,
    manager: Arc<M>,
    queue: Arc<UpdateQueue<M>>,
    waker: Arc<Waker>,
}

impl<M: SelectorManager> Selectable for AcceptorEndpoint<M> {
    fn on_selected(&self, _ready: Ready) -> io::Result<Option<Box<dyn Runnable>>> {
        loop {
            self.manager.on_accepting();
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    // `accepted` is the shard-selection hook; this crate has
                    // only one shard, so the accepting selector always keeps
                    // the channel and resubmits to its own queue.
                    self.manager.accepted(&stream);
                    if self.queue.submit(Update::Accept(stream), &self.waker).is_err() {
                        warn!("failed to wake selector after accept");
                    }
                }
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    self.manager.on_accept_failed(&err);
                    break;
                }
            }
        }
        Ok(None)
    }

    fn update_interest(&self) -> io::Result<()> {
        // The listening channel's interest never changes.
        Ok(())
    }

    fn close(&self) {
        // The listening channel is deregistered implicitly when dropped;
        // nothing else to release.
    }
}

enum EndPointTaskKind<M: SelectorManager> {
    Accept,
    Connect { attachment: M::Attachment },
}

/// Constructs an endpoint off the producer thread (accept and connect
/// completion share this), then hands the result back as an `Attach`
/// update so only the producer thread ever mutates the registration table.
struct EndPointTask<M: SelectorManager> {
    kind: EndPointTaskKind<M>,
    manager: Arc<M>,
    registry: Registry,
    queue: Arc<UpdateQueue<M>>,
    waker: Arc<Waker>,
    stream: TcpStream,
    token: Token,
}

impl<M: SelectorManager> Runnable for EndPointTask<M> {
    fn run(self: Box<Self>) {
        if matches!(self.kind, EndPointTaskKind::Accept) {
            self.manager.on_accepted(&self.stream);
        }
        match self.manager.new_end_point(self.stream, &self.registry, self.token) {
            Ok(endpoint) => {
                self.manager.connection_opened(&endpoint);
                self.manager.end_point_opened(&endpoint);
                if self
                    .queue
                    .submit(
                        Update::Attach {
                            token: self.token,
                            endpoint,
                        },
                        &self.waker,
                    )
                    .is_err()
                {
                    warn!("failed to wake selector after endpoint construction");
                }
            }
            Err((stream, err)) => match self.kind {
                EndPointTaskKind::Accept => {
                    warn!("accepted endpoint construction failed: {err}");
                    drop(stream);
                }
                EndPointTaskKind::Connect { attachment } => {
                    self.manager.connection_failed(stream, err, attachment);
                }
            },
        }
    }

    fn close(self: Box<Self>) {
        debug!("executor saturated, closing instead of constructing endpoint");
        match self.kind {
            EndPointTaskKind::Accept => drop(self.stream),
            EndPointTaskKind::Connect { attachment } => {
                let cause = io::Error::new(io::ErrorKind::Other, "executor rejected endpoint construction");
                self.manager.connection_failed(self.stream, cause, attachment);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managed::tests::NullManager;
    use crate::managed::{Config, ThreadPoolExecutor, TimerScheduler};

    fn new_selector() -> Arc<ManagedSelector<NullManager>> {
        ManagedSelector::new(
            Arc::new(NullManager),
            Arc::new(ThreadPoolExecutor::new(1, 4)),
            Arc::new(TimerScheduler::new()),
            Config::default(),
        )
        .expect("failed to build selector")
    }

    #[test]
    fn size_starts_at_zero() {
        let selector = new_selector();
        assert_eq!(selector.size(), 0);
        selector.stop();
    }

    /// Testable property #5: stop is idempotent and the second call does
    /// not block waiting for a latch nobody will ever count down again.
    #[test]
    fn stop_is_idempotent() {
        let selector = new_selector();
        selector.stop();
        selector.stop();
    }

    #[test]
    fn submit_after_stop_is_rejected() {
        let selector = new_selector();
        selector.stop();
        let addr: std::net::SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = crate::net::TcpListener::bind(addr).unwrap();
        match selector.accept_on(listener) {
            Err(super::super::Error::Closed) => {}
            other => panic!("expected Error::Closed, got {other:?}"),
        }
    }

    /// Spec scenario E6: an update whose application errors (here, a
    /// listener whose fd was closed out from under it, so `register` fails
    /// with EBADF) is logged and dropped, but the loop keeps applying
    /// whatever comes after it.
    #[test]
    fn faulty_update_does_not_block_subsequent_updates() {
        use std::os::fd::AsRawFd;

        let selector = new_selector();
        let addr: std::net::SocketAddr = "127.0.0.1:0".parse().unwrap();

        let bad_listener = crate::net::TcpListener::bind(addr).unwrap();
        let bad_fd = bad_listener.as_raw_fd();
        // SAFETY: closing this fd makes the listener invalid; nothing else
        // in this test references it by that fd again.
        unsafe { libc::close(bad_fd) };
        selector.submit(Update::Acceptor(bad_listener)).unwrap();

        let good_listener = crate::net::TcpListener::bind(addr).unwrap();
        selector.submit(Update::Acceptor(good_listener)).unwrap();

        let dump = selector.dump();
        assert_eq!(dump.len(), 1, "only the good acceptor should have registered: {dump:?}");
        selector.stop();
    }
}
