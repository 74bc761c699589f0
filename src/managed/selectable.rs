use std::io;

/// Which operations a key was found ready for during one select cycle.
#[derive(Copy, Clone, Debug, Default)]
pub struct Ready {
    pub readable: bool,
    pub writable: bool,
    pub error: bool,
}

/// A unit of work produced by [`Selectable::on_selected`] or by the accept
/// and connect dispatch paths.
///
/// Most `Runnable`s have nothing to clean up if they're rejected by an
/// [`Executor`](super::Executor): the default `close` is a no-op and the
/// caller just runs them inline instead. Tasks that own a channel (accepted
/// or connected sockets waiting to become an endpoint) override `close` so a
/// saturated executor doesn't leak the socket.
pub trait Runnable: Send {
    fn run(self: Box<Self>);

    fn close(self: Box<Self>) {}
}

/// The contract a registered endpoint must satisfy.
///
/// `on_selected` is invoked once per endpoint per select cycle when its key
/// is ready; `update_interest` is invoked once afterwards, after the whole
/// ready batch has been processed, so the endpoint can re-arm whatever
/// interest it wants observed next.
pub trait Selectable: Send + Sync {
    /// Handle a readiness notification, optionally producing a task to hand
    /// to the execution strategy.
    fn on_selected(&self, ready: Ready) -> io::Result<Option<Box<dyn Runnable>>>;

    /// Re-register interest after this cycle's readiness has been consumed.
    fn update_interest(&self) -> io::Result<()>;

    /// Close the underlying channel. Called when `on_selected` or
    /// `update_interest` errors, and during `CloseConnections`.
    fn close(&self);
}
