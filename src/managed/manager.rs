use std::io;
use std::sync::Arc;

use crate::net::TcpStream;

use super::selectable::Selectable;

/// The collaborator a [`ManagedSelector`](super::ManagedSelector) reports
/// into.
///
/// This bundles the `manager.*` callbacks named in the design: turning a
/// freshly connected or accepted channel into an endpoint, and observing the
/// connection/endpoint lifecycle. Implementing this (and choosing what
/// `Attachment` means for a given application) is the only thing a user of
/// this crate has to supply; everything else is driven by `ManagedSelector`
/// itself.
pub trait SelectorManager: Send + Sync + 'static {
    /// Opaque data carried alongside a pending `Connect`, handed back on
    /// success or failure.
    type Attachment: Send + 'static;

    /// Wrap a channel (freshly connected, or accepted) as an endpoint.
    ///
    /// The returned `Selectable` is expected to already be registered for
    /// whatever interest it wants observed; `registry`/`token` are provided
    /// so the implementation can do so.
    ///
    /// On failure the channel is handed back alongside the error so the
    /// caller can still report it (e.g. via `connection_failed`) without
    /// losing the socket.
    fn new_end_point(
        &self,
        stream: TcpStream,
        registry: &crate::Registry,
        token: crate::Token,
    ) -> Result<Arc<dyn Selectable>, (TcpStream, io::Error)>;

    /// Called right before `accept()` is attempted on the listener.
    fn on_accepting(&self) {}

    /// A channel was just accepted by an `Acceptor`, before it is resubmitted
    /// as an `Accept` update.
    ///
    /// In a sharded deployment this is the hook that would pick which
    /// `ManagedSelector` shard owns the channel next; this crate runs a
    /// single shard, so the accepting selector always keeps it and this hook
    /// is an observer only.
    fn accepted(&self, _stream: &TcpStream) {}

    /// An `Accept` update is being applied: the channel is about to be
    /// turned into an endpoint via `new_end_point`.
    fn on_accepted(&self, _stream: &TcpStream) {}

    /// `accept()` on the listening channel failed.
    fn on_accept_failed(&self, _cause: &io::Error) {}

    /// A `Connect` failed, either by error or by timing out.
    fn connection_failed(&self, stream: TcpStream, cause: io::Error, attachment: Self::Attachment);

    /// An endpoint successfully came into existence (accept or connect).
    fn connection_opened(&self, endpoint: &Arc<dyn Selectable>);

    /// An endpoint is being torn down.
    fn connection_closed(&self, endpoint: &Arc<dyn Selectable>);

    fn end_point_opened(&self, _endpoint: &Arc<dyn Selectable>) {}

    fn end_point_closed(&self, _endpoint: &Arc<dyn Selectable>) {}

    /// `select()` itself failed; the selector is about to stop.
    fn on_select_failed(&self, _cause: &io::Error) {}
}
