//! A managed selector event-loop core.
//!
//! This is an "eat-what-you-kill" execution strategy wrapped around a single
//! [`crate::Poll`] instance: one thread at a time owns producer duty (running
//! [`select`](crate::Poll::poll) and dispatching readiness), and every other
//! mutation of the registration set is serialized through an
//! [`UpdateQueue`](update::UpdateQueue) instead of touching the poll handle
//! directly. See [`ManagedSelector`] for the entry point.

mod config;
mod error;
mod executor;
mod latch;
mod manager;
mod scheduler;
mod selectable;
mod selector;
mod update;

pub use config::Config;
pub use error::Error;
pub use executor::{Executor, ThreadPoolExecutor};
pub use manager::SelectorManager;
pub use scheduler::{Cancellable, Scheduler, TimerScheduler};
pub use selectable::{Ready, Runnable, Selectable};
pub use selector::ManagedSelector;

#[cfg(test)]
pub(crate) mod tests {
    use std::io;
    use std::sync::Arc;

    use crate::net::TcpStream;

    use super::selectable::Selectable;
    use super::manager::SelectorManager;

    /// A `SelectorManager` that never actually builds an endpoint; good
    /// enough to type-check and drive the parts of the module (the update
    /// queue, mostly) that only need *some* `M: SelectorManager`.
    pub(crate) struct NullManager;

    impl SelectorManager for NullManager {
        type Attachment = ();

        fn new_end_point(
            &self,
            stream: TcpStream,
            _registry: &crate::Registry,
            _token: crate::Token,
        ) -> Result<Arc<dyn Selectable>, (TcpStream, io::Error)> {
            Err((stream, io::Error::new(io::ErrorKind::Other, "NullManager never succeeds")))
        }

        fn connection_failed(&self, _stream: TcpStream, _cause: io::Error, _attachment: ()) {}

        fn connection_opened(&self, _endpoint: &Arc<dyn Selectable>) {}

        fn connection_closed(&self, _endpoint: &Arc<dyn Selectable>) {}
    }
}
