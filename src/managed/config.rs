use std::time::Duration;

/// Tunables consumed by [`ManagedSelector`](super::ManagedSelector).
///
/// Mirrors the three configuration inputs named by the design:
/// `forceSelectNow`, `connectTimeout` and `stopTimeout`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Re-enter `select()` with a zero timeout right after registering new
    /// interest, instead of trusting the wakeup to cover it.
    ///
    /// This works around a `select()`-on-Windows quirk that doesn't apply to
    /// the epoll backend this crate targets, so it is always `false` here.
    pub force_select_now: bool,
    /// How long a `Connect` update is allowed to stay pending before it is
    /// failed with a timeout error.
    pub connect_timeout: Duration,
    /// How long `StopSelector` waits for the loop thread to acknowledge
    /// shutdown before giving up.
    pub stop_timeout: Duration,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            force_select_now: false,
            connect_timeout: Duration::from_secs(30),
            stop_timeout: Duration::from_secs(5),
        }
    }
}
