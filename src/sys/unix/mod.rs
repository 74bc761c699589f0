/// Helper macro to execute a system call that returns an `io::Result`.
//
// Macro must be defined before any modules that use it.
#[allow(unused_macros)]
macro_rules! syscall {
    ($fn: ident ( $($arg: expr),* $(,)* ) ) => {{
        let res = unsafe { libc::$fn($($arg, )*) };
        if res == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(res)
        }
    }};
}

mod net;

mod selector;
pub(crate) use self::selector::{event, Event, Events, Selector};

mod waker;
pub(crate) use self::waker::Waker;

cfg_net! {
    mod tcp;
    pub(crate) use self::tcp::{TcpListener, TcpStream};
}

cfg_any_os_ext! {
    mod sourcefd;
    pub use self::sourcefd::SourceFd;
}
