use std::fmt;
use std::io;

/// Errors that escape the managed selector layer.
///
/// Most failure paths named in the design (transient-key errors, endpoint
/// callback errors, update application errors) are swallowed and logged at
/// the point they occur rather than modeled here: they are recoverable and
/// the loop keeps running. `Error` only covers the paths that actually
/// propagate to a caller.
#[derive(Debug)]
pub enum Error {
    /// An I/O operation against the underlying selector or a socket failed.
    Io(io::Error),
    /// The operation was attempted after shutdown (`StopSelector`) completed.
    Closed,
    /// The executor rejected a task that had no closeable resource to clean
    /// up and the caller needs to know the work was dropped.
    Rejected,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Closed => write!(f, "selector is closed"),
            Error::Rejected => write!(f, "task rejected by executor"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Closed | Error::Rejected => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
