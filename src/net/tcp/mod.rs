//! TCP sockets backed directly by the platform selector.

pub use crate::sys::{TcpListener, TcpStream};
