//! A readiness-based event loop core: epoll-backed polling primitives plus
//! a managed, multi-shard selector layer built on top of them.
//!
//! The lower layer ([`Poll`], [`Registry`], [`Token`], [`Interest`],
//! [`event`], [`net`], [`unix`]) is a non-blocking I/O readiness multiplexer
//! in the style of `mio`: register [`event::Source`]s with a [`Registry`]
//! and block on [`Poll::poll`] for readiness events.
//!
//! The upper layer ([`managed`]) drives many selectors ("shards") each on
//! their own thread, hands off ready connections to a pluggable executor
//! using an eat-what-you-kill strategy, and serializes updates (new
//! registrations, accepts, connects, shutdown) through a coalescing update
//! queue instead of touching the selector from arbitrary threads.
#![deny(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

#[macro_use]
mod macros;

mod interest;
mod poll;
mod sys;
mod token;
mod waker;

pub mod event;
pub mod managed;
pub mod net;

cfg_any_os_ext! {
    pub mod unix {
        //! Unix only extensions.
        pub use crate::sys::SourceFd;
    }
}

pub use event::Events;
pub use interest::Interest;
pub use poll::{Poll, Registry};
pub use token::Token;
pub use waker::Waker;
