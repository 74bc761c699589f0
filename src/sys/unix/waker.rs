mod eventfd;

use std::io;
use std::os::fd::AsRawFd;

use crate::sys::unix::waker::eventfd::Waker as WakerInternal;
use crate::sys::Selector;
use crate::{Interest, Token};

#[derive(Debug)]
pub(crate) struct Waker {
    waker: WakerInternal,
}

impl Waker {
    pub(crate) fn new(selector: &Selector, token: Token) -> io::Result<Waker> {
        let waker = WakerInternal::new()?;
        selector.register(waker.as_raw_fd(), token, Interest::READABLE)?;
        Ok(Waker { waker })
    }

    pub(crate) fn wake(&self) -> io::Result<()> {
        self.waker.wake()
    }
}
