mod epoll;
pub(crate) use self::epoll::{event, Event, Events, Selector};
