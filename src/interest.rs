use std::fmt;
use std::num::NonZeroU8;
use std::ops::BitOr;

const READABLE: u8 = 0b0001;
const WRITABLE: u8 = 0b0010;
const AIO: u8 = 0b0100;
const LIO: u8 = 0b1000;
const PRIORITY: u8 = 0b1_0000;

/// Interest used in registering.
///
/// Interest represents the readiness operations Mio should monitor a handle
/// for. See [`readable`] and [`writable`] for more documentation on what
/// these interests mean.
///
/// [`readable`]: Interest::READABLE
/// [`writable`]: Interest::WRITABLE
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Interest(NonZeroU8);

impl Interest {
    /// Interest for readable readiness.
    pub const READABLE: Interest = Interest(unsafe { NonZeroU8::new_unchecked(READABLE) });

    /// Interest for writable readiness.
    pub const WRITABLE: Interest = Interest(unsafe { NonZeroU8::new_unchecked(WRITABLE) });

    /// Interest for AIO completion readiness.
    pub const AIO: Interest = Interest(unsafe { NonZeroU8::new_unchecked(AIO) });

    /// Interest for LIO completion readiness.
    pub const LIO: Interest = Interest(unsafe { NonZeroU8::new_unchecked(LIO) });

    /// Interest for priority readiness.
    pub const PRIORITY: Interest = Interest(unsafe { NonZeroU8::new_unchecked(PRIORITY) });

    /// Add together two `Interest`s, returning a new `Interest` set
    /// representing both the values.
    #[must_use = "this returns the result of the operation, without modifying the original"]
    pub const fn add(self, other: Interest) -> Interest {
        Interest(unsafe { NonZeroU8::new_unchecked(self.0.get() | other.0.get()) })
    }

    /// Returns true if the value includes readable readiness.
    pub const fn is_readable(self) -> bool {
        (self.0.get() & READABLE) != 0
    }

    /// Returns true if the value includes writable readiness.
    pub const fn is_writable(self) -> bool {
        (self.0.get() & WRITABLE) != 0
    }

    /// Returns true if `Interest` contains AIO readiness.
    pub const fn is_aio(self) -> bool {
        (self.0.get() & AIO) != 0
    }

    /// Returns true if `Interest` contains LIO readiness.
    pub const fn is_lio(self) -> bool {
        (self.0.get() & LIO) != 0
    }

    /// Returns true if the value includes priority readiness.
    pub const fn is_priority(self) -> bool {
        (self.0.get() & PRIORITY) != 0
    }
}

impl BitOr for Interest {
    type Output = Self;

    #[inline]
    fn bitor(self, other: Self) -> Self {
        self.add(other)
    }
}

impl fmt::Debug for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut one = false;
        if self.is_readable() {
            if one {
                write!(f, " | ")?
            }
            write!(f, "READABLE")?;
            one = true
        }
        if self.is_writable() {
            if one {
                write!(f, " | ")?
            }
            write!(f, "WRITABLE")?;
            one = true
        }
        if self.is_aio() {
            if one {
                write!(f, " | ")?
            }
            write!(f, "AIO")?;
            one = true
        }
        if self.is_lio() {
            if one {
                write!(f, " | ")?
            }
            write!(f, "LIO")?;
            one = true
        }
        if self.is_priority() {
            if one {
                write!(f, " | ")?
            }
            write!(f, "PRIORITY")?;
            one = true
        }
        debug_assert!(one, "printing empty interest");
        Ok(())
    }
}
