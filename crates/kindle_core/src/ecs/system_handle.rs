use std::fmt;

/// Identifies one registration in a `Systems` scheduler.
///
/// A scheduler never hands out the same handle twice, not even after
/// `Systems::clear`, so removing with a stale handle does nothing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemHandle(u32);

impl SystemHandle {
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Registration sequence number.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{}", self.0)
    }
}
