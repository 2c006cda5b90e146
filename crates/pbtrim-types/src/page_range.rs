use std::fmt;

/// One contiguous allocated region of a page blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRange {
    pub offset: u64,
    pub length: u64,
}

impl PageRange {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Build a range from inclusive `start..=end` byte positions, as page
    /// listings report them. Returns `None` when `end < start`.
    pub fn from_inclusive(start: u64, end: u64) -> Option<Self> {
        let length = end.checked_sub(start)?.checked_add(1)?;
        Some(Self::new(start, length))
    }

    /// First byte past the range, or `None` on overflow.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            Some(end) if self.length > 0 => write!(f, "bytes={}-{}", self.offset, end - 1),
            _ => write!(f, "bytes={}-", self.offset),
        }
    }
}
