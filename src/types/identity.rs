//! Component and track identities
//!
//! Two kinds of identity exist side by side:
//!
//! - [`ComponentId`] is internal bookkeeping for mixture components. It is
//!   minted when a component is born or corrected, and survives prediction
//!   and merging (a merge keeps the seed's identity).
//! - [`TrackId`] is the persistent identity reported to the caller, owned by
//!   the identity tracker.

/// Internal identity of a Gaussian component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

impl core::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Persistent identity of an extracted target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u64);

impl core::fmt::Display for TrackId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Identity Generator
// ============================================================================

/// Generates unique component identities.
///
/// Identities are handed out sequentially. A block can be reserved up front so
/// that workers correcting different observations never share a counter.
#[derive(Debug, Clone)]
pub struct ComponentIdGenerator {
    next: u64,
}

impl ComponentIdGenerator {
    /// Creates a generator starting at zero.
    #[inline]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Creates a generator whose first identity is `start`.
    #[inline]
    pub const fn starting_at(start: u64) -> Self {
        Self { next: start }
    }

    /// Generates a new unique identity.
    #[inline]
    pub fn next_id(&mut self) -> ComponentId {
        let id = ComponentId(self.next);
        self.next += 1;
        id
    }

    /// Reserves `count` consecutive identities and returns the block.
    #[inline]
    pub fn reserve(&mut self, count: usize) -> IdBlock {
        let block = IdBlock {
            start: self.next,
            len: count as u64,
        };
        self.next += count as u64;
        block
    }

    /// Returns the next identity that would be generated.
    #[inline]
    pub fn peek(&self) -> ComponentId {
        ComponentId(self.next)
    }
}

impl Default for ComponentIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// A contiguous block of reserved component identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdBlock {
    start: u64,
    len: u64,
}

impl IdBlock {
    /// Returns the identity at `offset` within the block.
    ///
    /// # Panics
    /// Panics if `offset` is outside the reserved block.
    #[inline]
    pub fn get(&self, offset: usize) -> ComponentId {
        let offset = offset as u64;
        assert!(offset < self.len, "identity offset outside reserved block");
        ComponentId(self.start + offset)
    }

    /// Splits off the sub-block for batch `index` of `batch_len` identities.
    #[inline]
    pub fn batch(&self, index: usize, batch_len: usize) -> IdBlock {
        let start = self.start + (index * batch_len) as u64;
        assert!(
            start + batch_len as u64 <= self.start + self.len,
            "batch outside reserved block"
        );
        IdBlock {
            start,
            len: batch_len as u64,
        }
    }

    /// Number of identities in the block.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns true if the block holds no identities.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let mut gen = ComponentIdGenerator::new();
        assert_eq!(gen.next_id(), ComponentId(0));
        assert_eq!(gen.next_id(), ComponentId(1));
        assert_eq!(gen.peek(), ComponentId(2));
    }

    #[test]
    fn test_reserved_blocks_do_not_overlap() {
        let mut gen = ComponentIdGenerator::starting_at(10);
        let block = gen.reserve(6);
        assert_eq!(gen.next_id(), ComponentId(16));

        let second = block.batch(1, 3);
        assert_eq!(second.get(0), ComponentId(13));
        assert_eq!(second.get(2), ComponentId(15));
        assert_eq!(second.len(), 3);
    }

    #[test]
    #[should_panic(expected = "outside reserved block")]
    fn test_block_bounds() {
        let mut gen = ComponentIdGenerator::new();
        let block = gen.reserve(2);
        block.get(2);
    }

    #[test]
    fn test_display() {
        assert_eq!(alloc::format!("{}", ComponentId(7)), "c7");
        assert_eq!(alloc::format!("{}", TrackId(3)), "3");
    }
}
