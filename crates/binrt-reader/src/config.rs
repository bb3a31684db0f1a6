/// Default number of bytes requested from a forward-only source per
/// read-ahead.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Upper bound on a single read-ahead; larger configured sizes are
/// clamped to this.
pub const MAX_CHUNK_SIZE: usize = 1 << 20;

/// Buffering configuration for [`StreamingContext`](crate::StreamingContext).
///
/// ```text
/// ┌──────────────┬──────────────────────────────────────────────────────┐
/// │ Field        │ Purpose                                              │
/// ├──────────────┼──────────────────────────────────────────────────────┤
/// │ chunk_size   │ Bytes requested from the source per read-ahead       │
/// │ lookbehind   │ Bytes kept behind the cursor when the window is      │
/// │              │ compacted; `None` keeps everything already received  │
/// └──────────────┴──────────────────────────────────────────────────────┘
/// ```
///
/// With `lookbehind: None` a streaming context can serve any backward
/// seek, at the cost of holding the whole consumed prefix in memory.
/// With `Some(n)` memory stays bounded; a backward seek further than
/// `n` bytes still succeeds, but the next read from that position fails
/// with `StreamError::Discarded`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamingConfig {
    pub chunk_size: usize,
    pub lookbehind: Option<usize>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            lookbehind: None,
        }
    }
}

impl StreamingConfig {
    /// Bytes requested per read-ahead, clamped to `1..=MAX_CHUNK_SIZE`
    /// when used.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn with_lookbehind(mut self, lookbehind: usize) -> Self {
        self.lookbehind = Some(lookbehind);
        self
    }

    /// Chunk size actually used; a zero-byte request would be
    /// indistinguishable from end of source.
    pub(crate) fn effective_chunk_size(&self) -> usize {
        self.chunk_size.clamp(1, MAX_CHUNK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_is_clamped_at_both_ends() {
        let config = StreamingConfig::default();
        assert_eq!(config.effective_chunk_size(), DEFAULT_CHUNK_SIZE);
        assert_eq!(config.with_chunk_size(0).effective_chunk_size(), 1);
        assert_eq!(
            config.with_chunk_size(usize::MAX).effective_chunk_size(),
            MAX_CHUNK_SIZE
        );
    }
}
