use crate::bytes::format_hex;

/// Errors raised by the stream primitives and byte transforms.
///
/// Every read failure is surfaced to the immediate caller; nothing in
/// the runtime retries or recovers. Variants carry the byte position
/// and, where it helps diagnostics, the expected vs. actual values.
///
/// Error hierarchy:
///
/// ```text
///   StreamError
///   ├── EndOfData            ← requested span exceeds remaining bytes
///   ├── TerminatorNotFound   ← source exhausted before terminator (eos_error)
///   ├── TerminatorSequenceNotFound ← same, for multi-byte terminators
///   ├── InvalidArgument      ← bad count, rotate amount, empty key, modulus
///   ├── ContentMismatch      ← ensure_fixed_contents divergence
///   ├── Unsupported          ← e.g. zlib data that is not DEFLATE
///   ├── NotImplemented       ← e.g. rotate group sizes other than 1
///   ├── DecompressFailed     ← DEFLATE decoder error
///   ├── Cancelled            ← cancellation fired while awaiting data
///   ├── Discarded            ← read behind a compacted streaming window
///   └── Io(std::io::Error)   ← from the underlying reader
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Fewer bytes remain than were requested. The position is left
    /// where it was before the failed call.
    #[error("requested {requested} bytes at offset {pos}, but only {available} available")]
    EndOfData {
        requested: u64,
        available: u64,
        pos: u64,
    },

    /// A terminator-delimited read hit the end of the source with
    /// `eos_error` set.
    #[error("end of stream reached at offset {pos}, but no terminator {terminator:#04X} found")]
    TerminatorNotFound { terminator: u8, pos: u64 },

    /// Multi-byte counterpart of `TerminatorNotFound`.
    #[error("end of stream reached at offset {pos}, but no terminator {} found", format_hex(.terminator))]
    TerminatorSequenceNotFound { terminator: Vec<u8>, pos: u64 },

    /// The caller passed an argument the operation cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `ensure_fixed_contents` read bytes that differ from the expected
    /// sequence. Both full sequences are kept for diagnostics.
    #[error("content mismatch at offset {pos}: expected {}, got {}", format_hex(.expected), format_hex(.actual))]
    ContentMismatch {
        expected: Vec<u8>,
        actual: Vec<u8>,
        pos: u64,
    },

    /// The input uses a format feature the runtime does not support.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The operation exists in the format language but is not
    /// implemented by this runtime.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// The DEFLATE decoder rejected the compressed stream.
    #[error("zlib decompression failed: {0}")]
    DecompressFailed(String),

    /// Cancellation fired while a read was waiting for more data.
    /// Position and buffered state are unchanged.
    #[error("operation cancelled at offset {pos}")]
    Cancelled { pos: u64 },

    /// A streaming context was asked for bytes that were already
    /// compacted out of its lookbehind window.
    #[error("offset {pos} was discarded from the stream window (window starts at {window_start})")]
    Discarded { pos: u64, window_start: u64 },

    /// I/O error from the underlying source.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// True for both end-of-data conditions.
    pub fn is_end_of_data(&self) -> bool {
        matches!(
            self,
            Self::EndOfData { .. }
                | Self::TerminatorNotFound { .. }
                | Self::TerminatorSequenceNotFound { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Build the invalid-argument error for a byte count outside the
    /// non-negative `i32` range.
    pub(crate) fn count_out_of_range(count: impl std::fmt::Display) -> Self {
        Self::InvalidArgument(format!(
            "requested {count} bytes, while only non-negative int32 amount of bytes possible"
        ))
    }
}

/// Largest byte count accepted by a single read.
pub const MAX_READ_COUNT: u64 = i32::MAX as u64;

/// Reject byte counts outside the non-negative `i32` range before any
/// I/O is attempted.
///
/// # Errors
///
/// [`StreamError::InvalidArgument`] when `count` exceeds [`MAX_READ_COUNT`].
pub fn check_read_count(count: u64) -> Result<usize, StreamError> {
    if count > MAX_READ_COUNT {
        return Err(StreamError::count_out_of_range(count));
    }
    usize::try_from(count).map_err(|_| StreamError::count_out_of_range(count))
}

/// Signed variant of [`check_read_count`] for counts computed by
/// generated expressions.
///
/// # Errors
///
/// [`StreamError::InvalidArgument`] when `count` is negative or too large.
pub fn check_signed_read_count(count: i64) -> Result<usize, StreamError> {
    let unsigned = u64::try_from(count).map_err(|_| StreamError::count_out_of_range(count))?;
    check_read_count(unsigned)
}
