/// Errors that can occur while serializing a structure.
///
/// Error hierarchy:
///
/// ```text
///   WriteError
///   ├── FixedSizeExceeded   ← padded run longer than its fixed slot
///   ├── InvalidArgument     ← bit width > 64, value wider than the field
///   └── Io(std::io::Error)  ← from the underlying writer
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("byte run of {len} bytes does not fit in fixed size {size}")]
    FixedSizeExceeded { len: usize, size: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
