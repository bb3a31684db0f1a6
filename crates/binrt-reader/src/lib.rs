#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

//! Stream runtime for generated binary-format parsers.
//!
//! A [`Stream`] wraps one [`ReaderContext`]: [`SeekableContext`] for
//! buffers and files, [`StreamingContext`] for forward-only async
//! sources. [`SyncStream`] is the blocking variant for seekable data.
//!
//! ```rust,no_run
//! use binrt_reader::Stream;
//!
//! # async fn demo() -> Result<(), binrt_wire::StreamError> {
//! let mut io = Stream::from_bytes(vec![0x00, 0x2A, 0b1010_0000]);
//! assert_eq!(io.read_u2be().await?, 42);
//! assert_eq!(io.read_bits_int_be(3).await?, 0b101);
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod config;
pub mod context;
pub mod seekable;
pub mod stream;
pub mod streaming;
pub mod structure;
pub mod sync_stream;

pub use cancel::{CancellationSource, CancellationToken};
pub use config::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, StreamingConfig};
pub use context::ReaderContext;
pub use seekable::SeekableContext;
pub use stream::Stream;
pub use streaming::StreamingContext;
pub use structure::{Parsed, Structure, SyncStructure};
pub use sync_stream::SyncStream;
