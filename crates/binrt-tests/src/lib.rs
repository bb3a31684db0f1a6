//! Shared fixtures for the binrt integration tests, benches and fuzz
//! targets.
//!
//! - [`ChunkedReader`]: an `AsyncRead` that hands out at most N bytes per
//!   poll, standing in for a socket or pipe.
//! - [`ReadOp`] scripts, replayed against every backend by
//!   [`run_async`] / [`run_sync`] so their outcomes can be compared.

use std::io::{self, Read, Seek};
use std::pin::Pin;
use std::task::{Context, Poll};

use binrt_reader::{ReaderContext, Stream, SyncStream};
use binrt_wire::StreamError;
use tokio::io::{AsyncRead, ReadBuf};

/// Install `env_logger` once per test binary; respects `RUST_LOG`.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Forward-only source that yields at most `chunk` bytes per read.
#[derive(Debug)]
pub struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl ChunkedReader {
    pub fn new(data: impl Into<Vec<u8>>, chunk: usize) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            chunk: chunk.max(1),
        }
    }
}

impl AsyncRead for ChunkedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let end = (this.pos + this.chunk).min(this.data.len());
        let n = (end - this.pos).min(buf.remaining());
        buf.put_slice(&this.data[this.pos..this.pos + n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}

/// One step of a read script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadOp {
    U1,
    U2be,
    U4le,
    S8be,
    F4le,
    BitsBe(u32),
    BitsLe(u32),
    Align,
    Bytes(u64),
    Full,
    Term {
        term: u8,
        include: bool,
        consume: bool,
        eos_error: bool,
    },
    TermMulti {
        term: Vec<u8>,
        include: bool,
        consume: bool,
        eos_error: bool,
    },
    Fixed(Vec<u8>),
    Seek(u64),
    IsEof,
    Size,
}

/// What a step produced, reduced to something every backend can agree on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Int(u64),
    Bytes(Vec<u8>),
    Flag(bool),
    Done,
    Failed(&'static str),
}

/// Stable label for an error, ignoring backend-specific detail.
pub fn error_kind(err: &StreamError) -> &'static str {
    match err {
        StreamError::EndOfData { .. } => "end_of_data",
        StreamError::TerminatorNotFound { .. } => "terminator_not_found",
        StreamError::TerminatorSequenceNotFound { .. } => "terminator_sequence_not_found",
        StreamError::InvalidArgument(_) => "invalid_argument",
        StreamError::ContentMismatch { .. } => "content_mismatch",
        StreamError::Unsupported(_) => "unsupported",
        StreamError::NotImplemented(_) => "not_implemented",
        StreamError::DecompressFailed(_) => "decompress_failed",
        StreamError::Cancelled { .. } => "cancelled",
        StreamError::Discarded { .. } => "discarded",
        StreamError::Io(_) => "io",
    }
}

fn outcome<T>(result: Result<T, StreamError>, map: impl FnOnce(T) -> Outcome) -> Outcome {
    match result {
        Ok(v) => map(v),
        Err(e) => Outcome::Failed(error_kind(&e)),
    }
}

#[allow(clippy::cast_sign_loss)]
fn signed(v: i64) -> Outcome {
    Outcome::Int(v as u64)
}

/// Replay `ops` on an async stream; each entry pairs the outcome with
/// the position afterwards.
pub async fn run_async<C: ReaderContext>(io: &mut Stream<C>, ops: &[ReadOp]) -> Vec<(Outcome, u64)> {
    let mut trace = Vec::with_capacity(ops.len());
    for op in ops {
        let result = match op {
            ReadOp::U1 => outcome(io.read_u1().await, |v| Outcome::Int(v.into())),
            ReadOp::U2be => outcome(io.read_u2be().await, |v| Outcome::Int(v.into())),
            ReadOp::U4le => outcome(io.read_u4le().await, |v| Outcome::Int(v.into())),
            ReadOp::S8be => outcome(io.read_s8be().await, signed),
            ReadOp::F4le => outcome(io.read_f4le().await, |v| Outcome::Int(v.to_bits().into())),
            ReadOp::BitsBe(n) => outcome(io.read_bits_int_be(*n).await, Outcome::Int),
            ReadOp::BitsLe(n) => outcome(io.read_bits_int_le(*n).await, Outcome::Int),
            ReadOp::Align => {
                io.align_to_byte();
                Outcome::Done
            }
            ReadOp::Bytes(n) => outcome(io.read_bytes(*n).await, Outcome::Bytes),
            ReadOp::Full => outcome(io.read_bytes_full().await, Outcome::Bytes),
            ReadOp::Term {
                term,
                include,
                consume,
                eos_error,
            } => outcome(
                io.read_bytes_term(*term, *include, *consume, *eos_error).await,
                Outcome::Bytes,
            ),
            ReadOp::TermMulti {
                term,
                include,
                consume,
                eos_error,
            } => outcome(
                io.read_bytes_term_multi(term, *include, *consume, *eos_error)
                    .await,
                Outcome::Bytes,
            ),
            ReadOp::Fixed(expected) => outcome(io.ensure_fixed_contents(expected).await, Outcome::Bytes),
            ReadOp::Seek(pos) => outcome(io.seek(*pos).await, |()| Outcome::Done),
            ReadOp::IsEof => outcome(io.is_eof().await, Outcome::Flag),
            ReadOp::Size => outcome(io.size().await, Outcome::Int),
        };
        trace.push((result, io.pos()));
    }
    trace
}

/// Blocking counterpart of [`run_async`].
pub fn run_sync<R: Read + Seek>(io: &mut SyncStream<R>, ops: &[ReadOp]) -> Vec<(Outcome, u64)> {
    let mut trace = Vec::with_capacity(ops.len());
    for op in ops {
        let result = match op {
            ReadOp::U1 => outcome(io.read_u1(), |v| Outcome::Int(v.into())),
            ReadOp::U2be => outcome(io.read_u2be(), |v| Outcome::Int(v.into())),
            ReadOp::U4le => outcome(io.read_u4le(), |v| Outcome::Int(v.into())),
            ReadOp::S8be => outcome(io.read_s8be(), signed),
            ReadOp::F4le => outcome(io.read_f4le(), |v| Outcome::Int(v.to_bits().into())),
            ReadOp::BitsBe(n) => outcome(io.read_bits_int_be(*n), Outcome::Int),
            ReadOp::BitsLe(n) => outcome(io.read_bits_int_le(*n), Outcome::Int),
            ReadOp::Align => {
                io.align_to_byte();
                Outcome::Done
            }
            ReadOp::Bytes(n) => outcome(io.read_bytes(*n), Outcome::Bytes),
            ReadOp::Full => outcome(io.read_bytes_full(), Outcome::Bytes),
            ReadOp::Term {
                term,
                include,
                consume,
                eos_error,
            } => outcome(
                io.read_bytes_term(*term, *include, *consume, *eos_error),
                Outcome::Bytes,
            ),
            ReadOp::TermMulti {
                term,
                include,
                consume,
                eos_error,
            } => outcome(
                io.read_bytes_term_multi(term, *include, *consume, *eos_error),
                Outcome::Bytes,
            ),
            ReadOp::Fixed(expected) => outcome(io.ensure_fixed_contents(expected), Outcome::Bytes),
            ReadOp::Seek(pos) => outcome(io.seek(*pos), |()| Outcome::Done),
            ReadOp::IsEof => Outcome::Flag(io.is_eof()),
            ReadOp::Size => Outcome::Int(io.size()),
        };
        trace.push((result, io.pos()));
    }
    trace
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn chunked_reader_limits_each_read() {
        let mut reader = ChunkedReader::new(b"abcdefg".to_vec(), 3);
        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).await.unwrap(), 3);
        assert_eq!(reader.read(&mut buf).await.unwrap(), 3);
        assert_eq!(reader.read(&mut buf).await.unwrap(), 1);
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    }
}
