use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

use binrt_wire::error::check_read_count;
use binrt_wire::{BitAccumulator, ParseError, StreamError};
use log::debug;
use tokio::io::AsyncRead;

use crate::cancel::CancellationToken;
use crate::config::StreamingConfig;
use crate::context::ReaderContext;
use crate::seekable::SeekableContext;
use crate::streaming::StreamingContext;
use crate::structure::{Parsed, Structure};

/// Generates one fixed-width numeric read.
macro_rules! read_number {
    ($(#[$meta:meta])* $name:ident, $ty:ty, $from:ident) => {
        $(#[$meta])*
        pub async fn $name(&mut self) -> Result<$ty, StreamError> {
            let mut buf = [0u8; size_of::<$ty>()];
            self.ctx.read_exact(&mut buf, &self.cancel).await?;
            Ok(<$ty>::$from(buf))
        }
    };
}

/// Cursor over a byte source, used by generated parser code.
///
/// A `Stream` owns exactly one [`ReaderContext`] and the bit accumulator
/// for unaligned reads. It is generic over the backend, so the same
/// parser runs on an in-memory buffer, a file, or a socket:
///
/// ```text
///   Stream<SeekableContext<Cursor<Vec<u8>>>>   ← Stream::from_bytes
///   Stream<SeekableContext<BufReader<File>>>   ← Stream::open
///   Stream<StreamingContext<R: AsyncRead>>     ← Stream::from_async_reader
/// ```
///
/// Every read observes the stream's [`CancellationToken`] (none by
/// default; install one with [`with_cancellation`](Self::with_cancellation)).
/// A read that fails leaves [`pos`](Self::pos) where it was.
///
/// Byte reads ignore the bit accumulator. Generated code calls
/// [`align_to_byte`](Self::align_to_byte) when switching from bit fields
/// back to whole bytes.
#[derive(Debug)]
pub struct Stream<C> {
    ctx: C,
    bits: BitAccumulator,
    cancel: CancellationToken,
}

impl Stream<SeekableContext<Cursor<Vec<u8>>>> {
    #[must_use]
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::new(SeekableContext::from_bytes(data))
    }
}

impl Stream<SeekableContext<BufReader<File>>> {
    /// Open a file read-only.
    ///
    /// # Errors
    ///
    /// [`StreamError::Io`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        Ok(Self::new(SeekableContext::open(path)?))
    }
}

impl<R: AsyncRead + Unpin> Stream<StreamingContext<R>> {
    #[must_use]
    pub fn from_async_reader(reader: R) -> Self {
        Self::new(StreamingContext::new(reader))
    }

    #[must_use]
    pub fn with_config(reader: R, config: StreamingConfig) -> Self {
        Self::new(StreamingContext::with_config(reader, config))
    }
}

impl<C: ReaderContext> Stream<C> {
    #[must_use]
    pub fn new(ctx: C) -> Self {
        Self {
            ctx,
            bits: BitAccumulator::new(),
            cancel: CancellationToken::none(),
        }
    }

    /// Observe `cancel` on every subsequent read.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn into_context(self) -> C {
        self.ctx
    }

    // ── Positioning ─────────────────────────────────────────────────────

    /// Current byte offset. Buffered bits are not counted.
    pub fn pos(&self) -> u64 {
        self.ctx.position()
    }

    /// Total length of the data. Drains forward-only sources.
    ///
    /// # Errors
    ///
    /// Propagates context failures (I/O, cancellation).
    pub async fn size(&mut self) -> Result<u64, StreamError> {
        self.ctx.size(&self.cancel).await
    }

    /// True when the context is exhausted and no buffered bits remain.
    ///
    /// # Errors
    ///
    /// Propagates context failures (I/O, cancellation).
    pub async fn is_eof(&mut self) -> Result<bool, StreamError> {
        if !self.bits.is_empty() {
            return Ok(false);
        }
        self.ctx.is_eof(&self.cancel).await
    }

    /// # Errors
    ///
    /// [`StreamError::EndOfData`] if `pos` lies past the end of data.
    pub async fn seek(&mut self, pos: u64) -> Result<(), StreamError> {
        self.ctx.seek(pos, &self.cancel).await
    }

    // ── Integers and floats ─────────────────────────────────────────────

    read_number!(read_s1, i8, from_be_bytes);
    read_number!(read_u1, u8, from_be_bytes);

    read_number!(read_s2be, i16, from_be_bytes);
    read_number!(read_s4be, i32, from_be_bytes);
    read_number!(read_s8be, i64, from_be_bytes);
    read_number!(read_u2be, u16, from_be_bytes);
    read_number!(read_u4be, u32, from_be_bytes);
    read_number!(read_u8be, u64, from_be_bytes);

    read_number!(read_s2le, i16, from_le_bytes);
    read_number!(read_s4le, i32, from_le_bytes);
    read_number!(read_s8le, i64, from_le_bytes);
    read_number!(read_u2le, u16, from_le_bytes);
    read_number!(read_u4le, u32, from_le_bytes);
    read_number!(read_u8le, u64, from_le_bytes);

    read_number!(
        /// IEEE 754 single precision, big-endian.
        read_f4be, f32, from_be_bytes
    );
    read_number!(
        /// IEEE 754 double precision, big-endian.
        read_f8be, f64, from_be_bytes
    );
    read_number!(read_f4le, f32, from_le_bytes);
    read_number!(read_f8le, f64, from_le_bytes);

    // ── Bit fields ──────────────────────────────────────────────────────

    /// Discard the unread bits of a partially consumed byte.
    pub fn align_to_byte(&mut self) {
        self.bits.align();
    }

    async fn fetch_bits(&mut self, n: u32, buf: &mut [u8; 8]) -> Result<usize, StreamError> {
        let need = self.bits.bytes_needed(n)?;
        if need > 0 {
            self.ctx.read_exact(&mut buf[..need], &self.cancel).await?;
        }
        Ok(need)
    }

    /// Read `n` bits (at most 64), most significant bit of each byte first.
    ///
    /// # Errors
    ///
    /// [`StreamError::InvalidArgument`] for `n > 64`,
    /// [`StreamError::EndOfData`] if the source runs out. Either way the
    /// buffered bits are unchanged.
    pub async fn read_bits_int_be(&mut self, n: u32) -> Result<u64, StreamError> {
        let mut buf = [0u8; 8];
        let need = self.fetch_bits(n, &mut buf).await?;
        Ok(self.bits.take_be(n, &buf[..need]))
    }

    /// Read `n` bits (at most 64), least significant bit of each byte first.
    ///
    /// # Errors
    ///
    /// See [`read_bits_int_be`](Self::read_bits_int_be).
    pub async fn read_bits_int_le(&mut self, n: u32) -> Result<u64, StreamError> {
        let mut buf = [0u8; 8];
        let need = self.fetch_bits(n, &mut buf).await?;
        Ok(self.bits.take_le(n, &buf[..need]))
    }

    // ── Byte runs ───────────────────────────────────────────────────────

    /// Read exactly `count` bytes.
    ///
    /// # Errors
    ///
    /// [`StreamError::InvalidArgument`] if `count` exceeds `i32::MAX`
    /// (checked before any I/O), [`StreamError::EndOfData`] if fewer
    /// bytes remain.
    pub async fn read_bytes(&mut self, count: u64) -> Result<Vec<u8>, StreamError> {
        let count = check_read_count(count)?;
        self.ctx.read_bytes(count, &self.cancel).await
    }

    /// Read everything up to the end of data.
    ///
    /// # Errors
    ///
    /// Propagates context failures (I/O, cancellation).
    pub async fn read_bytes_full(&mut self) -> Result<Vec<u8>, StreamError> {
        self.ctx.read_bytes_full(&self.cancel).await
    }

    /// Read up to a terminator byte.
    ///
    /// ```text
    ///   source "ABC", term 'B'
    ///   include=true,  consume=false → "AB", pos 1
    ///   include=true,  consume=true  → "AB", pos 2
    ///   include=false, consume=true  → "A",  pos 2
    /// ```
    ///
    /// Without a terminator the bytes up to the end are returned, unless
    /// `eos_error` is set.
    ///
    /// # Errors
    ///
    /// [`StreamError::TerminatorNotFound`] if `eos_error` is set and the
    /// source is exhausted first. The position is restored on failure.
    pub async fn read_bytes_term(
        &mut self,
        term: u8,
        include: bool,
        consume: bool,
        eos_error: bool,
    ) -> Result<Vec<u8>, StreamError> {
        let start = self.pos();
        self.ctx.pin(start);
        let result = self.scan_term(term, include, consume, eos_error).await;
        if result.is_err() {
            self.restore(start).await;
        }
        self.ctx.unpin();
        result
    }

    async fn scan_term(
        &mut self,
        term: u8,
        include: bool,
        consume: bool,
        eos_error: bool,
    ) -> Result<Vec<u8>, StreamError> {
        let mut out = Vec::new();
        loop {
            if self.ctx.is_eof(&self.cancel).await? {
                if eos_error {
                    return Err(StreamError::TerminatorNotFound {
                        terminator: term,
                        pos: self.pos(),
                    });
                }
                return Ok(out);
            }
            let byte = self.ctx.read_u8(&self.cancel).await?;
            if byte == term {
                if include {
                    out.push(byte);
                }
                if !consume {
                    let back = self.pos() - 1;
                    self.ctx.seek(back, &self.cancel).await?;
                }
                return Ok(out);
            }
            out.push(byte);
        }
    }

    /// Read up to a multi-byte terminator, scanning in units of
    /// `term.len()` bytes from the current position.
    ///
    /// # Errors
    ///
    /// [`StreamError::InvalidArgument`] for an empty terminator,
    /// [`StreamError::TerminatorSequenceNotFound`] if `eos_error` is set
    /// and the source ends first. The position is restored on failure.
    pub async fn read_bytes_term_multi(
        &mut self,
        term: &[u8],
        include: bool,
        consume: bool,
        eos_error: bool,
    ) -> Result<Vec<u8>, StreamError> {
        if term.is_empty() {
            return Err(StreamError::InvalidArgument(
                "terminator must not be empty".into(),
            ));
        }
        let start = self.pos();
        self.ctx.pin(start);
        let result = self.scan_term_multi(term, include, consume, eos_error).await;
        if result.is_err() {
            self.restore(start).await;
        }
        self.ctx.unpin();
        result
    }

    async fn scan_term_multi(
        &mut self,
        term: &[u8],
        include: bool,
        consume: bool,
        eos_error: bool,
    ) -> Result<Vec<u8>, StreamError> {
        let unit = term.len();
        let mut out = Vec::new();
        loop {
            let chunk = match self.ctx.read_bytes(unit, &self.cancel).await {
                Ok(chunk) => chunk,
                Err(StreamError::EndOfData { .. }) => {
                    let tail = self.ctx.read_bytes_full(&self.cancel).await?;
                    if eos_error {
                        return Err(StreamError::TerminatorSequenceNotFound {
                            terminator: term.to_vec(),
                            pos: self.pos(),
                        });
                    }
                    out.extend_from_slice(&tail);
                    return Ok(out);
                }
                Err(e) => return Err(e),
            };
            if chunk == term {
                if include {
                    out.extend_from_slice(&chunk);
                }
                if !consume {
                    let back = self.pos() - unit as u64;
                    self.ctx.seek(back, &self.cancel).await?;
                }
                return Ok(out);
            }
            out.extend_from_slice(&chunk);
        }
    }

    /// Read `expected.len()` bytes and check them against `expected`.
    ///
    /// # Errors
    ///
    /// [`StreamError::EndOfData`] if too few bytes remain,
    /// [`StreamError::ContentMismatch`] (position restored) on any
    /// differing byte.
    pub async fn ensure_fixed_contents(&mut self, expected: &[u8]) -> Result<Vec<u8>, StreamError> {
        let start = self.pos();
        let actual = self.ctx.read_bytes(expected.len(), &self.cancel).await?;
        if actual.len() != expected.len() || actual != expected {
            self.restore(start).await;
            return Err(StreamError::ContentMismatch {
                expected: expected.to_vec(),
                actual,
                pos: start,
            });
        }
        Ok(actual)
    }

    /// Rewind after a failed composite read. The target is behind the
    /// cursor, so this never waits for data; cancellation is not observed.
    async fn restore(&mut self, pos: u64) {
        if let Err(e) = self.ctx.seek(pos, &CancellationToken::none()).await {
            debug!("failed to restore offset {pos}: {e}");
        }
    }

    // ── Structures ──────────────────────────────────────────────────────

    /// Read a `T` and keep a shared handle on this stream next to it.
    ///
    /// # Errors
    ///
    /// Whatever `T::read` reports.
    pub async fn parse<T: Structure<C>>(&mut self) -> Result<Parsed<'_, T, Self>, ParseError> {
        let value = T::read(self).await?;
        Ok(Parsed::new(value, self))
    }
}
