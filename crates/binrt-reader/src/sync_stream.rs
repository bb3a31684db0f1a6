use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use binrt_wire::error::check_read_count;
use binrt_wire::{BitAccumulator, ParseError, StreamError};
use log::debug;

use crate::seekable::SeekableContext;
use crate::structure::{Parsed, SyncStructure};

macro_rules! read_number {
    ($name:ident, $ty:ty, $from:ident) => {
        pub fn $name(&mut self) -> Result<$ty, StreamError> {
            let mut buf = [0u8; size_of::<$ty>()];
            self.ctx.read_exact(&mut buf)?;
            Ok(<$ty>::$from(buf))
        }
    };
}

/// Blocking counterpart of [`Stream`](crate::Stream) over a seekable
/// source.
///
/// Nothing here ever suspends, so no runtime and no cancellation token
/// are involved. The read surface and failure behavior match the async
/// stream call for call.
#[derive(Debug)]
pub struct SyncStream<R> {
    ctx: SeekableContext<R>,
    bits: BitAccumulator,
}

impl SyncStream<Cursor<Vec<u8>>> {
    #[must_use]
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::from_context(SeekableContext::from_bytes(data))
    }
}

impl SyncStream<BufReader<File>> {
    /// # Errors
    ///
    /// [`StreamError::Io`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        Ok(Self::from_context(SeekableContext::open(path)?))
    }
}

impl<R: Read + Seek> SyncStream<R> {
    /// # Errors
    ///
    /// [`StreamError::Io`] if the source cannot be measured.
    pub fn new(reader: R) -> Result<Self, StreamError> {
        Ok(Self::from_context(SeekableContext::new(reader)?))
    }

    pub fn from_context(ctx: SeekableContext<R>) -> Self {
        Self {
            ctx,
            bits: BitAccumulator::new(),
        }
    }

    pub fn context(&self) -> &SeekableContext<R> {
        &self.ctx
    }

    pub fn into_context(self) -> SeekableContext<R> {
        self.ctx
    }

    pub fn pos(&self) -> u64 {
        self.ctx.position()
    }

    pub fn size(&self) -> u64 {
        self.ctx.size()
    }

    pub fn is_eof(&self) -> bool {
        self.bits.is_empty() && self.ctx.is_eof()
    }

    /// # Errors
    ///
    /// [`StreamError::EndOfData`] if `pos` lies past the end of data.
    pub fn seek(&mut self, pos: u64) -> Result<(), StreamError> {
        self.ctx.seek(pos)
    }

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

    read_number!(read_f4be, f32, from_be_bytes);
    read_number!(read_f8be, f64, from_be_bytes);
    read_number!(read_f4le, f32, from_le_bytes);
    read_number!(read_f8le, f64, from_le_bytes);

    pub fn align_to_byte(&mut self) {
        self.bits.align();
    }

    fn fetch_bits(&mut self, n: u32, buf: &mut [u8; 8]) -> Result<usize, StreamError> {
        let need = self.bits.bytes_needed(n)?;
        if need > 0 {
            self.ctx.read_exact(&mut buf[..need])?;
        }
        Ok(need)
    }

    /// # Errors
    ///
    /// [`StreamError::InvalidArgument`] for `n > 64`,
    /// [`StreamError::EndOfData`] if the source runs out.
    pub fn read_bits_int_be(&mut self, n: u32) -> Result<u64, StreamError> {
        let mut buf = [0u8; 8];
        let need = self.fetch_bits(n, &mut buf)?;
        Ok(self.bits.take_be(n, &buf[..need]))
    }

    /// # Errors
    ///
    /// [`StreamError::InvalidArgument`] for `n > 64`,
    /// [`StreamError::EndOfData`] if the source runs out.
    pub fn read_bits_int_le(&mut self, n: u32) -> Result<u64, StreamError> {
        let mut buf = [0u8; 8];
        let need = self.fetch_bits(n, &mut buf)?;
        Ok(self.bits.take_le(n, &buf[..need]))
    }

    /// # Errors
    ///
    /// [`StreamError::InvalidArgument`] for counts above `i32::MAX`,
    /// [`StreamError::EndOfData`] if fewer bytes remain.
    pub fn read_bytes(&mut self, count: u64) -> Result<Vec<u8>, StreamError> {
        let count = check_read_count(count)?;
        self.ctx.read_bytes(count)
    }

    /// # Errors
    ///
    /// [`StreamError::Io`] on an I/O failure.
    pub fn read_bytes_full(&mut self) -> Result<Vec<u8>, StreamError> {
        self.ctx.read_bytes_full()
    }

    /// See [`Stream::read_bytes_term`](crate::Stream::read_bytes_term).
    ///
    /// # Errors
    ///
    /// [`StreamError::TerminatorNotFound`] if `eos_error` is set and the
    /// source is exhausted first.
    pub fn read_bytes_term(
        &mut self,
        term: u8,
        include: bool,
        consume: bool,
        eos_error: bool,
    ) -> Result<Vec<u8>, StreamError> {
        let start = self.pos();
        let result = self.scan_term(term, include, consume, eos_error);
        if result.is_err() {
            self.restore(start);
        }
        result
    }

    fn scan_term(
        &mut self,
        term: u8,
        include: bool,
        consume: bool,
        eos_error: bool,
    ) -> Result<Vec<u8>, StreamError> {
        let mut out = Vec::new();
        loop {
            if self.ctx.is_eof() {
                if eos_error {
                    return Err(StreamError::TerminatorNotFound {
                        terminator: term,
                        pos: self.pos(),
                    });
                }
                return Ok(out);
            }
            let byte = self.ctx.read_u8()?;
            if byte == term {
                if include {
                    out.push(byte);
                }
                if !consume {
                    let back = self.pos() - 1;
                    self.ctx.seek(back)?;
                }
                return Ok(out);
            }
            out.push(byte);
        }
    }

    /// See [`Stream::read_bytes_term_multi`](crate::Stream::read_bytes_term_multi).
    ///
    /// # Errors
    ///
    /// [`StreamError::InvalidArgument`] for an empty terminator,
    /// [`StreamError::TerminatorSequenceNotFound`] if `eos_error` is set
    /// and the source ends first.
    pub fn read_bytes_term_multi(
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
        let result = self.scan_term_multi(term, include, consume, eos_error);
        if result.is_err() {
            self.restore(start);
        }
        result
    }

    fn scan_term_multi(
        &mut self,
        term: &[u8],
        include: bool,
        consume: bool,
        eos_error: bool,
    ) -> Result<Vec<u8>, StreamError> {
        let unit = term.len();
        let mut out = Vec::new();
        loop {
            let remaining = self.size() - self.pos();
            if remaining < unit as u64 {
                if eos_error {
                    return Err(StreamError::TerminatorSequenceNotFound {
                        terminator: term.to_vec(),
                        pos: self.size(),
                    });
                }
                out.extend_from_slice(&self.ctx.read_bytes_full()?);
                return Ok(out);
            }
            let chunk = self.ctx.read_bytes(unit)?;
            if chunk == term {
                if include {
                    out.extend_from_slice(&chunk);
                }
                if !consume {
                    let back = self.pos() - unit as u64;
                    self.ctx.seek(back)?;
                }
                return Ok(out);
            }
            out.extend_from_slice(&chunk);
        }
    }

    /// # Errors
    ///
    /// [`StreamError::EndOfData`] if too few bytes remain,
    /// [`StreamError::ContentMismatch`] (position restored) on any
    /// differing byte.
    pub fn ensure_fixed_contents(&mut self, expected: &[u8]) -> Result<Vec<u8>, StreamError> {
        let start = self.pos();
        let actual = self.ctx.read_bytes(expected.len())?;
        if actual != expected {
            self.restore(start);
            return Err(StreamError::ContentMismatch {
                expected: expected.to_vec(),
                actual,
                pos: start,
            });
        }
        Ok(actual)
    }

    fn restore(&mut self, pos: u64) {
        if let Err(e) = self.ctx.seek(pos) {
            debug!("failed to restore offset {pos}: {e}");
        }
    }

    /// # Errors
    ///
    /// Whatever `T::read` reports.
    pub fn parse<T: SyncStructure<R>>(&mut self) -> Result<Parsed<'_, T, Self>, ParseError> {
        let value = T::read(self)?;
        Ok(Parsed::new(value, self))
    }
}
