use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use binrt_wire::bits::MAX_BIT_WIDTH;
use binrt_wire::mask_ones;

use crate::error::WriteError;

macro_rules! write_number {
    ($name:ident, $ty:ty, $to:ident) => {
        pub fn $name(&mut self, value: $ty) -> Result<(), WriteError> {
            self.write_bytes(&value.$to())
        }
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BitOrder {
    Big,
    Little,
}

/// Serializer mirroring the read surface of `binrt_reader::Stream`.
///
/// Every `read_*` has a `write_*` counterpart producing the same bytes.
/// Bit fields are packed into a pending byte that is flushed, zero
/// padded, by [`align_to_byte`](Self::align_to_byte) or by the next
/// byte-level write:
///
/// ```text
///   write_bits_int_be(3, 0b101)   pending: 101·····
///   write_bits_int_be(2, 0b11)    pending: 10111···
///   write_u1(0xFF)                out:     10111000 11111111
/// ```
///
/// Big- and little-endian bit fields cannot share a pending byte.
#[derive(Debug)]
pub struct Writer<W: Write + Seek> {
    inner: W,
    bits: u64,
    bits_left: u32,
    order: BitOrder,
}

impl Writer<Cursor<Vec<u8>>> {
    /// Writer over a growable in-memory buffer.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Cursor::new(Vec::new()))
    }
}

impl Writer<BufWriter<File>> {
    /// Create (or truncate) a file for writing.
    ///
    /// # Errors
    ///
    /// [`WriteError::Io`] if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, WriteError> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Seek> Writer<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bits: 0,
            bits_left: 0,
            order: BitOrder::Big,
        }
    }

    /// Current byte offset, after flushing any pending bits.
    ///
    /// # Errors
    ///
    /// [`WriteError::Io`] if flushing or querying the position fails.
    pub fn pos(&mut self) -> Result<u64, WriteError> {
        self.align_to_byte()?;
        Ok(self.inner.stream_position()?)
    }

    /// Total length of the output so far.
    ///
    /// # Errors
    ///
    /// [`WriteError::Io`] if seeking fails.
    pub fn size(&mut self) -> Result<u64, WriteError> {
        let pos = self.pos()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(end)
    }

    /// # Errors
    ///
    /// [`WriteError::Io`] if flushing or seeking fails.
    pub fn seek(&mut self, pos: u64) -> Result<(), WriteError> {
        self.align_to_byte()?;
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    /// # Errors
    ///
    /// [`WriteError::Io`] if flushing fails.
    pub fn flush(&mut self) -> Result<(), WriteError> {
        self.align_to_byte()?;
        self.inner.flush()?;
        Ok(())
    }

    /// Flush pending bits and hand back the underlying writer.
    ///
    /// # Errors
    ///
    /// [`WriteError::Io`] if flushing fails.
    pub fn into_inner(mut self) -> Result<W, WriteError> {
        self.flush()?;
        Ok(self.inner)
    }

    // ── Integers and floats ─────────────────────────────────────────────

    write_number!(write_s1, i8, to_be_bytes);
    write_number!(write_u1, u8, to_be_bytes);

    write_number!(write_s2be, i16, to_be_bytes);
    write_number!(write_s4be, i32, to_be_bytes);
    write_number!(write_s8be, i64, to_be_bytes);
    write_number!(write_u2be, u16, to_be_bytes);
    write_number!(write_u4be, u32, to_be_bytes);
    write_number!(write_u8be, u64, to_be_bytes);

    write_number!(write_s2le, i16, to_le_bytes);
    write_number!(write_s4le, i32, to_le_bytes);
    write_number!(write_s8le, i64, to_le_bytes);
    write_number!(write_u2le, u16, to_le_bytes);
    write_number!(write_u4le, u32, to_le_bytes);
    write_number!(write_u8le, u64, to_le_bytes);

    write_number!(write_f4be, f32, to_be_bytes);
    write_number!(write_f8be, f64, to_be_bytes);
    write_number!(write_f4le, f32, to_le_bytes);
    write_number!(write_f8le, f64, to_le_bytes);

    // ── Byte runs ───────────────────────────────────────────────────────

    /// # Errors
    ///
    /// [`WriteError::Io`] from the underlying writer.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        self.align_to_byte()?;
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Write `bytes` into a slot of exactly `size` bytes, filling the
    /// rest with `pad`.
    ///
    /// # Errors
    ///
    /// [`WriteError::FixedSizeExceeded`] if `bytes` is longer than
    /// `size`; nothing is written in that case.
    pub fn write_bytes_padded(&mut self, bytes: &[u8], size: usize, pad: u8) -> Result<(), WriteError> {
        if bytes.len() > size {
            return Err(WriteError::FixedSizeExceeded {
                len: bytes.len(),
                size,
            });
        }
        let mut slot = Vec::with_capacity(size);
        slot.extend_from_slice(bytes);
        slot.resize(size, pad);
        self.write_bytes(&slot)
    }

    // ── Bit fields ──────────────────────────────────────────────────────

    /// Number of bits waiting in the pending byte.
    pub fn bits_left(&self) -> u32 {
        self.bits_left
    }

    /// Flush the pending partial byte, zero padded.
    ///
    /// # Errors
    ///
    /// [`WriteError::Io`] from the underlying writer.
    pub fn align_to_byte(&mut self) -> Result<(), WriteError> {
        if self.bits_left == 0 {
            return Ok(());
        }
        // Only the low `bits_left` (< 8) bits are set.
        #[allow(clippy::cast_possible_truncation)]
        let byte = match self.order {
            BitOrder::Big => (self.bits << (8 - self.bits_left)) as u8,
            BitOrder::Little => self.bits as u8,
        };
        self.inner.write_all(&[byte])?;
        self.bits = 0;
        self.bits_left = 0;
        Ok(())
    }

    fn check_bits(&self, n: u32, value: u64, order: BitOrder) -> Result<(), WriteError> {
        if n > MAX_BIT_WIDTH {
            return Err(WriteError::InvalidArgument(format!(
                "cannot write {n} bits at once, at most {MAX_BIT_WIDTH} supported"
            )));
        }
        if value & !mask_ones(n) != 0 {
            return Err(WriteError::InvalidArgument(format!(
                "value {value:#x} does not fit in {n} bits"
            )));
        }
        if self.bits_left > 0 && self.order != order {
            return Err(WriteError::InvalidArgument(
                "cannot mix big- and little-endian bit fields within one byte".into(),
            ));
        }
        Ok(())
    }

    /// Write the low `n` bits of `value`, most significant first.
    ///
    /// # Errors
    ///
    /// [`WriteError::InvalidArgument`] for `n > 64`, for a value wider
    /// than `n` bits, or when a little-endian field is still pending.
    pub fn write_bits_int_be(&mut self, n: u32, value: u64) -> Result<(), WriteError> {
        self.check_bits(n, value, BitOrder::Big)?;

        let mut acc = (u128::from(self.bits) << n) | u128::from(value);
        let mut left = self.bits_left + n;
        let mut out = [0u8; 9];
        let mut len = 0;
        while left >= 8 {
            left -= 8;
            #[allow(clippy::cast_possible_truncation)]
            let byte = (acc >> left) as u8;
            out[len] = byte;
            len += 1;
        }
        acc &= (1u128 << left) - 1;

        self.inner.write_all(&out[..len])?;
        #[allow(clippy::cast_possible_truncation)]
        let pending = acc as u64;
        self.bits = pending;
        self.bits_left = left;
        self.order = BitOrder::Big;
        Ok(())
    }

    /// Write the low `n` bits of `value`, least significant first.
    ///
    /// # Errors
    ///
    /// [`WriteError::InvalidArgument`] for `n > 64`, for a value wider
    /// than `n` bits, or when a big-endian field is still pending.
    pub fn write_bits_int_le(&mut self, n: u32, value: u64) -> Result<(), WriteError> {
        self.check_bits(n, value, BitOrder::Little)?;

        let mut acc = u128::from(self.bits) | (u128::from(value) << self.bits_left);
        let mut left = self.bits_left + n;
        let mut out = [0u8; 9];
        let mut len = 0;
        while left >= 8 {
            #[allow(clippy::cast_possible_truncation)]
            let byte = acc as u8;
            out[len] = byte;
            len += 1;
            acc >>= 8;
            left -= 8;
        }

        self.inner.write_all(&out[..len])?;
        #[allow(clippy::cast_possible_truncation)]
        let pending = acc as u64;
        self.bits = pending;
        self.bits_left = left;
        self.order = BitOrder::Little;
        Ok(())
    }
}
