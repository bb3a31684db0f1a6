//! Reversible byte transforms applied to raw byte runs.
//!
//! These are pure functions: no stream cursor is involved, so they can
//! be called on any buffer, before or after a read.

use std::io::Read;

use flate2::read::DeflateDecoder;

use crate::error::StreamError;

/// Compression method nibble for DEFLATE in the zlib CMF byte (RFC 1950).
const ZLIB_CM_DEFLATE: u8 = 0x08;

/// FLG bit signalling a 4-byte preset dictionary id after the header.
const ZLIB_FDICT: u8 = 0x20;

const ZLIB_HEADER_LEN: usize = 2;
const ZLIB_DICT_ID_LEN: usize = 4;
/// Trailing Adler-32 checksum.
const ZLIB_FOOTER_LEN: usize = 4;

/// XOR every byte with a single-byte key.
pub fn process_xor_one(data: &[u8], key: u8) -> Vec<u8> {
    data.iter().map(|&b| b ^ key).collect()
}

/// XOR byte `i` with `key[i % key.len()]`.
///
/// # Errors
///
/// [`StreamError::InvalidArgument`] if `key` is empty.
pub fn process_xor_many(data: &[u8], key: &[u8]) -> Result<Vec<u8>, StreamError> {
    if key.is_empty() {
        return Err(StreamError::InvalidArgument(
            "xor key must not be empty".to_string(),
        ));
    }
    Ok(data
        .iter()
        .zip(key.iter().cycle())
        .map(|(&b, &k)| b ^ k)
        .collect())
}

/// Rotate each group of `group_size` bytes left by `amount` bits.
///
/// `amount` must be in `-7..=7`; a negative amount rotates right
/// (`-2` is the same as `+6`). Only single-byte groups are supported.
///
/// # Errors
///
/// - [`StreamError::InvalidArgument`] if `amount` is out of range.
/// - [`StreamError::NotImplemented`] if `group_size` is not 1.
pub fn process_rotate_left(
    data: &[u8],
    amount: i32,
    group_size: usize,
) -> Result<Vec<u8>, StreamError> {
    if !(-7..=7).contains(&amount) {
        return Err(StreamError::InvalidArgument(format!(
            "rotation of more than 7 cannot be performed, got {amount}"
        )));
    }
    let amount = if amount < 0 { amount + 8 } else { amount };

    match group_size {
        1 => {
            #[allow(clippy::cast_sign_loss)]
            let amount = amount as u32;
            Ok(data.iter().map(|b| b.rotate_left(amount)).collect())
        }
        _ => Err(StreamError::NotImplemented(format!(
            "unable to rotate a group of {group_size} bytes yet"
        ))),
    }
}

/// Inflate a zlib-wrapped DEFLATE stream (RFC 1950).
///
/// The 2-byte header (6 bytes with FDICT) and the trailing Adler-32 are
/// skipped; the interior goes through a raw DEFLATE decoder.
///
/// ```text
/// ┌─────┬─────┬──────────────┬─────────────────┬──────────┐
/// │ CMF │ FLG │ [DICTID: 4]  │ DEFLATE data …  │ ADLER32  │
/// └─────┴─────┴──────────────┴─────────────────┴──────────┘
/// ```
///
/// # Errors
///
/// - [`StreamError::EndOfData`] if the input is too short for header
///   and footer.
/// - [`StreamError::Unsupported`] if CMF does not name DEFLATE.
/// - [`StreamError::DecompressFailed`] if the DEFLATE decoder fails.
pub fn process_zlib(data: &[u8]) -> Result<Vec<u8>, StreamError> {
    if data.len() < ZLIB_HEADER_LEN {
        return Err(StreamError::EndOfData {
            requested: ZLIB_HEADER_LEN as u64,
            available: data.len() as u64,
            pos: 0,
        });
    }

    let cmf = data[0];
    if cmf & 0x0F != ZLIB_CM_DEFLATE {
        return Err(StreamError::Unsupported(format!(
            "only the DEFLATE algorithm is supported for zlib data, CMF was {cmf:#04X}"
        )));
    }

    let flg = data[1];
    let header_len = if flg & ZLIB_FDICT == ZLIB_FDICT {
        ZLIB_HEADER_LEN + ZLIB_DICT_ID_LEN
    } else {
        ZLIB_HEADER_LEN
    };

    let framing = header_len + ZLIB_FOOTER_LEN;
    if data.len() < framing {
        return Err(StreamError::EndOfData {
            requested: framing as u64,
            available: data.len() as u64,
            pos: 0,
        });
    }

    let body = &data[header_len..data.len() - ZLIB_FOOTER_LEN];
    let mut decoder = DeflateDecoder::new(body);
    let mut out = Vec::with_capacity(body.len() * 2);
    decoder.read_to_end(&mut out).map_err(|e| {
        log::debug!("zlib inflate failed after {} output bytes: {e}", out.len());
        StreamError::DecompressFailed(e.to_string())
    })?;
    Ok(out)
}

/// A byte transform that generated code can invoke for a `process`
/// directive, whether built in or user supplied.
pub trait CustomDecoder {
    /// Decode `src` into a new buffer.
    ///
    /// # Errors
    ///
    /// Implementation-defined; built-in processors return the errors of
    /// the corresponding `process_*` function.
    fn decode(&self, src: &[u8]) -> Result<Vec<u8>, StreamError>;
}

impl<F> CustomDecoder for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, StreamError>,
{
    fn decode(&self, src: &[u8]) -> Result<Vec<u8>, StreamError> {
        self(src)
    }
}

/// XOR with a repeating key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Xor {
    key: Vec<u8>,
}

impl Xor {
    /// # Errors
    ///
    /// [`StreamError::InvalidArgument`] if `key` is empty.
    pub fn new(key: impl Into<Vec<u8>>) -> Result<Self, StreamError> {
        let key = key.into();
        if key.is_empty() {
            return Err(StreamError::InvalidArgument(
                "xor key must not be empty".to_string(),
            ));
        }
        Ok(Self { key })
    }
}

impl CustomDecoder for Xor {
    fn decode(&self, src: &[u8]) -> Result<Vec<u8>, StreamError> {
        match self.key.as_slice() {
            [single] => Ok(process_xor_one(src, *single)),
            key => process_xor_many(src, key),
        }
    }
}

/// Bit rotation within byte groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RotateLeft {
    pub amount: i32,
    pub group_size: usize,
}

impl CustomDecoder for RotateLeft {
    fn decode(&self, src: &[u8]) -> Result<Vec<u8>, StreamError> {
        process_rotate_left(src, self.amount, self.group_size)
    }
}

/// zlib inflate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Zlib;

impl CustomDecoder for Zlib {
    fn decode(&self, src: &[u8]) -> Result<Vec<u8>, StreamError> {
        process_zlib(src)
    }
}
