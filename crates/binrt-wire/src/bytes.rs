//! Byte-array helpers called by generated parsers after a raw read:
//! padding strip, in-buffer termination, ordering and modulo.

use std::cmp::Ordering;
use std::fmt::Write as _;

use crate::error::StreamError;

/// Strip trailing `pad` bytes.
///
/// ```rust
/// use binrt_wire::bytes::bytes_strip_right;
///
/// assert_eq!(bytes_strip_right(b"abc\0\0", 0), b"abc");
/// ```
pub fn bytes_strip_right(src: &[u8], pad: u8) -> &[u8] {
    let len = src.iter().rposition(|&b| b != pad).map_or(0, |i| i + 1);
    &src[..len]
}

/// Cut `src` at the first `terminator`, optionally keeping it.
///
/// If the terminator is absent the whole input is returned.
pub fn bytes_terminate(src: &[u8], terminator: u8, include_terminator: bool) -> &[u8] {
    match src.iter().position(|&b| b == terminator) {
        Some(i) if include_terminator => &src[..=i],
        Some(i) => &src[..i],
        None => src,
    }
}

/// Lexicographic comparison; a strict prefix orders first.
pub fn byte_array_compare(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

pub fn is_byte_array_zero(a: &[u8]) -> bool {
    a.iter().all(|&b| b == 0)
}

/// Floored modulo: the result is always in `0..b`, unlike `%`.
///
/// # Errors
///
/// [`StreamError::InvalidArgument`] if `b` is not positive.
pub fn modulo(a: i64, b: i64) -> Result<i64, StreamError> {
    if b <= 0 {
        return Err(StreamError::InvalidArgument(format!(
            "divisor of mod operation must be greater than zero, got {b}"
        )));
    }
    Ok(a.rem_euclid(b))
}

/// Render bytes as `[AA BB CC]` for diagnostics.
pub fn format_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3 + 2);
    out.push('[');
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{b:02X}");
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_right_removes_only_trailing_pad() {
        assert_eq!(bytes_strip_right(b"\0a\0b\0\0", 0), b"\0a\0b");
        assert_eq!(bytes_strip_right(b"\0\0", 0), b"");
        assert_eq!(bytes_strip_right(b"", 0x20), b"");
        assert_eq!(bytes_strip_right(b"name   ", b' '), b"name");
    }

    #[test]
    fn terminate_with_and_without_terminator() {
        assert_eq!(bytes_terminate(b"ab\0cd", 0, false), b"ab");
        assert_eq!(bytes_terminate(b"ab\0cd", 0, true), b"ab\0");
        assert_eq!(bytes_terminate(b"abcd", 0, true), b"abcd");
        assert_eq!(bytes_terminate(b"\0", 0, false), b"");
    }

    #[test]
    fn compare_orders_prefix_first() {
        assert_eq!(byte_array_compare(b"abc", b"abc"), Ordering::Equal);
        assert_eq!(byte_array_compare(b"ab", b"abc"), Ordering::Less);
        assert_eq!(byte_array_compare(b"b", b"abc"), Ordering::Greater);
        assert_eq!(byte_array_compare(&[0xFF], &[0x01]), Ordering::Greater);
    }

    #[test]
    fn zero_check() {
        assert!(is_byte_array_zero(&[]));
        assert!(is_byte_array_zero(&[0, 0, 0]));
        assert!(!is_byte_array_zero(&[0, 1, 0]));
    }

    #[test]
    fn modulo_is_never_negative() {
        assert_eq!(modulo(7, 3).unwrap(), 1);
        assert_eq!(modulo(-7, 3).unwrap(), 2);
        assert_eq!(modulo(-3, 3).unwrap(), 0);
        assert!(matches!(modulo(1, 0), Err(StreamError::InvalidArgument(_))));
        assert!(matches!(modulo(1, -2), Err(StreamError::InvalidArgument(_))));
    }

    #[test]
    fn hex_format() {
        assert_eq!(format_hex(&[]), "[]");
        assert_eq!(format_hex(&[0x0A, 0xFF]), "[0A FF]");
    }
}
