use std::ops::Deref;

use binrt_wire::ParseError;

use crate::context::ReaderContext;
use crate::stream::Stream;
use crate::sync_stream::SyncStream;

/// A type that can be parsed from an async [`Stream`].
///
/// Generated parser code implements this once per format type; nested
/// types call each other's `read` on the same stream.
#[allow(async_fn_in_trait)]
pub trait Structure<C: ReaderContext>: Sized {
    async fn read(io: &mut Stream<C>) -> Result<Self, ParseError>;
}

/// Blocking counterpart of [`Structure`] for [`SyncStream`].
pub trait SyncStructure<R>: Sized {
    fn read(io: &mut SyncStream<R>) -> Result<Self, ParseError>;
}

/// A parsed value together with a shared handle on the stream it came
/// from. The caller keeps owning the stream.
///
/// The handle is `&S`, so only `&self` queries are reachable through
/// [`io`](Self::io):
///
/// ```text
///   Parsed<_, _, SyncStream<R>>   pos(), size(), is_eof()
///   Parsed<_, _, Stream<C>>       pos() only
/// ```
///
/// On the async [`Stream`] `size()` and `is_eof()` may have to pull from
/// a forward-only source and take `&mut self`; call them on the stream
/// itself after [`into_inner`](Self::into_inner).
#[derive(Debug)]
pub struct Parsed<'io, T, S> {
    value: T,
    io: &'io S,
}

impl<'io, T, S> Parsed<'io, T, S> {
    pub fn new(value: T, io: &'io S) -> Self {
        Self { value, io }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn io(&self) -> &'io S {
        self.io
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T, S> Deref for Parsed<'_, T, S> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek};

    use binrt_wire::{Endian, ValidationError};

    use super::*;

    /// `magic "BR"`, an endian switch byte, then a u16 count in that
    /// order and `count` u8 items.
    #[derive(Debug, PartialEq)]
    struct Header {
        endian: Endian,
        items: Vec<u8>,
    }

    fn endian_from_switch(pos: u64, switch: u8) -> Result<Endian, ParseError> {
        let endian = match switch {
            b'B' => Some(Endian::Big),
            b'L' => Some(Endian::Little),
            _ => None,
        };
        Endian::resolve(endian).map_err(|e| {
            if switch == 0 {
                e
            } else {
                ValidationError::not_any_of(pos, "/header/endian", switch).into()
            }
        })
    }

    impl<C: ReaderContext> Structure<C> for Header {
        async fn read(io: &mut Stream<C>) -> Result<Self, ParseError> {
            io.ensure_fixed_contents(b"BR").await?;
            let pos = io.pos();
            let endian = endian_from_switch(pos, io.read_u1().await?)?;
            let count = match endian {
                Endian::Big => io.read_u2be().await?,
                Endian::Little => io.read_u2le().await?,
            };
            let items = io.read_bytes(u64::from(count)).await?;
            Ok(Self { endian, items })
        }
    }

    impl<R: Read + Seek> SyncStructure<R> for Header {
        fn read(io: &mut SyncStream<R>) -> Result<Self, ParseError> {
            io.ensure_fixed_contents(b"BR")?;
            let pos = io.pos();
            let endian = endian_from_switch(pos, io.read_u1()?)?;
            let count = match endian {
                Endian::Big => io.read_u2be()?,
                Endian::Little => io.read_u2le()?,
            };
            let items = io.read_bytes(u64::from(count))?;
            Ok(Self { endian, items })
        }
    }

    #[tokio::test]
    async fn async_size_is_queried_after_releasing_the_handle() {
        let mut io = Stream::from_bytes(b"BRB\x00\x01zPAD".to_vec());
        let header = io.parse::<Header>().await.unwrap().into_inner();
        assert_eq!(header.items, b"z");
        assert_eq!(io.size().await.unwrap(), 9);
        assert!(!io.is_eof().await.unwrap());
    }

    #[tokio::test]
    async fn parses_and_keeps_stream_handle() {
        let mut io = Stream::from_bytes(b"BRL\x02\x00xyTAIL".to_vec());
        let header = io.parse::<Header>().await.unwrap();
        assert_eq!(header.endian, Endian::Little);
        assert_eq!(header.items, b"xy");
        assert_eq!(header.io().pos(), 7);
        assert_eq!(header.into_inner().items.len(), 2);
    }

    #[test]
    fn sync_parse_matches() {
        let mut io = SyncStream::from_bytes(b"BRB\x00\x01z".to_vec());
        let header = io.parse::<Header>().unwrap();
        assert_eq!(header.value().endian, Endian::Big);
        assert_eq!(header.io().size(), 6);
        assert!(header.io().is_eof());
    }

    #[test]
    fn bad_magic_is_a_stream_error() {
        let mut io = SyncStream::from_bytes(b"XXL\x00\x00".to_vec());
        let err = io.parse::<Header>().unwrap_err();
        assert!(matches!(err, ParseError::Stream(_)));
    }

    #[test]
    fn bad_switch_is_a_validation_error() {
        let mut io = SyncStream::from_bytes(b"BRQ\x00\x00".to_vec());
        let err = io.parse::<Header>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "/header/endian: at pos 2: validation failed: not any of the list, got 81"
        );
    }

    #[test]
    fn zero_switch_is_undecided() {
        let mut io = SyncStream::from_bytes(b"BR\x00\x00\x00".to_vec());
        let err = io.parse::<Header>().unwrap_err();
        assert!(matches!(err, ParseError::UndecidedEndianness));
    }
}
