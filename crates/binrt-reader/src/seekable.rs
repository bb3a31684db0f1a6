use std::fs::File;
use std::io::{BufReader, Cursor, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use binrt_wire::StreamError;

use crate::cancel::CancellationToken;
use crate::context::{ReaderContext, ensure_not_cancelled};

/// Reader context over a random-access source.
///
/// The size is measured once at construction, so [`size`](Self::size)
/// and [`is_eof`](Self::is_eof) are O(1). The position is tracked
/// explicitly; a read that cannot be satisfied in full fails with
/// [`StreamError::EndOfData`] before touching the source, and any short
/// read from the OS restores the source position.
///
/// The inherent methods are blocking and never suspend; the
/// [`ReaderContext`] impl wraps them so the same context can back an
/// async [`Stream`](crate::Stream).
#[derive(Debug)]
pub struct SeekableContext<R> {
    reader: R,
    pos: u64,
    size: u64,
}

impl SeekableContext<Cursor<Vec<u8>>> {
    /// Context over an in-memory buffer.
    #[must_use]
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let size = data.len() as u64;
        Self {
            reader: Cursor::new(data),
            pos: 0,
            size,
        }
    }
}

impl SeekableContext<BufReader<File>> {
    /// Open a file read-only.
    ///
    /// # Errors
    ///
    /// [`StreamError::Io`] if the file cannot be opened or measured.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> SeekableContext<R> {
    /// Wrap an already open source. Its current position becomes the
    /// context's starting position.
    ///
    /// # Errors
    ///
    /// [`StreamError::Io`] if seeking to measure the length fails.
    pub fn new(mut reader: R) -> Result<Self, StreamError> {
        let pos = reader.stream_position()?;
        let size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(pos))?;
        Ok(Self { reader, pos, size })
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.size
    }

    fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.pos)
    }

    /// # Errors
    ///
    /// [`StreamError::EndOfData`] if `pos` lies past the end of data.
    pub fn seek(&mut self, pos: u64) -> Result<(), StreamError> {
        if pos > self.size {
            return Err(StreamError::EndOfData {
                requested: pos - self.pos.min(pos),
                available: self.remaining(),
                pos: self.pos,
            });
        }
        self.reader.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    /// # Errors
    ///
    /// [`StreamError::EndOfData`] if fewer than `buf.len()` bytes remain.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), StreamError> {
        let requested = buf.len() as u64;
        let available = self.remaining();
        if requested > available {
            return Err(StreamError::EndOfData {
                requested,
                available,
                pos: self.pos,
            });
        }

        if let Err(e) = self.reader.read_exact(buf) {
            self.reader.seek(SeekFrom::Start(self.pos))?;
            return Err(match e.kind() {
                // The source shrank underneath us.
                ErrorKind::UnexpectedEof => StreamError::EndOfData {
                    requested,
                    available,
                    pos: self.pos,
                },
                _ => StreamError::Io(e),
            });
        }

        self.pos += requested;
        Ok(())
    }

    /// # Errors
    ///
    /// [`StreamError::EndOfData`] if fewer than `count` bytes remain.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, StreamError> {
        let available = self.remaining();
        if count as u64 > available {
            return Err(StreamError::EndOfData {
                requested: count as u64,
                available,
                pos: self.pos,
            });
        }
        let mut buf = vec![0u8; count];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// # Errors
    ///
    /// [`StreamError::EndOfData`] at end of data.
    pub fn read_u8(&mut self) -> Result<u8, StreamError> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    /// # Errors
    ///
    /// [`StreamError::Io`] on an I/O failure.
    pub fn read_bytes_full(&mut self) -> Result<Vec<u8>, StreamError> {
        #[allow(clippy::cast_possible_truncation)]
        let count = self.remaining() as usize;
        self.read_bytes(count)
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> ReaderContext for SeekableContext<R> {
    fn position(&self) -> u64 {
        self.pos
    }

    async fn size(&mut self, cancel: &CancellationToken) -> Result<u64, StreamError> {
        ensure_not_cancelled(cancel, self.pos)?;
        Ok(self.size)
    }

    async fn is_eof(&mut self, cancel: &CancellationToken) -> Result<bool, StreamError> {
        ensure_not_cancelled(cancel, self.pos)?;
        Ok(SeekableContext::is_eof(self))
    }

    async fn seek(&mut self, pos: u64, cancel: &CancellationToken) -> Result<(), StreamError> {
        ensure_not_cancelled(cancel, self.pos)?;
        SeekableContext::seek(self, pos)
    }

    async fn read_exact(
        &mut self,
        buf: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<(), StreamError> {
        ensure_not_cancelled(cancel, self.pos)?;
        SeekableContext::read_exact(self, buf)
    }

    async fn read_bytes(
        &mut self,
        count: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, StreamError> {
        ensure_not_cancelled(cancel, self.pos)?;
        SeekableContext::read_bytes(self, count)
    }

    async fn read_bytes_full(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, StreamError> {
        ensure_not_cancelled(cancel, self.pos)?;
        SeekableContext::read_bytes_full(self)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::cancel::CancellationSource;

    #[test]
    fn reports_size_and_eof() {
        let mut ctx = SeekableContext::from_bytes(vec![1, 2, 3]);
        assert_eq!(ctx.size(), 3);
        assert!(!ctx.is_eof());
        ctx.seek(3).unwrap();
        assert!(ctx.is_eof());
    }

    #[test]
    fn empty_buffer_is_eof_at_start() {
        let ctx = SeekableContext::from_bytes(Vec::new());
        assert!(ctx.is_eof());
        assert_eq!(ctx.position(), 0);
    }

    #[test]
    fn short_read_fails_without_moving() {
        let mut ctx = SeekableContext::from_bytes(vec![1, 2, 3]);
        ctx.read_u8().unwrap();
        let err = ctx.read_bytes(5).unwrap_err();
        assert!(matches!(
            err,
            StreamError::EndOfData {
                requested: 5,
                available: 2,
                pos: 1
            }
        ));
        assert_eq!(ctx.position(), 1);
        assert_eq!(ctx.read_bytes(2).unwrap(), vec![2, 3]);
    }

    #[test]
    fn seek_past_end_is_rejected() {
        let mut ctx = SeekableContext::from_bytes(vec![0; 4]);
        assert!(ctx.seek(4).is_ok());
        assert!(ctx.seek(5).unwrap_err().is_end_of_data());
        assert_eq!(ctx.position(), 4);
    }

    #[test]
    fn read_full_drains_remainder() {
        let mut ctx = SeekableContext::from_bytes(b"header:body".to_vec());
        ctx.seek(7).unwrap();
        assert_eq!(ctx.read_bytes_full().unwrap(), b"body");
        assert!(ctx.is_eof());
        assert!(ctx.read_bytes_full().unwrap().is_empty());
    }

    #[test]
    fn wraps_source_at_its_current_position() {
        let mut cursor = Cursor::new(vec![9, 8, 7, 6]);
        cursor.seek(SeekFrom::Start(2)).unwrap();
        let mut ctx = SeekableContext::new(cursor).unwrap();
        assert_eq!(ctx.position(), 2);
        assert_eq!(ctx.size(), 4);
        assert_eq!(ctx.read_u8().unwrap(), 7);
    }

    #[test]
    fn opens_files_read_only() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xCA, 0xFE, 0xBA, 0xBE]).unwrap();
        file.flush().unwrap();

        let mut ctx = SeekableContext::open(file.path()).unwrap();
        assert_eq!(ctx.size(), 4);
        assert_eq!(ctx.read_bytes(4).unwrap(), vec![0xCA, 0xFE, 0xBA, 0xBE]);
        assert!(ctx.is_eof());
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let err = SeekableContext::open("/definitely/not/here.bin").unwrap_err();
        assert!(matches!(err, StreamError::Io(_)));
    }

    #[tokio::test]
    async fn async_ops_observe_cancellation() {
        let source = CancellationSource::new();
        source.cancel();
        let token = source.token();

        let mut ctx = SeekableContext::from_bytes(vec![1, 2]);
        let err = ReaderContext::read_u8(&mut ctx, &token).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(ReaderContext::position(&ctx), 0);

        let live = CancellationToken::none();
        assert_eq!(ReaderContext::read_u8(&mut ctx, &live).await.unwrap(), 1);
    }
}
