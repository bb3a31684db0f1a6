use binrt_wire::StreamError;
use bytes::{Buf, BytesMut};
use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::cancel::CancellationToken;
use crate::config::StreamingConfig;
use crate::context::{ReaderContext, ensure_not_cancelled};

/// Reader context over a forward-only async source (pipe, socket,
/// channel, HTTP body).
///
/// Bytes are pulled from the source in chunks of
/// [`StreamingConfig::chunk_size`] only when a read needs them, and kept
/// in a window so that backward seeks can be served:
///
/// ```text
///   window_start          position                 window_end
///        │                    │                         │
///        ▼                    ▼                         ▼
///   ─────┬────────────────────┬─────────────────────────┬──────────
///  dropped│   lookbehind      │   read ahead, unread    │ not yet
///        └────────────────────┴─────────────────────────┘ received
/// ```
///
/// The context moves through three states:
///
/// ```text
///   Uninitialized → Open → Completed
/// ```
///
/// `Completed` is entered when the source reports end of data; from then
/// on the window is final and `window_end` is the total size.
///
/// A read-ahead races the [`CancellationToken`]. A cancelled call fails
/// with [`StreamError::Cancelled`] and leaves the position unchanged;
/// chunks that were fully received before the signal stay buffered.
#[derive(Debug)]
pub struct StreamingContext<R> {
    reader: R,
    config: StreamingConfig,
    window: BytesMut,
    window_start: u64,
    position: u64,
    pinned: Option<u64>,
    state: State,
    scratch: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Uninitialized,
    Open,
    Completed,
}

impl<R: AsyncRead + Unpin> StreamingContext<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, StreamingConfig::default())
    }

    #[must_use]
    pub fn with_config(reader: R, config: StreamingConfig) -> Self {
        Self {
            reader,
            config,
            window: BytesMut::new(),
            window_start: 0,
            position: 0,
            pinned: None,
            state: State::Uninitialized,
            scratch: Vec::new(),
        }
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Logical offset of the first byte still held in memory.
    pub fn window_start(&self) -> u64 {
        self.window_start
    }

    /// Logical offset one past the last byte received so far.
    pub fn window_end(&self) -> u64 {
        self.window_start + self.window.len() as u64
    }

    /// True once the source has reported end of data.
    pub fn is_completed(&self) -> bool {
        self.state == State::Completed
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn available(&self) -> u64 {
        self.window_end().saturating_sub(self.position)
    }

    fn offset_in_window(&self) -> usize {
        // Bounded by the window length, which is a usize.
        #[allow(clippy::cast_possible_truncation)]
        let offset = (self.position - self.window_start) as usize;
        offset
    }

    fn ensure_retained(&self) -> Result<(), StreamError> {
        if self.position < self.window_start {
            return Err(StreamError::Discarded {
                pos: self.position,
                window_start: self.window_start,
            });
        }
        Ok(())
    }

    /// Pull one chunk from the source into the window.
    async fn read_ahead(&mut self, cancel: &CancellationToken) -> Result<(), StreamError> {
        ensure_not_cancelled(cancel, self.position)?;
        if self.state == State::Completed {
            return Ok(());
        }

        let chunk_size = self.config.effective_chunk_size();
        self.scratch.resize(chunk_size, 0);

        let received = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("read-ahead cancelled at offset {}", self.position);
                return Err(StreamError::Cancelled { pos: self.position });
            }
            read = self.reader.read(&mut self.scratch) => read?,
        };

        if received == 0 {
            self.state = State::Completed;
        } else {
            self.state = State::Open;
            self.compact();
            self.window.extend_from_slice(&self.scratch[..received]);
        }

        trace!(
            "read-ahead: {received} bytes, window [{}, {}), completed={}",
            self.window_start,
            self.window_end(),
            self.is_completed()
        );
        Ok(())
    }

    /// Drop bytes more than `lookbehind` behind the cursor, never past a
    /// pinned offset.
    fn compact(&mut self) {
        let Some(lookbehind) = self.config.lookbehind else {
            return;
        };
        let mut keep_from = self.position.saturating_sub(lookbehind as u64);
        if let Some(pinned) = self.pinned {
            keep_from = keep_from.min(pinned);
        }
        let keep_from = keep_from.max(self.window_start);
        #[allow(clippy::cast_possible_truncation)]
        let drop = ((keep_from - self.window_start) as usize).min(self.window.len());
        if drop > 0 {
            self.window.advance(drop);
            self.window_start += drop as u64;
        }
    }

    /// Perform the initial read-ahead if none happened yet.
    pub async fn ensure_buffered(&mut self, cancel: &CancellationToken) -> Result<(), StreamError> {
        if self.state == State::Uninitialized {
            self.read_ahead(cancel).await?;
        }
        Ok(())
    }

    /// Read ahead until `count` bytes past the cursor are buffered or the
    /// source is exhausted.
    async fn fill(&mut self, count: usize, cancel: &CancellationToken) -> Result<(), StreamError> {
        while self.available() < count as u64 && self.state != State::Completed {
            self.read_ahead(cancel).await?;
        }
        Ok(())
    }

    async fn drain(&mut self, cancel: &CancellationToken) -> Result<(), StreamError> {
        while self.state != State::Completed {
            self.read_ahead(cancel).await?;
        }
        Ok(())
    }

    fn take(&mut self, buf: &mut [u8]) -> Result<(), StreamError> {
        let requested = buf.len() as u64;
        let available = self.available();
        if requested > available {
            debug!(
                "end of data at offset {}: requested {requested}, available {available}",
                self.position
            );
            return Err(StreamError::EndOfData {
                requested,
                available,
                pos: self.position,
            });
        }
        let offset = self.offset_in_window();
        buf.copy_from_slice(&self.window[offset..offset + buf.len()]);
        self.position += requested;
        Ok(())
    }
}

impl<R: AsyncRead + Unpin> ReaderContext for StreamingContext<R> {
    fn position(&self) -> u64 {
        self.position
    }

    fn pin(&mut self, pos: u64) {
        self.pinned = Some(pos);
    }

    fn unpin(&mut self) {
        self.pinned = None;
    }

    async fn size(&mut self, cancel: &CancellationToken) -> Result<u64, StreamError> {
        ensure_not_cancelled(cancel, self.position)?;
        self.drain(cancel).await?;
        Ok(self.window_end())
    }

    async fn is_eof(&mut self, cancel: &CancellationToken) -> Result<bool, StreamError> {
        ensure_not_cancelled(cancel, self.position)?;
        if self.position >= self.window_end() && self.state != State::Completed {
            self.read_ahead(cancel).await?;
        }
        Ok(self.position >= self.window_end())
    }

    async fn seek(&mut self, pos: u64, cancel: &CancellationToken) -> Result<(), StreamError> {
        ensure_not_cancelled(cancel, self.position)?;
        while pos > self.window_end() && self.state != State::Completed {
            self.read_ahead(cancel).await?;
        }
        let window_end = self.window_end();
        if pos > window_end {
            return Err(StreamError::EndOfData {
                requested: pos - self.position.min(pos),
                available: window_end.saturating_sub(self.position),
                pos: self.position,
            });
        }
        self.position = pos;
        Ok(())
    }

    async fn read_exact(
        &mut self,
        buf: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<(), StreamError> {
        ensure_not_cancelled(cancel, self.position)?;
        self.ensure_retained()?;
        self.fill(buf.len(), cancel).await?;
        self.take(buf)
    }

    async fn read_bytes(
        &mut self,
        count: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, StreamError> {
        ensure_not_cancelled(cancel, self.position)?;
        self.ensure_retained()?;
        self.fill(count, cancel).await?;
        let available = self.available();
        if count as u64 > available {
            debug!(
                "end of data at offset {}: requested {count}, available {available}",
                self.position
            );
            return Err(StreamError::EndOfData {
                requested: count as u64,
                available,
                pos: self.position,
            });
        }
        let mut out = vec![0u8; count];
        self.take(&mut out)?;
        Ok(out)
    }

    async fn read_bytes_full(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, StreamError> {
        ensure_not_cancelled(cancel, self.position)?;
        self.ensure_retained()?;
        self.drain(cancel).await?;
        let offset = self.offset_in_window();
        let out = self.window[offset..].to_vec();
        self.position = self.window_end();
        Ok(out)
    }
}
