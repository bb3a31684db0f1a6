use binrt_wire::StreamError;

use crate::cancel::CancellationToken;

/// Raw byte access underneath a [`Stream`](crate::Stream).
///
/// Two implementations exist:
///
/// ```text
/// ┌───────────────────┬───────────────────────┬──────────────────────────┐
/// │ Context           │ Backing source        │ Suspends?                │
/// ├───────────────────┼───────────────────────┼──────────────────────────┤
/// │ SeekableContext   │ Read + Seek (buffer,  │ never                    │
/// │                   │ file, cursor)         │                          │
/// │ StreamingContext  │ AsyncRead (pipe,      │ on every read-ahead      │
/// │                   │ socket, channel)      │                          │
/// └───────────────────┴───────────────────────┴──────────────────────────┘
/// ```
///
/// All positions are logical offsets from the start of the data. Every
/// operation observes `cancel` before doing any work, and suspending
/// implementations race it against each wait for more data. A failed
/// or cancelled call leaves [`position`](Self::position) where it was.
#[allow(async_fn_in_trait)]
pub trait ReaderContext {
    /// Current logical byte offset.
    fn position(&self) -> u64;

    /// Total length of the data. On forward-only sources this drains
    /// the source.
    async fn size(&mut self, cancel: &CancellationToken) -> Result<u64, StreamError>;

    /// True when no bytes remain. Never moves the position, though a
    /// forward-only source may need to wait for data to decide.
    async fn is_eof(&mut self, cancel: &CancellationToken) -> Result<bool, StreamError>;

    /// Move to an absolute position no further than the end of data.
    async fn seek(&mut self, pos: u64, cancel: &CancellationToken) -> Result<(), StreamError>;

    /// Fill `buf` completely or fail with `EndOfData`.
    async fn read_exact(
        &mut self,
        buf: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<(), StreamError>;

    /// Read exactly `count` bytes. Availability is checked before the
    /// output buffer is allocated.
    async fn read_bytes(
        &mut self,
        count: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, StreamError>;

    /// Read everything from the current position to the end.
    async fn read_bytes_full(&mut self, cancel: &CancellationToken)
    -> Result<Vec<u8>, StreamError>;

    /// Keep every byte from `pos` onward readable until [`unpin`](Self::unpin),
    /// whatever the buffering policy. Contexts that hold the whole source
    /// ignore this.
    fn pin(&mut self, _pos: u64) {}

    /// Release the mark set by [`pin`](Self::pin).
    fn unpin(&mut self) {}

    async fn read_u8(&mut self, cancel: &CancellationToken) -> Result<u8, StreamError> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte, cancel).await?;
        Ok(byte[0])
    }
}

/// Fail with `Cancelled` if the token already fired.
pub(crate) fn ensure_not_cancelled(
    cancel: &CancellationToken,
    pos: u64,
) -> Result<(), StreamError> {
    if cancel.is_cancelled() {
        return Err(StreamError::Cancelled { pos });
    }
    Ok(())
}
