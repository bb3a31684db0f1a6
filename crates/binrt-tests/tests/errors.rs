//! Error messages are part of the diagnostics surface; pin them with
//! inline snapshots.

use binrt_reader::{CancellationSource, Stream, StreamingConfig, SyncStream};
use binrt_tests::ChunkedReader;
use binrt_wire::process::{process_rotate_left, process_zlib};
use binrt_wire::{ParseError, StreamError, ValidationError};
use binrt_writer::Writer;
use insta::assert_snapshot;

#[test]
fn end_of_data() {
    let mut io = SyncStream::from_bytes(vec![1, 2, 3]);
    io.read_u1().unwrap();
    let err = io.read_u8be().unwrap_err();
    assert_snapshot!(err.to_string(), @"requested 8 bytes at offset 1, but only 2 available");
}

#[test]
fn terminator_not_found() {
    let mut io = SyncStream::from_bytes(b"ABC".to_vec());
    let err = io.read_bytes_term(b'Z', false, true, true).unwrap_err();
    assert_snapshot!(err.to_string(), @"end of stream reached at offset 3, but no terminator 0x5A found");

    let err = io.read_bytes_term_multi(&[0, 0], false, true, true).unwrap_err();
    assert_snapshot!(err.to_string(), @"end of stream reached at offset 3, but no terminator [00 00] found");
}

#[test]
fn content_mismatch() {
    let mut io = SyncStream::from_bytes(b"PK\x03\x05".to_vec());
    let err = io.ensure_fixed_contents(b"PK\x03\x04").unwrap_err();
    assert_snapshot!(err.to_string(), @"content mismatch at offset 0: expected [50 4B 03 04], got [50 4B 03 05]");
}

#[test]
fn invalid_arguments() {
    let mut io = SyncStream::from_bytes(Vec::new());
    let err = io.read_bytes(1 << 32).unwrap_err();
    assert_snapshot!(err.to_string(), @"invalid argument: requested 4294967296 bytes, while only non-negative int32 amount of bytes possible");

    let err = io.read_bits_int_le(65).unwrap_err();
    assert_snapshot!(err.to_string(), @"invalid argument: cannot read 65 bits at once, at most 64 supported");

    let err = process_rotate_left(&[1], 9, 1).unwrap_err();
    assert_snapshot!(err.to_string(), @"invalid argument: rotation of more than 7 cannot be performed, got 9");

    let err = process_rotate_left(&[1], 1, 2).unwrap_err();
    assert_snapshot!(err.to_string(), @"not implemented: unable to rotate a group of 2 bytes yet");
}

#[test]
fn unsupported_zlib_method() {
    let err = process_zlib(&[0x07, 0x00, 0, 0, 0, 0]).unwrap_err();
    assert_snapshot!(err.to_string(), @"unsupported: only the DEFLATE algorithm is supported for zlib data, CMF was 0x07");
}

#[tokio::test]
async fn cancelled_and_discarded() {
    let source = CancellationSource::new();
    source.cancel();
    let mut io = Stream::from_bytes(vec![0; 4]).with_cancellation(source.token());
    let err = io.read_u1().await.unwrap_err();
    assert_snapshot!(err.to_string(), @"operation cancelled at offset 0");

    let config = StreamingConfig::default().with_chunk_size(2).with_lookbehind(0);
    let mut io = Stream::with_config(ChunkedReader::new(vec![0; 8], 2), config);
    io.read_bytes(4).await.unwrap();
    io.read_u1().await.unwrap();
    io.seek(1).await.unwrap();
    let err = io.read_u1().await.unwrap_err();
    assert_snapshot!(err.to_string(), @"offset 1 was discarded from the stream window (window starts at 4)");
}

#[test]
fn validation_errors() {
    let err: ParseError = ValidationError::not_equal_bytes(0, "/seq/0", b"\x7FELF", b"MZ\x90\x00").into();
    assert_snapshot!(err.to_string(), @"/seq/0: at pos 0: validation failed: not equal, expected [7F 45 4C 46], but got [4D 5A 90 00]");

    let err: ParseError = ValidationError::greater_than(6, "/types/header/seq/2", 3, 9).into();
    assert_snapshot!(err.to_string(), @"/types/header/seq/2: at pos 6: validation failed: not in range, max 3, but got 9");

    assert_snapshot!(ParseError::UndecidedEndianness.to_string(), @"unable to decide on endianness");
    assert_snapshot!(
        ParseError::from(StreamError::Cancelled { pos: 9 }).to_string(),
        @"operation cancelled at offset 9"
    );
}

#[test]
fn fixed_size_exceeded() {
    let mut w = Writer::in_memory();
    let err = w.write_bytes_padded(b"overflow", 4, 0).unwrap_err();
    assert_snapshot!(err.to_string(), @"byte run of 8 bytes does not fit in fixed size 4");
}
