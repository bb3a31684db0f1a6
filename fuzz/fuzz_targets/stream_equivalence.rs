#![no_main]

use binrt_reader::{Stream, StreamingConfig, SyncStream};
use binrt_tests::{ChunkedReader, ReadOp, run_async, run_sync};
use libfuzzer_sys::fuzz_target;

/// Decode a read script from `script`, two bytes per op.
fn decode_ops(script: &[u8]) -> Vec<ReadOp> {
    script
        .chunks_exact(2)
        .map(|pair| {
            let (kind, arg) = (pair[0], pair[1]);
            let include = arg & 1 != 0;
            let consume = arg & 2 != 0;
            let eos_error = arg & 4 != 0;
            match kind % 16 {
                0 => ReadOp::U1,
                1 => ReadOp::U2be,
                2 => ReadOp::U4le,
                3 => ReadOp::S8be,
                4 => ReadOp::F4le,
                5 => ReadOp::BitsBe(u32::from(arg % 66)),
                6 => ReadOp::BitsLe(u32::from(arg % 66)),
                7 => ReadOp::Align,
                8 => ReadOp::Bytes(u64::from(arg % 16)),
                9 => ReadOp::Full,
                10 => ReadOp::Term {
                    term: arg >> 4,
                    include,
                    consume,
                    eos_error,
                },
                11 => ReadOp::TermMulti {
                    term: vec![arg >> 4; usize::from(arg >> 6) + 1],
                    include,
                    consume,
                    eos_error,
                },
                12 => ReadOp::Fixed(vec![arg >> 4; usize::from(arg & 3)]),
                13 => ReadOp::Seek(u64::from(arg)),
                14 => ReadOp::IsEof,
                _ => ReadOp::Size,
            }
        })
        .collect()
}

// Fuzz target: seekable, streaming and blocking backends agree.
//
// Input format:
//   byte 0: chunk size
//   byte 1: script length in ops (n)
//   bytes 2..2+2n: script
//   rest: the stream
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let chunk = usize::from(data[0]).max(1);
    let script_len = (usize::from(data[1]) * 2).min(data.len() - 2);
    let ops = decode_ops(&data[2..2 + script_len]);
    let body = data[2 + script_len..].to_vec();

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let seekable = rt.block_on(async {
        let mut io = Stream::from_bytes(body.clone());
        run_async(&mut io, &ops).await
    });
    let streaming = rt.block_on(async {
        let reader = ChunkedReader::new(body.clone(), chunk);
        let mut io = Stream::with_config(reader, StreamingConfig::default().with_chunk_size(chunk));
        run_async(&mut io, &ops).await
    });
    let blocking = run_sync(&mut SyncStream::from_bytes(body), &ops);

    assert_eq!(seekable, streaming);
    assert_eq!(seekable, blocking);
});
