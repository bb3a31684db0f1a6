#![no_main]

use binrt_reader::SyncStream;
use libfuzzer_sys::fuzz_target;

// Fuzz target: interleaved bit and byte reads.
//
// Input format:
//   byte 0: number of width bytes (w)
//   bytes 1..=w: widths; bit 7 selects little-endian, low 7 bits the width
//   rest: the stream
//
// Widths above 64 must be rejected without consuming anything, and the
// position must never exceed the stream length.
fuzz_target!(|data: &[u8]| {
    let Some((&count, rest)) = data.split_first() else {
        return;
    };
    let count = usize::from(count).min(rest.len());
    let (widths, body) = rest.split_at(count);

    let mut io = SyncStream::from_bytes(body.to_vec());
    for &w in widths {
        let n = u32::from(w & 0x7F);
        let before = io.pos();
        let result = if w & 0x80 == 0 {
            io.read_bits_int_be(n)
        } else {
            io.read_bits_int_le(n)
        };
        match result {
            Ok(v) => {
                if n < 64 {
                    assert!(v < (1u64 << n));
                }
            }
            Err(_) => assert_eq!(io.pos(), before),
        }
        assert!(io.pos() <= io.size());
        if w == 0 {
            io.align_to_byte();
        }
    }
});
