#![no_main]

use arbitrary::Arbitrary;
use binrt_reader::SyncStream;
use binrt_wire::mask_ones;
use binrt_writer::Writer;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    little: bool,
    fields: Vec<(u8, u64)>,
}

// Fuzz target: bit fields written by Writer read back unchanged.
fuzz_target!(|input: Input| {
    let fields: Vec<(u32, u64)> = input
        .fields
        .iter()
        .map(|&(n, v)| {
            let n = u32::from(n % 65);
            (n, v & mask_ones(n))
        })
        .collect();

    let mut w = Writer::in_memory();
    for &(n, v) in &fields {
        if input.little {
            w.write_bits_int_le(n, v).unwrap();
        } else {
            w.write_bits_int_be(n, v).unwrap();
        }
    }
    let bytes = w.into_inner().unwrap().into_inner();

    let mut io = SyncStream::from_bytes(bytes);
    for &(n, v) in &fields {
        let got = if input.little {
            io.read_bits_int_le(n).unwrap()
        } else {
            io.read_bits_int_be(n).unwrap()
        };
        assert_eq!(got, v);
    }
});
