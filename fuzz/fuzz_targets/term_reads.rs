#![no_main]

use binrt_reader::SyncStream;
use libfuzzer_sys::fuzz_target;

// Fuzz target: terminator-delimited reads.
//
// Input format:
//   byte 0: terminator
//   byte 1: flags (bit 0 include, bit 1 consume, bit 2 eos_error)
//   rest: the stream
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let term = data[0];
    let include = data[1] & 1 != 0;
    let consume = data[1] & 2 != 0;
    let eos_error = data[1] & 4 != 0;
    let body = &data[2..];

    let mut io = SyncStream::from_bytes(body.to_vec());
    while !io.is_eof() {
        let before = io.pos();
        match io.read_bytes_term(term, include, consume, eos_error) {
            Ok(out) => {
                let start = usize::try_from(before).unwrap();
                let found = body[start..].iter().position(|&b| b == term);
                match found {
                    Some(i) => {
                        let expect_len = if include { i + 1 } else { i };
                        assert_eq!(out.len(), expect_len);
                        let expect_pos = if consume { i + 1 } else { i };
                        assert_eq!(io.pos(), before + expect_pos as u64);
                        if !consume {
                            // Step over the terminator to make progress.
                            io.read_u1().unwrap();
                        }
                    }
                    None => {
                        assert_eq!(out, &body[start..]);
                        assert!(io.is_eof());
                    }
                }
            }
            Err(e) => {
                assert!(e.is_end_of_data());
                assert_eq!(io.pos(), before);
                break;
            }
        }
    }
});
