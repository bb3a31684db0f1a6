#![no_main]

use binrt_wire::process::process_zlib;
use libfuzzer_sys::fuzz_target;

// Fuzz target: zlib inflate on arbitrary input must fail cleanly.
fuzz_target!(|data: &[u8]| {
    let _ = process_zlib(data);
});
