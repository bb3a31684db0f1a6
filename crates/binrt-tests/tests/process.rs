//! Byte transforms applied to data pulled off a stream, the way generated
//! code chains `read_bytes` with a `process` directive.

use std::io::Write;

use binrt_reader::Stream;
use binrt_wire::StreamError;
use binrt_wire::process::{
    CustomDecoder, RotateLeft, Xor, Zlib, process_rotate_left, process_xor_many, process_zlib,
};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use proptest::prelude::*;

fn zlib(plain: &[u8], level: Compression) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), level);
    enc.write_all(plain).unwrap();
    enc.finish().unwrap()
}

#[test]
fn zlib_round_trip_at_every_level() {
    let plain = b"The quick brown fox jumps over the lazy dog. ".repeat(40);
    for level in [Compression::none(), Compression::fast(), Compression::best()] {
        assert_eq!(process_zlib(&zlib(&plain, level)).unwrap(), plain);
    }
}

#[test]
fn zlib_empty_payload() {
    assert!(process_zlib(&zlib(b"", Compression::default())).unwrap().is_empty());
}

#[test]
fn corrupted_zlib_body_fails() {
    let mut data = zlib(b"some payload that compresses", Compression::default());
    // Invalid block type 0b11 in the first DEFLATE header.
    data[2] = 0xFF;
    assert!(matches!(
        process_zlib(&data),
        Err(StreamError::DecompressFailed(_))
    ));
}

#[tokio::test]
async fn length_prefixed_compressed_field() {
    let plain = b"section payload, repeated, repeated, repeated".to_vec();
    let packed = zlib(&plain, Compression::default());

    let mut blob = Vec::new();
    blob.extend_from_slice(&u32::try_from(packed.len()).unwrap().to_le_bytes());
    blob.extend_from_slice(&packed);
    blob.push(0xEE);

    let mut io = Stream::from_bytes(blob);
    let len = io.read_u4le().await.unwrap();
    let raw = io.read_bytes(u64::from(len)).await.unwrap();
    assert_eq!(Zlib.decode(&raw).unwrap(), plain);
    assert_eq!(io.read_u1().await.unwrap(), 0xEE);
}

#[test]
fn decoders_dispatch_uniformly() {
    let decoders: Vec<Box<dyn CustomDecoder>> = vec![
        Box::new(Xor::new([0xFF]).unwrap()),
        Box::new(RotateLeft {
            amount: 4,
            group_size: 1,
        }),
        Box::new(|src: &[u8]| -> Result<Vec<u8>, StreamError> {
            Ok(src.iter().rev().copied().collect())
        }),
    ];
    let outputs: Vec<Vec<u8>> = decoders
        .iter()
        .map(|d| d.decode(&[0x12, 0x34]).unwrap())
        .collect();
    assert_eq!(outputs, vec![vec![0xED, 0xCB], vec![0x21, 0x43], vec![0x34, 0x12]]);
}

proptest! {
    #[test]
    fn rotate_then_inverse_restores(data in prop::collection::vec(any::<u8>(), 0..64), k in 0i32..8) {
        let rotated = process_rotate_left(&data, k, 1).unwrap();
        let inverse = if k == 0 { 0 } else { 8 - k };
        prop_assert_eq!(process_rotate_left(&rotated, inverse, 1).unwrap(), data);
    }

    #[test]
    fn negative_rotation_is_right_rotation(data in prop::collection::vec(any::<u8>(), 0..64), k in 1i32..8) {
        let left = process_rotate_left(&data, 8 - k, 1).unwrap();
        prop_assert_eq!(process_rotate_left(&data, -k, 1).unwrap(), left);
    }

    #[test]
    fn xor_is_an_involution(
        data in prop::collection::vec(any::<u8>(), 0..64),
        key in prop::collection::vec(any::<u8>(), 1..8),
    ) {
        let once = process_xor_many(&data, &key).unwrap();
        prop_assert_eq!(process_xor_many(&once, &key).unwrap(), data);
    }
}
