#![no_main]

use libfuzzer_sys::fuzz_target;
use pushflate::{Checksum, Rfc1951Decoder, Status};

fuzz_target!(|data: &[u8]| {
    if data.len() <= 10
    {
        return;
    }

    let level = data[0] % 10;
    let data = &data[1..];
    let compressed = miniz_oxide::deflate::compress_to_vec(data, level);

    let mut decoder = Rfc1951Decoder::new(15, Checksum::None);
    let mut decoded = Vec::with_capacity(data.len());
    let mut scratch = [0_u8; 4096];
    let mut pos = 0_usize;

    loop
    {
        match decoder.eval(&compressed[pos..], &mut scratch)
        {
            Status::Await | Status::Flush =>
            {
                decoded.extend_from_slice(&scratch[..decoder.used_out()]);
                pos += decoder.used_in();
            }
            Status::End =>
            {
                decoded.extend_from_slice(&scratch[..decoder.used_out()]);
                break;
            }
            Status::Error(e) => panic!("failed to decompress data miniz_oxide produced: {e}")
        }
    }

    assert_eq!(decoded, data, "decompressed output doesn't match the original input");
});
