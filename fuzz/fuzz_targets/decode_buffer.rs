#![no_main]

use libfuzzer_sys::fuzz_target;
use pushflate::{Checksum, Rfc1951Decoder, Status};

fuzz_target!(|data: &[u8]| {
    let mut decoder = Rfc1951Decoder::new(15, Checksum::None);
    let mut scratch = [0_u8; 4096];
    let mut pos = 0_usize;

    loop
    {
        match decoder.eval(&data[pos..], &mut scratch)
        {
            Status::Await =>
            {
                pos += decoder.used_in();
                if pos >= data.len()
                {
                    break;
                }
            }
            Status::Flush =>
            {
                pos += decoder.used_in();
            }
            Status::End | Status::Error(_) => break
        }
    }
});
