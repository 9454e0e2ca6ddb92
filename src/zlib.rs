//! RFC 1950 (zlib) framing: a 2-byte header and a 4-byte big-endian
//! Adler-32 trailer wrapped around a raw RFC 1951 stream.
//!
//! Neither wrapper keeps its own copy of the inner codec's suspension
//! logic -- `ZlibEncoder` and `ZlibDecoder` are themselves small state
//! machines (`Header` / `Body` / `Trailer` / `Done`) in the same
//! `mem::replace`-driven style as [`crate::decoder::Rfc1951Decoder`] and
//! [`crate::encoder::Rfc1951Encoder`], delegating the `Body` state to one
//! of those two. The `Rfc1951Encoder` deliberately does not track a
//! checksum itself (see its module documentation), so `ZlibEncoder` keeps
//! its own running [`crate::checksum::Adler32`] over the raw bytes as they
//! pass through `Body`. On the decode side the inner decoder's
//! [`crate::window::Window`] already tracks the checksum over decoded
//! output, so `ZlibDecoder` just reads it back out once the inner session
//! reaches `End`.

use crate::checksum::{Adler32, Checksum};
use crate::decoder::Rfc1951Decoder;
use crate::encoder::{FlushMode, Rfc1951Encoder};
use crate::errors::{Lz77Error, ZlibError};
use crate::status::{Eval, Status};

/// Named constructor options for [`ZlibEncoder`], mirroring the teacher's
/// `DeflateEncodingOptions`.
#[derive(Debug, Clone, Copy)]
pub struct ZlibEncoderOptions
{
    /// `0..=9`; see [`crate::lz77::MatchFinder::new`].
    pub level: u8,
    /// `8..=15`; also determines the header's CINFO field.
    pub wbits: u8
}

impl Default for ZlibEncoderOptions
{
    fn default() -> Self
    {
        ZlibEncoderOptions { level: 4, wbits: 15 }
    }
}

fn zlib_flevel(level: u8) -> u8
{
    match level
    {
        0 | 1 => 0,
        2..=5 => 1,
        6 => 2,
        _ => 3
    }
}

fn zlib_header(level: u8, wbits: u8) -> [u8; 2]
{
    let cinfo = wbits - 8;
    let cmf = (cinfo << 4) | 8;
    let flg_hi = zlib_flevel(level) << 6;

    let mut word = (u16::from(cmf) << 8) | u16::from(flg_hi);
    word |= (31 - (word % 31)) % 31;

    word.to_be_bytes()
}

enum EncState
{
    Header
    {
        written: u8
    },
    Body,
    Trailer
    {
        written: u8
    },
    Done
}

/// A streaming zlib (RFC 1950) encoder wrapping an [`Rfc1951Encoder`].
pub struct ZlibEncoder
{
    inner:    Rfc1951Encoder,
    header:   [u8; 2],
    checksum: Adler32,
    trailer:  [u8; 4],
    state:    EncState,
    used_in:  usize,
    used_out: usize
}

impl ZlibEncoder
{
    pub fn new() -> Result<ZlibEncoder, Lz77Error>
    {
        ZlibEncoder::new_with_options(ZlibEncoderOptions::default())
    }

    pub fn new_with_options(options: ZlibEncoderOptions) -> Result<ZlibEncoder, Lz77Error>
    {
        Ok(ZlibEncoder {
            inner: Rfc1951Encoder::new(options.level, options.wbits)?,
            header: zlib_header(options.level, options.wbits),
            checksum: Adler32::new(),
            trailer: [0; 4],
            state: EncState::Header { written: 0 },
            used_in: 0,
            used_out: 0
        })
    }

    pub fn set_flush(&mut self, mode: FlushMode)
    {
        self.inner.set_flush(mode);
    }

    pub fn eval(&mut self, input: &[u8], output: &mut [u8]) -> Status<ZlibError>
    {
        let mut in_pos = 0_usize;
        let mut out_pos = 0_usize;

        let status = self.drive(input, &mut in_pos, output, &mut out_pos);

        self.used_in = in_pos;
        self.used_out = out_pos;

        status
    }

    pub fn used_in(&self) -> usize
    {
        self.used_in
    }

    pub fn used_out(&self) -> usize
    {
        self.used_out
    }

    fn drive(
        &mut self, input: &[u8], in_pos: &mut usize, output: &mut [u8], out_pos: &mut usize
    ) -> Status<ZlibError>
    {
        loop
        {
            match std::mem::replace(&mut self.state, EncState::Done)
            {
                EncState::Done => return Status::End,

                EncState::Header { mut written } =>
                {
                    while written < 2 && *out_pos < output.len()
                    {
                        output[*out_pos] = self.header[usize::from(written)];
                        *out_pos += 1;
                        written += 1;
                    }

                    if written < 2
                    {
                        self.state = EncState::Header { written };
                        return Status::Flush;
                    }

                    self.state = EncState::Body;
                }

                EncState::Body =>
                {
                    let sub_in = &input[*in_pos..];
                    let status = self.inner.eval(sub_in, &mut output[*out_pos..]);

                    let used_in = self.inner.used_in();
                    self.checksum.update(&sub_in[..used_in]);
                    *in_pos += used_in;
                    *out_pos += self.inner.used_out();

                    match status
                    {
                        Status::Await =>
                        {
                            self.state = EncState::Body;
                            return Status::Await;
                        }
                        Status::Flush =>
                        {
                            self.state = EncState::Body;
                            return Status::Flush;
                        }
                        Status::Error(e) => return Status::Error(ZlibError::from(e)),
                        Status::End =>
                        {
                            self.trailer = self.checksum.digest().to_be_bytes();
                            self.state = EncState::Trailer { written: 0 };
                        }
                    }
                }

                EncState::Trailer { mut written } =>
                {
                    while written < 4 && *out_pos < output.len()
                    {
                        output[*out_pos] = self.trailer[usize::from(written)];
                        *out_pos += 1;
                        written += 1;
                    }

                    if written < 4
                    {
                        self.state = EncState::Trailer { written };
                        return Status::Flush;
                    }

                    self.state = EncState::Done;
                }
            }
        }
    }
}

impl Eval for ZlibEncoder
{
    type Error = ZlibError;

    fn eval(&mut self, input: &[u8], output: &mut [u8]) -> Status<ZlibError>
    {
        ZlibEncoder::eval(self, input, output)
    }

    fn used_in(&self) -> usize
    {
        self.used_in
    }

    fn used_out(&self) -> usize
    {
        self.used_out
    }
}

enum DecState
{
    Header
    {
        buf:  [u8; 2],
        have: u8
    },
    Body,
    Trailer
    {
        buf: Vec<u8>
    },
    Done
}

/// A streaming zlib (RFC 1950) decoder wrapping an [`Rfc1951Decoder`). The
/// window size is read from the stream's own header rather than supplied
/// by the caller, since zlib is self-describing.
pub struct ZlibDecoder
{
    state:    DecState,
    inner:    Option<Rfc1951Decoder>,
    used_in:  usize,
    used_out: usize
}

impl ZlibDecoder
{
    pub fn new() -> ZlibDecoder
    {
        ZlibDecoder { state: DecState::Header { buf: [0; 2], have: 0 }, inner: None, used_in: 0, used_out: 0 }
    }

    pub fn eval(&mut self, input: &[u8], output: &mut [u8]) -> Status<ZlibError>
    {
        let mut in_pos = 0_usize;
        let mut out_pos = 0_usize;

        let status = self.drive(input, &mut in_pos, output, &mut out_pos);

        self.used_in = in_pos;
        self.used_out = out_pos;

        status
    }

    pub fn used_in(&self) -> usize
    {
        self.used_in
    }

    pub fn used_out(&self) -> usize
    {
        self.used_out
    }

    fn drive(
        &mut self, input: &[u8], in_pos: &mut usize, output: &mut [u8], out_pos: &mut usize
    ) -> Status<ZlibError>
    {
        loop
        {
            match std::mem::replace(&mut self.state, DecState::Done)
            {
                DecState::Done => return Status::End,

                DecState::Header { mut buf, mut have } =>
                {
                    while have < 2 && *in_pos < input.len()
                    {
                        buf[usize::from(have)] = input[*in_pos];
                        *in_pos += 1;
                        have += 1;
                    }

                    if have < 2
                    {
                        self.state = DecState::Header { buf, have };
                        return Status::Await;
                    }

                    let cmf = buf[0];
                    let flg = buf[1];

                    let word = (u16::from(cmf) << 8) | u16::from(flg);
                    let cm = cmf & 0x0F;
                    let cinfo = cmf >> 4;
                    let fdict = (flg >> 5) & 1;

                    if word % 31 != 0 || cm != 8 || cinfo > 7 || fdict != 0
                    {
                        return Status::Error(ZlibError::InvalidHeader);
                    }

                    let wbits = cinfo + 8;
                    self.inner = Some(Rfc1951Decoder::new(wbits, Checksum::Adler32(Adler32::new())));
                    self.state = DecState::Body;
                }

                DecState::Body =>
                {
                    let inner = self.inner.as_mut().expect("Body state only reachable after Header parses");
                    let status = inner.eval(&input[*in_pos..], &mut output[*out_pos..]);

                    *in_pos += inner.used_in();
                    *out_pos += inner.used_out();

                    match status
                    {
                        Status::Await =>
                        {
                            self.state = DecState::Body;
                            return Status::Await;
                        }
                        Status::Flush =>
                        {
                            self.state = DecState::Body;
                            return Status::Flush;
                        }
                        Status::Error(e) => return Status::Error(ZlibError::from(e)),
                        Status::End =>
                        {
                            let leftover = inner.take_leftover_bytes();
                            self.state = DecState::Trailer { buf: leftover };
                        }
                    }
                }

                DecState::Trailer { mut buf } =>
                {
                    while buf.len() < 4 && *in_pos < input.len()
                    {
                        buf.push(input[*in_pos]);
                        *in_pos += 1;
                    }

                    if buf.len() < 4
                    {
                        self.state = DecState::Trailer { buf };
                        return Status::Await;
                    }

                    let expect = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
                    let have = self
                        .inner
                        .as_ref()
                        .expect("Trailer state only reachable after Body")
                        .window()
                        .checksum_digest();

                    if have != expect
                    {
                        return Status::Error(ZlibError::InvalidChecksum { have, expect });
                    }

                    self.state = DecState::Done;
                }
            }
        }
    }
}

impl Default for ZlibDecoder
{
    fn default() -> Self
    {
        ZlibDecoder::new()
    }
}

impl Eval for ZlibDecoder
{
    type Error = ZlibError;

    fn eval(&mut self, input: &[u8], output: &mut [u8]) -> Status<ZlibError>
    {
        ZlibDecoder::eval(self, input, output)
    }

    fn used_in(&self) -> usize
    {
        self.used_in
    }

    fn used_out(&self) -> usize
    {
        self.used_out
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn encode_all(data: &[u8], options: ZlibEncoderOptions) -> Vec<u8>
    {
        let mut enc = ZlibEncoder::new_with_options(options).unwrap();
        enc.set_flush(FlushMode::Finish);

        let mut out = Vec::new();
        let mut scratch = [0_u8; 4096];
        let mut fed = false;

        loop
        {
            let chunk = if fed { &[][..] } else { data };
            match enc.eval(chunk, &mut scratch)
            {
                Status::End =>
                {
                    out.extend_from_slice(&scratch[..enc.used_out()]);
                    break;
                }
                Status::Flush => out.extend_from_slice(&scratch[..enc.used_out()]),
                Status::Await =>
                {
                    out.extend_from_slice(&scratch[..enc.used_out()]);
                    fed = true;
                }
                Status::Error(e) => panic!("encode error: {e}")
            }
        }

        out
    }

    fn decode_all(input: &[u8]) -> Vec<u8>
    {
        let mut dec = ZlibDecoder::new();
        let mut out = Vec::new();
        let mut scratch = [0_u8; 4096];

        loop
        {
            match dec.eval(input, &mut scratch)
            {
                Status::End =>
                {
                    out.extend_from_slice(&scratch[..dec.used_out()]);
                    break;
                }
                Status::Flush => out.extend_from_slice(&scratch[..dec.used_out()]),
                Status::Await => panic!("decoder stalled on encoder output"),
                Status::Error(e) => panic!("decode error: {e}")
            }
        }

        out
    }

    #[test]
    fn hello_at_level_six_matches_the_known_byte_sequence()
    {
        let out = encode_all(b"Hello", ZlibEncoderOptions { level: 6, wbits: 15 });
        assert_eq!(out, [0x78, 0x9C, 0xF3, 0x48, 0xCD, 0xC9, 0xC9, 0x07, 0x00, 0x05, 0x8C, 0x01, 0xF5]);
        assert_eq!(decode_all(&out), b"Hello");
    }

    #[test]
    fn repeated_run_round_trips_and_checksum_matches_known_value()
    {
        let out = encode_all(b"aaaaaaaa", ZlibEncoderOptions { level: 6, wbits: 15 });
        assert_eq!(decode_all(&out), b"aaaaaaaa");

        let trailer = u32::from_be_bytes(out[out.len() - 4..].try_into().unwrap());
        assert_eq!(trailer, 0x0C22_0205);
    }

    #[test]
    fn empty_input_is_eight_bytes()
    {
        let out = encode_all(b"", ZlibEncoderOptions::default());
        assert_eq!(out.len(), 8);
        assert_eq!(decode_all(&out), b"");
    }

    #[test]
    fn corrupted_trailer_is_rejected()
    {
        let mut out = encode_all(b"hello world", ZlibEncoderOptions::default());
        let last = out.len() - 1;
        out[last] ^= 0xFF;

        let mut dec = ZlibDecoder::new();
        let mut scratch = [0_u8; 4096];
        let mut status = dec.eval(&out, &mut scratch);

        while matches!(status, Status::Flush)
        {
            status = dec.eval(&[], &mut scratch);
        }

        assert!(matches!(status, Status::Error(ZlibError::InvalidChecksum { .. })));
    }

    #[test]
    fn reserved_block_type_surfaces_through_the_zlib_layer()
    {
        let header = zlib_header(4, 15);
        let mut data = header.to_vec();
        data.push(0b0000_0111);

        let mut dec = ZlibDecoder::new();
        let mut out = [0_u8; 16];
        assert!(matches!(
            dec.eval(&data, &mut out),
            Status::Error(ZlibError::Rfc1951(crate::errors::Rfc1951Error::InvalidKindOfBlock))
        ));
    }
}
