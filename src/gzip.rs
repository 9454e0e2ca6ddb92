//! RFC 1952 (gzip) framing: a variable-length header carrying optional
//! metadata, a raw RFC 1951 stream, and an 8-byte little-endian trailer
//! (CRC-32 then ISIZE).
//!
//! Grounded on the same `Header` / `Body` / `Trailer` / `Done` shape as
//! [`crate::zlib`], generalized for gzip's optional EXTRA/NAME/COMMENT/
//! HCRC fields. The encoder builds its whole header up front (its length
//! is known as soon as the options are fixed) and drains it as a plain
//! byte buffer; the decoder has to parse the same fields incrementally
//! since their presence and length depend on FLG bits and, for the
//! NUL-terminated fields, on where the NUL actually falls in the stream.

use crate::checksum::Crc32;
use crate::decoder::Rfc1951Decoder;
use crate::checksum::Checksum;
use crate::encoder::{FlushMode, Rfc1951Encoder};
use crate::errors::{GzipError, Lz77Error};
use crate::status::{Eval, Status};

const MAGIC: [u8; 2] = [0x1F, 0x8B];
const CM_DEFLATE: u8 = 8;

const FLG_FTEXT: u8 = 0x01;
const FLG_FHCRC: u8 = 0x02;
const FLG_FEXTRA: u8 = 0x04;
const FLG_FNAME: u8 = 0x08;
const FLG_FCOMMENT: u8 = 0x10;

/// Operating-system byte for the gzip header's OS field (RFC 1952 §2.3.1.2).
/// Values `0..=13` name a specific OS; `255` means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GzipOs
{
    Fat,
    Amiga,
    Vms,
    Unix,
    VmCms,
    AtariTos,
    Hpfs,
    Macintosh,
    ZSystem,
    Cpm,
    Tops20,
    Ntfs,
    Qdos,
    AcornRisc,
    Unknown
}

impl GzipOs
{
    pub fn as_u8(self) -> u8
    {
        match self
        {
            GzipOs::Fat => 0,
            GzipOs::Amiga => 1,
            GzipOs::Vms => 2,
            GzipOs::Unix => 3,
            GzipOs::VmCms => 4,
            GzipOs::AtariTos => 5,
            GzipOs::Hpfs => 6,
            GzipOs::Macintosh => 7,
            GzipOs::ZSystem => 8,
            GzipOs::Cpm => 9,
            GzipOs::Tops20 => 10,
            GzipOs::Ntfs => 11,
            GzipOs::Qdos => 12,
            GzipOs::AcornRisc => 13,
            GzipOs::Unknown => 255
        }
    }

    /// `None` for any byte outside `0..=13` or `255`, mirroring the
    /// distilled interface's `of_int`.
    pub fn of_int(v: u8) -> Option<GzipOs>
    {
        match v
        {
            0 => Some(GzipOs::Fat),
            1 => Some(GzipOs::Amiga),
            2 => Some(GzipOs::Vms),
            3 => Some(GzipOs::Unix),
            4 => Some(GzipOs::VmCms),
            5 => Some(GzipOs::AtariTos),
            6 => Some(GzipOs::Hpfs),
            7 => Some(GzipOs::Macintosh),
            8 => Some(GzipOs::ZSystem),
            9 => Some(GzipOs::Cpm),
            10 => Some(GzipOs::Tops20),
            11 => Some(GzipOs::Ntfs),
            12 => Some(GzipOs::Qdos),
            13 => Some(GzipOs::AcornRisc),
            255 => Some(GzipOs::Unknown),
            _ => None
        }
    }
}

/// Named constructor options for [`GzipEncoder`].
#[derive(Debug, Clone)]
pub struct GzipEncoderOptions
{
    pub level:       u8,
    pub wbits:       u8,
    pub text:        bool,
    pub header_crc:  bool,
    pub extra:       Option<Vec<u8>>,
    pub name:        Option<String>,
    pub comment:     Option<String>,
    pub mtime:       u32,
    pub os:          GzipOs
}

impl Default for GzipEncoderOptions
{
    fn default() -> Self
    {
        GzipEncoderOptions {
            level: 4,
            wbits: 15,
            text: false,
            header_crc: false,
            extra: None,
            name: None,
            comment: None,
            mtime: 0,
            os: GzipOs::Unknown
        }
    }
}

fn xfl_for_level(level: u8) -> u8
{
    match level
    {
        9 => 2,
        0 | 1 => 4,
        _ => 0
    }
}

fn build_header(options: &GzipEncoderOptions) -> Vec<u8>
{
    let mut buf = Vec::with_capacity(10);
    buf.extend_from_slice(&MAGIC);
    buf.push(CM_DEFLATE);

    let mut flg = 0_u8;
    if options.text
    {
        flg |= FLG_FTEXT;
    }
    if options.header_crc
    {
        flg |= FLG_FHCRC;
    }
    if options.extra.is_some()
    {
        flg |= FLG_FEXTRA;
    }
    if options.name.is_some()
    {
        flg |= FLG_FNAME;
    }
    if options.comment.is_some()
    {
        flg |= FLG_FCOMMENT;
    }
    buf.push(flg);

    buf.extend_from_slice(&options.mtime.to_le_bytes());
    buf.push(xfl_for_level(options.level));
    buf.push(options.os.as_u8());

    if let Some(extra) = &options.extra
    {
        buf.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        buf.extend_from_slice(extra);
    }
    if let Some(name) = &options.name
    {
        buf.extend_from_slice(name.as_bytes());
        buf.push(0);
    }
    if let Some(comment) = &options.comment
    {
        buf.extend_from_slice(comment.as_bytes());
        buf.push(0);
    }

    if options.header_crc
    {
        let mut crc = Crc32::new();
        crc.update(&buf);
        let hcrc16 = (crc.digest() & 0xFFFF) as u16;
        buf.extend_from_slice(&hcrc16.to_le_bytes());
    }

    buf
}

enum EncState
{
    Header
    {
        pos: usize
    },
    Body,
    Trailer
    {
        written: u8
    },
    Done
}

/// A streaming gzip (RFC 1952) encoder wrapping an [`Rfc1951Encoder`].
pub struct GzipEncoder
{
    inner:    Rfc1951Encoder,
    header:   Vec<u8>,
    checksum: Crc32,
    isize:    u32,
    trailer:  [u8; 8],
    state:    EncState,
    used_in:  usize,
    used_out: usize
}

impl GzipEncoder
{
    pub fn new() -> Result<GzipEncoder, Lz77Error>
    {
        GzipEncoder::new_with_options(GzipEncoderOptions::default())
    }

    pub fn new_with_options(options: GzipEncoderOptions) -> Result<GzipEncoder, Lz77Error>
    {
        Ok(GzipEncoder {
            inner: Rfc1951Encoder::new(options.level, options.wbits)?,
            header: build_header(&options),
            checksum: Crc32::new(),
            isize: 0,
            trailer: [0; 8],
            state: EncState::Header { pos: 0 },
            used_in: 0,
            used_out: 0
        })
    }

    pub fn set_flush(&mut self, mode: FlushMode)
    {
        self.inner.set_flush(mode);
    }

    pub fn eval(&mut self, input: &[u8], output: &mut [u8]) -> Status<GzipError>
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
    ) -> Status<GzipError>
    {
        loop
        {
            match std::mem::replace(&mut self.state, EncState::Done)
            {
                EncState::Done => return Status::End,

                EncState::Header { mut pos } =>
                {
                    while pos < self.header.len() && *out_pos < output.len()
                    {
                        output[*out_pos] = self.header[pos];
                        *out_pos += 1;
                        pos += 1;
                    }

                    if pos < self.header.len()
                    {
                        self.state = EncState::Header { pos };
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
                    self.isize = self.isize.wrapping_add(used_in as u32);
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
                        Status::Error(e) => return Status::Error(GzipError::from(e)),
                        Status::End =>
                        {
                            self.trailer[..4].copy_from_slice(&self.checksum.digest().to_le_bytes());
                            self.trailer[4..].copy_from_slice(&self.isize.to_le_bytes());
                            self.state = EncState::Trailer { written: 0 };
                        }
                    }
                }

                EncState::Trailer { mut written } =>
                {
                    while written < 8 && *out_pos < output.len()
                    {
                        output[*out_pos] = self.trailer[usize::from(written)];
                        *out_pos += 1;
                        written += 1;
                    }

                    if written < 8
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

impl Eval for GzipEncoder
{
    type Error = GzipError;

    fn eval(&mut self, input: &[u8], output: &mut [u8]) -> Status<GzipError>
    {
        GzipEncoder::eval(self, input, output)
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

#[derive(Clone, Copy, PartialEq, Eq)]
enum HeaderPhase
{
    Fixed,
    ExtraLen,
    ExtraData,
    Name,
    Comment,
    Hcrc,
    Done
}

struct HeaderParse
{
    phase:         HeaderPhase,
    fixed:         [u8; 10],
    fixed_have:    u8,
    flg:           u8,
    extra_len:     u16,
    extra_len_buf: [u8; 2],
    extra_have:    u16,
    extra:         Vec<u8>,
    name:          Vec<u8>,
    comment:       Vec<u8>,
    hcrc_buf:      [u8; 2],
    hcrc_have:     u8,
    seen:          Crc32
}

impl HeaderParse
{
    fn new() -> HeaderParse
    {
        HeaderParse {
            phase: HeaderPhase::Fixed,
            fixed: [0; 10],
            fixed_have: 0,
            flg: 0,
            extra_len: 0,
            extra_len_buf: [0; 2],
            extra_have: 0,
            extra: Vec::new(),
            name: Vec::new(),
            comment: Vec::new(),
            hcrc_buf: [0; 2],
            hcrc_have: 0,
            seen: Crc32::new()
        }
    }
}

enum DecState
{
    Header(HeaderParse),
    Body,
    Trailer
    {
        buf: Vec<u8>
    },
    Done
}

/// A streaming gzip (RFC 1952) decoder wrapping an [`Rfc1951Decoder`].
pub struct GzipDecoder
{
    state:    DecState,
    inner:    Option<Rfc1951Decoder>,
    mtime:    u32,
    xfl:      u8,
    os:       u8,
    extra:    Vec<u8>,
    name:     Vec<u8>,
    comment:  Vec<u8>,
    size:     u32,
    used_in:  usize,
    used_out: usize
}

impl GzipDecoder
{
    pub fn new() -> GzipDecoder
    {
        GzipDecoder {
            state: DecState::Header(HeaderParse::new()),
            inner: None,
            mtime: 0,
            xfl: 0,
            os: 0,
            extra: Vec::new(),
            name: Vec::new(),
            comment: Vec::new(),
            size: 0,
            used_in: 0,
            used_out: 0
        }
    }

    pub fn mtime(&self) -> u32
    {
        self.mtime
    }

    pub fn xfl(&self) -> u8
    {
        self.xfl
    }

    pub fn os(&self) -> u8
    {
        self.os
    }

    pub fn extra(&self) -> &[u8]
    {
        &self.extra
    }

    pub fn name(&self) -> Option<&str>
    {
        if self.name.is_empty() { None } else { std::str::from_utf8(&self.name).ok() }
    }

    pub fn comment(&self) -> Option<&str>
    {
        if self.comment.is_empty() { None } else { std::str::from_utf8(&self.comment).ok() }
    }

    /// Decompressed size mod 2^32, accumulated as output is produced (valid
    /// once the session reaches `End`).
    pub fn size(&self) -> u32
    {
        self.size
    }

    pub fn eval(&mut self, input: &[u8], output: &mut [u8]) -> Status<GzipError>
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
    ) -> Status<GzipError>
    {
        loop
        {
            match std::mem::replace(&mut self.state, DecState::Done)
            {
                DecState::Done => return Status::End,

                DecState::Header(mut hp) => match self.step_header(&mut hp, input, in_pos)
                {
                    Ok(true) => self.state = DecState::Body,
                    Ok(false) =>
                    {
                        self.state = DecState::Header(hp);
                        return Status::Await;
                    }
                    Err(e) => return Status::Error(e)
                },

                DecState::Body =>
                {
                    let inner = self.inner.as_mut().expect("Body state only reachable after Header parses");
                    let status = inner.eval(&input[*in_pos..], &mut output[*out_pos..]);

                    let used_out = inner.used_out();
                    *in_pos += inner.used_in();
                    *out_pos += used_out;
                    self.size = self.size.wrapping_add(used_out as u32);

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
                        Status::Error(e) => return Status::Error(GzipError::from(e)),
                        Status::End =>
                        {
                            let leftover = inner.take_leftover_bytes();
                            self.state = DecState::Trailer { buf: leftover };
                        }
                    }
                }

                DecState::Trailer { mut buf } =>
                {
                    while buf.len() < 8 && *in_pos < input.len()
                    {
                        buf.push(input[*in_pos]);
                        *in_pos += 1;
                    }

                    if buf.len() < 8
                    {
                        self.state = DecState::Trailer { buf };
                        return Status::Await;
                    }

                    let expect_crc = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
                    let expect_size = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);

                    let have_crc = self
                        .inner
                        .as_ref()
                        .expect("Trailer state only reachable after Body")
                        .window()
                        .checksum_digest();

                    if have_crc != expect_crc
                    {
                        return Status::Error(GzipError::InvalidChecksum { have: have_crc, expect: expect_crc });
                    }
                    if self.size != expect_size
                    {
                        return Status::Error(GzipError::InvalidSize { have: self.size, expect: expect_size });
                    }

                    self.state = DecState::Done;
                }
            }
        }
    }

    /// Drive the header sub-state-machine as far as the input allows,
    /// returning `Ok(true)` once the fixed fields and every flagged
    /// optional field have been read and the inner decoder constructed.
    fn step_header(&mut self, hp: &mut HeaderParse, input: &[u8], in_pos: &mut usize) -> Result<bool, GzipError>
    {
        loop
        {
            match hp.phase
            {
                HeaderPhase::Fixed =>
                {
                    while hp.fixed_have < 10 && *in_pos < input.len()
                    {
                        hp.fixed[usize::from(hp.fixed_have)] = input[*in_pos];
                        *in_pos += 1;
                        hp.fixed_have += 1;
                    }

                    if hp.fixed_have < 10
                    {
                        return Ok(false);
                    }

                    if hp.fixed[0] != MAGIC[0] || hp.fixed[1] != MAGIC[1] || hp.fixed[2] != CM_DEFLATE
                    {
                        return Err(GzipError::InvalidHeader);
                    }

                    hp.flg = hp.fixed[3];
                    if hp.flg & 0xE0 != 0
                    {
                        return Err(GzipError::InvalidHeader);
                    }

                    self.mtime = u32::from_le_bytes([hp.fixed[4], hp.fixed[5], hp.fixed[6], hp.fixed[7]]);
                    self.xfl = hp.fixed[8];
                    self.os = hp.fixed[9];

                    hp.seen.update(&hp.fixed);

                    hp.phase = if hp.flg & FLG_FEXTRA != 0 { HeaderPhase::ExtraLen } else { HeaderPhase::Name };
                }

                HeaderPhase::ExtraLen =>
                {
                    while hp.extra_have < 2 && *in_pos < input.len()
                    {
                        hp.extra_len_buf[usize::from(hp.extra_have)] = input[*in_pos];
                        *in_pos += 1;
                        hp.extra_have += 1;
                    }

                    if hp.extra_have < 2
                    {
                        return Ok(false);
                    }

                    hp.seen.update(&hp.extra_len_buf);
                    hp.extra_len = u16::from_le_bytes(hp.extra_len_buf);
                    hp.extra_have = 0;
                    hp.phase = HeaderPhase::ExtraData;
                }

                HeaderPhase::ExtraData =>
                {
                    while hp.extra_have < hp.extra_len && *in_pos < input.len()
                    {
                        hp.extra.push(input[*in_pos]);
                        *in_pos += 1;
                        hp.extra_have += 1;
                    }

                    if hp.extra_have < hp.extra_len
                    {
                        return Ok(false);
                    }

                    hp.seen.update(&hp.extra);
                    self.extra = std::mem::take(&mut hp.extra);
                    hp.phase = HeaderPhase::Name;
                }

                HeaderPhase::Name =>
                {
                    if hp.flg & FLG_FNAME != 0
                    {
                        loop
                        {
                            if *in_pos >= input.len()
                            {
                                return Ok(false);
                            }
                            let b = input[*in_pos];
                            *in_pos += 1;
                            hp.seen.update(std::slice::from_ref(&b));
                            if b == 0
                            {
                                break;
                            }
                            hp.name.push(b);
                        }
                        self.name = std::mem::take(&mut hp.name);
                    }
                    hp.phase = HeaderPhase::Comment;
                }

                HeaderPhase::Comment =>
                {
                    if hp.flg & FLG_FCOMMENT != 0
                    {
                        loop
                        {
                            if *in_pos >= input.len()
                            {
                                return Ok(false);
                            }
                            let b = input[*in_pos];
                            *in_pos += 1;
                            hp.seen.update(std::slice::from_ref(&b));
                            if b == 0
                            {
                                break;
                            }
                            hp.comment.push(b);
                        }
                        self.comment = std::mem::take(&mut hp.comment);
                    }
                    hp.phase = HeaderPhase::Hcrc;
                }

                HeaderPhase::Hcrc =>
                {
                    if hp.flg & FLG_FHCRC != 0
                    {
                        while hp.hcrc_have < 2 && *in_pos < input.len()
                        {
                            hp.hcrc_buf[usize::from(hp.hcrc_have)] = input[*in_pos];
                            *in_pos += 1;
                            hp.hcrc_have += 1;
                        }

                        if hp.hcrc_have < 2
                        {
                            return Ok(false);
                        }

                        let expect = u16::from_le_bytes(hp.hcrc_buf);
                        let have = (hp.seen.digest() & 0xFFFF) as u16;

                        if have != expect
                        {
                            return Err(GzipError::InvalidHeaderChecksum);
                        }
                    }
                    hp.phase = HeaderPhase::Done;
                }

                HeaderPhase::Done =>
                {
                    self.inner = Some(Rfc1951Decoder::new(15, Checksum::Crc32(Crc32::new())));
                    return Ok(true);
                }
            }
        }
    }
}

impl Default for GzipDecoder
{
    fn default() -> Self
    {
        GzipDecoder::new()
    }
}

impl Eval for GzipDecoder
{
    type Error = GzipError;

    fn eval(&mut self, input: &[u8], output: &mut [u8]) -> Status<GzipError>
    {
        GzipDecoder::eval(self, input, output)
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

    fn encode_all(data: &[u8], options: GzipEncoderOptions) -> Vec<u8>
    {
        let mut enc = GzipEncoder::new_with_options(options).unwrap();
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

    fn decode_all(input: &[u8]) -> (Vec<u8>, GzipDecoder)
    {
        let mut dec = GzipDecoder::new();
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

        (out, dec)
    }

    #[test]
    fn empty_input_is_twenty_bytes_and_round_trips()
    {
        let out = encode_all(b"", GzipEncoderOptions::default());
        assert_eq!(out.len(), 20);

        let (decoded, _) = decode_all(&out);
        assert_eq!(decoded, b"");
    }

    #[test]
    fn name_round_trips_and_is_reported_by_the_decoder()
    {
        let options = GzipEncoderOptions { name: Some("README.md".to_string()), level: 1, ..Default::default() };
        let out = encode_all(b"", options);

        let (decoded, dec) = decode_all(&out);
        assert_eq!(decoded, b"");
        assert_eq!(dec.name(), Some("README.md"));
        assert_eq!(dec.mtime(), 0);
    }

    #[test]
    fn header_crc_round_trips()
    {
        let options = GzipEncoderOptions { header_crc: true, comment: Some("hi".to_string()), ..Default::default() };
        let out = encode_all(b"some text", options);

        let (decoded, dec) = decode_all(&out);
        assert_eq!(decoded, b"some text");
        assert_eq!(dec.comment(), Some("hi"));
    }

    #[test]
    fn corrupted_crc_trailer_is_rejected()
    {
        let mut out = encode_all(b"hello world", GzipEncoderOptions::default());
        let len = out.len();
        out[len - 5] ^= 0xFF;

        let mut dec = GzipDecoder::new();
        let mut scratch = [0_u8; 4096];
        let mut status = dec.eval(&out, &mut scratch);

        while matches!(status, Status::Flush)
        {
            status = dec.eval(&[], &mut scratch);
        }

        assert!(matches!(status, Status::Error(GzipError::InvalidChecksum { .. })));
    }

    #[test]
    fn gzip_os_of_int_rejects_unmapped_values()
    {
        assert_eq!(GzipOs::of_int(3), Some(GzipOs::Unix));
        assert_eq!(GzipOs::of_int(255), Some(GzipOs::Unknown));
        assert_eq!(GzipOs::of_int(200), None);
    }
}
