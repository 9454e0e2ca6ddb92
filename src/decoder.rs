//! The RFC 1951 DEFLATE decoder: a resumable state machine that suspends
//! on `Await` (needs more input bits) or `Flush` (output slice is full)
//! and otherwise runs to `End` or a terminal `Error`.
//!
//! The state tags below (`BlockHeader` / `StoredLen` / `StoredCopy` /
//! `DynamicHeader` / `Block` / `Copy` / `Done`, plus the symbol-decode
//! sub-states `LengthExtra` / `DistSymbol` / `DistExtra`) are the ones
//! named in the decoder's design; every transition that partially decodes
//! a multi-part symbol (a length/distance pair spans a length codeword,
//! its extra bits, a distance codeword, and its extra bits) keeps its
//! already-resolved pieces in the state itself, since bits consumed from
//! the reader can never be un-consumed once a suspension is returned. The
//! canonical-Huffman table construction each state relies on is
//! `crate::huffman::DecodeTable::build`, grounded on the teacher's
//! `build_decode_table`.

use log::{debug, trace, warn};

use crate::bitreader::BitReader;
use crate::checksum::Checksum;
use crate::constants::*;
use crate::errors::Rfc1951Error;
use crate::huffman::DecodeTable;
use crate::status::Status;
use crate::window::Window;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DynPhase
{
    ReadCounts,
    ReadClLens,
    ReadSymbols
}

struct DynHeader
{
    phase:         DynPhase,
    hlit:          usize,
    hdist:         usize,
    hclen:         usize,
    cl_lens:       [u8; DEFLATE_NUM_PRECODE_SYMS],
    cl_read:       usize,
    precode:       Option<DecodeTable>,
    lens:          Vec<u8>,
    lens_filled:   usize,
    prev_len:      u8,
    pending_extra: Option<(u8, u32, u8)> // (repeat_symbol, extra_bits_needed, base)
}

impl DynHeader
{
    fn new() -> DynHeader
    {
        DynHeader {
            phase: DynPhase::ReadCounts,
            hlit: 0,
            hdist: 0,
            hclen: 0,
            cl_lens: [0; DEFLATE_NUM_PRECODE_SYMS],
            cl_read: 0,
            precode: None,
            lens: Vec::new(),
            lens_filled: 0,
            prev_len: 0,
            pending_extra: None
        }
    }
}

enum State
{
    BlockHeader,
    StoredLen,
    StoredCopy
    {
        remaining: u16
    },
    DynamicHeader(DynHeader),
    /// Waiting on the next literal/length symbol.
    Block,
    /// Decoded a length symbol (`idx` into `LENGTH_BASE`), waiting on its
    /// extra bits.
    LengthExtra
    {
        idx: usize
    },
    /// Have a resolved match length, waiting on the distance symbol.
    DistSymbol
    {
        length: usize
    },
    /// Have a length and a resolved distance symbol, waiting on the
    /// distance's extra bits.
    DistExtra
    {
        length:   usize,
        dist_sym: usize
    },
    Copy
    {
        remaining: usize,
        distance:  usize
    },
    Done
}

impl State
{
    fn next_block_state(bfinal: bool) -> State
    {
        if bfinal
        {
            State::Done
        }
        else
        {
            State::BlockHeader
        }
    }
}

/// A streaming RFC 1951 (raw DEFLATE) decoder.
pub struct Rfc1951Decoder
{
    state:        State,
    bits:         BitReader,
    window:       Window,
    bfinal:       bool,
    litlen_table: DecodeTable,
    dist_table:   DecodeTable,
    used_in:      usize,
    used_out:     usize
}

impl Rfc1951Decoder
{
    pub fn new(wbits: u8, checksum: Checksum) -> Rfc1951Decoder
    {
        let litlen_table = fixed_litlen_table();
        let dist_table = fixed_dist_table();

        Rfc1951Decoder {
            state: State::BlockHeader,
            bits: BitReader::new(),
            window: Window::new(wbits, checksum),
            bfinal: false,
            litlen_table,
            dist_table,
            used_in: 0,
            used_out: 0
        }
    }

    pub fn window(&self) -> &Window
    {
        &self.window
    }

    pub fn bits_remaining(&self) -> u32
    {
        self.bits.bits_left()
    }

    pub fn used_in(&self) -> usize
    {
        self.used_in
    }

    pub fn used_out(&self) -> usize
    {
        self.used_out
    }

    /// Bytes already pulled from the input stream into the bit reader's
    /// look-ahead but never consumed by a decoded symbol. A framing layer
    /// wrapping this decoder calls this once `eval` reports `End`, since
    /// those bytes belong to whatever immediately follows the compressed
    /// block stream on the wire (a zlib or gzip trailer) and would
    /// otherwise be silently lost along with the bit reader itself.
    pub fn take_leftover_bytes(&mut self) -> Vec<u8>
    {
        self.bits.align_to_byte();

        let mut out = Vec::new();
        while let Some(b) = self.bits.take_byte()
        {
            out.push(b);
        }
        out
    }

    fn ensure_bits(&mut self, input: &[u8], in_pos: &mut usize, n: u32) -> bool
    {
        self.bits.refill(input, in_pos);
        self.bits.has(n)
    }

    pub fn eval(&mut self, input: &[u8], output: &mut [u8]) -> Status<Rfc1951Error>
    {
        let mut in_pos = 0_usize;
        let mut out_pos = 0_usize;

        let status = self.drive(input, &mut in_pos, output, &mut out_pos);

        self.used_in = in_pos;
        self.used_out = out_pos;

        status
    }

    fn drive(
        &mut self, input: &[u8], in_pos: &mut usize, output: &mut [u8], out_pos: &mut usize
    ) -> Status<Rfc1951Error>
    {
        loop
        {
            if matches!(self.state, State::Done)
            {
                return Status::End;
            }

            match std::mem::replace(&mut self.state, State::Done)
            {
                State::Done => unreachable!(),

                State::BlockHeader =>
                {
                    if !self.ensure_bits(input, in_pos, 3)
                    {
                        self.state = State::BlockHeader;
                        return Status::Await;
                    }

                    self.bfinal = self.bits.get_bits(1) != 0;
                    let btype = self.bits.get_bits(2);

                    trace!("deflate: block header bfinal={} btype={}", self.bfinal, btype);

                    self.state = match btype
                    {
                        0 => State::StoredLen,
                        1 =>
                        {
                            self.litlen_table = fixed_litlen_table();
                            self.dist_table = fixed_dist_table();
                            debug!("deflate: fixed Huffman block");
                            State::Block
                        }
                        2 => State::DynamicHeader(DynHeader::new()),
                        _ =>
                        {
                            warn!("deflate: reserved block type 3 encountered");
                            return Status::Error(Rfc1951Error::InvalidKindOfBlock);
                        }
                    };
                }

                State::StoredLen =>
                {
                    self.bits.align_to_byte();

                    if !self.ensure_bits(input, in_pos, 32)
                    {
                        self.state = State::StoredLen;
                        return Status::Await;
                    }

                    let len = self.bits.get_bits(16) as u16;
                    let nlen = self.bits.get_bits(16) as u16;

                    if len != !nlen
                    {
                        return Status::Error(Rfc1951Error::InvalidComplementOfLength);
                    }

                    debug!("deflate: stored block, {len} bytes");

                    self.state = State::StoredCopy { remaining: len };
                }

                State::StoredCopy { remaining } =>
                {
                    if remaining == 0
                    {
                        self.state = State::next_block_state(self.bfinal);
                        continue;
                    }

                    let mut remaining = remaining;

                    // Drain whole bytes the bit reader already pulled into
                    // its accumulator (look-ahead from decoding the header)
                    // before falling back to a bulk copy straight out of
                    // `input`.
                    while remaining > 0 && *out_pos < output.len()
                    {
                        match self.bits.take_byte()
                        {
                            Some(byte) =>
                            {
                                let b = self.window.push(byte);
                                output[*out_pos] = b;
                                *out_pos += 1;
                                remaining -= 1;
                            }
                            None => break
                        }
                    }

                    if remaining > 0
                    {
                        let avail_in = input.len() - *in_pos;
                        let avail_out = output.len() - *out_pos;
                        let n = (remaining as usize).min(avail_in).min(avail_out);

                        if n > 0
                        {
                            let chunk = &input[*in_pos..*in_pos + n];
                            self.window.push_slice(chunk);
                            output[*out_pos..*out_pos + n].copy_from_slice(chunk);

                            *in_pos += n;
                            *out_pos += n;
                            remaining -= n as u16;
                        }
                    }

                    if remaining == 0
                    {
                        self.state = State::next_block_state(self.bfinal);
                        continue;
                    }

                    self.state = State::StoredCopy { remaining };

                    if *out_pos == output.len()
                    {
                        return Status::Flush;
                    }
                    return Status::Await;
                }

                State::DynamicHeader(mut dh) => match self.step_dynamic_header(&mut dh, input, in_pos)
                {
                    Ok(true) => self.state = State::Block,
                    Ok(false) =>
                    {
                        self.state = State::DynamicHeader(dh);
                        return Status::Await;
                    }
                    Err(e) => return Status::Error(e)
                },

                State::Block =>
                {
                    if *out_pos == output.len()
                    {
                        self.state = State::Block;
                        return Status::Flush;
                    }

                    let sym = match self.decode_symbol(input, in_pos, true)
                    {
                        Ok(Some(s)) => s,
                        Ok(None) =>
                        {
                            self.state = State::Block;
                            return Status::Await;
                        }
                        Err(e) => return Status::Error(e)
                    };

                    if sym < 256
                    {
                        let byte = self.window.push(sym as u8);
                        output[*out_pos] = byte;
                        *out_pos += 1;
                        self.state = State::Block;
                    }
                    else if sym == END_OF_BLOCK_SYM
                    {
                        self.state = State::next_block_state(self.bfinal);
                    }
                    else
                    {
                        let idx = (sym - 257) as usize;
                        if idx >= LENGTH_BASE.len()
                        {
                            return Status::Error(Rfc1951Error::InvalidLiteralLengthCode);
                        }
                        self.state = State::LengthExtra { idx };
                    }
                }

                State::LengthExtra { idx } =>
                {
                    let extra_bits = LENGTH_EXTRA_BITS[idx];
                    if !self.ensure_bits(input, in_pos, u32::from(extra_bits))
                    {
                        self.state = State::LengthExtra { idx };
                        return Status::Await;
                    }

                    let extra = self.bits.get_bits(u32::from(extra_bits));
                    let length = usize::from(LENGTH_BASE[idx]) + extra as usize;

                    self.state = State::DistSymbol { length };
                }

                State::DistSymbol { length } =>
                {
                    let dist_sym = match self.decode_symbol(input, in_pos, false)
                    {
                        Ok(Some(s)) => s,
                        Ok(None) =>
                        {
                            self.state = State::DistSymbol { length };
                            return Status::Await;
                        }
                        Err(e) => return Status::Error(e)
                    };

                    if usize::from(dist_sym) >= DIST_BASE.len()
                    {
                        return Status::Error(Rfc1951Error::InvalidDistanceCode);
                    }

                    self.state = State::DistExtra { length, dist_sym: usize::from(dist_sym) };
                }

                State::DistExtra { length, dist_sym } =>
                {
                    let extra_bits = DIST_EXTRA_BITS[dist_sym];
                    if !self.ensure_bits(input, in_pos, u32::from(extra_bits))
                    {
                        self.state = State::DistExtra { length, dist_sym };
                        return Status::Await;
                    }

                    let extra = self.bits.get_bits(u32::from(extra_bits));
                    let distance = usize::from(DIST_BASE[dist_sym]) + extra as usize;

                    if distance == 0 || distance > self.window.available()
                    {
                        return Status::Error(Rfc1951Error::InvalidDistance {
                            distance,
                            max: self.window.available()
                        });
                    }

                    self.state = State::Copy { remaining: length, distance };
                }

                State::Copy { remaining, distance } =>
                {
                    if remaining == 0
                    {
                        self.state = State::Block;
                        continue;
                    }

                    let avail_out = output.len() - *out_pos;
                    if avail_out == 0
                    {
                        self.state = State::Copy { remaining, distance };
                        return Status::Flush;
                    }

                    let n = remaining.min(avail_out);

                    match self.window.copy_match(n, distance, &mut output[*out_pos..*out_pos + n])
                    {
                        Ok(written) =>
                        {
                            *out_pos += written;
                            self.state = State::Copy { remaining: remaining - written, distance };
                        }
                        Err(e) => return Status::Error(e)
                    }
                }
            }
        }
    }

    /// Decode one symbol through the literal/length table (`is_litlen`) or
    /// the distance table, returning `Ok(None)` if the bits currently
    /// buffered aren't enough to resolve a codeword — nothing is consumed
    /// in that case, so the caller can safely retry after a refill.
    fn decode_symbol(
        &mut self, input: &[u8], in_pos: &mut usize, is_litlen: bool
    ) -> Result<Option<u16>, Rfc1951Error>
    {
        self.bits.refill(input, in_pos);

        let table = if is_litlen { &self.litlen_table } else { &self.dist_table };

        let peek = self.bits.peek_bits(table.table_bits as u32);
        let entry = table.entries[peek as usize];

        if entry.is_subtable()
        {
            let total_len_needed = table.table_bits as u32 + entry.subtable_bits() as u32;
            if self.bits.bits_left() < total_len_needed
            {
                return Ok(None);
            }

            let sub_peek = self.bits.peek_bits(total_len_needed) >> table.table_bits;
            let sub_entry = table.entries[entry.subtable_start() + sub_peek as usize];

            let total_len = table.table_bits as u32 + sub_entry.len() as u32;
            self.bits.drop_bits(total_len);
            Ok(Some(sub_entry.symbol()))
        }
        else
        {
            if self.bits.bits_left() < entry.len() as u32
            {
                return Ok(None);
            }

            self.bits.drop_bits(entry.len() as u32);
            Ok(Some(entry.symbol()))
        }
    }

    /// Drive the dynamic-block header sub-state-machine forward as far as
    /// the currently buffered bits allow. Returns `Ok(true)` once the
    /// literal/length and distance tables are built, `Ok(false)` if more
    /// input is needed.
    fn step_dynamic_header(
        &mut self, dh: &mut DynHeader, input: &[u8], in_pos: &mut usize
    ) -> Result<bool, Rfc1951Error>
    {
        loop
        {
            match dh.phase
            {
                DynPhase::ReadCounts =>
                {
                    if !self.ensure_bits(input, in_pos, 14)
                    {
                        return Ok(false);
                    }

                    dh.hlit = self.bits.get_bits(5) as usize + 257;
                    dh.hdist = self.bits.get_bits(5) as usize + 1;
                    dh.hclen = self.bits.get_bits(4) as usize + 4;
                    dh.lens = vec![0_u8; dh.hlit + dh.hdist];
                    dh.phase = DynPhase::ReadClLens;
                }

                DynPhase::ReadClLens =>
                {
                    while dh.cl_read < dh.hclen
                    {
                        if !self.ensure_bits(input, in_pos, 3)
                        {
                            return Ok(false);
                        }

                        let len = self.bits.get_bits(3) as u8;
                        let sym = DEFLATE_PRECODE_LENS_PERMUTATION[dh.cl_read];
                        dh.cl_lens[usize::from(sym)] = len;
                        dh.cl_read += 1;
                    }

                    dh.precode = Some(DecodeTable::build(
                        &dh.cl_lens,
                        DEFLATE_NUM_PRECODE_SYMS,
                        PRECODE_TABLE_BITS,
                        DEFLATE_MAX_PRE_CODEWORD_LEN as usize,
                        PRECODE_ENOUGH
                    )?);

                    debug!("deflate: dynamic block, hlit={} hdist={} hclen={}", dh.hlit, dh.hdist, dh.hclen);
                    dh.phase = DynPhase::ReadSymbols;
                }

                DynPhase::ReadSymbols =>
                {
                    let total = dh.lens.len();

                    if let Some((repeat_sym, extra_bits, base)) = dh.pending_extra
                    {
                        if !self.ensure_bits(input, in_pos, extra_bits)
                        {
                            return Ok(false);
                        }

                        let extra = self.bits.get_bits(extra_bits) as usize;
                        let count = base as usize + extra;

                        if repeat_sym == 16 && dh.lens_filled == 0
                        {
                            return Err(Rfc1951Error::InvalidDictionary);
                        }
                        if dh.lens_filled + count > total
                        {
                            return Err(Rfc1951Error::InvalidDictionary);
                        }

                        let fill_value = if repeat_sym == 16 { dh.prev_len } else { 0 };

                        for _ in 0..count
                        {
                            dh.lens[dh.lens_filled] = fill_value;
                            dh.lens_filled += 1;
                        }

                        dh.pending_extra = None;
                        continue;
                    }

                    if dh.lens_filled >= total
                    {
                        let (litlen_lens, dist_lens) = dh.lens.split_at(dh.hlit);

                        self.litlen_table = DecodeTable::build(
                            litlen_lens,
                            dh.hlit,
                            LITLEN_TABLE_BITS,
                            DEFLATE_MAX_LITLEN_CODEWORD_LENGTH,
                            LITLEN_ENOUGH
                        )?;
                        self.dist_table = DecodeTable::build(
                            dist_lens,
                            dh.hdist,
                            OFFSET_TABLEBITS,
                            DEFLATE_MAX_OFFSET_CODEWORD_LENGTH,
                            OFFSET_ENOUGH
                        )?;

                        return Ok(true);
                    }

                    self.bits.refill(input, in_pos);

                    let table = dh.precode.as_ref().unwrap();
                    let peek = self.bits.peek_bits(table.table_bits as u32);
                    let entry = table.entries[peek as usize];

                    debug_assert!(!entry.is_subtable(), "precode table_bits equals its max codeword length");

                    if self.bits.bits_left() < entry.len() as u32
                    {
                        return Ok(false);
                    }

                    self.bits.drop_bits(entry.len() as u32);
                    let sym = entry.symbol();

                    match sym
                    {
                        0..=15 =>
                        {
                            dh.lens[dh.lens_filled] = sym as u8;
                            dh.lens_filled += 1;
                            dh.prev_len = sym as u8;
                        }
                        16 => dh.pending_extra = Some((16, 2, 3)),
                        17 => dh.pending_extra = Some((17, 3, 3)),
                        18 => dh.pending_extra = Some((18, 7, 11)),
                        _ => return Err(Rfc1951Error::InvalidDictionary)
                    }
                }
            }
        }
    }
}

fn fixed_litlen_table() -> DecodeTable
{
    DecodeTable::build(
        &fixed_litlen_lengths(),
        DEFLATE_NUM_LITLEN_SYMS,
        LITLEN_TABLE_BITS,
        DEFLATE_MAX_LITLEN_CODEWORD_LENGTH,
        LITLEN_ENOUGH
    )
    .expect("fixed literal/length table is a compile-time constant and always valid")
}

fn fixed_dist_table() -> DecodeTable
{
    DecodeTable::build(
        &fixed_dist_lengths(),
        DEFLATE_NUM_OFFSET_SYMS,
        OFFSET_TABLEBITS,
        DEFLATE_MAX_OFFSET_CODEWORD_LENGTH,
        OFFSET_ENOUGH
    )
    .expect("fixed distance table is a compile-time constant and always valid")
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn decode_all(input: &[u8]) -> Vec<u8>
    {
        let mut decoder = Rfc1951Decoder::new(15, Checksum::None);
        let mut out = Vec::new();
        let mut scratch = [0_u8; 256];

        loop
        {
            match decoder.eval(input, &mut scratch)
            {
                Status::End =>
                {
                    out.extend_from_slice(&scratch[..decoder.used_out()]);
                    break;
                }
                Status::Flush =>
                {
                    out.extend_from_slice(&scratch[..decoder.used_out()]);
                }
                Status::Await => panic!("unexpected Await: input exhausted without reaching End"),
                Status::Error(e) => panic!("decode error: {e}")
            }
        }

        out
    }

    #[test]
    fn decodes_a_stored_block()
    {
        // BFINAL=1, BTYPE=00, then byte-aligned LEN/NLEN/data.
        let mut data = vec![0b0000_0001_u8];
        data.extend_from_slice(&5_u16.to_le_bytes());
        data.extend_from_slice(&(!5_u16).to_le_bytes());
        data.extend_from_slice(b"hello");

        assert_eq!(decode_all(&data), b"hello");
    }

    #[test]
    fn rejects_reserved_block_type()
    {
        let data = [0b0000_0111_u8];
        let mut decoder = Rfc1951Decoder::new(15, Checksum::None);
        let mut out = [0_u8; 16];

        assert!(matches!(decoder.eval(&data, &mut out), Status::Error(Rfc1951Error::InvalidKindOfBlock)));
    }

    #[test]
    fn truncated_input_returns_await_not_a_silent_success()
    {
        let mut decoder = Rfc1951Decoder::new(15, Checksum::None);
        let mut out = [0_u8; 16];

        assert!(matches!(decoder.eval(&[], &mut out), Status::Await));
    }
}
