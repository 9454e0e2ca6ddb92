/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The RFC 1951 DEFLATE encoder: a resumable state machine mirroring
//! [`crate::decoder::Rfc1951Decoder`]'s suspend-on-`Await`/`Flush` shape in
//! reverse. Input bytes accumulate into a block buffer capped at 65535
//! bytes (so a stored block's 16-bit LEN field always fits); once the
//! buffer fills, or the caller requests a flush, the block is costed
//! against all three DEFLATE block types (stored, fixed Huffman, dynamic
//! Huffman) and the cheapest is rendered into a flat sequence of
//! `(bits, length)` pairs. That sequence -- the "plan" -- is what actually
//! makes this resumable: draining it into the caller's output slice is just
//! walking an index, so a `Flush` suspension mid-block is a matter of
//! remembering where the index stopped, the same way the decoder remembers
//! which `State` it suspended in.
//!
//! A fresh [`crate::lz77::MatchFinder`] is built for every block rather
//! than kept as a persistent field: its hash chains store byte positions
//! into whatever slice was passed to `parse`, and those positions are only
//! meaningful against that slice's contents. Reusing one chain across
//! blocks whose backing buffer is cleared and refilled each time would let
//! a stale chain entry get reinterpreted against unrelated bytes at the
//! same index, producing a match that doesn't actually reproduce the
//! original data. Rebuilding per block avoids that at the cost of never
//! matching across a block boundary.

use log::debug;

use crate::bitwriter::BitWriter;
use crate::constants::*;
use crate::errors::{EncodeError, Lz77Error};
use crate::huffman::{build_encode_table, build_lengths};
use crate::lz77::{Hunk, MatchFinder};
use crate::status::{Eval, Status};

/// Caller-selected flush directive, consumed the next time the session
/// would otherwise just keep accumulating input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode
{
    /// Keep accumulating; only emit a block when the buffer fills.
    #[default]
    None,
    /// Finish the current block, then emit an empty fixed-Huffman block so
    /// the decoder can resynchronize without losing accumulated
    /// statistics.
    Partial,
    /// Finish the current block, then emit an empty byte-aligned stored
    /// block (the classic `00 00 00 FF FF` marker) so everything encoded
    /// so far is immediately decodable.
    Sync,
    /// Like `Sync`, but also resets the literal/length and distance
    /// frequency tables, starting the next block's statistics from zero.
    Full,
    /// Emit a final block (`BFINAL=1`) over whatever remains and align to
    /// a byte boundary. No more input is accepted afterward.
    Finish
}

const BLOCK_CAP: usize = 0xFFFF;

#[derive(Debug, Clone, Copy)]
enum NextState
{
    Collecting,
    ResetFreqsThenCollect,
    Done
}

enum EncState
{
    Collecting,
    Emitting
    {
        plan: Vec<(u32, u8)>,
        idx:  usize,
        next: NextState
    },
    Draining
    {
        next: NextState
    },
    Done
}

/// Code lengths, canonical codes, and the code-length-alphabet RLE stream
/// for one dynamic-Huffman block, built from the encoder's accumulated
/// frequency tables.
struct DynamicPlanData
{
    hlit:        usize,
    hdist:       usize,
    hclen:       usize,
    litlen_lens: Vec<u8>,
    dist_lens:   Vec<u8>,
    litlen_codes: Vec<(u16, u8)>,
    dist_codes:  Vec<(u16, u8)>,
    cl_lens:     [u8; DEFLATE_NUM_PRECODE_SYMS],
    cl_codes:    Vec<(u16, u8)>,
    rle_tokens:  Vec<(u8, u8, u16)>
}

/// A streaming RFC 1951 (raw DEFLATE) encoder.
pub struct Rfc1951Encoder
{
    level:        u8,
    wbits:        u8,
    pending:      Vec<u8>,
    bitw:         BitWriter,
    litlen_freqs: Vec<u32>,
    dist_freqs:   Vec<u32>,
    flush_mode:   FlushMode,
    state:        EncState,
    used_in:      usize,
    used_out:     usize
}

impl Rfc1951Encoder
{
    /// `level` is `0..=9` (0 disables matching entirely, always emitting
    /// stored blocks); `wbits` is `8..=15`, the window-size exponent
    /// bounding how far back a match may reach within a single block.
    pub fn new(level: u8, wbits: u8) -> Result<Rfc1951Encoder, Lz77Error>
    {
        // Surface a bad level/wbits now rather than on the first block.
        MatchFinder::new(level, wbits)?;

        Ok(Rfc1951Encoder {
            level,
            wbits,
            pending: Vec::with_capacity(BLOCK_CAP),
            bitw: BitWriter::new(),
            litlen_freqs: vec![0_u32; 286],
            dist_freqs: vec![0_u32; 30],
            flush_mode: FlushMode::None,
            state: EncState::Collecting,
            used_in: 0,
            used_out: 0
        })
    }

    /// Register a flush directive, honored the next time input runs dry
    /// (including immediately, if `input` is already empty on the next
    /// `eval` call).
    pub fn set_flush(&mut self, mode: FlushMode)
    {
        self.flush_mode = mode;
    }

    /// Bits buffered in the internal bit writer but not yet drained to an
    /// output slice.
    pub fn bits_pending(&self) -> u32
    {
        self.bitw.bits_pending()
    }

    /// Accumulated literal/length symbol frequencies, for introspection or
    /// priming a later session via [`Self::import_frequencies`].
    pub fn literal_length_frequencies(&self) -> &[u32]
    {
        &self.litlen_freqs
    }

    /// Accumulated distance symbol frequencies.
    pub fn distance_frequencies(&self) -> &[u32]
    {
        &self.dist_freqs
    }

    /// Replace the accumulated frequency tables wholesale, e.g. to resume a
    /// session with statistics carried over from a previous one. Under
    /// `paranoid`, rejects an import whose counts are lower than what this
    /// session has already observed for that symbol -- such an import
    /// would silently discard history the encoder has already committed to
    /// its output.
    pub fn import_frequencies(&mut self, litlen: &[u32], dist: &[u32], paranoid: bool) -> Result<(), EncodeError>
    {
        if paranoid
        {
            for (i, (&have, &want)) in self.litlen_freqs.iter().zip(litlen.iter()).enumerate()
            {
                if want < have
                {
                    return Err(EncodeError::InconsistentFrequencies { index: i });
                }
            }
            for (i, (&have, &want)) in self.dist_freqs.iter().zip(dist.iter()).enumerate()
            {
                if want < have
                {
                    return Err(EncodeError::InconsistentFrequencies { index: i });
                }
            }
        }

        self.litlen_freqs.resize(self.litlen_freqs.len().max(litlen.len()), 0);
        self.litlen_freqs[..litlen.len()].copy_from_slice(litlen);

        self.dist_freqs.resize(self.dist_freqs.len().max(dist.len()), 0);
        self.dist_freqs[..dist.len()].copy_from_slice(dist);

        Ok(())
    }

    pub fn eval(&mut self, input: &[u8], output: &mut [u8]) -> Status<EncodeError>
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
    ) -> Status<EncodeError>
    {
        loop
        {
            match std::mem::replace(&mut self.state, EncState::Done)
            {
                EncState::Done =>
                {
                    return Status::End;
                }

                EncState::Collecting =>
                {
                    let cap_left = BLOCK_CAP - self.pending.len();
                    let avail_in = input.len() - *in_pos;
                    let n = cap_left.min(avail_in);

                    if n > 0
                    {
                        self.pending.extend_from_slice(&input[*in_pos..*in_pos + n]);
                        *in_pos += n;
                    }

                    if self.pending.len() == BLOCK_CAP
                    {
                        let state = self.build_emit(false, NextState::Collecting);
                        self.state = state;
                        continue;
                    }

                    let input_drained = *in_pos == input.len();

                    if input_drained && self.flush_mode != FlushMode::None
                    {
                        let mode = self.flush_mode;
                        self.flush_mode = FlushMode::None;

                        self.state = match mode
                        {
                            FlushMode::Finish => self.build_emit(true, NextState::Done),
                            FlushMode::Partial => self.build_emit_with_marker(Marker::Fixed, NextState::Collecting),
                            FlushMode::Sync => self.build_emit_with_marker(Marker::Stored, NextState::Collecting),
                            FlushMode::Full =>
                            {
                                self.build_emit_with_marker(Marker::Stored, NextState::ResetFreqsThenCollect)
                            }
                            FlushMode::None => unreachable!()
                        };
                        continue;
                    }

                    self.state = EncState::Collecting;
                    return Status::Await;
                }

                EncState::Emitting { plan, mut idx, next } =>
                {
                    while idx < plan.len()
                    {
                        let (bits, len) = plan[idx];

                        if self.bitw.bits_pending() + u32::from(len) > 64
                        {
                            let written = self.bitw.drain(&mut output[*out_pos..]);
                            *out_pos += written;

                            if self.bitw.bits_pending() + u32::from(len) > 64
                            {
                                self.state = EncState::Emitting { plan, idx, next };
                                return Status::Flush;
                            }
                        }

                        self.bitw.put_bits(bits, len);
                        idx += 1;
                    }

                    self.state = EncState::Draining { next };
                }

                EncState::Draining { next } =>
                {
                    let written = self.bitw.drain(&mut output[*out_pos..]);
                    *out_pos += written;

                    if self.bitw.bits_pending() >= 8
                    {
                        self.state = EncState::Draining { next };
                        return Status::Flush;
                    }

                    match next
                    {
                        NextState::Collecting => self.state = EncState::Collecting,
                        NextState::ResetFreqsThenCollect =>
                        {
                            self.litlen_freqs.iter_mut().for_each(|f| *f = 0);
                            self.dist_freqs.iter_mut().for_each(|f| *f = 0);
                            self.state = EncState::Collecting;
                        }
                        NextState::Done =>
                        {
                            // The last block's final codeword may not end on
                            // a byte boundary; whatever's left is genuine
                            // trailing bits that still need to reach the
                            // output, not discardable padding. Pad once to a
                            // whole byte and loop back through `Draining` to
                            // push it out, rather than losing it by jumping
                            // straight to `Done`.
                            if self.bitw.bits_pending() > 0
                            {
                                self.bitw.align_to_byte();
                                self.state = EncState::Draining { next: NextState::Done };
                            }
                            else
                            {
                                self.state = EncState::Done;
                            }
                        }
                    }
                }
            }
        }
    }

    fn build_emit(&mut self, is_final: bool, next: NextState) -> EncState
    {
        let mut plan = Vec::new();
        let mut running = self.bitw.bits_pending();

        self.append_data_block(&mut plan, &mut running, is_final);

        EncState::Emitting { plan, idx: 0, next }
    }

    fn build_emit_with_marker(&mut self, marker: Marker, next: NextState) -> EncState
    {
        let mut plan = Vec::new();
        let mut running = self.bitw.bits_pending();

        self.append_data_block(&mut plan, &mut running, false);

        match marker
        {
            Marker::Fixed => append_empty_fixed_block(&mut plan, &mut running),
            Marker::Stored => append_empty_stored_marker(&mut plan, &mut running)
        }

        EncState::Emitting { plan, idx: 0, next }
    }

    /// Parse `self.pending` into hunks, fold their symbol frequencies into
    /// the accumulated tables, pick the cheapest block type for this
    /// block's content, and append its bit-level encoding to `plan`.
    fn append_data_block(&mut self, plan: &mut Vec<(u32, u8)>, running: &mut u32, is_final: bool)
    {
        let pending = std::mem::replace(&mut self.pending, Vec::with_capacity(BLOCK_CAP));

        let mut mf = MatchFinder::new(self.level, self.wbits)
            .expect("level/wbits already validated in Rfc1951Encoder::new");
        let hunks = if self.level == 0 { Vec::new() } else { mf.parse(&pending) };

        let mut block_litlen_freqs = vec![0_u32; 286];
        let mut block_dist_freqs = vec![0_u32; 30];
        let mut extra_bits_this_block = 0_u32;

        if self.level == 0
        {
            for &b in &pending
            {
                block_litlen_freqs[usize::from(b)] += 1;
            }
        }

        for hunk in &hunks
        {
            match *hunk
            {
                Hunk::Literal(b) => block_litlen_freqs[usize::from(b)] += 1,
                Hunk::Match { length, distance } =>
                {
                    let (sym, extra_bits, _) = length_to_symbol(usize::from(length));
                    block_litlen_freqs[usize::from(sym)] += 1;
                    extra_bits_this_block += u32::from(extra_bits);

                    let (dsym, dextra_bits, _) = dist_to_symbol(usize::from(distance));
                    block_dist_freqs[usize::from(dsym)] += 1;
                    extra_bits_this_block += u32::from(dextra_bits);
                }
            }
        }
        block_litlen_freqs[usize::from(END_OF_BLOCK_SYM)] += 1;

        for (acc, &f) in self.litlen_freqs.iter_mut().zip(block_litlen_freqs.iter())
        {
            *acc += f;
        }
        for (acc, &f) in self.dist_freqs.iter_mut().zip(block_dist_freqs.iter())
        {
            *acc += f;
        }

        if self.level == 0
        {
            append_stored(plan, running, &pending, is_final);
            return;
        }

        let fixed_lens = fixed_litlen_lengths();
        let fixed_dist = fixed_dist_lengths();

        let fixed_cost: u64 = u64::from(3 + extra_bits_this_block)
            + block_litlen_freqs
                .iter()
                .enumerate()
                .map(|(s, &f)| u64::from(f) * u64::from(fixed_lens[s]))
                .sum::<u64>()
            + block_dist_freqs
                .iter()
                .enumerate()
                .map(|(s, &f)| u64::from(f) * u64::from(fixed_dist[s]))
                .sum::<u64>();

        let dyn_plan = self.plan_dynamic();

        let dynamic_cost: u64 = u64::from(3 + 5 + 5 + 4 + (dyn_plan.hclen as u32) * 3 + extra_bits_this_block)
            + dyn_plan
                .rle_tokens
                .iter()
                .map(|&(sym, extra_bits, _)| u64::from(dyn_plan.cl_lens[usize::from(sym)]) + u64::from(extra_bits))
                .sum::<u64>()
            + block_litlen_freqs[..dyn_plan.hlit]
                .iter()
                .enumerate()
                .map(|(s, &f)| u64::from(f) * u64::from(dyn_plan.litlen_lens[s]))
                .sum::<u64>()
            + block_dist_freqs[..dyn_plan.hdist]
                .iter()
                .enumerate()
                .map(|(s, &f)| u64::from(f) * u64::from(dyn_plan.dist_lens[s]))
                .sum::<u64>();

        let header_and_pad = 3 + (8 - ((*running + 3) % 8)) % 8;
        let stored_cost: u64 = u64::from(header_and_pad + 32) + 8 * pending.len() as u64;

        if stored_cost <= fixed_cost && stored_cost <= dynamic_cost
        {
            debug!("deflate: stored block, {} bytes (cost {stored_cost} bits)", pending.len());
            append_stored(plan, running, &pending, is_final);
        }
        else if fixed_cost <= dynamic_cost
        {
            debug!("deflate: fixed Huffman block ({fixed_cost} bits)");
            append_fixed(plan, running, &hunks, is_final);
        }
        else
        {
            debug!("deflate: dynamic Huffman block ({dynamic_cost} bits vs fixed {fixed_cost})");
            append_dynamic(plan, running, &hunks, &dyn_plan, is_final);
        }
    }

    /// Build code lengths and canonical codes for a dynamic block from the
    /// encoder's accumulated frequency tables (which already include this
    /// block's symbols, folded in by the caller before this runs).
    fn plan_dynamic(&self) -> DynamicPlanData
    {
        let hlit = (0..self.litlen_freqs.len())
            .rev()
            .find(|&i| self.litlen_freqs[i] > 0)
            .map(|i| i + 1)
            .unwrap_or(0)
            .max(257);

        let hdist = (0..self.dist_freqs.len())
            .rev()
            .find(|&i| self.dist_freqs[i] > 0)
            .map(|i| i + 1)
            .unwrap_or(0)
            .max(1);

        let litlen_lens = build_lengths(&self.litlen_freqs[..hlit], 15);

        // RFC 1951 requires at least one distance code even when no match
        // ever used one; borrow a single-symbol frequency so `build_lengths`
        // produces the required one-bit code instead of an empty table.
        let dist_src: Vec<u32> = if self.dist_freqs[..hdist].iter().all(|&f| f == 0)
        {
            let mut v = vec![0_u32; hdist];
            v[0] = 1;
            v
        }
        else
        {
            self.dist_freqs[..hdist].to_vec()
        };
        let dist_lens = build_lengths(&dist_src, 15);

        let mut combined = Vec::with_capacity(hlit + hdist);
        combined.extend_from_slice(&litlen_lens);
        combined.extend_from_slice(&dist_lens);

        let (rle_tokens, cl_freqs) = rle_encode_lengths(&combined);
        let cl_lens_vec = build_lengths(&cl_freqs, DEFLATE_MAX_PRE_CODEWORD_LEN);
        let mut cl_lens = [0_u8; DEFLATE_NUM_PRECODE_SYMS];
        cl_lens.copy_from_slice(&cl_lens_vec);

        let hclen = (0..DEFLATE_NUM_PRECODE_SYMS)
            .rev()
            .find(|&i| cl_lens[usize::from(DEFLATE_PRECODE_LENS_PERMUTATION[i])] != 0)
            .map(|i| i + 1)
            .unwrap_or(0)
            .max(4);

        let litlen_codes = build_encode_table(&litlen_lens);
        let dist_codes = build_encode_table(&dist_lens);
        let cl_codes = build_encode_table(&cl_lens);

        DynamicPlanData {
            hlit,
            hdist,
            hclen,
            litlen_lens,
            dist_lens,
            litlen_codes,
            dist_codes,
            cl_lens,
            cl_codes,
            rle_tokens
        }
    }
}

#[derive(Clone, Copy)]
enum Marker
{
    Fixed,
    Stored
}

#[inline]
fn push_bits(plan: &mut Vec<(u32, u8)>, running: &mut u32, bits: u32, len: u8)
{
    if len == 0
    {
        return;
    }
    plan.push((bits, len));
    *running += u32::from(len);
}

fn append_stored(plan: &mut Vec<(u32, u8)>, running: &mut u32, data: &[u8], is_final: bool)
{
    push_bits(plan, running, u32::from(is_final), 3);

    let pad = (8 - (*running % 8)) % 8;
    push_bits(plan, running, 0, pad as u8);

    let len = data.len() as u16;
    push_bits(plan, running, u32::from(len), 16);
    push_bits(plan, running, u32::from(!len), 16);

    for &b in data
    {
        push_bits(plan, running, u32::from(b), 8);
    }
}

fn append_fixed(plan: &mut Vec<(u32, u8)>, running: &mut u32, hunks: &[Hunk], is_final: bool)
{
    push_bits(plan, running, u32::from(is_final) | (1 << 1), 3);

    let litlen_codes = build_encode_table(&fixed_litlen_lengths());
    let dist_codes = build_encode_table(&fixed_dist_lengths());

    append_hunks(plan, running, hunks, &litlen_codes, &dist_codes);

    let (code, len) = litlen_codes[usize::from(END_OF_BLOCK_SYM)];
    push_bits(plan, running, u32::from(code), len);
}

fn append_dynamic(
    plan: &mut Vec<(u32, u8)>, running: &mut u32, hunks: &[Hunk], dyn_plan: &DynamicPlanData, is_final: bool
)
{
    push_bits(plan, running, u32::from(is_final) | (2 << 1), 3);

    push_bits(plan, running, (dyn_plan.hlit - 257) as u32, 5);
    push_bits(plan, running, (dyn_plan.hdist - 1) as u32, 5);
    push_bits(plan, running, (dyn_plan.hclen - 4) as u32, 4);

    for i in 0..dyn_plan.hclen
    {
        let sym = DEFLATE_PRECODE_LENS_PERMUTATION[i];
        push_bits(plan, running, u32::from(dyn_plan.cl_lens[usize::from(sym)]), 3);
    }

    for &(sym, extra_bits, extra_val) in &dyn_plan.rle_tokens
    {
        let (code, len) = dyn_plan.cl_codes[usize::from(sym)];
        push_bits(plan, running, u32::from(code), len);

        if extra_bits > 0
        {
            push_bits(plan, running, u32::from(extra_val), extra_bits);
        }
    }

    append_hunks(plan, running, hunks, &dyn_plan.litlen_codes, &dyn_plan.dist_codes);

    let (code, len) = dyn_plan.litlen_codes[usize::from(END_OF_BLOCK_SYM)];
    push_bits(plan, running, u32::from(code), len);
}

fn append_hunks(
    plan: &mut Vec<(u32, u8)>, running: &mut u32, hunks: &[Hunk], litlen_codes: &[(u16, u8)], dist_codes: &[(u16, u8)]
)
{
    for hunk in hunks
    {
        match *hunk
        {
            Hunk::Literal(b) =>
            {
                let (code, len) = litlen_codes[usize::from(b)];
                push_bits(plan, running, u32::from(code), len);
            }
            Hunk::Match { length, distance } =>
            {
                let (sym, extra_bits, extra_val) = length_to_symbol(usize::from(length));
                let (code, len) = litlen_codes[usize::from(sym)];
                push_bits(plan, running, u32::from(code), len);
                if extra_bits > 0
                {
                    push_bits(plan, running, u32::from(extra_val), extra_bits);
                }

                let (dsym, dextra_bits, dextra_val) = dist_to_symbol(usize::from(distance));
                let (dcode, dlen) = dist_codes[usize::from(dsym)];
                push_bits(plan, running, u32::from(dcode), dlen);
                if dextra_bits > 0
                {
                    push_bits(plan, running, u32::from(dextra_val), dextra_bits);
                }
            }
        }
    }
}

fn append_empty_fixed_block(plan: &mut Vec<(u32, u8)>, running: &mut u32)
{
    push_bits(plan, running, 1 << 1, 3);

    let litlen_codes = build_encode_table(&fixed_litlen_lengths());
    let (code, len) = litlen_codes[usize::from(END_OF_BLOCK_SYM)];
    push_bits(plan, running, u32::from(code), len);
}

fn append_empty_stored_marker(plan: &mut Vec<(u32, u8)>, running: &mut u32)
{
    append_stored(plan, running, &[], false);
}

/// Encode a code-length sequence (the concatenated literal/length and
/// distance code lengths) using the RFC 1951 §3.2.7 repeat codes 16/17/18,
/// returning the token stream alongside the resulting code-length alphabet
/// frequency histogram.
fn rle_encode_lengths(lens: &[u8]) -> (Vec<(u8, u8, u16)>, [u32; DEFLATE_NUM_PRECODE_SYMS])
{
    let mut tokens = Vec::new();
    let mut freqs = [0_u32; DEFLATE_NUM_PRECODE_SYMS];

    let n = lens.len();
    let mut i = 0;

    while i < n
    {
        let value = lens[i];
        let mut run = 1;
        while i + run < n && lens[i + run] == value
        {
            run += 1;
        }

        if value == 0
        {
            let mut remaining = run;
            while remaining > 0
            {
                if remaining < 3
                {
                    for _ in 0..remaining
                    {
                        tokens.push((0_u8, 0_u8, 0_u16));
                        freqs[0] += 1;
                    }
                    remaining = 0;
                }
                else
                {
                    let take = remaining.min(138);
                    if take < 11
                    {
                        tokens.push((17, 3, (take - 3) as u16));
                        freqs[17] += 1;
                    }
                    else
                    {
                        tokens.push((18, 7, (take - 11) as u16));
                        freqs[18] += 1;
                    }
                    remaining -= take;
                }
            }
        }
        else
        {
            tokens.push((value, 0, 0));
            freqs[usize::from(value)] += 1;

            let mut remaining = run - 1;
            while remaining > 0
            {
                let take = remaining.min(6);
                if take < 3
                {
                    for _ in 0..take
                    {
                        tokens.push((value, 0, 0));
                        freqs[usize::from(value)] += 1;
                    }
                }
                else
                {
                    tokens.push((16, 2, (take - 3) as u16));
                    freqs[16] += 1;
                }
                remaining -= take;
            }
        }

        i += run;
    }

    (tokens, freqs)
}

impl Eval for Rfc1951Encoder
{
    type Error = EncodeError;

    fn eval(&mut self, input: &[u8], output: &mut [u8]) -> Status<EncodeError>
    {
        Rfc1951Encoder::eval(self, input, output)
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

    fn encode_all(data: &[u8], level: u8, flush: FlushMode) -> Vec<u8>
    {
        let mut enc = Rfc1951Encoder::new(level, 15).unwrap();
        enc.set_flush(flush);

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
                Status::Flush =>
                {
                    out.extend_from_slice(&scratch[..enc.used_out()]);
                }
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
        use crate::checksum::Checksum;
        use crate::decoder::Rfc1951Decoder;

        let mut dec = Rfc1951Decoder::new(15, Checksum::None);
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
                Status::Flush =>
                {
                    out.extend_from_slice(&scratch[..dec.used_out()]);
                }
                Status::Await => panic!("decoder stalled on encoder output"),
                Status::Error(e) => panic!("decode error: {e}")
            }
        }

        out
    }

    #[test]
    fn stored_level_zero_round_trips()
    {
        let data = b"the quick brown fox jumps over the lazy dog";
        let encoded = encode_all(data, 0, FlushMode::Finish);
        assert_eq!(decode_all(&encoded), data);
    }

    #[test]
    fn compressed_round_trips_a_repetitive_input()
    {
        let data = b"abcabcabcabcabcabcabcabcabcabcabcabcabcabc".repeat(4);
        let encoded = encode_all(&data, 6, FlushMode::Finish);
        assert_eq!(decode_all(&encoded), data);
    }

    #[test]
    fn empty_input_still_produces_a_decodable_stream()
    {
        let encoded = encode_all(b"", 6, FlushMode::Finish);
        assert_eq!(decode_all(&encoded), b"");
    }

    #[test]
    fn sync_flush_leaves_a_fully_decodable_prefix()
    {
        let mut enc = Rfc1951Encoder::new(6, 15).unwrap();
        enc.set_flush(FlushMode::Sync);

        let mut out = Vec::new();
        let mut scratch = [0_u8; 4096];

        loop
        {
            match enc.eval(b"hello world", &mut scratch)
            {
                Status::Await =>
                {
                    out.extend_from_slice(&scratch[..enc.used_out()]);
                    break;
                }
                Status::Flush => out.extend_from_slice(&scratch[..enc.used_out()]),
                Status::End => unreachable!("sync flush never ends the session"),
                Status::Error(e) => panic!("encode error: {e}")
            }
        }

        assert_eq!(decode_all(&out), b"hello world");
    }

    #[test]
    fn paranoid_import_rejects_a_regression()
    {
        let mut enc = Rfc1951Encoder::new(6, 15).unwrap();
        enc.eval(b"abcabcabc", &mut [0_u8; 64]);

        let zeros_litlen = vec![0_u32; 286];
        let zeros_dist = vec![0_u32; 30];

        assert!(matches!(
            enc.import_frequencies(&zeros_litlen, &zeros_dist, true),
            Err(EncodeError::InconsistentFrequencies { .. })
        ));
    }

    #[test]
    fn rle_encode_collapses_a_long_zero_run()
    {
        let mut lens = vec![5_u8; 3];
        lens.extend(std::iter::repeat(0_u8).take(20));

        let (tokens, freqs) = rle_encode_lengths(&lens);
        assert!(tokens.iter().any(|&(sym, _, _)| sym == 18 || sym == 17));
        assert!(freqs[18] > 0 || freqs[17] > 0);
    }
}
