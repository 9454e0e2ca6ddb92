//! LZ77 match finding: a hash-chain search over the last `2^wbits` bytes,
//! producing a stream of literals and length/distance matches for the
//! DEFLATE encoder to Huffman-code.
//!
//! Grounded on the classic zlib `deflate.c` configuration table (the
//! per-level `good_length`/`max_lazy`/`nice_length`/`max_chain_length`
//! tuning knobs and the decision to only attempt lazy (probe-ahead-by-one)
//! matching from level 4 upward) and on the teacher crate's general
//! "small, explicit state, no unsafe" style; the teacher itself only ships
//! a decoder, so the hash-chain search here is written from the
//! well-documented zlib algorithm rather than adapted line-by-line from
//! any single file in the pack.

use crate::constants::{DEFLATE_MAX_MATCH_DIST, DEFLATE_MAX_MATCH_LEN, DEFLATE_MIN_MATCH_LEN};
use crate::errors::Lz77Error;

const HASH_BITS: u32 = 15;
const HASH_SIZE: usize = 1 << HASH_BITS;
const HASH_SHIFT: u32 = (HASH_BITS + 2) / 3;
const HASH_MASK: usize = HASH_SIZE - 1;

/// A single parsed unit of the LZ77 token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hunk
{
    Literal(u8),
    Match
    {
        /// True match length, `3..=258`.
        length:   u16,
        /// True match distance, `1..=32768`.
        distance: u16
    }
}

#[derive(Debug, Clone, Copy)]
struct LevelParams
{
    good_length: usize,
    max_lazy:    usize,
    nice_length: usize,
    max_chain:   usize
}

const LEVEL_TABLE: [LevelParams; 10] = [
    LevelParams { good_length: 0, max_lazy: 0, nice_length: 0, max_chain: 0 },
    LevelParams { good_length: 4, max_lazy: 4, nice_length: 8, max_chain: 4 },
    LevelParams { good_length: 4, max_lazy: 5, nice_length: 16, max_chain: 8 },
    LevelParams { good_length: 4, max_lazy: 6, nice_length: 32, max_chain: 32 },
    LevelParams { good_length: 4, max_lazy: 4, nice_length: 16, max_chain: 16 },
    LevelParams { good_length: 8, max_lazy: 16, nice_length: 32, max_chain: 32 },
    LevelParams { good_length: 8, max_lazy: 16, nice_length: 128, max_chain: 128 },
    LevelParams { good_length: 8, max_lazy: 32, nice_length: 128, max_chain: 256 },
    LevelParams { good_length: 32, max_lazy: 128, nice_length: 258, max_chain: 1024 },
    LevelParams { good_length: 32, max_lazy: 258, nice_length: 258, max_chain: 4096 },
];

/// Lazy (probe-ahead-by-one) matching only pays for itself once the chain
/// walk is deep enough to matter; zlib enables it from level 4 up.
const LAZY_MATCH_MIN_LEVEL: u8 = 4;

fn level_params(level: u8) -> Result<LevelParams, Lz77Error>
{
    LEVEL_TABLE
        .get(usize::from(level))
        .copied()
        .ok_or(Lz77Error::InvalidLevel(level))
}

fn validate_wbits(wbits: u8) -> Result<(), Lz77Error>
{
    if (8..=15).contains(&wbits)
    {
        Ok(())
    }
    else
    {
        Err(Lz77Error::InvalidWbits(wbits))
    }
}

#[inline(always)]
fn hash3(a: u8, b: u8, c: u8) -> usize
{
    (((usize::from(a) << (2 * HASH_SHIFT)) ^ (usize::from(b) << HASH_SHIFT) ^ usize::from(c)) & HASH_MASK)
}

#[inline]
fn common_prefix_len(data: &[u8], a: usize, b: usize, max_len: usize) -> usize
{
    let mut n = 0;
    while n < max_len && data[a + n] == data[b + n]
    {
        n += 1;
    }
    n
}

/// Hash-chain match finder over a byte slice held entirely by the caller.
/// The encoder inserts positions as it advances `pos` and asks for matches
/// at the current position; `max_dist` bounds how far back a match may
/// reach (the window size in effect for this session).
pub struct MatchFinder
{
    head:      Vec<i32>,
    prev:      Vec<i32>,
    prev_mask: usize,
    max_dist:  usize,
    params:    LevelParams,
    level:     u8
}

impl MatchFinder
{
    pub fn new(level: u8, wbits: u8) -> Result<MatchFinder, Lz77Error>
    {
        let params = level_params(level)?;
        validate_wbits(wbits)?;

        let window_size = 1_usize << wbits;

        Ok(MatchFinder {
            head: vec![-1; HASH_SIZE],
            prev: vec![-1; window_size],
            prev_mask: window_size - 1,
            max_dist: window_size,
            params,
            level
        })
    }

    /// Record `pos` in the hash chain for the 3-byte sequence starting
    /// there, returning the chain's previous head (the most recent earlier
    /// position with the same 3-byte prefix, if any) so the caller can
    /// search from it without rediscovering `pos` itself. No-op (`-1`) if
    /// fewer than 3 bytes remain.
    #[inline]
    pub fn insert(&mut self, data: &[u8], pos: usize) -> i32
    {
        if pos + DEFLATE_MIN_MATCH_LEN > data.len()
        {
            return -1;
        }

        let h = hash3(data[pos], data[pos + 1], data[pos + 2]);
        let old_head = self.head[h];

        self.prev[pos & self.prev_mask] = old_head;
        self.head[h] = pos as i32;

        old_head
    }

    /// Search for the longest match at `pos`, starting the chain walk from
    /// `start` (the value `insert` returned for this same position) so the
    /// position just inserted never matches against itself.
    pub fn find_match(&self, data: &[u8], pos: usize, start: i32, min_len: usize) -> Option<(usize, usize)>
    {
        if self.params.max_chain == 0 || pos + DEFLATE_MIN_MATCH_LEN > data.len()
        {
            return None;
        }

        let mut candidate = start;
        let limit = pos.saturating_sub(self.max_dist.min(DEFLATE_MAX_MATCH_DIST));
        let max_len = (data.len() - pos).min(DEFLATE_MAX_MATCH_LEN);

        let mut best_len = min_len.saturating_sub(1);
        let mut best_dist = 0_usize;
        let mut chain = self.params.max_chain;

        while candidate >= 0 && chain > 0
        {
            let cpos = candidate as usize;
            if cpos < limit
            {
                break;
            }

            if best_len < max_len
            {
                let probe_ok = data.get(cpos + best_len) == data.get(pos + best_len);
                if probe_ok
                {
                    let len = common_prefix_len(data, cpos, pos, max_len);
                    if len > best_len
                    {
                        best_len = len;
                        best_dist = pos - cpos;

                        if len >= self.params.nice_length || len >= max_len
                        {
                            break;
                        }
                    }
                }
            }

            candidate = self.prev[cpos & self.prev_mask];
            chain -= 1;
        }

        if best_len >= DEFLATE_MIN_MATCH_LEN
        {
            Some((best_len, best_dist))
        }
        else
        {
            None
        }
    }

    fn uses_lazy_matching(&self) -> bool
    {
        self.level >= LAZY_MATCH_MIN_LEVEL
    }

    /// Parse the whole of `data` into a hunk stream using hash-chain
    /// matching with lazy (probe-ahead-by-one) evaluation at level >= 4.
    /// Ties are broken toward the nearer (shorter-distance) match, which
    /// falls out naturally here since the chain walk visits candidates in
    /// decreasing position order and only replaces the best match on a
    /// strictly longer one.
    pub fn parse(&mut self, data: &[u8]) -> Vec<Hunk>
    {
        if self.uses_lazy_matching()
        {
            self.parse_lazy(data)
        }
        else
        {
            self.parse_greedy(data)
        }
    }

    fn parse_greedy(&mut self, data: &[u8]) -> Vec<Hunk>
    {
        let mut hunks = Vec::with_capacity(data.len() / 2 + 1);
        let mut pos = 0;

        while pos < data.len()
        {
            let head = self.insert(data, pos);

            match self.find_match(data, pos, head, DEFLATE_MIN_MATCH_LEN)
            {
                Some((len, dist)) =>
                {
                    hunks.push(Hunk::Match { length: len as u16, distance: dist as u16 });
                    for p in pos + 1..(pos + len).min(data.len())
                    {
                        self.insert(data, p);
                    }
                    pos += len;
                }
                None =>
                {
                    hunks.push(Hunk::Literal(data[pos]));
                    pos += 1;
                }
            }
        }

        hunks
    }

    /// Probe one byte ahead before committing to a match: if the match at
    /// `pos + 1` is longer than the one at `pos`, prefer it and emit `pos`
    /// as a literal instead. Mirrors zlib's `deflate_slow`.
    fn parse_lazy(&mut self, data: &[u8]) -> Vec<Hunk>
    {
        let mut hunks = Vec::with_capacity(data.len() / 2 + 1);
        let mut pos = 0;

        let mut pending: Option<(usize, usize, usize)> = None; // (len, dist, at_pos)

        while pos < data.len()
        {
            let head = self.insert(data, pos);
            let found = self.find_match(data, pos, head, DEFLATE_MIN_MATCH_LEN);

            if let Some((plen, pdist, ppos)) = pending
            {
                let beats_pending = matches!(found, Some((len, _)) if len > plen) && plen < self.params.max_lazy;

                if beats_pending
                {
                    hunks.push(Hunk::Literal(data[ppos]));
                    pending = found.map(|(l, d)| (l, d, pos));
                    pos += 1;
                }
                else
                {
                    hunks.push(Hunk::Match { length: plen as u16, distance: pdist as u16 });

                    // `ppos + 1 == pos` always holds here (pending is only
                    // ever deferred by one byte), and `pos` was already
                    // inserted above, so insert the remaining bytes of the
                    // committed match and resume scanning right after it.
                    let match_end = (ppos + plen).min(data.len());
                    for p in (pos + 1)..match_end
                    {
                        self.insert(data, p);
                    }

                    pending = None;
                    pos = match_end;
                }
            }
            else
            {
                pending = found.map(|(l, d)| (l, d, pos));
                pos += 1;
            }
        }

        if let Some((plen, pdist, _)) = pending
        {
            hunks.push(Hunk::Match { length: plen as u16, distance: pdist as u16 });
        }

        hunks
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn invalid_level_is_rejected()
    {
        assert!(matches!(MatchFinder::new(10, 15), Err(Lz77Error::InvalidLevel(10))));
    }

    #[test]
    fn invalid_wbits_is_rejected()
    {
        assert!(matches!(MatchFinder::new(6, 16), Err(Lz77Error::InvalidWbits(16))));
    }

    #[test]
    fn level_zero_emits_only_literals()
    {
        let mut mf = MatchFinder::new(0, 15).unwrap();
        let hunks = mf.parse(b"aaaaaaaaaaaaaaaa");

        assert!(hunks.iter().all(|h| matches!(h, Hunk::Literal(_))));
        assert_eq!(hunks.len(), 16);
    }

    #[test]
    fn repeated_run_produces_a_match()
    {
        let mut mf = MatchFinder::new(6, 15).unwrap();
        let hunks = mf.parse(b"abcabcabcabcabcabc");

        assert!(hunks.iter().any(|h| matches!(h, Hunk::Match { .. })));
    }

    #[test]
    fn hunks_reconstruct_the_original_bytes()
    {
        let data = b"the quick brown fox jumps over the quick brown fox";
        let mut mf = MatchFinder::new(6, 15).unwrap();
        let hunks = mf.parse(data);

        let mut out = Vec::new();
        for h in hunks
        {
            match h
            {
                Hunk::Literal(b) => out.push(b),
                Hunk::Match { length, distance } =>
                {
                    let start = out.len() - usize::from(distance);
                    for i in 0..usize::from(length)
                    {
                        out.push(out[start + i]);
                    }
                }
            }
        }

        assert_eq!(out, data);
    }
}
