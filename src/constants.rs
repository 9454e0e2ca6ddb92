//! Shared DEFLATE (RFC 1951) constants: block types, alphabet sizes, and the
//! length/distance base-and-extra-bits tables used by both the encoder and
//! the decoder.

/// Number of symbols in each Huffman code.  Note: for the literal/length
/// and offset codes, these are actually the maximum values; a given block
/// might use fewer symbols.
pub const DEFLATE_NUM_PRECODE_SYMS: usize = 19;

/// Order which precode lengths are stored
pub static DEFLATE_PRECODE_LENS_PERMUTATION: [u8; DEFLATE_NUM_PRECODE_SYMS] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Maximum codeword length across all codes.
pub const DEFLATE_MAX_CODEWORD_LENGTH: usize = 15;

/// Maximum codeword length for the literal/length code.
pub const DEFLATE_MAX_LITLEN_CODEWORD_LENGTH: usize = 15;

/// Maximum codeword length for the distance code.
pub const DEFLATE_MAX_OFFSET_CODEWORD_LENGTH: usize = 15;

/// Maximum codeword length for the precode.
pub const DEFLATE_MAX_PRE_CODEWORD_LEN: u8 = 7;

/// Number of symbols in the literal/length alphabet (0..255 literals, 256 end
/// of block, 257..285 length codes).
pub const DEFLATE_NUM_LITLEN_SYMS: usize = 288;

/// Number of symbols in the distance alphabet.
pub const DEFLATE_NUM_OFFSET_SYMS: usize = 32;

pub const DEFLATE_BLOCKTYPE_UNCOMPRESSED: u64 = 0;
pub const DEFLATE_BLOCKTYPE_STATIC: u64 = 1;
pub const DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN: u64 = 2;

/// Minimum and maximum match length/distance on the wire.
pub const DEFLATE_MIN_MATCH_LEN: usize = 3;
pub const DEFLATE_MAX_MATCH_LEN: usize = 258;
pub const DEFLATE_MIN_MATCH_DIST: usize = 1;
pub const DEFLATE_MAX_MATCH_DIST: usize = 32768;

/// End-of-block symbol in the literal/length alphabet.
pub const END_OF_BLOCK_SYM: u16 = 256;

/// Table-bit widths for the direct-lookup portion of each decode table.
pub const PRECODE_TABLE_BITS: usize = 7;
pub const LITLEN_TABLE_BITS: usize = 10;
pub const OFFSET_TABLEBITS: usize = 8;

pub const PRECODE_ENOUGH: usize = 128;
pub const LITLEN_ENOUGH: usize = 1334;
pub const OFFSET_ENOUGH: usize = 402;

/// Length base values for length symbols 257..285 (index 0 == symbol 257).
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];

/// Extra bits following each length symbol.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Distance base values for distance symbols 0..29.
pub const DIST_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Extra bits following each distance symbol.
pub const DIST_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Fixed literal/length code lengths, RFC 1951 §3.2.6.
pub fn fixed_litlen_lengths() -> [u8; DEFLATE_NUM_LITLEN_SYMS]
{
    let mut lens = [0_u8; DEFLATE_NUM_LITLEN_SYMS];

    lens[0..144].fill(8);
    lens[144..256].fill(9);
    lens[256..280].fill(7);
    lens[280..288].fill(8);

    lens
}

/// Fixed distance code lengths, RFC 1951 §3.2.6 (all 5 bits).
pub fn fixed_dist_lengths() -> [u8; DEFLATE_NUM_OFFSET_SYMS]
{
    [5_u8; DEFLATE_NUM_OFFSET_SYMS]
}

/// Map a match length (3..=258) to its length symbol (257..=285), returning
/// `(symbol, extra_bits, extra_value)`.
pub fn length_to_symbol(length: usize) -> (u16, u8, u16)
{
    debug_assert!((DEFLATE_MIN_MATCH_LEN..=DEFLATE_MAX_MATCH_LEN).contains(&length));

    let idx = LENGTH_BASE
        .iter()
        .rposition(|&base| usize::from(base) <= length)
        .unwrap();

    let extra_bits = LENGTH_EXTRA_BITS[idx];
    let extra_val = (length - usize::from(LENGTH_BASE[idx])) as u16;

    (257 + idx as u16, extra_bits, extra_val)
}

/// Map a match distance (1..=32768) to its distance symbol (0..=29),
/// returning `(symbol, extra_bits, extra_value)`.
pub fn dist_to_symbol(dist: usize) -> (u16, u8, u16)
{
    debug_assert!((DEFLATE_MIN_MATCH_DIST..=DEFLATE_MAX_MATCH_DIST).contains(&dist));

    let idx = DIST_BASE
        .iter()
        .rposition(|&base| usize::from(base) <= dist)
        .unwrap();

    let extra_bits = DIST_EXTRA_BITS[idx];
    let extra_val = (dist - usize::from(DIST_BASE[idx])) as u16;

    (idx as u16, extra_bits, extra_val)
}
