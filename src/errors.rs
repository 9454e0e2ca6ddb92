//! Layered error taxonomy: LZ77 errors nest into RFC1951 errors, which nest
//! into the zlib and gzip framing errors. Every enum is closed, hand-writes
//! `Debug`/`Display` in the teacher's one-sentence style instead of
//! deriving them, and implements `std::error::Error` so callers can use
//! `?` through the usual std machinery. Outer layers hold the inner error
//! by value in a dedicated variant rather than boxing it.

use std::fmt::{Display, Formatter};

/// Errors raised by the LZ77 match finder and its session setup.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Lz77Error
{
    /// Compression level outside `0..=9`.
    InvalidLevel(u8),
    /// Window-size exponent outside `8..=15`.
    InvalidWbits(u8)
}

impl Display for Lz77Error
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            Self::InvalidLevel(l) => write!(f, "compression level {l} is not in 0..=9"),
            Self::InvalidWbits(w) => write!(f, "window bits {w} is not in 8..=15")
        }
    }
}

impl std::fmt::Debug for Lz77Error
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Lz77Error {}

/// Errors raised while decoding a raw RFC 1951 DEFLATE stream.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Rfc1951Error
{
    /// LZ77 session setup failed (propagated from the encoder side).
    Lz77(Lz77Error),
    /// BTYPE field was `11`, the reserved block type.
    InvalidKindOfBlock,
    /// A stored block's `LEN` did not match the one's complement of `NLEN`.
    InvalidComplementOfLength,
    /// A dynamic block's code-length dictionary failed to build a valid
    /// canonical Huffman table (Kraft sum exceeded 1, for example).
    InvalidDictionary,
    /// A decoded literal/length symbol fell in the reserved 286/287 range
    /// (RFC 1951 §3.2.5: "values 286, 287 ... do not actually occur in the
    /// compressed data").
    InvalidLiteralLengthCode,
    /// A decoded distance symbol fell outside the distance alphabet in use.
    InvalidDistanceCode,
    /// A back-reference distance exceeded the bytes produced so far, or the
    /// window size in effect.
    InvalidDistance
    {
        distance: usize,
        max:      usize
    }
}

impl Display for Rfc1951Error
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            Self::Lz77(inner) => write!(f, "{inner}"),
            Self::InvalidKindOfBlock => write!(f, "block type 3 (reserved) is not a valid DEFLATE block type"),
            Self::InvalidComplementOfLength =>
            {
                write!(f, "stored block LEN did not match the one's complement of NLEN")
            }
            Self::InvalidDictionary => write!(f, "dynamic block's Huffman code-length dictionary is invalid"),
            Self::InvalidLiteralLengthCode =>
            {
                write!(f, "decoded literal/length symbol 286 or 287, which RFC 1951 reserves and never emits")
            }
            Self::InvalidDistanceCode => write!(f, "decoded distance symbol is outside the distance alphabet"),
            Self::InvalidDistance { distance, max } =>
            {
                write!(f, "back-reference distance {distance} exceeds {max} bytes of available history")
            }
        }
    }
}

impl std::fmt::Debug for Rfc1951Error
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Rfc1951Error {}

impl From<Lz77Error> for Rfc1951Error
{
    fn from(e: Lz77Error) -> Self
    {
        Rfc1951Error::Lz77(e)
    }
}

/// Errors raised while decoding a zlib (RFC 1950) stream: the RFC1951
/// errors plus framing-specific header/trailer failures.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ZlibError
{
    Rfc1951(Rfc1951Error),
    /// CMF/FLG header failed the `(CMF*256 + FLG) % 31 == 0` check, used a
    /// compression method other than 8, declared a preset dictionary (which
    /// this crate does not support), or used a window size we can't honor.
    InvalidHeader,
    /// Trailing Adler-32 did not match the one computed over the output.
    InvalidChecksum
    {
        have:   u32,
        expect: u32
    }
}

impl Display for ZlibError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            Self::Rfc1951(inner) => write!(f, "{inner}"),
            Self::InvalidHeader => write!(f, "zlib header failed its CMF/FLG consistency check"),
            Self::InvalidChecksum { have, expect } =>
            {
                write!(f, "zlib Adler-32 mismatch: stream declares {expect:#010x}, computed {have:#010x}")
            }
        }
    }
}

impl std::fmt::Debug for ZlibError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        Display::fmt(self, f)
    }
}

impl std::error::Error for ZlibError {}

impl From<Rfc1951Error> for ZlibError
{
    fn from(e: Rfc1951Error) -> Self
    {
        ZlibError::Rfc1951(e)
    }
}

impl From<Lz77Error> for ZlibError
{
    fn from(e: Lz77Error) -> Self
    {
        ZlibError::Rfc1951(Rfc1951Error::Lz77(e))
    }
}

/// Errors raised while decoding a gzip (RFC 1952) stream: the RFC1951
/// errors plus framing-specific header/trailer failures.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum GzipError
{
    Rfc1951(Rfc1951Error),
    /// Magic bytes, compression method, or a reserved FLG bit were wrong.
    InvalidHeader,
    /// The optional FHCRC header checksum did not match.
    InvalidHeaderChecksum,
    /// Trailing CRC-32 did not match the one computed over the output.
    InvalidChecksum
    {
        have:   u32,
        expect: u32
    },
    /// Trailing ISIZE did not match the decompressed size mod 2^32.
    InvalidSize
    {
        have:   u32,
        expect: u32
    }
}

impl Display for GzipError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            Self::Rfc1951(inner) => write!(f, "{inner}"),
            Self::InvalidHeader => write!(f, "gzip header failed magic/method/flag validation"),
            Self::InvalidHeaderChecksum => write!(f, "gzip FHCRC header checksum did not match"),
            Self::InvalidChecksum { have, expect } =>
            {
                write!(f, "gzip CRC-32 mismatch: trailer declares {expect:#010x}, computed {have:#010x}")
            }
            Self::InvalidSize { have, expect } =>
            {
                write!(f, "gzip ISIZE mismatch: trailer declares {expect}, decompressed {have} bytes (mod 2^32)")
            }
        }
    }
}

impl std::fmt::Debug for GzipError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        Display::fmt(self, f)
    }
}

impl std::error::Error for GzipError {}

impl From<Rfc1951Error> for GzipError
{
    fn from(e: Rfc1951Error) -> Self
    {
        GzipError::Rfc1951(e)
    }
}

impl From<Lz77Error> for GzipError
{
    fn from(e: Lz77Error) -> Self
    {
        GzipError::Rfc1951(Rfc1951Error::Lz77(e))
    }
}

/// Caller misuse of the encoder API: importing an inconsistent frequency
/// pair under `paranoid` validation, or requesting a flush the session
/// cannot honor in its current state.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum EncodeError
{
    Lz77(Lz77Error),
    /// `paranoid` frequency import found a count that disagreed with the
    /// symbols actually seen, at the given literal/length or distance
    /// alphabet index.
    InconsistentFrequencies
    {
        index: usize
    }
}

impl Display for EncodeError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            Self::Lz77(inner) => write!(f, "{inner}"),
            Self::InconsistentFrequencies { index } =>
            {
                write!(f, "imported frequency table disagrees with observed symbols at index {index}")
            }
        }
    }
}

impl std::fmt::Debug for EncodeError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        Display::fmt(self, f)
    }
}

impl std::error::Error for EncodeError {}

impl From<Lz77Error> for EncodeError
{
    fn from(e: Lz77Error) -> Self
    {
        EncodeError::Lz77(e)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn display_messages_carry_offending_values()
    {
        let e = Rfc1951Error::InvalidDistance { distance: 40000, max: 32768 };
        assert!(e.to_string().contains("40000"));
        assert!(e.to_string().contains("32768"));
    }

    #[test]
    fn wrapping_preserves_inner_display()
    {
        let inner = Rfc1951Error::InvalidKindOfBlock;
        let outer: ZlibError = inner.into();
        assert_eq!(outer.to_string(), inner.to_string());
    }
}
