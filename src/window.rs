//! Sliding window: the ring buffer that holds the last `2^wbits` bytes of
//! decompressed (or to-be-compressed) output, used to resolve LZ77
//! back-references and to keep a running checksum without re-scanning the
//! whole output.

use crate::checksum::Checksum;
use crate::errors::Rfc1951Error;

pub struct Window
{
    buf:      Vec<u8>,
    mask:     usize,
    cursor:   usize,
    filled:   usize,
    checksum: Checksum
}

impl Window
{
    /// `wbits` is the RFC 1950/1951 window-size exponent, `8..=15`.
    pub fn new(wbits: u8, checksum: Checksum) -> Window
    {
        debug_assert!((8..=15).contains(&wbits));

        let size = 1_usize << wbits;

        Window { buf: vec![0_u8; size], mask: size - 1, cursor: 0, filled: 0, checksum }
    }

    pub fn size(&self) -> usize
    {
        self.mask + 1
    }

    /// Bytes of valid history currently available for a back-reference,
    /// capped at the window size.
    pub fn available(&self) -> usize
    {
        self.filled.min(self.size())
    }

    /// Append a literal byte, returning it so callers can hand it straight
    /// to the output sink without a second lookup.
    #[inline]
    pub fn push(&mut self, byte: u8) -> u8
    {
        self.buf[self.cursor] = byte;
        self.cursor = (self.cursor + 1) & self.mask;
        self.filled += 1;
        self.checksum.update(core::slice::from_ref(&byte));
        byte
    }

    /// Append a literal run in bulk (used by stored blocks).
    pub fn push_slice(&mut self, data: &[u8])
    {
        for &b in data
        {
            self.buf[self.cursor] = b;
            self.cursor = (self.cursor + 1) & self.mask;
        }
        self.filled += data.len();
        self.checksum.update(data);
    }

    /// Copy a back-reference `length` bytes back from `distance`, writing
    /// the copied bytes into `out` (so the caller's output sink sees them
    /// too) and returning how many bytes were written. `out` must have at
    /// least `length` bytes of room; callers are expected to check that
    /// before calling (the DEFLATE decoder may need to split a copy across
    /// suspension points).
    pub fn copy_match(&mut self, length: usize, distance: usize, out: &mut [u8]) -> Result<usize, Rfc1951Error>
    {
        if distance == 0 || distance > self.available()
        {
            return Err(Rfc1951Error::InvalidDistance { distance, max: self.available() });
        }

        debug_assert!(out.len() >= length);

        let mut read_pos = (self.cursor + self.size() - distance) & self.mask;

        for i in 0..length
        {
            let byte = self.buf[read_pos];
            out[i] = byte;
            self.buf[self.cursor] = byte;

            self.cursor = (self.cursor + 1) & self.mask;
            read_pos = (read_pos + 1) & self.mask;
        }

        self.filled += length;
        self.checksum.update(&out[..length]);

        Ok(length)
    }

    pub fn checksum_digest(&self) -> u32
    {
        self.checksum.digest()
    }

    /// Reset for reuse by a fresh session without discarding the backing
    /// allocation.
    pub fn reset(&mut self, checksum: Checksum)
    {
        self.buf.fill(0);
        self.cursor = 0;
        self.filled = 0;
        self.checksum = checksum;
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn push_then_copy_match_reproduces_bytes()
    {
        let mut w = Window::new(8, Checksum::None);

        for &b in b"abcdefgh"
        {
            w.push(b);
        }

        let mut out = [0_u8; 4];
        let n = w.copy_match(4, 8, &mut out).unwrap();

        assert_eq!(n, 4);
        assert_eq!(&out, b"abcd");
    }

    #[test]
    fn copy_match_overlapping_source_and_dest_extends_correctly()
    {
        // distance 1, length 4 on "a" should reproduce "aaaa" (the classic
        // overlapping self-referential run-length case).
        let mut w = Window::new(8, Checksum::None);
        w.push(b'a');

        let mut out = [0_u8; 4];
        w.copy_match(4, 1, &mut out).unwrap();

        assert_eq!(&out, b"aaaa");
    }

    #[test]
    fn copy_match_rejects_distance_beyond_history()
    {
        let mut w = Window::new(8, Checksum::None);
        w.push(b'a');

        let mut out = [0_u8; 1];
        assert!(w.copy_match(1, 2, &mut out).is_err());
    }

    #[test]
    fn checksum_tracks_every_byte_emitted_through_the_window()
    {
        use crate::checksum::Adler32;

        let mut w = Window::new(8, Checksum::Adler32(Adler32::new()));
        w.push_slice(b"aaaaaaaa");

        assert_eq!(w.checksum_digest(), 0x0C22_0205);
    }
}
