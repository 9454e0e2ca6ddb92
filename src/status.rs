//! The shared suspension-tag type every encoder and decoder session
//! returns from `eval`, across all three framings (RFC1951, zlib, gzip)
//! and both directions. Keeping one generic tag type (rather than one per
//! session type, as a direct port of the distilled spec's per-module
//! continuations would have) is what lets [`to_result`] drive any of the
//! six session types with the same loop.

/// One step's outcome. `E` is whichever layer's error enum the session
/// uses (`Rfc1951Error`, `ZlibError`, `GzipError`, or `EncodeError`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status<E>
{
    /// The input slice passed to `eval` was fully consumed but the
    /// session needs more to make progress.
    Await,
    /// The output slice passed to `eval` is full; call again with a fresh
    /// one to keep draining.
    Flush,
    /// The session reached its natural end (final block decoded and
    /// trailer verified, or `finish` fully flushed).
    End,
    Error(E)
}

/// A session this crate's `eval`-based types all implement, letting
/// [`to_result`] drive any of them identically.
pub trait Eval
{
    type Error: std::error::Error;

    /// Consume as much of `input` as possible, writing decoded or encoded
    /// bytes into `output`, until a suspension point or the natural end.
    fn eval(&mut self, input: &[u8], output: &mut [u8]) -> Status<Self::Error>;

    /// Bytes of `input` consumed by the most recent `eval` call.
    fn used_in(&self) -> usize;

    /// Bytes of `output` written by the most recent `eval` call.
    fn used_out(&self) -> usize;
}

/// Drive `session` to completion, calling `refill` whenever it reports
/// `Await` (to obtain the next input slice) and `flush_out` whenever it
/// reports a full output slice worth of bytes (to drain `output` before
/// reusing it). Returns `Ok(())` on `End`, or the session's error on
/// `Error`.
///
/// `refill` returns `None` once the caller has no more input to offer;
/// `eval` is then called once more with an empty slice so the session can
/// observe end-of-stream (a truncated stream at that point yields
/// `Status::Await` forever, which this driver reports as an error via
/// `on_truncated`).
pub fn to_result<S, E>(
    session: &mut S, output: &mut [u8], mut refill: impl FnMut() -> Option<Vec<u8>>,
    mut flush_out: impl FnMut(&[u8]), on_truncated: impl FnOnce() -> E
) -> Result<(), E>
where
    S: Eval<Error = E>
{
    let mut pending_input: Vec<u8> = Vec::new();
    let mut input_exhausted = false;

    loop
    {
        match session.eval(&pending_input, output)
        {
            Status::End => return Ok(()),
            Status::Error(e) => return Err(e),
            Status::Flush =>
            {
                let used_out = session.used_out();
                flush_out(&output[..used_out]);

                let used_in = session.used_in();
                pending_input.drain(0..used_in);
            }
            Status::Await =>
            {
                let used_out = session.used_out();
                if used_out > 0
                {
                    flush_out(&output[..used_out]);
                }

                let used_in = session.used_in();
                pending_input.drain(0..used_in);

                if pending_input.is_empty()
                {
                    match refill()
                    {
                        Some(more) => pending_input = more,
                        None =>
                        {
                            if input_exhausted
                            {
                                return Err(on_truncated());
                            }
                            input_exhausted = true;
                        }
                    }
                }
            }
        }
    }
}
