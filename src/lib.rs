//! A streaming, non-blocking DEFLATE/zlib/gzip codec.
//!
//! Every session type (raw, zlib-framed, gzip-framed; encoder or
//! decoder) exposes the same push-style `eval(input, output)` call,
//! suspending with [`Status::Await`] (needs more input), [`Status::Flush`]
//! (output buffer full, call again with the same input), [`Status::End`]
//! (done), or [`Status::Error`] (session is now unusable).
pub use crate::decoder::Rfc1951Decoder;
pub use crate::encoder::{FlushMode, Rfc1951Encoder};
pub use crate::gzip::{GzipDecoder, GzipEncoder, GzipEncoderOptions, GzipOs};
pub use crate::status::{to_result, Eval, Status};
pub use crate::zlib::{ZlibDecoder, ZlibEncoder, ZlibEncoderOptions};

mod bitreader;
mod bitwriter;
mod checksum;
mod constants;
mod decoder;
mod encoder;
pub mod errors;
mod gzip;
mod huffman;
mod lz77;
mod status;
mod window;
mod zlib;

pub use crate::checksum::{Adler32, Checksum, Crc32};
