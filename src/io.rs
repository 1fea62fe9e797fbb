//! The byte-stream abstraction the façade is built on.
//!
//! This is intentionally thin: the core only ever needs seek, read-exact,
//! write, and truncate-with-zero-fill-on-growth over a random-access
//! byte stream. Any `Read + Write + Seek` type gets this for free;
//! `Truncate` is the one operation the standard traits don't already
//! provide, so it's its own trait implemented per concrete stream type.

use std::io::{Read, Seek, Write};

/// Marker bound for anything the façade can bind to.
pub trait PeStream: Read + Write + Seek {}
impl<T: Read + Write + Seek> PeStream for T {}

/// Truncate a stream to an absolute length, growing with zero-fill or
/// shrinking by discarding trailing bytes.
pub trait Truncate {
    fn truncate(&mut self, len: u64) -> std::io::Result<()>;
}

impl Truncate for std::fs::File {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        let current = self.metadata()?.len();
        self.set_len(len)?;
        if len > current {
            // set_len on a File already zero-fills the new region on every
            // platform this crate targets; nothing further to do.
        }
        Ok(())
    }
}

impl Truncate for std::io::Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        let len = len as usize;
        let buf = self.get_mut();
        if len <= buf.len() {
            buf.truncate(len);
        } else {
            buf.resize(len, 0);
        }
        Ok(())
    }
}

/// Reads exactly `n` bytes from the current stream position.
pub(crate) fn read_vec<R: Read>(reader: &mut R, n: usize) -> crate::error::Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    crate::error::read_exact_or_eof(reader, &mut buf)?;
    Ok(buf)
}
