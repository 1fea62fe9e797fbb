//! Error surface for the PE-structural model.
//!
//! The library is a thin model over the file: no error kind is recovered
//! locally, everything is surfaced to the caller via `Result`.

use std::io;

/// A short-read failure, distinguished from a generic I/O failure so a
/// caller can tell "the stream ran out of bytes" apart from "the OS
/// refused the operation".
#[derive(Debug, thiserror::Error)]
#[error("unexpected end of stream: needed {needed} bytes, got {got}")]
pub struct UnexpectedEofError {
    pub needed: usize,
    pub got: usize,
}

/// All failure modes the core distinguishes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing/invalid `MZ` or `PE\0\0` signature, or a malformed
    /// relocation block size.
    #[error("{0}")]
    Format(&'static str),

    /// Optional-header magic not in `{0x10B, 0x20B}`.
    #[error("unsupported optional header magic 0x{0:04X}")]
    UnsupportedFormat(u16),

    /// An `offset_to_rva`/`rva_to_offset` probe fell outside the extent
    /// of the section it was asked of.
    #[error("{0:#x} is out of range for this section")]
    Range(u64),

    /// `which_section`/`which_section_index` called with neither or both
    /// of `offset`/`rva`.
    #[error("exactly one of `offset` or `rva` must be supplied")]
    Argument,

    /// The stream ran out of bytes before a read could complete.
    #[error(transparent)]
    UnexpectedEof(#[from] UnexpectedEofError),

    /// Any other stream failure: write, truncate, seek.
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reads exactly `buf.len()` bytes, turning a short read into
/// [`Error::UnexpectedEof`] instead of the generic I/O error
/// `std::io::Read::read_exact` would normally produce only for a
/// totally empty stream.
pub(crate) fn read_exact_or_eof<R: io::Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Error::UnexpectedEof(UnexpectedEofError {
                    needed: buf.len(),
                    got: filled,
                }))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(())
}
