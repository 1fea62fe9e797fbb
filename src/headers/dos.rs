//! The MS-DOS header every PE image opens with. Only `e_magic` and
//! `e_lfanew` carry meaning for a modern loader; the rest is retained
//! byte-for-byte because it's part of the on-disk layout.

use crate::record::packed_record;

/// The two bytes every PE image must begin with: `b"MZ"`.
pub const IMAGE_DOS_SIGNATURE: [u8; 2] = *b"MZ";

packed_record! {
    /// 64-byte MS-DOS executable header (`IMAGE_DOS_HEADER`).
    pub struct ImageDosHeader {
        /// Magic number, must be `"MZ"`.
        e_magic: [u8; 2],
        /// Bytes on last page of file.
        e_cblp: u16,
        /// Pages in file.
        e_cp: u16,
        /// Relocations.
        e_crlc: u16,
        /// Size of header in paragraphs.
        e_cparhdr: u16,
        /// Minimum extra paragraphs needed.
        e_minalloc: u16,
        /// Maximum extra paragraphs needed.
        e_maxalloc: u16,
        /// Initial (relative) SS value.
        e_ss: u16,
        /// Initial SP value.
        e_sp: u16,
        /// Checksum.
        e_csum: u16,
        /// Initial IP value.
        e_ip: u16,
        /// Initial (relative) CS value.
        e_cs: u16,
        /// File address of relocation table.
        e_lfarlc: u16,
        /// Overlay number.
        e_ovno: u16,
        /// Reserved words.
        e_res: [u16; 4],
        /// OEM identifier (for e_oeminfo).
        e_oemid: u16,
        /// OEM information; e_oemid specific.
        e_oeminfo: u16,
        /// Reserved words.
        e_res2: [u16; 10],
        /// File address of the new exe header (the NT headers).
        e_lfanew: u32,
    }
}

impl ImageDosHeader {
    pub fn is_valid(&self) -> bool {
        self.e_magic == IMAGE_DOS_SIGNATURE
    }
}
