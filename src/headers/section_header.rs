//! The section header and the characteristics bitmask describing a
//! section's content and memory attributes.
//!
//! `ImageSectionHeader` carries a C union at offset 8: the same 32-bit
//! storage slot is addressed as either `physical_address` (object files)
//! or `virtual_size` (image files). The packed-record macro has no
//! syntax for overlapping fields, so this record is declared with the
//! union's single storage slot named `misc` and exposed through two
//! accessor methods that read/write that one field — preserving the
//! "size = 4 bytes at the same offset" layout the union requires
//! without any hand-written unsafe code.

use crate::record::packed_record;
use bitflags::bitflags;

packed_record! {
    /// 40-byte section header.
    pub struct ImageSectionHeader {
        /// Section name, zero-padded, not NUL-terminated if exactly 8 bytes.
        name: [u8; 8],
        /// Union storage: `physical_address` (object files) or
        /// `virtual_size` (image files). Use [`ImageSectionHeader::virtual_size`].
        misc: u32,
        virtual_address: u32,
        size_of_raw_data: u32,
        pointer_to_raw_data: u32,
        pointer_to_relocations: u32,
        pointer_to_linenumbers: u32,
        number_of_relocations: u16,
        number_of_linenumbers: u16,
        characteristics: u32,
    }
}

impl ImageSectionHeader {
    /// The `virtual_size` member of the `misc` union: the total size of
    /// the section in memory. This is the only member this crate exposes.
    pub fn virtual_size(&self) -> u32 {
        self.misc
    }

    pub fn set_virtual_size(&mut self, value: u32) {
        self.misc = value;
    }

    /// The `physical_address` member of the same union, for object files.
    pub fn physical_address(&self) -> u32 {
        self.misc
    }

    /// The section name with trailing zero padding stripped, decoded
    /// lossily (PE section names are not guaranteed to be valid UTF-8,
    /// though in practice they always are).
    pub fn name_str(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    pub fn characteristics(&self) -> SectionCharacteristics {
        SectionCharacteristics::from_bits_truncate(self.characteristics)
    }

    /// Builds a section header from the fields a caller supplies when
    /// constructing a new section (e.g. for `add_new_section`); the
    /// remaining fields (relocations, line numbers) default to zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        characteristics: SectionCharacteristics,
        pointer_to_raw_data: u32,
        size_of_raw_data: u32,
        virtual_address: u32,
        virtual_size: u32,
    ) -> Self {
        let mut name_bytes = [0u8; 8];
        let src = name.as_bytes();
        let n = src.len().min(8);
        name_bytes[..n].copy_from_slice(&src[..n]);
        Self {
            name: name_bytes,
            misc: virtual_size,
            virtual_address,
            size_of_raw_data,
            pointer_to_raw_data,
            pointer_to_relocations: 0,
            pointer_to_linenumbers: 0,
            number_of_relocations: 0,
            number_of_linenumbers: 0,
            characteristics: characteristics.bits(),
        }
    }
}

bitflags! {
    /// Section attributes (`IMAGE_SECTION_HEADER::Characteristics`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionCharacteristics: u32 {
        /// Section should not be padded to the next boundary. Obsolete,
        /// replaced by `ALIGN_1BYTES`. Valid only for object files.
        const TYPE_NO_PAD = 0x0000_0008;
        /// Section contains executable code.
        const CNT_CODE = 0x0000_0020;
        /// Section contains initialized data.
        const CNT_INITIALIZED_DATA = 0x0000_0040;
        /// Section contains uninitialized data.
        const CNT_UNINITIALIZED_DATA = 0x0000_0080;
        /// Reserved for future use.
        const LNK_OTHER = 0x0000_0100;
        /// Section contains comments or other information (e.g. `.drectve`).
        /// Valid only for object files.
        const LNK_INFO = 0x0000_0200;
        /// Section will not become part of the image. Object files only.
        const LNK_REMOVE = 0x0000_0800;
        /// Section contains COMDAT data. Object files only.
        const LNK_COMDAT = 0x0000_1000;
        /// Section contains data referenced through the global pointer (GP).
        const GPREL = 0x0000_8000;
        /// Align data on a 1-byte boundary. Object files only.
        const ALIGN_1BYTES = 0x0010_0000;
        /// Align data on a 2-byte boundary. Object files only.
        const ALIGN_2BYTES = 0x0020_0000;
        /// Align data on a 4-byte boundary. Object files only.
        const ALIGN_4BYTES = 0x0030_0000;
        /// Align data on an 8-byte boundary. Object files only.
        const ALIGN_8BYTES = 0x0040_0000;
        /// Align data on a 16-byte boundary. Object files only.
        const ALIGN_16BYTES = 0x0050_0000;
        /// Align data on a 32-byte boundary. Object files only.
        const ALIGN_32BYTES = 0x0060_0000;
        /// Align data on a 64-byte boundary. Object files only.
        const ALIGN_64BYTES = 0x0070_0000;
        /// Align data on a 128-byte boundary. Object files only.
        const ALIGN_128BYTES = 0x0080_0000;
        /// Align data on a 256-byte boundary. Object files only.
        const ALIGN_256BYTES = 0x0090_0000;
        /// Align data on a 512-byte boundary. Object files only.
        const ALIGN_512BYTES = 0x00A0_0000;
        /// Align data on a 1024-byte boundary. Object files only.
        const ALIGN_1024BYTES = 0x00B0_0000;
        /// Align data on a 2048-byte boundary. Object files only.
        const ALIGN_2048BYTES = 0x00C0_0000;
        /// Align data on a 4096-byte boundary. Object files only.
        const ALIGN_4096BYTES = 0x00D0_0000;
        /// Align data on an 8192-byte boundary. Object files only.
        const ALIGN_8192BYTES = 0x00E0_0000;
        /// Section contains extended relocations.
        const LNK_NRELOC_OVFL = 0x0100_0000;
        /// Section can be discarded as needed.
        const MEM_DISCARDABLE = 0x0200_0000;
        /// Section cannot be cached.
        const MEM_NOT_CACHED = 0x0400_0000;
        /// Section is not pageable.
        const MEM_NOT_PAGED = 0x0800_0000;
        /// Section can be shared in memory.
        const MEM_SHARED = 0x1000_0000;
        /// Section can be executed as code.
        const MEM_EXECUTE = 0x2000_0000;
        /// Section can be read.
        const MEM_READ = 0x4000_0000;
        /// Section can be written to.
        const MEM_WRITE = 0x8000_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_40_bytes() {
        assert_eq!(ImageSectionHeader::SIZE, 40);
    }

    #[test]
    fn misc_union_slot_is_virtual_size() {
        let header = ImageSectionHeader::new(
            ".text",
            SectionCharacteristics::CNT_CODE
                | SectionCharacteristics::MEM_EXECUTE
                | SectionCharacteristics::MEM_READ,
            0x400,
            0xAA9800,
            0x1000,
            0xAA977F,
        );
        assert_eq!(header.virtual_size(), 0xAA977F);
        assert_eq!(header.physical_address(), 0xAA977F);
        assert_eq!(header.name_str(), ".text");
        assert_eq!(header.characteristics().bits(), 0x6000_0020);
    }

    #[test]
    fn name_padding_is_stripped() {
        let header = ImageSectionHeader::new(
            ".reloc",
            SectionCharacteristics::empty(),
            0,
            0,
            0,
            0,
        );
        assert_eq!(header.name_str(), ".reloc");
        assert_eq!(&header.name, b".reloc\0\0");
    }
}
