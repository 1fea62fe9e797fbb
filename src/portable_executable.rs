//! The Portable Executable façade: binds to a seekable byte stream,
//! exposes the parsed headers and (lazily) the section and relocation
//! tables, and performs the header-rewrite and append-new-section
//! mutations.

use crate::align::align;
use crate::error::{Error, Result};
use crate::headers::data_directory::ImageDataDirectoryArray;
use crate::headers::nt_headers::{ImageNTHeaders, ImageNTHeaders64, IMAGE_NT_SIGNATURE};
use crate::headers::optional_header::{
    IMAGE_NT_OPTIONAL_HDR32_MAGIC, IMAGE_NT_OPTIONAL_HDR64_MAGIC,
};
use crate::headers::{ImageDosHeader, NTHeaders};
use crate::io::Truncate;
use crate::relocation_table::RelocationTable;
use crate::section::Section;
use crate::section_table::SectionTable;
use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};

/// A Portable Executable image bound to a seekable byte stream.
///
/// The handle does not own the stream; closing it is the caller's
/// concern. It is not safe for concurrent use: the cached section and
/// relocation tables and the stream cursor are mutable shared state.
pub struct PortableExecutable<S> {
    stream: S,
    dos_header: ImageDosHeader,
    nt_headers: NTHeaders,
    section_table: Option<SectionTable>,
    relocation_table: Option<RelocationTable>,
}

impl<S: Read + Write + Seek + Truncate> PortableExecutable<S> {
    /// Binds to `stream` and performs the read-only construction path:
    /// DOS header, `"PE\0\0"` signature, and optional-header-magic
    /// dispatch to the 32- or 64-bit NT headers variant.
    pub fn new(mut stream: S) -> Result<Self> {
        let (dos_header, nt_headers) = Self::read_headers(&mut stream)?;
        Ok(Self {
            stream,
            dos_header,
            nt_headers,
            section_table: None,
            relocation_table: None,
        })
    }

    fn read_headers(stream: &mut S) -> Result<(ImageDosHeader, NTHeaders)> {
        stream.seek(SeekFrom::Start(0))?;
        let dos_bytes = crate::io::read_vec(stream, ImageDosHeader::SIZE)?;
        let dos_header = *ImageDosHeader::from_bytes(&dos_bytes)
            .expect("DOS header slice has exactly ImageDosHeader::SIZE bytes");
        if !dos_header.is_valid() {
            return Err(Error::Format("not an MZ image"));
        }

        stream.seek(SeekFrom::Start(dos_header.e_lfanew as u64))?;
        let signature = crate::io::read_vec(stream, 4)?;
        if signature != IMAGE_NT_SIGNATURE {
            return Err(Error::Format("missing PE signature"));
        }

        let optional_header_offset = dos_header.e_lfanew as u64 + 4 + 20;
        stream.seek(SeekFrom::Start(optional_header_offset))?;
        let magic_bytes = crate::io::read_vec(stream, 2)?;
        let magic = u16::from_le_bytes([magic_bytes[0], magic_bytes[1]]);

        stream.seek(SeekFrom::Start(dos_header.e_lfanew as u64))?;
        let nt_headers = match magic {
            IMAGE_NT_OPTIONAL_HDR32_MAGIC => {
                let bytes = crate::io::read_vec(stream, ImageNTHeaders::SIZE)?;
                let header = *ImageNTHeaders::from_bytes(&bytes)
                    .expect("NT headers slice has exactly ImageNTHeaders::SIZE bytes");
                NTHeaders::Nt32(header)
            }
            IMAGE_NT_OPTIONAL_HDR64_MAGIC => {
                let bytes = crate::io::read_vec(stream, ImageNTHeaders64::SIZE)?;
                let header = *ImageNTHeaders64::from_bytes(&bytes)
                    .expect("NT headers slice has exactly ImageNTHeaders64::SIZE bytes");
                NTHeaders::Nt64(header)
            }
            other => return Err(Error::UnsupportedFormat(other)),
        };

        Ok((dos_header, nt_headers))
    }

    pub fn dos_header(&self) -> &ImageDosHeader {
        &self.dos_header
    }

    pub fn nt_headers(&self) -> &NTHeaders {
        &self.nt_headers
    }

    pub fn file_header(&self) -> &crate::headers::ImageFileHeader {
        self.nt_headers.file_header()
    }

    pub fn optional_header(&self) -> crate::headers::OptionalHeader {
        self.nt_headers.optional_header()
    }

    pub fn data_directory(&self) -> &ImageDataDirectoryArray {
        // Accessed through the optional header; callers that need a
        // stable reference should go through `optional_header()`.
        // SAFETY-free: delegates to the tagged optional header.
        match &self.nt_headers {
            NTHeaders::Nt32(h) => &h.optional_header.data_directory,
            NTHeaders::Nt64(h) => &h.optional_header.data_directory,
        }
    }

    pub fn optional_header_offset(&self) -> u64 {
        self.dos_header.e_lfanew as u64 + 4 + 20
    }

    /// Size of the NT headers as they actually appear on disk: the fixed
    /// part plus `number_of_rva_and_sizes` directory entries, not the
    /// full fixed-size record.
    pub fn nt_headers_size(&self) -> u64 {
        let base = self.nt_headers.base_size_without_directory_array() as u64;
        let directories = self.optional_header().number_of_rva_and_sizes() as u64;
        base + 8 * directories
    }

    pub fn data_directory_offset(&self) -> u64 {
        self.dos_header.e_lfanew as u64 + self.nt_headers.full_size() as u64
            - ImageDataDirectoryArray::SIZE as u64
    }

    pub fn data_directory_size(&self) -> u64 {
        8 * self.optional_header().number_of_rva_and_sizes() as u64
    }

    pub fn section_table_offset(&self) -> u64 {
        self.dos_header.e_lfanew as u64 + self.nt_headers_size()
    }

    /// The section table, materialized on first access.
    pub fn section_table(&mut self) -> Result<&SectionTable> {
        if self.section_table.is_none() {
            let offset = self.section_table_offset();
            let count = self.file_header().number_of_sections as usize;
            self.stream.seek(SeekFrom::Start(offset))?;
            let table = SectionTable::read(&mut self.stream, count)?;
            self.section_table = Some(table);
        }
        Ok(self.section_table.as_ref().unwrap())
    }

    /// The base relocation table, materialized on first access by
    /// translating `data_directory.basereloc` to a file offset via the
    /// section table.
    pub fn relocation_table(&mut self) -> Result<&RelocationTable> {
        if self.relocation_table.is_none() {
            let basereloc = self.data_directory().basereloc;
            let offset = self.section_table()?.rva_to_offset(basereloc.virtual_address as u64)?;
            self.stream.seek(SeekFrom::Start(offset))?;
            let table = RelocationTable::from_stream(&mut self.stream, basereloc.size as u64)?;
            self.relocation_table = Some(table);
        }
        Ok(self.relocation_table.as_ref().unwrap())
    }

    /// Serializes the in-memory NT headers, truncated to
    /// [`Self::nt_headers_size`], at `e_lfanew`.
    pub fn rewrite_nt_headers(&mut self) -> Result<()> {
        let offset = self.dos_header.e_lfanew as u64;
        let size = self.nt_headers_size() as usize;
        let bytes = self.nt_headers.to_bytes_truncated(size);
        self.stream.seek(SeekFrom::Start(offset))?;
        self.stream.write_all(&bytes)?;
        Ok(())
    }

    /// Serializes `data_directory_size` bytes of the directory array at
    /// `data_directory_offset`.
    pub fn rewrite_data_directory(&mut self) -> Result<()> {
        let offset = self.data_directory_offset();
        let full = self.data_directory().as_bytes();
        let size = (self.data_directory_size() as usize).min(full.len());
        let bytes = full[..size].to_vec();
        self.stream.seek(SeekFrom::Start(offset))?;
        self.stream.write_all(&bytes)?;
        Ok(())
    }

    /// Re-runs the construction read path and invalidates cached tables.
    pub fn reread(&mut self) -> Result<()> {
        let (dos_header, nt_headers) = Self::read_headers(&mut self.stream)?;
        self.dos_header = dos_header;
        self.nt_headers = nt_headers;
        self.section_table = None;
        self.relocation_table = None;
        Ok(())
    }

    /// Appends a new section, following the eight-step algorithm that
    /// keeps section count, image size, and file length mutually
    /// consistent.
    ///
    /// `section` must already carry `pointer_to_raw_data` aligned to
    /// `file_alignment` and `virtual_address` aligned to
    /// `section_alignment`, chosen so as not to overlap existing
    /// sections — this is trusted, not re-validated, matching the
    /// source's lenient behavior.
    ///
    /// After this call the caller is expected to populate
    /// `[section.pointer_to_raw_data, +data_size)` with payload bytes
    /// and call [`Self::reread`] to refresh the cached section table.
    pub fn add_new_section(&mut self, mut section: Section, data_size: u64) -> Result<()> {
        let file_alignment = self.optional_header().file_alignment() as u64;
        let section_alignment = self.optional_header().section_alignment() as u64;

        let file_size = align(section.pointer_to_raw_data() as u64 + data_size, file_alignment);
        section.set_size_of_raw_data((file_size - section.pointer_to_raw_data() as u64) as u32);

        self.stream.truncate(file_size)?;

        section.set_virtual_size(data_size as u32);

        let existing_count = self.file_header().number_of_sections as u64;
        let header_offset = self.section_table_offset() + existing_count * 40;
        self.stream.seek(SeekFrom::Start(header_offset))?;
        self.stream.write_all(section.header().as_bytes())?;

        self.nt_headers.file_header_mut().number_of_sections = (existing_count + 1) as u16;

        let size_of_image = align(
            section.virtual_address() as u64 + section.virtual_size() as u64,
            section_alignment,
        );
        let mut optional_header = self.optional_header();
        optional_header.set_size_of_image(size_of_image as u32);
        self.nt_headers.set_optional_header(optional_header);

        self.rewrite_nt_headers()?;

        Ok(())
    }
}

impl<S> fmt::Display for PortableExecutable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let optional = self.nt_headers.optional_header();
        writeln!(f, "machine: {}", self.file_header().machine())?;
        writeln!(f, "sections: {}", self.file_header().number_of_sections)?;
        writeln!(
            f,
            "bitness: {}",
            if optional.is_pe32_plus() { "PE32+" } else { "PE32" }
        )?;
        writeln!(f, "subsystem: {}", optional.subsystem())?;
        write!(f, "size of image: {:#x}", optional.size_of_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::{
        ImageFileHeader, ImageOptionalHeader, ImageSectionHeader, SectionCharacteristics,
    };
    use std::io::Cursor;

    /// Builds a minimal, byte-exact PE32 image in memory with the given
    /// sections, ready for `PortableExecutable::new`.
    fn build_minimal_pe32(sections: &[(&str, u32, u32, u32, u32, u32)]) -> Vec<u8> {
        let e_lfanew: u32 = 0x80;
        let mut buf = vec![0u8; e_lfanew as usize];
        let mut dos = zeroed::<ImageDosHeader>();
        dos.e_magic = *b"MZ";
        dos.e_lfanew = e_lfanew;
        buf[..64].copy_from_slice(dos.as_bytes());

        buf.extend_from_slice(b"PE\0\0");

        let mut file_header = zeroed::<ImageFileHeader>();
        file_header.machine = 0x014C; // I386
        file_header.number_of_sections = sections.len() as u16;
        file_header.size_of_optional_header = ImageOptionalHeader::SIZE as u16;
        file_header.characteristics = 0x0102;
        buf.extend_from_slice(file_header.as_bytes());

        let mut optional = zeroed::<ImageOptionalHeader>();
        optional.magic = IMAGE_NT_OPTIONAL_HDR32_MAGIC;
        optional.section_alignment = 0x1000;
        optional.file_alignment = 0x200;
        optional.image_base = 0x0040_0000;
        optional.size_of_headers = align(e_lfanew as u64 + 4 + 20 + ImageOptionalHeader::SIZE as u64 + sections.len() as u64 * 40, 0x200) as u32;
        optional.number_of_rva_and_sizes = 16;
        if let Some(last) = sections.last() {
            optional.size_of_image = align((last.4 + last.5) as u64, 0x1000) as u32;
        }
        buf.extend_from_slice(optional.as_bytes());

        let section_table_offset = buf.len() as u64;
        for &(name, characteristics, praw, psize, vaddr, vsize) in sections {
            let header = ImageSectionHeader::new(
                name,
                SectionCharacteristics::from_bits_truncate(characteristics),
                praw,
                psize,
                vaddr,
                vsize,
            );
            buf.extend_from_slice(header.as_bytes());
        }
        let _ = section_table_offset;

        let needed = sections.iter().map(|s| (s.2 + s.3) as usize).max().unwrap_or(buf.len());
        if needed > buf.len() {
            buf.resize(needed, 0);
        }
        buf
    }

    fn zeroed<T: bytemuck::Zeroable>() -> T {
        T::zeroed()
    }

    #[test]
    fn opens_minimal_pe32_and_enumerates_sections() {
        let bytes = build_minimal_pe32(&[
            (".text", 0x6000_0020, 0x400, 0x200, 0x1000, 0x10),
            (".data", 0xC000_0040, 0x600, 0x200, 0x2000, 0x10),
            (".reloc", 0x4200_0040, 0x800, 0x200, 0x3000, 0x10),
        ]);
        let mut pe = PortableExecutable::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = pe.section_table().unwrap().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec![".text", ".data", ".reloc"]);
    }

    #[test]
    fn unsupported_magic_fails() {
        let mut bytes = build_minimal_pe32(&[(".text", 0x6000_0020, 0x400, 0x200, 0x1000, 0x10)]);
        // Optional header magic lives right after signature + file header.
        let magic_offset = 0x80 + 4 + 20;
        bytes[magic_offset] = 0x07;
        bytes[magic_offset + 1] = 0x01; // 0x107, ROM
        let err = PortableExecutable::new(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(0x107)));
    }

    #[test]
    fn append_new_section_updates_invariants() {
        let bytes = build_minimal_pe32(&[
            (".text", 0x6000_0020, 0x400, 0x200, 0x1000, 0x10),
            (".data", 0xC000_0040, 0x600, 0x200, 0x2000, 0x10),
        ]);
        let mut pe = PortableExecutable::new(Cursor::new(bytes)).unwrap();

        let (last_va, last_vsize, last_praw, last_psize) = {
            let table = pe.section_table().unwrap();
            let last = table.get(table.len() - 1).unwrap();
            (last.virtual_address(), last.virtual_size(), last.pointer_to_raw_data(), last.size_of_raw_data())
        };
        let section_alignment = pe.optional_header().section_alignment() as u64;
        let file_alignment = pe.optional_header().file_alignment() as u64;

        let new_va = align(last_va as u64 + last_vsize as u64, section_alignment) as u32;
        let new_praw = align(last_praw as u64 + last_psize as u64, file_alignment) as u32;

        let new_section = Section::new(
            ".new",
            SectionCharacteristics::from_bits_truncate(0xDEAD_BEEF),
            new_praw,
            0,
            new_va,
            0,
        );
        pe.add_new_section(new_section, 1024).unwrap();
        pe.reread().unwrap();

        let table = pe.section_table().unwrap();
        assert_eq!(table.len(), 3);
        let appended = table.get(2).unwrap();
        assert_eq!(appended.name(), ".new");
        assert_eq!(appended.characteristics().bits(), 0xDEAD_BEEF);

        let expected_size_of_image = align(new_va as u64 + 1024, section_alignment);
        assert_eq!(pe.optional_header().size_of_image() as u64, expected_size_of_image);
    }
}
