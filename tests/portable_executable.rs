//! End-to-end scenarios over minimal, byte-exact PE images assembled
//! entirely in memory — no external fixture files, matching how the
//! crate's own unit tests build their fixtures.

use pexp::align;
use pexp::headers::optional_header::{
    IMAGE_NT_OPTIONAL_HDR32_MAGIC, IMAGE_NT_OPTIONAL_HDR64_MAGIC,
};
use pexp::headers::{
    ImageDosHeader, ImageFileHeader, ImageOptionalHeader, ImageOptionalHeader64,
    ImageSectionHeader, SectionCharacteristics,
};
use pexp::relocation_table::RelocationTable;
use pexp::{Error, PortableExecutable, Section};
use std::io::Cursor;

const E_LFANEW: u32 = 0x80;
const SECTION_ALIGNMENT: u32 = 0x1000;
const FILE_ALIGNMENT: u32 = 0x200;

fn zeroed<T: bytemuck::Zeroable>() -> T {
    T::zeroed()
}

struct SectionSpec {
    name: &'static str,
    characteristics: u32,
    pointer_to_raw_data: u32,
    size_of_raw_data: u32,
    virtual_address: u32,
    virtual_size: u32,
    data: Vec<u8>,
}

/// Assembles a minimal PE32 or PE32+ image with the given sections.
/// `basereloc` is `(virtual_address, size)` if a relocation directory
/// entry should be populated.
fn build_minimal_pe(
    magic: u16,
    sections: &[SectionSpec],
    basereloc: Option<(u32, u32)>,
) -> Vec<u8> {
    let mut buf = vec![0u8; E_LFANEW as usize];
    let mut dos = zeroed::<ImageDosHeader>();
    dos.e_magic = *b"MZ";
    dos.e_lfanew = E_LFANEW;
    buf[..64].copy_from_slice(dos.as_bytes());

    buf.extend_from_slice(b"PE\0\0");

    let mut file_header = zeroed::<ImageFileHeader>();
    file_header.machine = 0x014C;
    file_header.number_of_sections = sections.len() as u16;
    file_header.characteristics = 0x0102;
    buf.extend_from_slice(file_header.as_bytes());

    let optional_header_bytes: Vec<u8> = if magic == IMAGE_NT_OPTIONAL_HDR64_MAGIC {
        let mut optional = zeroed::<ImageOptionalHeader64>();
        optional.magic = magic;
        optional.section_alignment = SECTION_ALIGNMENT;
        optional.file_alignment = FILE_ALIGNMENT;
        optional.image_base = 0x1_4000_0000;
        optional.number_of_rva_and_sizes = 16;
        if let Some(last) = sections.last() {
            optional.size_of_image =
                align((last.virtual_address + last.virtual_size) as u64, SECTION_ALIGNMENT as u64) as u32;
        }
        if let Some((rva, size)) = basereloc {
            optional.data_directory.basereloc.virtual_address = rva;
            optional.data_directory.basereloc.size = size;
        }
        optional.as_bytes().to_vec()
    } else {
        let mut optional = zeroed::<ImageOptionalHeader>();
        optional.magic = magic;
        optional.section_alignment = SECTION_ALIGNMENT;
        optional.file_alignment = FILE_ALIGNMENT;
        optional.image_base = 0x0040_0000;
        optional.number_of_rva_and_sizes = 16;
        if let Some(last) = sections.last() {
            optional.size_of_image =
                align((last.virtual_address + last.virtual_size) as u64, SECTION_ALIGNMENT as u64) as u32;
        }
        if let Some((rva, size)) = basereloc {
            optional.data_directory.basereloc.virtual_address = rva;
            optional.data_directory.basereloc.size = size;
        }
        optional.as_bytes().to_vec()
    };
    buf.extend_from_slice(&optional_header_bytes);

    for spec in sections {
        let header = ImageSectionHeader::new(
            spec.name,
            SectionCharacteristics::from_bits_truncate(spec.characteristics),
            spec.pointer_to_raw_data,
            spec.size_of_raw_data,
            spec.virtual_address,
            spec.virtual_size,
        );
        buf.extend_from_slice(header.as_bytes());
    }

    let needed = sections
        .iter()
        .map(|s| (s.pointer_to_raw_data + s.size_of_raw_data) as usize)
        .max()
        .unwrap_or(buf.len());
    if needed > buf.len() {
        buf.resize(needed, 0);
    }

    for spec in sections {
        if spec.data.is_empty() {
            continue;
        }
        let start = spec.pointer_to_raw_data as usize;
        let end = start + spec.data.len();
        buf[start..end].copy_from_slice(&spec.data);
    }

    buf
}

fn three_section_layout() -> Vec<SectionSpec> {
    vec![
        SectionSpec {
            name: ".text",
            characteristics: 0x6000_0020,
            pointer_to_raw_data: 0x400,
            size_of_raw_data: 0x200,
            virtual_address: 0x1000,
            virtual_size: 0x10,
            data: Vec::new(),
        },
        SectionSpec {
            name: ".data",
            characteristics: 0xC000_0040,
            pointer_to_raw_data: 0x600,
            size_of_raw_data: 0x200,
            virtual_address: 0x2000,
            virtual_size: 0x10,
            data: Vec::new(),
        },
        SectionSpec {
            name: ".reloc",
            characteristics: 0x4200_0040,
            pointer_to_raw_data: 0x800,
            size_of_raw_data: 0x200,
            virtual_address: 0x3000,
            virtual_size: 0x10,
            data: Vec::new(),
        },
    ]
}

#[test]
fn pe32_section_enumeration() {
    let bytes = build_minimal_pe(IMAGE_NT_OPTIONAL_HDR32_MAGIC, &three_section_layout(), None);
    let mut pe = PortableExecutable::new(Cursor::new(bytes)).unwrap();
    let names: Vec<String> = pe.section_table().unwrap().iter().map(|s| s.name()).collect();
    let chars: Vec<u32> = pe
        .section_table()
        .unwrap()
        .iter()
        .map(|s| s.characteristics().bits())
        .collect();
    assert_eq!(names, vec![".text", ".data", ".reloc"]);
    assert_eq!(chars, vec![0x6000_0020, 0xC000_0040, 0x4200_0040]);
}

#[test]
fn pe32_plus_section_enumeration() {
    let bytes = build_minimal_pe(IMAGE_NT_OPTIONAL_HDR64_MAGIC, &three_section_layout(), None);
    let mut pe = PortableExecutable::new(Cursor::new(bytes)).unwrap();
    assert!(pe.optional_header().is_pe32_plus());
    let names: Vec<String> = pe.section_table().unwrap().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec![".text", ".data", ".reloc"]);
}

#[test]
fn relocation_iteration_yields_one_rva() {
    let reloc_table = RelocationTable::build(vec![0x3008u32]);
    let mut reloc_bytes = Cursor::new(Vec::new());
    reloc_table.to_stream(&mut reloc_bytes).unwrap();
    let reloc_bytes = reloc_bytes.into_inner();

    let mut sections = three_section_layout();
    sections.last_mut().unwrap().data = reloc_bytes.clone();

    let basereloc = (sections.last().unwrap().virtual_address, reloc_bytes.len() as u32);
    let bytes = build_minimal_pe(IMAGE_NT_OPTIONAL_HDR32_MAGIC, &sections, Some(basereloc));

    let mut pe = PortableExecutable::new(Cursor::new(bytes)).unwrap();
    let rvas: Vec<u32> = pe.relocation_table().unwrap().iter().collect();
    assert_eq!(rvas, vec![0x3008]);
}

#[test]
fn unsupported_magic_fails() {
    let bytes = build_minimal_pe(0x0107, &three_section_layout(), None);
    let err = PortableExecutable::new(Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(0x107)));
}

#[test]
fn append_new_section_preserves_invariants() {
    let bytes = build_minimal_pe(IMAGE_NT_OPTIONAL_HDR32_MAGIC, &three_section_layout(), None);
    let mut pe = PortableExecutable::new(Cursor::new(bytes)).unwrap();

    let (last_va, last_vsize, last_praw, last_psize) = {
        let table = pe.section_table().unwrap();
        let last = table.get(table.len() - 1).unwrap();
        (
            last.virtual_address(),
            last.virtual_size(),
            last.pointer_to_raw_data(),
            last.size_of_raw_data(),
        )
    };

    let new_va = align((last_va + last_vsize) as u64, SECTION_ALIGNMENT as u64) as u32;
    let new_praw = align((last_praw + last_psize) as u64, FILE_ALIGNMENT as u64) as u32;

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
    assert_eq!(table.len(), 4);
    let appended = table.get(3).unwrap();
    assert_eq!(appended.name(), ".new");
    assert_eq!(appended.characteristics().bits(), 0xDEAD_BEEF);

    let expected_size_of_image = align((new_va as u64) + 1024, SECTION_ALIGNMENT as u64);
    assert_eq!(pe.optional_header().size_of_image() as u64, expected_size_of_image);
}
