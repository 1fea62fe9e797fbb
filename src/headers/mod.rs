//! The PE record catalog: every on-disk structure the façade reads and
//! writes, built on the packed record model in [`crate::record`].

pub mod data_directory;
pub mod dos;
pub mod file_header;
pub mod nt_headers;
pub mod optional_header;
pub mod section_header;

pub use data_directory::{ImageDataDirectory, ImageDataDirectoryArray};
pub use dos::ImageDosHeader;
pub use file_header::{Characteristics, ImageFileHeader, Machine};
pub use nt_headers::{ImageNTHeaders, ImageNTHeaders64};
pub use optional_header::{
    DllCharacteristics, ImageOptionalHeader, ImageOptionalHeader64, OptionalHeader,
    WindowsSubsystem,
};
pub use section_header::{ImageSectionHeader, SectionCharacteristics};

/// The NT headers, tagged by bitness. Mirrors [`OptionalHeader`]'s split.
#[derive(Debug, Clone, Copy)]
pub enum NTHeaders {
    Nt32(ImageNTHeaders),
    Nt64(ImageNTHeaders64),
}

impl NTHeaders {
    pub fn file_header(&self) -> &ImageFileHeader {
        match self {
            Self::Nt32(h) => &h.file_header,
            Self::Nt64(h) => &h.file_header,
        }
    }

    pub fn file_header_mut(&mut self) -> &mut ImageFileHeader {
        match self {
            Self::Nt32(h) => &mut h.file_header,
            Self::Nt64(h) => &mut h.file_header,
        }
    }

    pub fn optional_header(&self) -> OptionalHeader {
        match self {
            Self::Nt32(h) => OptionalHeader::Pe32(h.optional_header),
            Self::Nt64(h) => OptionalHeader::Pe32Plus(h.optional_header),
        }
    }

    pub fn set_optional_header(&mut self, header: OptionalHeader) {
        match (self, header) {
            (Self::Nt32(h), OptionalHeader::Pe32(o)) => h.optional_header = o,
            (Self::Nt64(h), OptionalHeader::Pe32Plus(o)) => h.optional_header = o,
            _ => unreachable!("optional header bitness must match NT headers bitness"),
        }
    }

    /// Size in bytes of the fixed part of the NT headers (the signature,
    /// file header, and optional header *up to and excluding* the data
    /// directory array).
    pub fn base_size_without_directory_array(&self) -> usize {
        match self {
            Self::Nt32(_) => ImageNTHeaders::SIZE - ImageDataDirectoryArray::SIZE,
            Self::Nt64(_) => ImageNTHeaders64::SIZE - ImageDataDirectoryArray::SIZE,
        }
    }

    pub fn full_size(&self) -> usize {
        match self {
            Self::Nt32(_) => ImageNTHeaders::SIZE,
            Self::Nt64(_) => ImageNTHeaders64::SIZE,
        }
    }

    /// Serializes the record truncated to `nt_headers_size`: the fixed
    /// part plus `number_of_rva_and_sizes` directory entries, matching
    /// the on-disk layout rather than the full fixed-size record.
    pub fn to_bytes_truncated(&self, nt_headers_size: usize) -> Vec<u8> {
        let full = match self {
            Self::Nt32(h) => h.as_bytes(),
            Self::Nt64(h) => h.as_bytes(),
        };
        full[..nt_headers_size.min(full.len())].to_vec()
    }
}
