//! The optional header: standard fields common to both PE variants,
//! Windows-specific fields, and the trailing data directory array.
//! Despite the name it is mandatory for image files; "optional" refers
//! to its historical absence from plain object files.

use crate::headers::data_directory::ImageDataDirectoryArray;
use crate::record::packed_record;
use bitflags::bitflags;
use std::fmt;

/// Optional-header magic identifying the PE32 layout.
pub const IMAGE_NT_OPTIONAL_HDR32_MAGIC: u16 = 0x10B;
/// Optional-header magic identifying the PE32+ layout.
pub const IMAGE_NT_OPTIONAL_HDR64_MAGIC: u16 = 0x20B;
/// Optional-header magic identifying a ROM image. Not supported by this
/// crate; present only so the façade can name it in an error.
pub const IMAGE_ROM_OPTIONAL_HDR_MAGIC: u16 = 0x107;

packed_record! {
    /// 224-byte PE32 optional header.
    pub struct ImageOptionalHeader {
        magic: u16,
        major_linker_version: u8,
        minor_linker_version: u8,
        size_of_code: u32,
        size_of_initialized_data: u32,
        size_of_uninitialized_data: u32,
        address_of_entry_point: u32,
        base_of_code: u32,
        base_of_data: u32,
        image_base: u32,
        section_alignment: u32,
        file_alignment: u32,
        major_operating_system_version: u16,
        minor_operating_system_version: u16,
        major_image_version: u16,
        minor_image_version: u16,
        major_subsystem_version: u16,
        minor_subsystem_version: u16,
        win32_version_value: u32,
        size_of_image: u32,
        size_of_headers: u32,
        check_sum: u32,
        subsystem: u16,
        dll_characteristics: u16,
        size_of_stack_reserve: u32,
        size_of_stack_commit: u32,
        size_of_heap_reserve: u32,
        size_of_heap_commit: u32,
        loader_flags: u32,
        number_of_rva_and_sizes: u32,
        data_directory: ImageDataDirectoryArray,
    }
}

packed_record! {
    /// 240-byte PE32+ optional header. Differs from [`ImageOptionalHeader`]
    /// by widening `image_base` and the stack/heap reserve-and-commit
    /// sizes to 64 bits, and by dropping `base_of_data`.
    pub struct ImageOptionalHeader64 {
        magic: u16,
        major_linker_version: u8,
        minor_linker_version: u8,
        size_of_code: u32,
        size_of_initialized_data: u32,
        size_of_uninitialized_data: u32,
        address_of_entry_point: u32,
        base_of_code: u32,
        image_base: u64,
        section_alignment: u32,
        file_alignment: u32,
        major_operating_system_version: u16,
        minor_operating_system_version: u16,
        major_image_version: u16,
        minor_image_version: u16,
        major_subsystem_version: u16,
        minor_subsystem_version: u16,
        win32_version_value: u32,
        size_of_image: u32,
        size_of_headers: u32,
        check_sum: u32,
        subsystem: u16,
        dll_characteristics: u16,
        size_of_stack_reserve: u64,
        size_of_stack_commit: u64,
        size_of_heap_reserve: u64,
        size_of_heap_commit: u64,
        loader_flags: u32,
        number_of_rva_and_sizes: u32,
        data_directory: ImageDataDirectoryArray,
    }
}

/// The optional header, tagged by bitness. The source models PE32 and
/// PE32+ as interchangeable records; the natural shape here is a
/// two-variant sum with accessors for the fields the two share.
#[derive(Debug, Clone, Copy)]
pub enum OptionalHeader {
    Pe32(ImageOptionalHeader),
    Pe32Plus(ImageOptionalHeader64),
}

impl OptionalHeader {
    pub fn magic(&self) -> u16 {
        match self {
            Self::Pe32(h) => h.magic,
            Self::Pe32Plus(h) => h.magic,
        }
    }

    pub fn is_pe32_plus(&self) -> bool {
        matches!(self, Self::Pe32Plus(_))
    }

    pub fn section_alignment(&self) -> u32 {
        match self {
            Self::Pe32(h) => h.section_alignment,
            Self::Pe32Plus(h) => h.section_alignment,
        }
    }

    pub fn file_alignment(&self) -> u32 {
        match self {
            Self::Pe32(h) => h.file_alignment,
            Self::Pe32Plus(h) => h.file_alignment,
        }
    }

    pub fn size_of_image(&self) -> u32 {
        match self {
            Self::Pe32(h) => h.size_of_image,
            Self::Pe32Plus(h) => h.size_of_image,
        }
    }

    pub fn set_size_of_image(&mut self, value: u32) {
        match self {
            Self::Pe32(h) => h.size_of_image = value,
            Self::Pe32Plus(h) => h.size_of_image = value,
        }
    }

    pub fn number_of_rva_and_sizes(&self) -> u32 {
        match self {
            Self::Pe32(h) => h.number_of_rva_and_sizes,
            Self::Pe32Plus(h) => h.number_of_rva_and_sizes,
        }
    }

    pub fn data_directory(&self) -> &ImageDataDirectoryArray {
        match self {
            Self::Pe32(h) => &h.data_directory,
            Self::Pe32Plus(h) => &h.data_directory,
        }
    }

    pub fn data_directory_mut(&mut self) -> &mut ImageDataDirectoryArray {
        match self {
            Self::Pe32(h) => &mut h.data_directory,
            Self::Pe32Plus(h) => &mut h.data_directory,
        }
    }

    pub fn subsystem(&self) -> WindowsSubsystem {
        let raw = match self {
            Self::Pe32(h) => h.subsystem,
            Self::Pe32Plus(h) => h.subsystem,
        };
        WindowsSubsystem::from(raw)
    }

    pub fn dll_characteristics(&self) -> DllCharacteristics {
        let raw = match self {
            Self::Pe32(h) => h.dll_characteristics,
            Self::Pe32Plus(h) => h.dll_characteristics,
        };
        DllCharacteristics::from_bits_truncate(raw)
    }

    /// Raw bytes of the as-stored record, for writing back.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Pe32(h) => h.as_bytes(),
            Self::Pe32Plus(h) => h.as_bytes(),
        }
    }
}

bitflags! {
    /// DLL characteristics: attributes of the image relevant to the
    /// loader (`IMAGE_OPTIONAL_HEADER::DllCharacteristics`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DllCharacteristics: u16 {
        /// Image can handle a high-entropy 64-bit virtual address space.
        const HIGH_ENTROPY_VA = 0x0020;
        /// DLL can be relocated at load time.
        const DYNAMIC_BASE = 0x0040;
        /// Code integrity checks are enforced.
        const FORCE_INTEGRITY = 0x0080;
        /// Image is NX compatible (DEP-aware).
        const NX_COMPAT = 0x0100;
        /// Isolation aware, but do not isolate the image.
        const NO_ISOLATION = 0x0200;
        /// Does not use structured exception handling (SEH).
        const NO_SEH = 0x0400;
        /// Do not bind the image.
        const NO_BIND = 0x0800;
        /// Image must execute in an AppContainer.
        const APPCONTAINER = 0x1000;
        /// A WDM driver.
        const WDM_DRIVER = 0x2000;
        /// Supports Control Flow Guard.
        const GUARD_CF = 0x4000;
        /// Terminal Server aware.
        const TERMINAL_SERVER_AWARE = 0x8000;
    }
}

/// Which Windows subsystem (if any) is required to run the image
/// (`IMAGE_OPTIONAL_HEADER::Subsystem`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowsSubsystem {
    Unknown,
    Native,
    WindowsGui,
    WindowsCui,
    Os2Cui,
    PosixCui,
    NativeWindows,
    WindowsCeGui,
    EfiApplication,
    EfiBootServiceDriver,
    EfiRuntimeDriver,
    EfiRom,
    Xbox,
    WindowsBootApplication,
    Other(u16),
}

impl From<u16> for WindowsSubsystem {
    fn from(value: u16) -> Self {
        match value {
            0x0000 => Self::Unknown,
            0x0001 => Self::Native,
            0x0002 => Self::WindowsGui,
            0x0003 => Self::WindowsCui,
            0x0005 => Self::Os2Cui,
            0x0007 => Self::PosixCui,
            0x0008 => Self::NativeWindows,
            0x0009 => Self::WindowsCeGui,
            0x000A => Self::EfiApplication,
            0x000B => Self::EfiBootServiceDriver,
            0x000C => Self::EfiRuntimeDriver,
            0x000D => Self::EfiRom,
            0x000E => Self::Xbox,
            0x0010 => Self::WindowsBootApplication,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for WindowsSubsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unknown => "unknown",
            Self::Native => "native (device drivers and native Windows processes)",
            Self::WindowsGui => "Windows GUI",
            Self::WindowsCui => "Windows character-mode",
            Self::Os2Cui => "OS/2 character-mode",
            Self::PosixCui => "POSIX character-mode",
            Self::NativeWindows => "native Win9x driver",
            Self::WindowsCeGui => "Windows CE",
            Self::EfiApplication => "EFI application",
            Self::EfiBootServiceDriver => "EFI boot service driver",
            Self::EfiRuntimeDriver => "EFI runtime driver",
            Self::EfiRom => "EFI ROM image",
            Self::Xbox => "Xbox",
            Self::WindowsBootApplication => "Windows boot application",
            Self::Other(v) => return write!(f, "unknown subsystem 0x{v:04X}"),
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pe32_header_is_224_bytes() {
        assert_eq!(ImageOptionalHeader::SIZE, 224);
    }

    #[test]
    fn pe32_plus_header_is_240_bytes() {
        assert_eq!(ImageOptionalHeader64::SIZE, 240);
    }

    #[test]
    fn subsystem_decodes() {
        assert_eq!(WindowsSubsystem::from(0x0002), WindowsSubsystem::WindowsGui);
    }
}
