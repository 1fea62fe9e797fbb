//! COFF file header (`IMAGE_FILE_HEADER`) and the enums/bitflags that
//! decode its `machine` and `characteristics` fields.

use crate::record::packed_record;
use bitflags::bitflags;
use chrono::{DateTime, Utc};
use std::fmt;

packed_record! {
    /// 20-byte COFF file header.
    pub struct ImageFileHeader {
        /// The CPU type the image targets. See [`Machine`].
        machine: u16,
        /// Number of entries in the section table.
        number_of_sections: u16,
        /// Low 32 bits of the number of seconds since 1970-01-01 00:00,
        /// the time this file was created.
        time_date_stamp: u32,
        /// File offset of the COFF symbol table, or zero if none is present.
        pointer_to_symbol_table: u32,
        /// Number of entries in the symbol table.
        number_of_symbols: u32,
        /// Size of the optional header, required for executable images.
        size_of_optional_header: u16,
        /// Flags indicating attributes of the file. See [`Characteristics`].
        characteristics: u16,
    }
}

impl ImageFileHeader {
    pub fn machine(&self) -> Machine {
        Machine::from(self.machine)
    }

    pub fn characteristics(&self) -> Characteristics {
        Characteristics::from_bits_truncate(self.characteristics)
    }

    /// The image's creation time, if `time_date_stamp` decodes to a valid
    /// instant (it is a bare COFF timestamp and may be zero or garbage on
    /// object files that don't set it meaningfully).
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time_date_stamp as i64, 0)
    }
}

bitflags! {
    /// Attributes of the image file (`IMAGE_FILE_HEADER::Characteristics`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Characteristics: u16 {
        /// Image only: relocation info was stripped; the image must be
        /// loaded at its preferred base address.
        const RELOCS_STRIPPED = 0x0001;
        /// Image only: the file is valid and can be run.
        const EXECUTABLE_IMAGE = 0x0002;
        /// COFF line numbers were stripped. Deprecated, should be zero.
        const LINE_NUMS_STRIPPED = 0x0004;
        /// COFF symbol table entries for local symbols were stripped.
        /// Deprecated, should be zero.
        const LOCAL_SYMS_STRIPPED = 0x0008;
        /// Obsolete: aggressively trim the working set.
        const AGGRESSIVE_WS_TRIM = 0x0010;
        /// Application can handle addresses larger than 2 GB.
        const LARGE_ADDRESS_AWARE = 0x0020;
        /// Reserved for future use.
        const RESERVED = 0x0040;
        /// Little endian. Deprecated, should be zero.
        const BYTES_REVERSED_LO = 0x0080;
        /// Machine is based on a 32-bit-word architecture.
        const MACHINE_32BIT = 0x0100;
        /// Debugging information was removed from the image file.
        const DEBUG_STRIPPED = 0x0200;
        /// If the image is on removable media, fully load and copy it to swap.
        const REMOVABLE_RUN_FROM_SWAP = 0x0400;
        /// If the image is on network media, fully load and copy it to swap.
        const NET_RUN_FROM_SWAP = 0x0800;
        /// The image is a system file, not a user program.
        const SYSTEM = 0x1000;
        /// The image file is a dynamic-link library (DLL).
        const DLL = 0x2000;
        /// The file should be run only on a uniprocessor machine.
        const UP_SYSTEM_ONLY = 0x4000;
        /// Big endian. Deprecated, should be zero.
        const BYTES_REVERSED_HI = 0x8000;
    }
}

/// CPU type a PE image targets (`IMAGE_FILE_HEADER::Machine`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    Unknown,
    Alpha,
    Alpha64,
    Am33,
    Amd64,
    Arm,
    Arm64,
    ArmNt,
    Ebc,
    I386,
    Ia64,
    LoongArch32,
    LoongArch64,
    M32R,
    Mips16,
    MipsFpu,
    MipsFpu16,
    PowerPc,
    PowerPcFp,
    R4000,
    RiscV32,
    RiscV64,
    RiscV128,
    Sh3,
    Sh3Dsp,
    Sh4,
    Sh5,
    Thumb,
    WceMipsV2,
    /// A value not in the catalog of known machine types.
    Other(u16),
}

impl From<u16> for Machine {
    fn from(value: u16) -> Self {
        match value {
            0x0000 => Self::Unknown,
            0x0184 => Self::Alpha,
            0x0284 => Self::Alpha64,
            0x01D3 => Self::Am33,
            0x8664 => Self::Amd64,
            0x01C0 => Self::Arm,
            0xAA64 => Self::Arm64,
            0x01C4 => Self::ArmNt,
            0x0EBC => Self::Ebc,
            0x014C => Self::I386,
            0x0200 => Self::Ia64,
            0x6232 => Self::LoongArch32,
            0x6264 => Self::LoongArch64,
            0x9041 => Self::M32R,
            0x0266 => Self::Mips16,
            0x0366 => Self::MipsFpu,
            0x0466 => Self::MipsFpu16,
            0x01F0 => Self::PowerPc,
            0x01F1 => Self::PowerPcFp,
            0x0166 => Self::R4000,
            0x5032 => Self::RiscV32,
            0x5064 => Self::RiscV64,
            0x5128 => Self::RiscV128,
            0x01A2 => Self::Sh3,
            0x01A3 => Self::Sh3Dsp,
            0x01A6 => Self::Sh4,
            0x01A8 => Self::Sh5,
            0x01C2 => Self::Thumb,
            0x0169 => Self::WceMipsV2,
            other => Self::Other(other),
        }
    }
}

impl From<Machine> for u16 {
    fn from(value: Machine) -> Self {
        match value {
            Machine::Unknown => 0x0000,
            Machine::Alpha => 0x0184,
            Machine::Alpha64 => 0x0284,
            Machine::Am33 => 0x01D3,
            Machine::Amd64 => 0x8664,
            Machine::Arm => 0x01C0,
            Machine::Arm64 => 0xAA64,
            Machine::ArmNt => 0x01C4,
            Machine::Ebc => 0x0EBC,
            Machine::I386 => 0x014C,
            Machine::Ia64 => 0x0200,
            Machine::LoongArch32 => 0x6232,
            Machine::LoongArch64 => 0x6264,
            Machine::M32R => 0x9041,
            Machine::Mips16 => 0x0266,
            Machine::MipsFpu => 0x0366,
            Machine::MipsFpu16 => 0x0466,
            Machine::PowerPc => 0x01F0,
            Machine::PowerPcFp => 0x01F1,
            Machine::R4000 => 0x0166,
            Machine::RiscV32 => 0x5032,
            Machine::RiscV64 => 0x5064,
            Machine::RiscV128 => 0x5128,
            Machine::Sh3 => 0x01A2,
            Machine::Sh3Dsp => 0x01A3,
            Machine::Sh4 => 0x01A6,
            Machine::Sh5 => 0x01A8,
            Machine::Thumb => 0x01C2,
            Machine::WceMipsV2 => 0x0169,
            Machine::Other(v) => v,
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unknown => "any machine type",
            Self::Alpha => "Alpha AXP, 32-bit address space",
            Self::Alpha64 => "Alpha 64, 64-bit address space",
            Self::Am33 => "Matsushita AM33",
            Self::Amd64 => "x64",
            Self::Arm => "ARM little endian",
            Self::Arm64 => "ARM64 little endian",
            Self::ArmNt => "ARM Thumb-2 little endian",
            Self::Ebc => "EFI byte code",
            Self::I386 => "Intel 386 or later",
            Self::Ia64 => "Intel Itanium",
            Self::LoongArch32 => "LoongArch 32-bit",
            Self::LoongArch64 => "LoongArch 64-bit",
            Self::M32R => "Mitsubishi M32R little endian",
            Self::Mips16 => "MIPS16",
            Self::MipsFpu => "MIPS with FPU",
            Self::MipsFpu16 => "MIPS16 with FPU",
            Self::PowerPc => "Power PC little endian",
            Self::PowerPcFp => "Power PC with floating point support",
            Self::R4000 => "MIPS little endian",
            Self::RiscV32 => "RISC-V 32-bit address space",
            Self::RiscV64 => "RISC-V 64-bit address space",
            Self::RiscV128 => "RISC-V 128-bit address space",
            Self::Sh3 => "Hitachi SH3",
            Self::Sh3Dsp => "Hitachi SH3 DSP",
            Self::Sh4 => "Hitachi SH4",
            Self::Sh5 => "Hitachi SH5",
            Self::Thumb => "Thumb",
            Self::WceMipsV2 => "MIPS little-endian WCE v2",
            Self::Other(v) => return write!(f, "unknown machine type 0x{v:04X}"),
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_20_bytes() {
        assert_eq!(ImageFileHeader::SIZE, 20);
    }

    #[test]
    fn machine_round_trips() {
        assert_eq!(Machine::from(0x8664), Machine::Amd64);
        assert_eq!(u16::from(Machine::Amd64), 0x8664);
        assert_eq!(Machine::from(0xFFFF), Machine::Other(0xFFFF));
    }

    #[test]
    fn characteristics_decodes_executable_large_address() {
        let c = Characteristics::from_bits_truncate(0x22);
        assert!(c.contains(Characteristics::EXECUTABLE_IMAGE));
        assert!(c.contains(Characteristics::LARGE_ADDRESS_AWARE));
        assert!(!c.contains(Characteristics::DLL));
    }
}
