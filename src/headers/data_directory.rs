//! The data directory: a fixed 16-entry table of `(rva, size)` pairs
//! pointing at well-known sub-tables (imports, exports, base
//! relocations, ...). Only `basereloc` (index 5) is interpreted further
//! by this crate; the rest are exposed read-only.

use crate::record::packed_record;

packed_record! {
    /// One `(virtual_address, size)` pair in the data directory.
    pub struct ImageDataDirectory {
        /// RVA of the sub-table this entry describes.
        virtual_address: u32,
        /// Size in bytes of the sub-table.
        size: u32,
    }
}

packed_record! {
    /// The 16-entry data directory array, in its fixed on-disk order.
    pub struct ImageDataDirectoryArray {
        export: ImageDataDirectory,
        import: ImageDataDirectory,
        resource: ImageDataDirectory,
        exception: ImageDataDirectory,
        security: ImageDataDirectory,
        /// Index 5: the base relocation table this crate parses.
        basereloc: ImageDataDirectory,
        debug: ImageDataDirectory,
        architecture: ImageDataDirectory,
        globalptr: ImageDataDirectory,
        tls: ImageDataDirectory,
        load_config: ImageDataDirectory,
        bound_import: ImageDataDirectory,
        iat: ImageDataDirectory,
        delay_import: ImageDataDirectory,
        com_descriptor: ImageDataDirectory,
        reserved: ImageDataDirectory,
    }
}

impl ImageDataDirectoryArray {
    /// Number of entries in the array; `number_of_rva_and_sizes` in the
    /// optional header may be smaller, in which case only the first
    /// that-many entries are actually present on disk.
    pub const COUNT: usize = 16;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_is_8_bytes() {
        assert_eq!(ImageDataDirectory::SIZE, 8);
    }

    #[test]
    fn array_is_128_bytes() {
        assert_eq!(ImageDataDirectoryArray::SIZE, 128);
    }

    #[test]
    fn basereloc_is_the_sixth_entry() {
        let mut bytes = [0u8; 128];
        // basereloc is entry index 5 (0-based): offset 5 * 8 = 40.
        bytes[40..44].copy_from_slice(&0x19D7000u32.to_le_bytes());
        bytes[44..48].copy_from_slice(&0xBA138u32.to_le_bytes());
        let dirs = ImageDataDirectoryArray::from_bytes(&bytes).unwrap();
        assert_eq!(dirs.basereloc.virtual_address, 0x19D7000);
        assert_eq!(dirs.basereloc.size, 0xBA138);
    }
}
