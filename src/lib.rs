//! A PE-structural model: bit-exact parsing, inspection, and mutation of
//! Portable Executable images over a seekable byte stream.
//!
//! Scope is deliberately narrow: headers (DOS, NT, file, optional,
//! section), the section table's RVA/offset lookup, the base
//! relocation table, and the append-new-section transformation. Imports,
//! exports, resources, TLS, debug info, and every other data-directory
//! content besides base relocations are out of scope — consumers that
//! need those should layer their own parsing on top of
//! [`PortableExecutable::data_directory`].

pub mod align;
pub mod error;
pub mod headers;
pub mod io;
pub mod portable_executable;
pub mod record;
pub mod relocation_table;
pub mod section;
pub mod section_table;

pub use align::align;
pub use error::{Error, Result};
pub use portable_executable::PortableExecutable;
pub use relocation_table::RelocationTable;
pub use section::Section;
pub use section_table::SectionTable;
