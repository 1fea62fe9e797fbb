//! The packed record model: a small declarative mechanism that turns a
//! field list into a C-compatible, zero-copy, exact-size struct.
//!
//! Every PE on-disk record (DOS header, file header, optional headers,
//! section header, ...) is generated through [`packed_record!`] rather
//! than hand-marshalled, so that size and accessor code cannot drift
//! from the field declaration. The one shape the macro doesn't model
//! directly is the C union in `ImageSectionHeader`: its single 32-bit
//! storage slot is declared as a plain field (`misc`) and exposed
//! through two accessor methods that both read/write it, which
//! reproduces "overlapping members, one storage slot" without any
//! hand-written unsafe code; see `headers::section_header`.

/// Declares a `#[repr(C)]` record backed by `bytemuck::Pod`/`Zeroable`.
///
/// Fields must themselves be `Pod` (primitive integers or fixed-size
/// byte arrays) and must be listed in on-disk order with no implicit
/// padding — `repr(C)` lays them out exactly as declared only when
/// every field's natural alignment already matches its offset, which
/// holds for every record in this catalog.
macro_rules! packed_record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Clone, Copy, PartialEq, Eq, ::bytemuck::Pod, ::bytemuck::Zeroable)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field : $ty ),*
        }

        impl $name {
            /// On-disk size of this record, in bytes.
            pub const SIZE: usize = ::core::mem::size_of::<Self>();

            /// Views a byte slice of exactly [`Self::SIZE`] bytes as this
            /// record, without copying.
            pub fn from_bytes(bytes: &[u8]) -> Option<&Self> {
                ::bytemuck::try_from_bytes(bytes).ok()
            }

            /// Views this record as its on-disk byte representation.
            pub fn as_bytes(&self) -> &[u8] {
                ::bytemuck::bytes_of(self)
            }
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_struct(stringify!($name))
                    $(.field(stringify!($field), &self.$field))*
                    .finish()
            }
        }
    };
}

pub(crate) use packed_record;
