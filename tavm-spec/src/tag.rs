//! Memory cell tags.
//!
//! Every memory cell carries exactly one tag: the field, or an unsigned
//! integer of a fixed width. Tag bytes appear on the wire (SET and CAST carry
//! one) so the discriminant values are part of the encoding.

use crate::error::IsaError;
use serde::{Deserialize, Serialize};

/// The type discriminant of a memory cell.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Field = 0,
    U1 = 1,
    U8 = 2,
    U16 = 3,
    U32 = 4,
    U64 = 5,
    U128 = 6,
}

impl TypeTag {
    /// Decode a wire tag byte.
    pub fn from_u8(value: u8) -> Result<Self, IsaError> {
        match value {
            0 => Ok(TypeTag::Field),
            1 => Ok(TypeTag::U1),
            2 => Ok(TypeTag::U8),
            3 => Ok(TypeTag::U16),
            4 => Ok(TypeTag::U32),
            5 => Ok(TypeTag::U64),
            6 => Ok(TypeTag::U128),
            _ => Err(IsaError::InvalidTag(value)),
        }
    }

    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Whether this tag is one of the unsigned integer widths.
    #[inline]
    pub const fn is_integral(self) -> bool {
        !matches!(self, TypeTag::Field)
    }

    /// Bit width for integral tags.
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            TypeTag::Field => 254,
            TypeTag::U1 => 1,
            TypeTag::U8 => 8,
            TypeTag::U16 => 16,
            TypeTag::U32 => 32,
            TypeTag::U64 => 64,
            TypeTag::U128 => 128,
        }
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TypeTag::Field => "FIELD",
            TypeTag::U1 => "U1",
            TypeTag::U8 => "U8",
            TypeTag::U16 => "U16",
            TypeTag::U32 => "U32",
            TypeTag::U64 => "U64",
            TypeTag::U128 => "U128",
        };
        write!(f, "{}", name)
    }
}
