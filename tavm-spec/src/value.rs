//! Tagged memory values.
//!
//! A `MemoryValue` is exactly one of the field or a fixed-width unsigned
//! integer. The tag is the enum discriminant itself, so tag lookup is a
//! structural match. Mixed-tag arithmetic is rejected, never coerced; the
//! same single code path handles every integer width via masking.

use crate::error::IsaError;
use crate::field::Fr;
use crate::tag::TypeTag;
use std::fmt;

/// A tagged memory cell value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemoryValue {
    Field(Fr),
    U1(u8),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
}

impl MemoryValue {
    #[inline]
    pub fn tag(&self) -> TypeTag {
        match self {
            MemoryValue::Field(_) => TypeTag::Field,
            MemoryValue::U1(_) => TypeTag::U1,
            MemoryValue::U8(_) => TypeTag::U8,
            MemoryValue::U16(_) => TypeTag::U16,
            MemoryValue::U32(_) => TypeTag::U32,
            MemoryValue::U64(_) => TypeTag::U64,
            MemoryValue::U128(_) => TypeTag::U128,
        }
    }

    /// Build a value of the given tag from an integer, truncating to fit.
    pub fn from_u128_truncating(tag: TypeTag, value: u128) -> Self {
        match tag {
            TypeTag::Field => MemoryValue::Field(Fr::from_u128(value)),
            TypeTag::U1 => MemoryValue::U1((value & 1) as u8),
            TypeTag::U8 => MemoryValue::U8(value as u8),
            TypeTag::U16 => MemoryValue::U16(value as u16),
            TypeTag::U32 => MemoryValue::U32(value as u32),
            TypeTag::U64 => MemoryValue::U64(value as u64),
            TypeTag::U128 => MemoryValue::U128(value),
        }
    }

    /// Build a value of the given tag from a field element, truncating.
    pub fn from_field_truncating(tag: TypeTag, value: &Fr) -> Self {
        match tag {
            TypeTag::Field => MemoryValue::Field(value.clone()),
            _ => Self::from_u128_truncating(tag, value.to_u128_truncated()),
        }
    }

    /// The value as a field element. Lossless for every tag.
    pub fn to_field(&self) -> Fr {
        match self {
            MemoryValue::Field(f) => f.clone(),
            _ => Fr::from_u128(self.integral_bits()),
        }
    }

    /// The `U32` payload, if this cell carries that tag.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            MemoryValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    /// The `U1` payload interpreted as a boolean, if tagged `U1`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MemoryValue::U1(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Truncate the payload to `u128`. Field values lose their high bits.
    pub fn to_u128_truncated(&self) -> u128 {
        match self {
            MemoryValue::Field(f) => f.to_u128_truncated(),
            _ => self.integral_bits(),
        }
    }

    /// Raw integral payload widened to u128. Panics on `Field` (internal use).
    fn integral_bits(&self) -> u128 {
        match self {
            MemoryValue::Field(_) => unreachable!("integral_bits on Field"),
            MemoryValue::U1(v) => *v as u128,
            MemoryValue::U8(v) => *v as u128,
            MemoryValue::U16(v) => *v as u128,
            MemoryValue::U32(v) => *v as u128,
            MemoryValue::U64(v) => *v as u128,
            MemoryValue::U128(v) => *v,
        }
    }

    fn require_same_tag(&self, rhs: &MemoryValue) -> Result<TypeTag, IsaError> {
        let tag = self.tag();
        if tag != rhs.tag() {
            return Err(IsaError::TagMismatch {
                expected: tag,
                actual: rhs.tag(),
            });
        }
        Ok(tag)
    }

    fn require_integral(&self) -> Result<TypeTag, IsaError> {
        let tag = self.tag();
        if !tag.is_integral() {
            return Err(IsaError::NotIntegral(tag));
        }
        Ok(tag)
    }

    /// Wrapping addition: mod `2^N` for integers, mod the prime for fields.
    pub fn add(&self, rhs: &MemoryValue) -> Result<MemoryValue, IsaError> {
        let tag = self.require_same_tag(rhs)?;
        if let (MemoryValue::Field(a), MemoryValue::Field(b)) = (self, rhs) {
            return Ok(MemoryValue::Field(a.add(b)));
        }
        let sum = self.integral_bits().wrapping_add(rhs.integral_bits());
        Ok(Self::from_u128_truncating(tag, sum))
    }

    /// Wrapping subtraction (adds the modulus back on underflow).
    pub fn sub(&self, rhs: &MemoryValue) -> Result<MemoryValue, IsaError> {
        let tag = self.require_same_tag(rhs)?;
        if let (MemoryValue::Field(a), MemoryValue::Field(b)) = (self, rhs) {
            return Ok(MemoryValue::Field(a.sub(b)));
        }
        let diff = self.integral_bits().wrapping_sub(rhs.integral_bits());
        Ok(Self::from_u128_truncating(tag, diff))
    }

    /// Wrapping multiplication.
    pub fn mul(&self, rhs: &MemoryValue) -> Result<MemoryValue, IsaError> {
        let tag = self.require_same_tag(rhs)?;
        if let (MemoryValue::Field(a), MemoryValue::Field(b)) = (self, rhs) {
            return Ok(MemoryValue::Field(a.mul(b)));
        }
        let prod = self.integral_bits().wrapping_mul(rhs.integral_bits());
        Ok(Self::from_u128_truncating(tag, prod))
    }

    /// Truncating integer division; Euclidean division on fields.
    pub fn div(&self, rhs: &MemoryValue) -> Result<MemoryValue, IsaError> {
        let tag = self.require_same_tag(rhs)?;
        if let (MemoryValue::Field(a), MemoryValue::Field(b)) = (self, rhs) {
            return a
                .ediv(b)
                .map(MemoryValue::Field)
                .ok_or(IsaError::DivisionByZero);
        }
        let divisor = rhs.integral_bits();
        if divisor == 0 {
            return Err(IsaError::DivisionByZero);
        }
        Ok(Self::from_u128_truncating(tag, self.integral_bits() / divisor))
    }

    /// Field division (multiplication by the modular inverse). Fields only.
    pub fn fdiv(&self, rhs: &MemoryValue) -> Result<MemoryValue, IsaError> {
        match (self, rhs) {
            (MemoryValue::Field(a), MemoryValue::Field(b)) => a
                .fdiv(b)
                .map(MemoryValue::Field)
                .ok_or(IsaError::DivisionByZero),
            _ => Err(IsaError::TagMismatch {
                expected: TypeTag::Field,
                actual: if self.tag() != TypeTag::Field {
                    self.tag()
                } else {
                    rhs.tag()
                },
            }),
        }
    }

    /// Same-tag equality.
    pub fn equals(&self, rhs: &MemoryValue) -> Result<bool, IsaError> {
        self.require_same_tag(rhs)?;
        Ok(self == rhs)
    }

    /// Same-tag less-than over canonical representatives.
    pub fn less_than(&self, rhs: &MemoryValue) -> Result<bool, IsaError> {
        self.require_same_tag(rhs)?;
        if let (MemoryValue::Field(a), MemoryValue::Field(b)) = (self, rhs) {
            return Ok(a.lt(b));
        }
        Ok(self.integral_bits() < rhs.integral_bits())
    }

    pub fn bit_and(&self, rhs: &MemoryValue) -> Result<MemoryValue, IsaError> {
        let tag = self.require_same_tag(rhs)?;
        self.require_integral()?;
        Ok(Self::from_u128_truncating(
            tag,
            self.integral_bits() & rhs.integral_bits(),
        ))
    }

    pub fn bit_or(&self, rhs: &MemoryValue) -> Result<MemoryValue, IsaError> {
        let tag = self.require_same_tag(rhs)?;
        self.require_integral()?;
        Ok(Self::from_u128_truncating(
            tag,
            self.integral_bits() | rhs.integral_bits(),
        ))
    }

    pub fn bit_xor(&self, rhs: &MemoryValue) -> Result<MemoryValue, IsaError> {
        let tag = self.require_same_tag(rhs)?;
        self.require_integral()?;
        Ok(Self::from_u128_truncating(
            tag,
            self.integral_bits() ^ rhs.integral_bits(),
        ))
    }

    /// Bitwise NOT within the tag's width.
    pub fn bit_not(&self) -> Result<MemoryValue, IsaError> {
        let tag = self.require_integral()?;
        Ok(Self::from_u128_truncating(tag, !self.integral_bits()))
    }

    /// Left shift; shift amounts at or beyond the width produce zero.
    pub fn shl(&self, amount: u32) -> Result<MemoryValue, IsaError> {
        let tag = self.require_integral()?;
        if amount >= tag.bits() {
            return Ok(Self::from_u128_truncating(tag, 0));
        }
        Ok(Self::from_u128_truncating(tag, self.integral_bits() << amount))
    }

    /// Logical right shift; no sign extension.
    pub fn shr(&self, amount: u32) -> Result<MemoryValue, IsaError> {
        let tag = self.require_integral()?;
        if amount >= tag.bits() {
            return Ok(Self::from_u128_truncating(tag, 0));
        }
        Ok(Self::from_u128_truncating(tag, self.integral_bits() >> amount))
    }

    /// Cast to a destination tag, truncating to fit.
    pub fn cast(&self, dst_tag: TypeTag) -> MemoryValue {
        match self {
            MemoryValue::Field(f) => Self::from_field_truncating(dst_tag, f),
            _ => Self::from_u128_truncating(dst_tag, self.integral_bits()),
        }
    }
}

impl fmt::Display for MemoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryValue::Field(v) => write!(f, "Field({})", v),
            MemoryValue::U1(v) => write!(f, "U1({})", v),
            MemoryValue::U8(v) => write!(f, "U8({:#x})", v),
            MemoryValue::U16(v) => write!(f, "U16({:#x})", v),
            MemoryValue::U32(v) => write!(f, "U32({:#x})", v),
            MemoryValue::U64(v) => write!(f, "U64({:#x})", v),
            MemoryValue::U128(v) => write!(f, "U128({:#x})", v),
        }
    }
}
