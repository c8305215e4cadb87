//! ISA-level error types.

use crate::tag::TypeTag;
use thiserror::Error;

/// Errors raised by decoding or by tag-checked value operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IsaError {
    /// Opcode byte has no assigned instruction
    #[error("Invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    /// Wire tag byte outside the valid range
    #[error("Invalid tag byte: {0}")]
    InvalidTag(u8),

    /// Bytecode ends before the instruction's operands do
    #[error("Truncated instruction at pc {pc}: needed {needed} bytes, {available} available")]
    TruncatedInstruction {
        pc: usize,
        needed: usize,
        available: usize,
    },

    /// Operand tags disagree where the instruction requires agreement
    #[error("Tag mismatch: expected {expected}, got {actual}")]
    TagMismatch { expected: TypeTag, actual: TypeTag },

    /// Bitwise or shift operation on a field value
    #[error("Operation requires an integral tag, got {0}")]
    NotIntegral(TypeTag),

    /// Division with a zero divisor
    #[error("Division by zero")]
    DivisionByZero,

    /// Operand offset does not fit the opcode's wire width
    #[error("Operand value {value} does not fit in {width_bits} bits")]
    OperandOutOfRange { value: u64, width_bits: u32 },

    /// GETENVVAR selector byte with no assigned variable
    #[error("Invalid environment variable selector: {0}")]
    InvalidEnvVar(u8),

    /// GETCONTRACTINSTANCE member byte with no assigned member
    #[error("Invalid contract instance member: {0}")]
    InvalidContractMember(u8),
}

/// Result type for ISA operations.
pub type IsaResult<T> = Result<T, IsaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = IsaError::InvalidOpcode(0xAB);
        assert_eq!(err.to_string(), "Invalid opcode: 0xab");

        let err = IsaError::TagMismatch {
            expected: TypeTag::U32,
            actual: TypeTag::Field,
        };
        assert_eq!(err.to_string(), "Tag mismatch: expected U32, got FIELD");
    }

    #[test]
    fn test_truncated_display() {
        let err = IsaError::TruncatedInstruction {
            pc: 10,
            needed: 5,
            available: 2,
        };
        assert!(err.to_string().contains("pc 10"));
    }
}
