//! Runtime error types and halt classification.

use tavm_spec::{Fr, IsaError};
use tavm_trees::TreeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvmError {
    #[error("ISA error: {0}")]
    Isa(#[from] IsaError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Memory slice out of range: offset {offset}, size {size}")]
    MemorySliceOutOfRange { offset: u64, size: u64 },

    #[error("Relative address overflow: base {base}, offset {offset}")]
    RelativeAddressOverflow { base: u32, offset: u32 },

    #[error("Out of gas at pc {pc}: needed l2={l2_needed} da={da_needed}, left l2={l2_left} da={da_left}")]
    OutOfGas {
        pc: u32,
        l2_needed: u64,
        da_needed: u64,
        l2_left: u64,
        da_left: u64,
    },

    #[error("Invalid program counter {pc} (bytecode is {bytecode_size} bytes)")]
    InvalidProgramCounter { pc: u32, bytecode_size: usize },

    #[error("State mutation in a static context: {opcode}")]
    StaticContextViolation { opcode: String },

    #[error("Calldata slice out of range: start {start}, size {size}, calldata length {len}")]
    CalldataOutOfRange { start: u64, size: u64, len: usize },

    #[error("Returndata slice out of range: start {start}, size {size}, returndata length {len}")]
    ReturndataOutOfRange { start: u64, size: u64, len: usize },

    #[error("Invalid TORADIXBE inputs: {0}")]
    InvalidToRadixInputs(String),

    #[error("Bytecode is empty")]
    EmptyBytecode,

    #[error("Nested call depth {depth} exceeds maximum {max}")]
    MaxCallDepthExceeded { depth: u32, max: u32 },

    #[error("No bytecode found for contract {0}")]
    BytecodeNotFound(Fr),
}

pub type Result<T> = std::result::Result<T, AvmError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tavm_spec::TypeTag;

    #[test]
    fn test_isa_error_wraps() {
        let err: AvmError = IsaError::TagMismatch {
            expected: TypeTag::U32,
            actual: TypeTag::Field,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "ISA error: Tag mismatch: expected U32, got FIELD"
        );
    }

    #[test]
    fn test_out_of_gas_display() {
        let err = AvmError::OutOfGas {
            pc: 12,
            l2_needed: 100,
            da_needed: 0,
            l2_left: 40,
            da_left: 0,
        };
        assert!(err.to_string().contains("pc 12"));
        assert!(err.to_string().contains("needed l2=100"));
    }
}
