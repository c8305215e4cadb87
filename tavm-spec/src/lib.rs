//! Instruction-set and data-model definitions for the TAVM, a tagged-memory
//! virtual machine for rollup public bytecode.
//!
//! This crate owns everything two independent implementations would have to
//! agree on: the field type, memory tags and tagged values, opcodes, operand
//! addressing, and the bytecode wire codec. It has no execution state; the
//! interpreter lives in `tavm-runtime` and the world-state trees in
//! `tavm-trees`.

pub mod addressing;
pub mod error;
pub mod field;
pub mod instruction;
pub mod opcode;
pub mod tag;
pub mod value;

pub use addressing::{Addressing, OperandMode};
pub use error::{IsaError, IsaResult};
pub use field::Fr;
pub use instruction::{
    BinaryOp, ContractInstanceMember, EnvVar, Instruction, OperandWidth, SetWidth,
};
pub use opcode::Opcode;
pub use tag::TypeTag;
pub use value::MemoryValue;

/// Addressable memory size: offsets are `u32`, so one past the last valid
/// address is `2^32`.
pub const MEMORY_SIZE: u64 = 1 << 32;
