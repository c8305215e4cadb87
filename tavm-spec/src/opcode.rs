//! Opcode definitions.
//!
//! Opcodes are one-byte discriminants organized by family. Most families come
//! in two wire variants (8-bit and 16-bit operand widths) purely to shrink
//! bytecode; the variant is part of the opcode byte, so the decoder never
//! guesses widths.
//!
//! - 0x00-0x0D: Arithmetic and comparison (ADD, SUB, MUL, DIV, FDIV, EQ, LT)
//! - 0x10-0x1B: Bitwise and shift (AND, OR, XOR, NOT, SHL, SHR)
//! - 0x20-0x24: Control flow (JUMP, JUMPI, RETURN, REVERT)
//! - 0x28-0x34: Memory (SET, MOV, CAST, CALLDATACOPY, RETURNDATA*)
//! - 0x38-0x39: Conversions and environment (TORADIXBE, GETENVVAR)
//! - 0x40-0x44: State access (SLOAD, SSTORE, NULLIFIEREXISTS, EMITNULLIFIER,
//!   GETCONTRACTINSTANCE)
//! - 0x48-0x49: External calls (CALL, STATICCALL)

use crate::error::IsaError;
use serde::{Deserialize, Serialize};

/// Instruction opcode byte.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // ========== Arithmetic (0x00-0x09) ==========
    Add8 = 0x00,
    Add16 = 0x01,
    Sub8 = 0x02,
    Sub16 = 0x03,
    Mul8 = 0x04,
    Mul16 = 0x05,
    Div8 = 0x06,
    Div16 = 0x07,
    FDiv8 = 0x08,
    FDiv16 = 0x09,

    // ========== Comparison (0x0A-0x0D) ==========
    Eq8 = 0x0A,
    Eq16 = 0x0B,
    Lt8 = 0x0C,
    Lt16 = 0x0D,

    // ========== Bitwise and shift (0x10-0x1B) ==========
    And8 = 0x10,
    And16 = 0x11,
    Or8 = 0x12,
    Or16 = 0x13,
    Xor8 = 0x14,
    Xor16 = 0x15,
    Not8 = 0x16,
    Not16 = 0x17,
    Shl8 = 0x18,
    Shl16 = 0x19,
    Shr8 = 0x1A,
    Shr16 = 0x1B,

    // ========== Control flow (0x20-0x24) ==========
    Jump32 = 0x20,
    JumpI32 = 0x21,
    Return = 0x22,
    Revert8 = 0x23,
    Revert16 = 0x24,

    // ========== Memory (0x28-0x34) ==========
    Set8 = 0x28,
    Set16 = 0x29,
    Set32 = 0x2A,
    Set64 = 0x2B,
    Set128 = 0x2C,
    SetFF = 0x2D,
    Mov8 = 0x2E,
    Mov16 = 0x2F,
    Cast8 = 0x30,
    Cast16 = 0x31,
    CalldataCopy = 0x32,
    ReturndataSize = 0x33,
    ReturndataCopy = 0x34,

    // ========== Conversions and environment (0x38-0x39) ==========
    ToRadixBE = 0x38,
    GetEnvVar16 = 0x39,

    // ========== State access (0x40-0x44) ==========
    SLoad = 0x40,
    SStore = 0x41,
    NullifierExists = 0x42,
    EmitNullifier = 0x43,
    GetContractInstance = 0x44,

    // ========== External calls (0x48-0x49) ==========
    Call = 0x48,
    StaticCall = 0x49,
}

impl Opcode {
    /// Try to convert from the wire byte.
    pub fn from_u8(value: u8) -> Result<Self, IsaError> {
        match value {
            0x00 => Ok(Opcode::Add8),
            0x01 => Ok(Opcode::Add16),
            0x02 => Ok(Opcode::Sub8),
            0x03 => Ok(Opcode::Sub16),
            0x04 => Ok(Opcode::Mul8),
            0x05 => Ok(Opcode::Mul16),
            0x06 => Ok(Opcode::Div8),
            0x07 => Ok(Opcode::Div16),
            0x08 => Ok(Opcode::FDiv8),
            0x09 => Ok(Opcode::FDiv16),
            0x0A => Ok(Opcode::Eq8),
            0x0B => Ok(Opcode::Eq16),
            0x0C => Ok(Opcode::Lt8),
            0x0D => Ok(Opcode::Lt16),
            0x10 => Ok(Opcode::And8),
            0x11 => Ok(Opcode::And16),
            0x12 => Ok(Opcode::Or8),
            0x13 => Ok(Opcode::Or16),
            0x14 => Ok(Opcode::Xor8),
            0x15 => Ok(Opcode::Xor16),
            0x16 => Ok(Opcode::Not8),
            0x17 => Ok(Opcode::Not16),
            0x18 => Ok(Opcode::Shl8),
            0x19 => Ok(Opcode::Shl16),
            0x1A => Ok(Opcode::Shr8),
            0x1B => Ok(Opcode::Shr16),
            0x20 => Ok(Opcode::Jump32),
            0x21 => Ok(Opcode::JumpI32),
            0x22 => Ok(Opcode::Return),
            0x23 => Ok(Opcode::Revert8),
            0x24 => Ok(Opcode::Revert16),
            0x28 => Ok(Opcode::Set8),
            0x29 => Ok(Opcode::Set16),
            0x2A => Ok(Opcode::Set32),
            0x2B => Ok(Opcode::Set64),
            0x2C => Ok(Opcode::Set128),
            0x2D => Ok(Opcode::SetFF),
            0x2E => Ok(Opcode::Mov8),
            0x2F => Ok(Opcode::Mov16),
            0x30 => Ok(Opcode::Cast8),
            0x31 => Ok(Opcode::Cast16),
            0x32 => Ok(Opcode::CalldataCopy),
            0x33 => Ok(Opcode::ReturndataSize),
            0x34 => Ok(Opcode::ReturndataCopy),
            0x38 => Ok(Opcode::ToRadixBE),
            0x39 => Ok(Opcode::GetEnvVar16),
            0x40 => Ok(Opcode::SLoad),
            0x41 => Ok(Opcode::SStore),
            0x42 => Ok(Opcode::NullifierExists),
            0x43 => Ok(Opcode::EmitNullifier),
            0x44 => Ok(Opcode::GetContractInstance),
            0x48 => Ok(Opcode::Call),
            0x49 => Ok(Opcode::StaticCall),
            other => Err(IsaError::InvalidOpcode(other)),
        }
    }

    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// True for the state-access family (storage, nullifiers, instances).
    #[inline]
    pub const fn is_state_access(self) -> bool {
        matches!(
            self,
            Opcode::SLoad
                | Opcode::SStore
                | Opcode::NullifierExists
                | Opcode::EmitNullifier
                | Opcode::GetContractInstance
        )
    }

    /// True for opcodes that manage the program counter themselves.
    #[inline]
    pub const fn controls_pc(self) -> bool {
        matches!(self, Opcode::Jump32 | Opcode::JumpI32)
    }

    /// True for opcodes that write state (rejected in static contexts).
    #[inline]
    pub const fn mutates_state(self) -> bool {
        matches!(self, Opcode::SStore | Opcode::EmitNullifier)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Opcode::Add8 | Opcode::Add16 => "ADD",
            Opcode::Sub8 | Opcode::Sub16 => "SUB",
            Opcode::Mul8 | Opcode::Mul16 => "MUL",
            Opcode::Div8 | Opcode::Div16 => "DIV",
            Opcode::FDiv8 | Opcode::FDiv16 => "FDIV",
            Opcode::Eq8 | Opcode::Eq16 => "EQ",
            Opcode::Lt8 | Opcode::Lt16 => "LT",
            Opcode::And8 | Opcode::And16 => "AND",
            Opcode::Or8 | Opcode::Or16 => "OR",
            Opcode::Xor8 | Opcode::Xor16 => "XOR",
            Opcode::Not8 | Opcode::Not16 => "NOT",
            Opcode::Shl8 | Opcode::Shl16 => "SHL",
            Opcode::Shr8 | Opcode::Shr16 => "SHR",
            Opcode::Jump32 => "JUMP",
            Opcode::JumpI32 => "JUMPI",
            Opcode::Return => "RETURN",
            Opcode::Revert8 | Opcode::Revert16 => "REVERT",
            Opcode::Set8
            | Opcode::Set16
            | Opcode::Set32
            | Opcode::Set64
            | Opcode::Set128
            | Opcode::SetFF => "SET",
            Opcode::Mov8 | Opcode::Mov16 => "MOV",
            Opcode::Cast8 | Opcode::Cast16 => "CAST",
            Opcode::CalldataCopy => "CALLDATACOPY",
            Opcode::ReturndataSize => "RETURNDATASIZE",
            Opcode::ReturndataCopy => "RETURNDATACOPY",
            Opcode::ToRadixBE => "TORADIXBE",
            Opcode::GetEnvVar16 => "GETENVVAR",
            Opcode::SLoad => "SLOAD",
            Opcode::SStore => "SSTORE",
            Opcode::NullifierExists => "NULLIFIEREXISTS",
            Opcode::EmitNullifier => "EMITNULLIFIER",
            Opcode::GetContractInstance => "GETCONTRACTINSTANCE",
            Opcode::Call => "CALL",
            Opcode::StaticCall => "STATICCALL",
        };
        write!(f, "{}", name)
    }
}
