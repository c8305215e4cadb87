//! Decoded instructions and the bytecode wire codec.
//!
//! An `Instruction` is a fully decoded, immutable operation: opcode family,
//! addressing bitset, and the operand offsets/immediates exactly as they
//! appeared in the bytecode (pre-dereference). The wire layout is always
//! `[opcode byte][addressing u16][operands...]`, all fields big-endian.
//! Operand offsets are 1 or 2 bytes depending on the opcode's width variant;
//! the codec round-trips byte-exactly in both directions.

use crate::addressing::Addressing;
use crate::error::IsaError;
use crate::field::Fr;
use crate::opcode::Opcode;
use crate::tag::TypeTag;
use serde::{Deserialize, Serialize};

/// Operand-offset width of a wire variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandWidth {
    U8,
    U16,
}

impl OperandWidth {
    #[inline]
    fn bytes(self) -> usize {
        match self {
            OperandWidth::U8 => 1,
            OperandWidth::U16 => 2,
        }
    }
}

/// Immediate width of a SET wire variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetWidth {
    U8,
    U16,
    U32,
    U64,
    U128,
    FF,
}

impl SetWidth {
    #[inline]
    fn bytes(self) -> usize {
        match self {
            SetWidth::U8 => 1,
            SetWidth::U16 => 2,
            SetWidth::U32 => 4,
            SetWidth::U64 => 8,
            SetWidth::U128 => 16,
            SetWidth::FF => 32,
        }
    }
}

/// Environment variable selector for GETENVVAR.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvVar {
    Address = 0,
    Sender = 1,
    TransactionFee = 2,
    ChainId = 3,
    Version = 4,
    BlockNumber = 5,
    Timestamp = 6,
    BaseFeePerL2Gas = 7,
    BaseFeePerDaGas = 8,
    IsStaticCall = 9,
    L2GasLeft = 10,
    DaGasLeft = 11,
}

impl EnvVar {
    pub fn from_u8(value: u8) -> Result<Self, IsaError> {
        match value {
            0 => Ok(EnvVar::Address),
            1 => Ok(EnvVar::Sender),
            2 => Ok(EnvVar::TransactionFee),
            3 => Ok(EnvVar::ChainId),
            4 => Ok(EnvVar::Version),
            5 => Ok(EnvVar::BlockNumber),
            6 => Ok(EnvVar::Timestamp),
            7 => Ok(EnvVar::BaseFeePerL2Gas),
            8 => Ok(EnvVar::BaseFeePerDaGas),
            9 => Ok(EnvVar::IsStaticCall),
            10 => Ok(EnvVar::L2GasLeft),
            11 => Ok(EnvVar::DaGasLeft),
            other => Err(IsaError::InvalidEnvVar(other)),
        }
    }

    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Contract-instance member selector for GETCONTRACTINSTANCE.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractInstanceMember {
    Deployer = 0,
    ClassId = 1,
    InitHash = 2,
}

impl ContractInstanceMember {
    pub fn from_u8(value: u8) -> Result<Self, IsaError> {
        match value {
            0 => Ok(ContractInstanceMember::Deployer),
            1 => Ok(ContractInstanceMember::ClassId),
            2 => Ok(ContractInstanceMember::InitHash),
            other => Err(IsaError::InvalidContractMember(other)),
        }
    }

    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Binary-op selector shared by the three-operand arithmetic family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FDiv,
    Eq,
    Lt,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

/// A decoded instruction. Offsets are pre-dereference: addressing modes are
/// applied by the runtime just before execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// ADD/SUB/MUL/DIV/FDIV/EQ/LT/AND/OR/XOR/SHL/SHR: dst = a `op` b
    Binary {
        op: BinaryOp,
        width: OperandWidth,
        addressing: Addressing,
        a_offset: u32,
        b_offset: u32,
        dst_offset: u32,
    },
    /// NOT: dst = !a (integral only)
    Not {
        width: OperandWidth,
        addressing: Addressing,
        a_offset: u32,
        dst_offset: u32,
    },
    /// JUMP: pc = loc
    Jump { addressing: Addressing, loc: u32 },
    /// JUMPI: pc = loc if cond != 0 (cond is U1)
    JumpI {
        addressing: Addressing,
        cond_offset: u32,
        loc: u32,
    },
    /// RETURN: halt with output memory[ret..ret+size]
    Return {
        addressing: Addressing,
        ret_offset: u32,
        ret_size_offset: u32,
    },
    /// REVERT: halt, mark reverted, output carries the failure payload
    Revert {
        width: OperandWidth,
        addressing: Addressing,
        ret_offset: u32,
        ret_size_offset: u32,
    },
    /// SET: memory[dst] = immediate, tagged
    Set {
        width: SetWidth,
        addressing: Addressing,
        dst_offset: u32,
        tag: TypeTag,
        value: Fr,
    },
    /// MOV: memory[dst] = memory[src] (tag preserved)
    Mov {
        width: OperandWidth,
        addressing: Addressing,
        src_offset: u32,
        dst_offset: u32,
    },
    /// CAST: memory[dst] = memory[a] truncated into dst_tag
    Cast {
        width: OperandWidth,
        addressing: Addressing,
        a_offset: u32,
        dst_offset: u32,
        dst_tag: TypeTag,
    },
    /// CALLDATACOPY: copy calldata[start..start+size] into memory as Fields
    CalldataCopy {
        addressing: Addressing,
        cd_start_offset: u32,
        copy_size_offset: u32,
        dst_offset: u32,
    },
    /// RETURNDATASIZE: memory[dst] = U32(len(last nested-call output))
    ReturndataSize {
        addressing: Addressing,
        dst_offset: u32,
    },
    /// RETURNDATACOPY: copy nested-call output slice into memory
    ReturndataCopy {
        addressing: Addressing,
        rd_start_offset: u32,
        copy_size_offset: u32,
        dst_offset: u32,
    },
    /// TORADIXBE: big-endian radix decomposition of a field value
    ToRadixBE {
        addressing: Addressing,
        value_offset: u32,
        radix_offset: u32,
        num_limbs_offset: u32,
        output_bits_offset: u32,
        dst_offset: u32,
    },
    /// GETENVVAR: memory[dst] = environment variable
    GetEnvVar {
        addressing: Addressing,
        var: EnvVar,
        dst_offset: u32,
    },
    /// SLOAD: memory[dst] = storage[silo(slot)]
    SLoad {
        addressing: Addressing,
        slot_offset: u32,
        dst_offset: u32,
    },
    /// SSTORE: storage[silo(slot)] = memory[src]
    SStore {
        addressing: Addressing,
        src_offset: u32,
        slot_offset: u32,
    },
    /// NULLIFIEREXISTS: memory[dst] = U1(nullifier present)
    NullifierExists {
        addressing: Addressing,
        nullifier_offset: u32,
        exists_dst_offset: u32,
    },
    /// EMITNULLIFIER: insert silo(nullifier) into the nullifier tree
    EmitNullifier {
        addressing: Addressing,
        nullifier_offset: u32,
    },
    /// GETCONTRACTINSTANCE: exists flag plus one instance member
    GetContractInstance {
        addressing: Addressing,
        member: ContractInstanceMember,
        address_offset: u32,
        dst_offset: u32,
        exists_dst_offset: u32,
    },
    /// CALL/STATICCALL: run a nested public call
    Call {
        addressing: Addressing,
        is_static: bool,
        l2_gas_offset: u32,
        da_gas_offset: u32,
        addr_offset: u32,
        args_offset: u32,
        args_size_offset: u32,
        success_dst_offset: u32,
    },
}

// Wire cursor helpers ------------------------------------------------------

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    start: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Reader {
            bytes,
            pos,
            start: pos,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], IsaError> {
        if self.pos + n > self.bytes.len() {
            return Err(IsaError::TruncatedInstruction {
                pc: self.start,
                needed: self.pos + n - self.start,
                available: self.bytes.len() - self.start,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, IsaError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, IsaError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, IsaError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_offset(&mut self, width: OperandWidth) -> Result<u32, IsaError> {
        match width {
            OperandWidth::U8 => Ok(self.read_u8()? as u32),
            OperandWidth::U16 => Ok(self.read_u16()? as u32),
        }
    }

    fn read_fr(&mut self, n: usize) -> Result<Fr, IsaError> {
        Ok(Fr::from_be_bytes(self.take(n)?))
    }

    fn consumed(&self) -> usize {
        self.pos - self.start
    }
}

fn write_offset(out: &mut Vec<u8>, width: OperandWidth, value: u32) -> Result<(), IsaError> {
    match width {
        OperandWidth::U8 => {
            let byte: u8 = value
                .try_into()
                .map_err(|_| IsaError::OperandOutOfRange {
                    value: value as u64,
                    width_bits: 8,
                })?;
            out.push(byte);
        }
        OperandWidth::U16 => {
            let short: u16 = value
                .try_into()
                .map_err(|_| IsaError::OperandOutOfRange {
                    value: value as u64,
                    width_bits: 16,
                })?;
            out.extend_from_slice(&short.to_be_bytes());
        }
    }
    Ok(())
}

impl Instruction {
    /// The wire opcode for this instruction (width variant included).
    pub fn opcode(&self) -> Opcode {
        use OperandWidth::*;
        match self {
            Instruction::Binary { op, width, .. } => match (op, width) {
                (BinaryOp::Add, U8) => Opcode::Add8,
                (BinaryOp::Add, U16) => Opcode::Add16,
                (BinaryOp::Sub, U8) => Opcode::Sub8,
                (BinaryOp::Sub, U16) => Opcode::Sub16,
                (BinaryOp::Mul, U8) => Opcode::Mul8,
                (BinaryOp::Mul, U16) => Opcode::Mul16,
                (BinaryOp::Div, U8) => Opcode::Div8,
                (BinaryOp::Div, U16) => Opcode::Div16,
                (BinaryOp::FDiv, U8) => Opcode::FDiv8,
                (BinaryOp::FDiv, U16) => Opcode::FDiv16,
                (BinaryOp::Eq, U8) => Opcode::Eq8,
                (BinaryOp::Eq, U16) => Opcode::Eq16,
                (BinaryOp::Lt, U8) => Opcode::Lt8,
                (BinaryOp::Lt, U16) => Opcode::Lt16,
                (BinaryOp::And, U8) => Opcode::And8,
                (BinaryOp::And, U16) => Opcode::And16,
                (BinaryOp::Or, U8) => Opcode::Or8,
                (BinaryOp::Or, U16) => Opcode::Or16,
                (BinaryOp::Xor, U8) => Opcode::Xor8,
                (BinaryOp::Xor, U16) => Opcode::Xor16,
                (BinaryOp::Shl, U8) => Opcode::Shl8,
                (BinaryOp::Shl, U16) => Opcode::Shl16,
                (BinaryOp::Shr, U8) => Opcode::Shr8,
                (BinaryOp::Shr, U16) => Opcode::Shr16,
            },
            Instruction::Not { width: U8, .. } => Opcode::Not8,
            Instruction::Not { width: U16, .. } => Opcode::Not16,
            Instruction::Jump { .. } => Opcode::Jump32,
            Instruction::JumpI { .. } => Opcode::JumpI32,
            Instruction::Return { .. } => Opcode::Return,
            Instruction::Revert { width: U8, .. } => Opcode::Revert8,
            Instruction::Revert { width: U16, .. } => Opcode::Revert16,
            Instruction::Set { width, .. } => match width {
                SetWidth::U8 => Opcode::Set8,
                SetWidth::U16 => Opcode::Set16,
                SetWidth::U32 => Opcode::Set32,
                SetWidth::U64 => Opcode::Set64,
                SetWidth::U128 => Opcode::Set128,
                SetWidth::FF => Opcode::SetFF,
            },
            Instruction::Mov { width: U8, .. } => Opcode::Mov8,
            Instruction::Mov { width: U16, .. } => Opcode::Mov16,
            Instruction::Cast { width: U8, .. } => Opcode::Cast8,
            Instruction::Cast { width: U16, .. } => Opcode::Cast16,
            Instruction::CalldataCopy { .. } => Opcode::CalldataCopy,
            Instruction::ReturndataSize { .. } => Opcode::ReturndataSize,
            Instruction::ReturndataCopy { .. } => Opcode::ReturndataCopy,
            Instruction::ToRadixBE { .. } => Opcode::ToRadixBE,
            Instruction::GetEnvVar { .. } => Opcode::GetEnvVar16,
            Instruction::SLoad { .. } => Opcode::SLoad,
            Instruction::SStore { .. } => Opcode::SStore,
            Instruction::NullifierExists { .. } => Opcode::NullifierExists,
            Instruction::EmitNullifier { .. } => Opcode::EmitNullifier,
            Instruction::GetContractInstance { .. } => Opcode::GetContractInstance,
            Instruction::Call { is_static: false, .. } => Opcode::Call,
            Instruction::Call { is_static: true, .. } => Opcode::StaticCall,
        }
    }

    /// The addressing bitset.
    pub fn addressing(&self) -> Addressing {
        match self {
            Instruction::Binary { addressing, .. }
            | Instruction::Not { addressing, .. }
            | Instruction::Jump { addressing, .. }
            | Instruction::JumpI { addressing, .. }
            | Instruction::Return { addressing, .. }
            | Instruction::Revert { addressing, .. }
            | Instruction::Set { addressing, .. }
            | Instruction::Mov { addressing, .. }
            | Instruction::Cast { addressing, .. }
            | Instruction::CalldataCopy { addressing, .. }
            | Instruction::ReturndataSize { addressing, .. }
            | Instruction::ReturndataCopy { addressing, .. }
            | Instruction::ToRadixBE { addressing, .. }
            | Instruction::GetEnvVar { addressing, .. }
            | Instruction::SLoad { addressing, .. }
            | Instruction::SStore { addressing, .. }
            | Instruction::NullifierExists { addressing, .. }
            | Instruction::EmitNullifier { addressing, .. }
            | Instruction::GetContractInstance { addressing, .. }
            | Instruction::Call { addressing, .. } => *addressing,
        }
    }

    /// Number of addressable operand slots (for addressing gas overhead).
    pub fn operand_count(&self) -> usize {
        match self {
            Instruction::Binary { .. } => 3,
            Instruction::Not { .. } => 2,
            Instruction::Jump { .. } => 0,
            Instruction::JumpI { .. } => 1,
            Instruction::Return { .. } => 2,
            Instruction::Revert { .. } => 2,
            Instruction::Set { .. } => 1,
            Instruction::Mov { .. } => 2,
            Instruction::Cast { .. } => 2,
            Instruction::CalldataCopy { .. } => 3,
            Instruction::ReturndataSize { .. } => 1,
            Instruction::ReturndataCopy { .. } => 3,
            Instruction::ToRadixBE { .. } => 5,
            Instruction::GetEnvVar { .. } => 1,
            Instruction::SLoad { .. } => 2,
            Instruction::SStore { .. } => 2,
            Instruction::NullifierExists { .. } => 2,
            Instruction::EmitNullifier { .. } => 1,
            Instruction::GetContractInstance { .. } => 3,
            Instruction::Call { .. } => 6,
        }
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        // opcode + addressing
        let header = 3;
        let body = match self {
            Instruction::Binary { width, .. } => 3 * width.bytes(),
            Instruction::Not { width, .. } => 2 * width.bytes(),
            Instruction::Jump { .. } => 4,
            Instruction::JumpI { .. } => 2 + 4,
            Instruction::Return { .. } => 2 * 2,
            Instruction::Revert { width, .. } => 2 * width.bytes(),
            Instruction::Set { width, .. } => 2 + 1 + width.bytes(),
            Instruction::Mov { width, .. } => 2 * width.bytes(),
            Instruction::Cast { width, .. } => 2 * width.bytes() + 1,
            Instruction::CalldataCopy { .. } => 3 * 2,
            Instruction::ReturndataSize { .. } => 2,
            Instruction::ReturndataCopy { .. } => 3 * 2,
            Instruction::ToRadixBE { .. } => 5 * 2,
            Instruction::GetEnvVar { .. } => 1 + 2,
            Instruction::SLoad { .. } => 2 * 2,
            Instruction::SStore { .. } => 2 * 2,
            Instruction::NullifierExists { .. } => 2 * 2,
            Instruction::EmitNullifier { .. } => 2,
            Instruction::GetContractInstance { .. } => 1 + 3 * 2,
            Instruction::Call { .. } => 6 * 2,
        };
        header + body
    }

    /// Append the wire encoding to `out`.
    pub fn serialize(&self, out: &mut Vec<u8>) -> Result<(), IsaError> {
        out.push(self.opcode().to_u8());
        out.extend_from_slice(&self.addressing().to_wire().to_be_bytes());
        match self {
            Instruction::Binary {
                width,
                a_offset,
                b_offset,
                dst_offset,
                ..
            } => {
                write_offset(out, *width, *a_offset)?;
                write_offset(out, *width, *b_offset)?;
                write_offset(out, *width, *dst_offset)?;
            }
            Instruction::Not {
                width,
                a_offset,
                dst_offset,
                ..
            } => {
                write_offset(out, *width, *a_offset)?;
                write_offset(out, *width, *dst_offset)?;
            }
            Instruction::Jump { loc, .. } => {
                out.extend_from_slice(&loc.to_be_bytes());
            }
            Instruction::JumpI {
                cond_offset, loc, ..
            } => {
                write_offset(out, OperandWidth::U16, *cond_offset)?;
                out.extend_from_slice(&loc.to_be_bytes());
            }
            Instruction::Return {
                ret_offset,
                ret_size_offset,
                ..
            } => {
                write_offset(out, OperandWidth::U16, *ret_offset)?;
                write_offset(out, OperandWidth::U16, *ret_size_offset)?;
            }
            Instruction::Revert {
                width,
                ret_offset,
                ret_size_offset,
                ..
            } => {
                write_offset(out, *width, *ret_offset)?;
                write_offset(out, *width, *ret_size_offset)?;
            }
            Instruction::Set {
                width,
                dst_offset,
                tag,
                value,
                ..
            } => {
                write_offset(out, OperandWidth::U16, *dst_offset)?;
                out.push(tag.to_u8());
                let be = value.to_be_bytes();
                out.extend_from_slice(&be[32 - width.bytes()..]);
            }
            Instruction::Mov {
                width,
                src_offset,
                dst_offset,
                ..
            } => {
                write_offset(out, *width, *src_offset)?;
                write_offset(out, *width, *dst_offset)?;
            }
            Instruction::Cast {
                width,
                a_offset,
                dst_offset,
                dst_tag,
                ..
            } => {
                write_offset(out, *width, *a_offset)?;
                write_offset(out, *width, *dst_offset)?;
                out.push(dst_tag.to_u8());
            }
            Instruction::CalldataCopy {
                cd_start_offset,
                copy_size_offset,
                dst_offset,
                ..
            } => {
                write_offset(out, OperandWidth::U16, *cd_start_offset)?;
                write_offset(out, OperandWidth::U16, *copy_size_offset)?;
                write_offset(out, OperandWidth::U16, *dst_offset)?;
            }
            Instruction::ReturndataSize { dst_offset, .. } => {
                write_offset(out, OperandWidth::U16, *dst_offset)?;
            }
            Instruction::ReturndataCopy {
                rd_start_offset,
                copy_size_offset,
                dst_offset,
                ..
            } => {
                write_offset(out, OperandWidth::U16, *rd_start_offset)?;
                write_offset(out, OperandWidth::U16, *copy_size_offset)?;
                write_offset(out, OperandWidth::U16, *dst_offset)?;
            }
            Instruction::ToRadixBE {
                value_offset,
                radix_offset,
                num_limbs_offset,
                output_bits_offset,
                dst_offset,
                ..
            } => {
                write_offset(out, OperandWidth::U16, *value_offset)?;
                write_offset(out, OperandWidth::U16, *radix_offset)?;
                write_offset(out, OperandWidth::U16, *num_limbs_offset)?;
                write_offset(out, OperandWidth::U16, *output_bits_offset)?;
                write_offset(out, OperandWidth::U16, *dst_offset)?;
            }
            Instruction::GetEnvVar { var, dst_offset, .. } => {
                out.push(var.to_u8());
                write_offset(out, OperandWidth::U16, *dst_offset)?;
            }
            Instruction::SLoad {
                slot_offset,
                dst_offset,
                ..
            } => {
                write_offset(out, OperandWidth::U16, *slot_offset)?;
                write_offset(out, OperandWidth::U16, *dst_offset)?;
            }
            Instruction::SStore {
                src_offset,
                slot_offset,
                ..
            } => {
                write_offset(out, OperandWidth::U16, *src_offset)?;
                write_offset(out, OperandWidth::U16, *slot_offset)?;
            }
            Instruction::NullifierExists {
                nullifier_offset,
                exists_dst_offset,
                ..
            } => {
                write_offset(out, OperandWidth::U16, *nullifier_offset)?;
                write_offset(out, OperandWidth::U16, *exists_dst_offset)?;
            }
            Instruction::EmitNullifier {
                nullifier_offset, ..
            } => {
                write_offset(out, OperandWidth::U16, *nullifier_offset)?;
            }
            Instruction::GetContractInstance {
                member,
                address_offset,
                dst_offset,
                exists_dst_offset,
                ..
            } => {
                out.push(member.to_u8());
                write_offset(out, OperandWidth::U16, *address_offset)?;
                write_offset(out, OperandWidth::U16, *dst_offset)?;
                write_offset(out, OperandWidth::U16, *exists_dst_offset)?;
            }
            Instruction::Call {
                l2_gas_offset,
                da_gas_offset,
                addr_offset,
                args_offset,
                args_size_offset,
                success_dst_offset,
                ..
            } => {
                write_offset(out, OperandWidth::U16, *l2_gas_offset)?;
                write_offset(out, OperandWidth::U16, *da_gas_offset)?;
                write_offset(out, OperandWidth::U16, *addr_offset)?;
                write_offset(out, OperandWidth::U16, *args_offset)?;
                write_offset(out, OperandWidth::U16, *args_size_offset)?;
                write_offset(out, OperandWidth::U16, *success_dst_offset)?;
            }
        }
        Ok(())
    }

    /// Encode to a fresh buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, IsaError> {
        let mut out = Vec::with_capacity(self.size());
        self.serialize(&mut out)?;
        Ok(out)
    }

    /// Decode the instruction starting at `pc`. Returns the instruction and
    /// the number of bytes consumed.
    pub fn deserialize(bytes: &[u8], pc: usize) -> Result<(Instruction, usize), IsaError> {
        let mut r = Reader::new(bytes, pc);
        let opcode = Opcode::from_u8(r.read_u8()?)?;
        let addressing = Addressing::from_wire(r.read_u16()?);

        use OperandWidth::*;
        let instruction = match opcode {
            Opcode::Add8 => Self::read_binary(BinaryOp::Add, U8, addressing, &mut r)?,
            Opcode::Add16 => Self::read_binary(BinaryOp::Add, U16, addressing, &mut r)?,
            Opcode::Sub8 => Self::read_binary(BinaryOp::Sub, U8, addressing, &mut r)?,
            Opcode::Sub16 => Self::read_binary(BinaryOp::Sub, U16, addressing, &mut r)?,
            Opcode::Mul8 => Self::read_binary(BinaryOp::Mul, U8, addressing, &mut r)?,
            Opcode::Mul16 => Self::read_binary(BinaryOp::Mul, U16, addressing, &mut r)?,
            Opcode::Div8 => Self::read_binary(BinaryOp::Div, U8, addressing, &mut r)?,
            Opcode::Div16 => Self::read_binary(BinaryOp::Div, U16, addressing, &mut r)?,
            Opcode::FDiv8 => Self::read_binary(BinaryOp::FDiv, U8, addressing, &mut r)?,
            Opcode::FDiv16 => Self::read_binary(BinaryOp::FDiv, U16, addressing, &mut r)?,
            Opcode::Eq8 => Self::read_binary(BinaryOp::Eq, U8, addressing, &mut r)?,
            Opcode::Eq16 => Self::read_binary(BinaryOp::Eq, U16, addressing, &mut r)?,
            Opcode::Lt8 => Self::read_binary(BinaryOp::Lt, U8, addressing, &mut r)?,
            Opcode::Lt16 => Self::read_binary(BinaryOp::Lt, U16, addressing, &mut r)?,
            Opcode::And8 => Self::read_binary(BinaryOp::And, U8, addressing, &mut r)?,
            Opcode::And16 => Self::read_binary(BinaryOp::And, U16, addressing, &mut r)?,
            Opcode::Or8 => Self::read_binary(BinaryOp::Or, U8, addressing, &mut r)?,
            Opcode::Or16 => Self::read_binary(BinaryOp::Or, U16, addressing, &mut r)?,
            Opcode::Xor8 => Self::read_binary(BinaryOp::Xor, U8, addressing, &mut r)?,
            Opcode::Xor16 => Self::read_binary(BinaryOp::Xor, U16, addressing, &mut r)?,
            Opcode::Shl8 => Self::read_binary(BinaryOp::Shl, U8, addressing, &mut r)?,
            Opcode::Shl16 => Self::read_binary(BinaryOp::Shl, U16, addressing, &mut r)?,
            Opcode::Shr8 => Self::read_binary(BinaryOp::Shr, U8, addressing, &mut r)?,
            Opcode::Shr16 => Self::read_binary(BinaryOp::Shr, U16, addressing, &mut r)?,
            Opcode::Not8 | Opcode::Not16 => {
                let width = if opcode == Opcode::Not8 { U8 } else { U16 };
                Instruction::Not {
                    width,
                    addressing,
                    a_offset: r.read_offset(width)?,
                    dst_offset: r.read_offset(width)?,
                }
            }
            Opcode::Jump32 => Instruction::Jump {
                addressing,
                loc: r.read_u32()?,
            },
            Opcode::JumpI32 => Instruction::JumpI {
                addressing,
                cond_offset: r.read_offset(U16)?,
                loc: r.read_u32()?,
            },
            Opcode::Return => Instruction::Return {
                addressing,
                ret_offset: r.read_offset(U16)?,
                ret_size_offset: r.read_offset(U16)?,
            },
            Opcode::Revert8 | Opcode::Revert16 => {
                let width = if opcode == Opcode::Revert8 { U8 } else { U16 };
                Instruction::Revert {
                    width,
                    addressing,
                    ret_offset: r.read_offset(width)?,
                    ret_size_offset: r.read_offset(width)?,
                }
            }
            Opcode::Set8 | Opcode::Set16 | Opcode::Set32 | Opcode::Set64 | Opcode::Set128
            | Opcode::SetFF => {
                let width = match opcode {
                    Opcode::Set8 => SetWidth::U8,
                    Opcode::Set16 => SetWidth::U16,
                    Opcode::Set32 => SetWidth::U32,
                    Opcode::Set64 => SetWidth::U64,
                    Opcode::Set128 => SetWidth::U128,
                    _ => SetWidth::FF,
                };
                Instruction::Set {
                    width,
                    addressing,
                    dst_offset: r.read_offset(U16)?,
                    tag: TypeTag::from_u8(r.read_u8()?)?,
                    value: r.read_fr(width.bytes())?,
                }
            }
            Opcode::Mov8 | Opcode::Mov16 => {
                let width = if opcode == Opcode::Mov8 { U8 } else { U16 };
                Instruction::Mov {
                    width,
                    addressing,
                    src_offset: r.read_offset(width)?,
                    dst_offset: r.read_offset(width)?,
                }
            }
            Opcode::Cast8 | Opcode::Cast16 => {
                let width = if opcode == Opcode::Cast8 { U8 } else { U16 };
                Instruction::Cast {
                    width,
                    addressing,
                    a_offset: r.read_offset(width)?,
                    dst_offset: r.read_offset(width)?,
                    dst_tag: TypeTag::from_u8(r.read_u8()?)?,
                }
            }
            Opcode::CalldataCopy => Instruction::CalldataCopy {
                addressing,
                cd_start_offset: r.read_offset(U16)?,
                copy_size_offset: r.read_offset(U16)?,
                dst_offset: r.read_offset(U16)?,
            },
            Opcode::ReturndataSize => Instruction::ReturndataSize {
                addressing,
                dst_offset: r.read_offset(U16)?,
            },
            Opcode::ReturndataCopy => Instruction::ReturndataCopy {
                addressing,
                rd_start_offset: r.read_offset(U16)?,
                copy_size_offset: r.read_offset(U16)?,
                dst_offset: r.read_offset(U16)?,
            },
            Opcode::ToRadixBE => Instruction::ToRadixBE {
                addressing,
                value_offset: r.read_offset(U16)?,
                radix_offset: r.read_offset(U16)?,
                num_limbs_offset: r.read_offset(U16)?,
                output_bits_offset: r.read_offset(U16)?,
                dst_offset: r.read_offset(U16)?,
            },
            Opcode::GetEnvVar16 => Instruction::GetEnvVar {
                addressing,
                var: EnvVar::from_u8(r.read_u8()?)?,
                dst_offset: r.read_offset(U16)?,
            },
            Opcode::SLoad => Instruction::SLoad {
                addressing,
                slot_offset: r.read_offset(U16)?,
                dst_offset: r.read_offset(U16)?,
            },
            Opcode::SStore => Instruction::SStore {
                addressing,
                src_offset: r.read_offset(U16)?,
                slot_offset: r.read_offset(U16)?,
            },
            Opcode::NullifierExists => Instruction::NullifierExists {
                addressing,
                nullifier_offset: r.read_offset(U16)?,
                exists_dst_offset: r.read_offset(U16)?,
            },
            Opcode::EmitNullifier => Instruction::EmitNullifier {
                addressing,
                nullifier_offset: r.read_offset(U16)?,
            },
            Opcode::GetContractInstance => Instruction::GetContractInstance {
                addressing,
                member: ContractInstanceMember::from_u8(r.read_u8()?)?,
                address_offset: r.read_offset(U16)?,
                dst_offset: r.read_offset(U16)?,
                exists_dst_offset: r.read_offset(U16)?,
            },
            Opcode::Call | Opcode::StaticCall => Instruction::Call {
                addressing,
                is_static: opcode == Opcode::StaticCall,
                l2_gas_offset: r.read_offset(U16)?,
                da_gas_offset: r.read_offset(U16)?,
                addr_offset: r.read_offset(U16)?,
                args_offset: r.read_offset(U16)?,
                args_size_offset: r.read_offset(U16)?,
                success_dst_offset: r.read_offset(U16)?,
            },
        };

        Ok((instruction, r.consumed()))
    }

    fn read_binary(
        op: BinaryOp,
        width: OperandWidth,
        addressing: Addressing,
        r: &mut Reader<'_>,
    ) -> Result<Instruction, IsaError> {
        Ok(Instruction::Binary {
            op,
            width,
            addressing,
            a_offset: r.read_offset(width)?,
            b_offset: r.read_offset(width)?,
            dst_offset: r.read_offset(width)?,
        })
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.opcode())
    }
}
