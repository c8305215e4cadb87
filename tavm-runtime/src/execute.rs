//! Per-instruction execution.
//!
//! One exhaustive match over the decoded instruction. Operand addressing is
//! resolved here, once, before the opcode body runs; dynamic gas (copies,
//! limbs, state writes) is charged here too, after operands are known. Base
//! and addressing-overhead gas is the loop's job.

use crate::env::ExecutionEnvironment;
use crate::error::{AvmError, Result};
use crate::gas::{Gas, COPY_WORD_GAS_L2, RADIX_LIMB_GAS_L2, STATE_WRITE_GAS_DA};
use crate::memory::TaggedMemory;
use crate::state::{MachineState, NestedCallRequest, StepResult};
use crate::world::{BytecodeSource, WorldState};
use tavm_spec::{
    BinaryOp, EnvVar, Fr, Instruction, MemoryValue, TypeTag,
};
use tavm_trees::TreeStore;

pub fn execute<S: TreeStore, B: BytecodeSource>(
    instruction: &Instruction,
    memory: &mut TaggedMemory,
    machine: &mut MachineState,
    env: &ExecutionEnvironment,
    world: &mut WorldState<S, B>,
) -> Result<StepResult> {
    let addressing = instruction.addressing();
    // Resolve the i-th operand offset under its addressing mode.
    macro_rules! resolve {
        ($i:expr, $offset:expr) => {
            memory.resolve(*$offset, addressing.mode($i))?
        };
    }

    match instruction {
        Instruction::Binary {
            op,
            a_offset,
            b_offset,
            dst_offset,
            ..
        } => {
            let a_addr = resolve!(0, a_offset);
            let b_addr = resolve!(1, b_offset);
            let dst_addr = resolve!(2, dst_offset);
            let a = memory.get(a_addr);
            let b = memory.get(b_addr);
            let out = match op {
                BinaryOp::Add => a.add(&b)?,
                BinaryOp::Sub => a.sub(&b)?,
                BinaryOp::Mul => a.mul(&b)?,
                BinaryOp::Div => a.div(&b)?,
                BinaryOp::FDiv => a.fdiv(&b)?,
                BinaryOp::Eq => MemoryValue::U1(a.equals(&b)? as u8),
                BinaryOp::Lt => MemoryValue::U1(a.less_than(&b)? as u8),
                BinaryOp::And => a.bit_and(&b)?,
                BinaryOp::Or => a.bit_or(&b)?,
                BinaryOp::Xor => a.bit_xor(&b)?,
                BinaryOp::Shl | BinaryOp::Shr => {
                    memory.check_tag(b_addr, TypeTag::U8)?;
                    let amount = b.to_u128_truncated() as u32;
                    if *op == BinaryOp::Shl {
                        a.shl(amount)?
                    } else {
                        a.shr(amount)?
                    }
                }
            };
            memory.set(dst_addr, out);
            Ok(StepResult::Continue)
        }

        Instruction::Not {
            a_offset,
            dst_offset,
            ..
        } => {
            let a_addr = resolve!(0, a_offset);
            let dst_addr = resolve!(1, dst_offset);
            let out = memory.get(a_addr).bit_not()?;
            memory.set(dst_addr, out);
            Ok(StepResult::Continue)
        }

        Instruction::Jump { loc, .. } => {
            machine.next_pc = *loc;
            Ok(StepResult::Continue)
        }

        Instruction::JumpI {
            cond_offset, loc, ..
        } => {
            let cond_addr = resolve!(0, cond_offset);
            memory.check_tag(cond_addr, TypeTag::U1)?;
            if memory.get(cond_addr).as_bool().unwrap_or(false) {
                machine.next_pc = *loc;
            }
            Ok(StepResult::Continue)
        }

        Instruction::Return {
            ret_offset,
            ret_size_offset,
            ..
        } => {
            let output = read_output(memory, machine, addressing, ret_offset, ret_size_offset)?;
            Ok(StepResult::Return(output))
        }

        Instruction::Revert {
            ret_offset,
            ret_size_offset,
            ..
        } => {
            let output = read_output(memory, machine, addressing, ret_offset, ret_size_offset)?;
            Ok(StepResult::Revert(output))
        }

        Instruction::Set {
            dst_offset,
            tag,
            value,
            ..
        } => {
            let dst_addr = resolve!(0, dst_offset);
            memory.set(dst_addr, MemoryValue::from_field_truncating(*tag, value));
            Ok(StepResult::Continue)
        }

        Instruction::Mov {
            src_offset,
            dst_offset,
            ..
        } => {
            let src_addr = resolve!(0, src_offset);
            let dst_addr = resolve!(1, dst_offset);
            let value = memory.get(src_addr);
            memory.set(dst_addr, value);
            Ok(StepResult::Continue)
        }

        Instruction::Cast {
            a_offset,
            dst_offset,
            dst_tag,
            ..
        } => {
            let a_addr = resolve!(0, a_offset);
            let dst_addr = resolve!(1, dst_offset);
            let out = memory.get(a_addr).cast(*dst_tag);
            memory.set(dst_addr, out);
            Ok(StepResult::Continue)
        }

        Instruction::CalldataCopy {
            cd_start_offset,
            copy_size_offset,
            dst_offset,
            ..
        } => {
            let start_addr = resolve!(0, cd_start_offset);
            let size_addr = resolve!(1, copy_size_offset);
            let dst_addr = resolve!(2, dst_offset);
            let start = memory.get_u32(start_addr)? as u64;
            let size = memory.get_u32(size_addr)? as u64;
            if start + size > env.calldata.len() as u64 {
                return Err(AvmError::CalldataOutOfRange {
                    start,
                    size,
                    len: env.calldata.len(),
                });
            }
            machine
                .gas
                .charge(machine.pc, Gas::new(size * COPY_WORD_GAS_L2, 0))?;
            let cells: Vec<MemoryValue> = env.calldata[start as usize..(start + size) as usize]
                .iter()
                .map(|f| MemoryValue::Field(f.clone()))
                .collect();
            memory.set_slice(dst_addr, &cells)?;
            Ok(StepResult::Continue)
        }

        Instruction::ReturndataSize { dst_offset, .. } => {
            let dst_addr = resolve!(0, dst_offset);
            let size = MemoryValue::from_u128_truncating(
                TypeTag::U32,
                machine.returndata.len() as u128,
            );
            memory.set(dst_addr, size);
            Ok(StepResult::Continue)
        }

        Instruction::ReturndataCopy {
            rd_start_offset,
            copy_size_offset,
            dst_offset,
            ..
        } => {
            let start_addr = resolve!(0, rd_start_offset);
            let size_addr = resolve!(1, copy_size_offset);
            let dst_addr = resolve!(2, dst_offset);
            let start = memory.get_u32(start_addr)? as u64;
            let size = memory.get_u32(size_addr)? as u64;
            if start + size > machine.returndata.len() as u64 {
                return Err(AvmError::ReturndataOutOfRange {
                    start,
                    size,
                    len: machine.returndata.len(),
                });
            }
            machine
                .gas
                .charge(machine.pc, Gas::new(size * COPY_WORD_GAS_L2, 0))?;
            let cells: Vec<MemoryValue> = machine.returndata
                [start as usize..(start + size) as usize]
                .iter()
                .map(|f| MemoryValue::Field(f.clone()))
                .collect();
            memory.set_slice(dst_addr, &cells)?;
            Ok(StepResult::Continue)
        }

        Instruction::ToRadixBE {
            value_offset,
            radix_offset,
            num_limbs_offset,
            output_bits_offset,
            dst_offset,
            ..
        } => {
            let value_addr = resolve!(0, value_offset);
            let radix_addr = resolve!(1, radix_offset);
            let limbs_addr = resolve!(2, num_limbs_offset);
            let bits_addr = resolve!(3, output_bits_offset);
            let dst_addr = resolve!(4, dst_offset);

            memory.check_tag(value_addr, TypeTag::Field)?;
            let value = memory.get(value_addr).to_field();
            let radix = memory.get_u32(radix_addr)?;
            let num_limbs = memory.get_u32(limbs_addr)?;
            memory.check_tag(bits_addr, TypeTag::U1)?;
            let output_bits = memory.get(bits_addr).as_bool().unwrap_or(false);

            if !(2..=256).contains(&radix) {
                return Err(AvmError::InvalidToRadixInputs(format!(
                    "radix {radix} out of range [2, 256]"
                )));
            }
            if output_bits && radix != 2 {
                return Err(AvmError::InvalidToRadixInputs(format!(
                    "bit mode requires radix 2, got {radix}"
                )));
            }
            if num_limbs == 0 && !value.is_zero() {
                return Err(AvmError::InvalidToRadixInputs(
                    "zero limbs requested for a nonzero value".into(),
                ));
            }

            // The circuit always decomposes at least enough limbs to cover
            // the modulus, so gas does too.
            let charged_limbs = num_limbs.max(Fr::limbs_for_modulus(radix)) as u64;
            machine
                .gas
                .charge(machine.pc, Gas::new(charged_limbs * RADIX_LIMB_GAS_L2, 0))?;

            let limb_tag = if output_bits { TypeTag::U1 } else { TypeTag::U8 };
            let cells: Vec<MemoryValue> = value
                .to_radix_be(radix, num_limbs)
                .into_iter()
                .map(|limb| MemoryValue::from_u128_truncating(limb_tag, limb as u128))
                .collect();
            memory.set_slice(dst_addr, &cells)?;
            Ok(StepResult::Continue)
        }

        Instruction::GetEnvVar { var, dst_offset, .. } => {
            let dst_addr = resolve!(0, dst_offset);
            let value = read_env_var(*var, env, machine);
            memory.set(dst_addr, value);
            Ok(StepResult::Continue)
        }

        Instruction::SLoad {
            slot_offset,
            dst_offset,
            ..
        } => {
            let slot_addr = resolve!(0, slot_offset);
            let dst_addr = resolve!(1, dst_offset);
            memory.check_tag(slot_addr, TypeTag::Field)?;
            let slot = memory.get(slot_addr).to_field();
            let value = world.storage_read(&env.address, &slot)?;
            memory.set(dst_addr, MemoryValue::Field(value));
            Ok(StepResult::Continue)
        }

        Instruction::SStore {
            src_offset,
            slot_offset,
            ..
        } => {
            if env.is_static {
                return Err(AvmError::StaticContextViolation {
                    opcode: instruction.opcode().to_string(),
                });
            }
            let src_addr = resolve!(0, src_offset);
            let slot_addr = resolve!(1, slot_offset);
            memory.check_tag(slot_addr, TypeTag::Field)?;
            let slot = memory.get(slot_addr).to_field();
            let value = memory.get(src_addr).to_field();
            machine
                .gas
                .charge(machine.pc, Gas::new(0, STATE_WRITE_GAS_DA))?;
            world.storage_write(&env.address, &slot, &value)?;
            Ok(StepResult::Continue)
        }

        Instruction::NullifierExists {
            nullifier_offset,
            exists_dst_offset,
            ..
        } => {
            let nullifier_addr = resolve!(0, nullifier_offset);
            let exists_addr = resolve!(1, exists_dst_offset);
            memory.check_tag(nullifier_addr, TypeTag::Field)?;
            let nullifier = memory.get(nullifier_addr).to_field();
            let exists = world.nullifier_exists(&env.address, &nullifier)?;
            memory.set(exists_addr, MemoryValue::U1(exists as u8));
            Ok(StepResult::Continue)
        }

        Instruction::EmitNullifier {
            nullifier_offset, ..
        } => {
            if env.is_static {
                return Err(AvmError::StaticContextViolation {
                    opcode: instruction.opcode().to_string(),
                });
            }
            let nullifier_addr = resolve!(0, nullifier_offset);
            memory.check_tag(nullifier_addr, TypeTag::Field)?;
            let nullifier = memory.get(nullifier_addr).to_field();
            machine
                .gas
                .charge(machine.pc, Gas::new(0, STATE_WRITE_GAS_DA))?;
            world.emit_nullifier(&env.address, &nullifier)?;
            Ok(StepResult::Continue)
        }

        Instruction::GetContractInstance {
            member,
            address_offset,
            dst_offset,
            exists_dst_offset,
            ..
        } => {
            let address_addr = resolve!(0, address_offset);
            let dst_addr = resolve!(1, dst_offset);
            let exists_addr = resolve!(2, exists_dst_offset);
            memory.check_tag(address_addr, TypeTag::Field)?;
            let address = memory.get(address_addr).to_field();
            let instance = world.get_contract_instance(&address);
            let exists = instance.is_some();
            let value = instance
                .map(|i| {
                    use tavm_spec::ContractInstanceMember::*;
                    match member {
                        Deployer => i.deployer,
                        ClassId => i.class_id,
                        InitHash => i.init_hash,
                    }
                })
                .unwrap_or_else(Fr::zero);
            memory.set(exists_addr, MemoryValue::U1(exists as u8));
            memory.set(dst_addr, MemoryValue::Field(value));
            Ok(StepResult::Continue)
        }

        Instruction::Call {
            is_static,
            l2_gas_offset,
            da_gas_offset,
            addr_offset,
            args_offset,
            args_size_offset,
            success_dst_offset,
            ..
        } => {
            let l2_addr = resolve!(0, l2_gas_offset);
            let da_addr = resolve!(1, da_gas_offset);
            let callee_addr = resolve!(2, addr_offset);
            let args_addr = resolve!(3, args_offset);
            let args_size_addr = resolve!(4, args_size_offset);
            let success_dst = resolve!(5, success_dst_offset);

            let l2_gas = memory.get_u32(l2_addr)? as u64;
            let da_gas = memory.get_u32(da_addr)? as u64;
            memory.check_tag(callee_addr, TypeTag::Field)?;
            let callee = memory.get(callee_addr).to_field();
            let args_size = memory.get_u32(args_size_addr)?;
            let calldata: Vec<Fr> = memory
                .get_slice(args_addr, args_size)?
                .iter()
                .map(|cell| cell.to_field())
                .collect();

            Ok(StepResult::NestedCall(NestedCallRequest {
                callee,
                allocation: Gas::new(l2_gas, da_gas),
                calldata,
                success_dst,
                is_static: *is_static,
            }))
        }
    }
}

/// Read a RETURN/REVERT output slice (size cell must be `U32`), charging the
/// per-word copy cost.
fn read_output(
    memory: &TaggedMemory,
    machine: &mut MachineState,
    addressing: tavm_spec::Addressing,
    ret_offset: &u32,
    ret_size_offset: &u32,
) -> Result<Vec<Fr>> {
    let ret_addr = memory.resolve(*ret_offset, addressing.mode(0))?;
    let size_addr = memory.resolve(*ret_size_offset, addressing.mode(1))?;
    let size = memory.get_u32(size_addr)?;
    machine
        .gas
        .charge(machine.pc, Gas::new(size as u64 * COPY_WORD_GAS_L2, 0))?;
    Ok(memory
        .get_slice(ret_addr, size)?
        .iter()
        .map(|cell| cell.to_field())
        .collect())
}

fn read_env_var(var: EnvVar, env: &ExecutionEnvironment, machine: &MachineState) -> MemoryValue {
    match var {
        EnvVar::Address => MemoryValue::Field(env.address.clone()),
        EnvVar::Sender => MemoryValue::Field(env.sender.clone()),
        EnvVar::TransactionFee => MemoryValue::Field(env.transaction_fee.clone()),
        EnvVar::ChainId => MemoryValue::Field(env.globals.chain_id.clone()),
        EnvVar::Version => MemoryValue::Field(env.globals.version.clone()),
        EnvVar::BlockNumber => MemoryValue::U32(env.globals.block_number),
        EnvVar::Timestamp => MemoryValue::U64(env.globals.timestamp),
        EnvVar::BaseFeePerL2Gas => MemoryValue::Field(env.globals.base_fee_per_l2_gas.clone()),
        EnvVar::BaseFeePerDaGas => MemoryValue::Field(env.globals.base_fee_per_da_gas.clone()),
        EnvVar::IsStaticCall => MemoryValue::U1(env.is_static as u8),
        // Balances are u64 but the cell is U32; saturate rather than wrap so
        // an oversized allocation never reads back small.
        EnvVar::L2GasLeft => MemoryValue::U32(machine.gas.left().l2.min(u32::MAX as u64) as u32),
        EnvVar::DaGasLeft => MemoryValue::U32(machine.gas.left().da.min(u32::MAX as u64) as u32),
    }
}
