//! Simulator integration tests: whole programs run through the VM loop.

use tavm_runtime::{
    AvmSimulator, CallResult, ExecutionEnvironment, Gas, MapBytecodeSource, NoopProfiler,
    OpcodeTally, Profiler, VmConfig, WorldState,
};
use tavm_spec::{Addressing, BinaryOp, Fr, Instruction, Opcode, OperandWidth, SetWidth, TypeTag};
use tavm_trees::{EphemeralTreeContainer, MemoryTreeStore};

const CONTRACT: u64 = 0xAA;

fn assemble(instructions: &[Instruction]) -> Vec<u8> {
    let mut bytecode = Vec::new();
    for instruction in instructions {
        instruction.serialize(&mut bytecode).unwrap();
    }
    bytecode
}

fn set_u32(dst: u32, value: u64) -> Instruction {
    Instruction::Set {
        width: SetWidth::U32,
        addressing: Addressing::direct(),
        dst_offset: dst,
        tag: TypeTag::U32,
        value: Fr::from_u64(value),
    }
}

fn set_u1(dst: u32, value: u64) -> Instruction {
    Instruction::Set {
        width: SetWidth::U8,
        addressing: Addressing::direct(),
        dst_offset: dst,
        tag: TypeTag::U1,
        value: Fr::from_u64(value),
    }
}

fn set_ff(dst: u32, value: Fr) -> Instruction {
    Instruction::Set {
        width: SetWidth::FF,
        addressing: Addressing::direct(),
        dst_offset: dst,
        tag: TypeTag::Field,
        value,
    }
}

fn binary(op: BinaryOp, a: u32, b: u32, dst: u32) -> Instruction {
    Instruction::Binary {
        op,
        width: OperandWidth::U16,
        addressing: Addressing::direct(),
        a_offset: a,
        b_offset: b,
        dst_offset: dst,
    }
}

fn ret(offset: u32, size_cell: u32) -> Instruction {
    Instruction::Return {
        addressing: Addressing::direct(),
        ret_offset: offset,
        ret_size_offset: size_cell,
    }
}

/// Run `bytecode` at the test contract address against a fresh world.
fn run_with(
    bytecode: Vec<u8>,
    env: ExecutionEnvironment,
    allocated: Gas,
    profiler: &mut dyn Profiler,
) -> CallResult {
    let mut source = MapBytecodeSource::new();
    source.register(Fr::from_u64(CONTRACT), bytecode);
    let trees = EphemeralTreeContainer::fork(MemoryTreeStore::new(10)).unwrap();
    let mut world = WorldState::new(trees, source);
    let mut sim = AvmSimulator::new(&mut world, VmConfig::default(), profiler);
    sim.execute(env, allocated).unwrap()
}

fn run(bytecode: Vec<u8>, calldata: Vec<Fr>, allocated: Gas) -> CallResult {
    let env = ExecutionEnvironment {
        address: Fr::from_u64(CONTRACT),
        calldata,
        ..Default::default()
    };
    run_with(bytecode, env, allocated, &mut NoopProfiler)
}

#[test]
fn add_from_calldata() {
    // Copy calldata [1, 2] into memory, add, return the sum.
    let bytecode = assemble(&[
        set_u32(20, 0),
        set_u32(21, 2),
        Instruction::CalldataCopy {
            addressing: Addressing::direct(),
            cd_start_offset: 20,
            copy_size_offset: 21,
            dst_offset: 0,
        },
        binary(BinaryOp::Add, 0, 1, 2),
        set_u32(22, 1),
        ret(2, 22),
    ]);
    let result = run(
        bytecode,
        vec![Fr::from_u64(1), Fr::from_u64(2)],
        Gas::new(1_000_000, 1_000),
    );
    assert!(!result.reverted, "reason: {:?}", result.revert_reason);
    assert_eq!(result.output, vec![Fr::from_u64(3)]);
    assert_eq!(result.instruction_count, 6);
}

#[test]
fn gas_decreases_by_exact_cost() {
    // SET(25) + SET(25) + SET(25) + RETURN(20 base + 1 word * 5) = 100 l2.
    let bytecode = assemble(&[
        set_u32(10, 1),
        set_ff(11, Fr::from_u64(42)),
        set_u32(12, 7),
        ret(11, 10),
    ]);
    let result = run(bytecode, vec![], Gas::new(1_000, 50));
    assert!(!result.reverted);
    assert_eq!(result.gas_left, Gas::new(900, 50));
}

#[test]
fn out_of_gas_consumes_everything() {
    let bytecode = assemble(&[set_u32(10, 1), set_u32(11, 2)]);
    let result = run(bytecode, vec![], Gas::new(30, 0));
    assert!(result.reverted);
    assert_eq!(result.gas_left, Gas::ZERO);
    assert!(result
        .revert_reason
        .as_deref()
        .is_some_and(|r| r.contains("Out of gas")));
}

#[test]
fn explicit_revert_keeps_unused_gas() {
    let bytecode = assemble(&[
        set_u32(10, 0),
        Instruction::Revert {
            width: OperandWidth::U16,
            addressing: Addressing::direct(),
            ret_offset: 0,
            ret_size_offset: 10,
        },
    ]);
    let result = run(bytecode, vec![], Gas::new(1_000, 0));
    assert!(result.reverted);
    assert!(result.gas_left.l2 > 0, "revert must not consume all gas");
    assert!(result.output.is_empty());
    // No symbol information registered, so the reason names the address.
    assert!(result
        .revert_reason
        .as_deref()
        .is_some_and(|r| r.contains("Reverted in")));
}

#[test]
fn explicit_revert_names_the_failing_function() {
    let bytecode = assemble(&[
        set_u32(10, 0),
        Instruction::Revert {
            width: OperandWidth::U16,
            addressing: Addressing::direct(),
            ret_offset: 0,
            ret_size_offset: 10,
        },
    ]);
    let mut source = MapBytecodeSource::new();
    source.register(Fr::from_u64(CONTRACT), bytecode);
    source.register_debug_name(Fr::from_u64(CONTRACT), "Token::transfer");
    let trees = EphemeralTreeContainer::fork(MemoryTreeStore::new(10)).unwrap();
    let mut world = WorldState::new(trees, source);
    let env = ExecutionEnvironment {
        address: Fr::from_u64(CONTRACT),
        ..Default::default()
    };
    let mut profiler = NoopProfiler;
    let mut sim = AvmSimulator::new(&mut world, VmConfig::default(), &mut profiler);
    let result = sim.execute(env, Gas::new(1_000, 0)).unwrap();

    assert!(result.reverted);
    let reason = result.revert_reason.as_deref().unwrap();
    assert!(reason.contains("Token::transfer"), "reason: {reason}");
    assert!(reason.contains("call stack"), "reason: {reason}");
}

#[test]
fn storage_write_then_read() {
    // SSTORE slot 1000 := 129, SLOAD it back, return it.
    let bytecode = assemble(&[
        set_ff(0x10, Fr::from_u64(129)),
        set_ff(0x11, Fr::from_u64(1000)),
        Instruction::SStore {
            addressing: Addressing::direct(),
            src_offset: 0x10,
            slot_offset: 0x11,
        },
        Instruction::SLoad {
            addressing: Addressing::direct(),
            slot_offset: 0x11,
            dst_offset: 0x12,
        },
        set_u32(0x13, 1),
        ret(0x12, 0x13),
    ]);
    let result = run(bytecode, vec![], Gas::new(1_000_000, 10_000));
    assert!(!result.reverted, "reason: {:?}", result.revert_reason);
    assert_eq!(result.output, vec![Fr::from_u64(129)]);
}

#[test]
fn sload_of_untouched_slot_is_zero() {
    let bytecode = assemble(&[
        set_ff(0x11, Fr::from_u64(555)),
        Instruction::SLoad {
            addressing: Addressing::direct(),
            slot_offset: 0x11,
            dst_offset: 0x12,
        },
        set_u32(0x13, 1),
        ret(0x12, 0x13),
    ]);
    let result = run(bytecode, vec![], Gas::new(1_000_000, 1_000));
    assert!(!result.reverted);
    assert_eq!(result.output, vec![Fr::zero()]);
}

#[test]
fn sstore_rejected_in_static_context() {
    let bytecode = assemble(&[
        set_ff(0x10, Fr::from_u64(1)),
        set_ff(0x11, Fr::from_u64(2)),
        Instruction::SStore {
            addressing: Addressing::direct(),
            src_offset: 0x10,
            slot_offset: 0x11,
        },
    ]);
    let env = ExecutionEnvironment {
        address: Fr::from_u64(CONTRACT),
        is_static: true,
        ..Default::default()
    };
    let result = run_with(bytecode, env, Gas::new(1_000_000, 10_000), &mut NoopProfiler);
    assert!(result.reverted);
    assert_eq!(result.gas_left, Gas::ZERO);
    assert!(result
        .revert_reason
        .as_deref()
        .is_some_and(|r| r.contains("static context")));
}

#[test]
fn nullifier_emit_and_exists() {
    let bytecode = assemble(&[
        set_ff(0x10, Fr::from_u64(77)),
        Instruction::NullifierExists {
            addressing: Addressing::direct(),
            nullifier_offset: 0x10,
            exists_dst_offset: 0x11,
        },
        Instruction::EmitNullifier {
            addressing: Addressing::direct(),
            nullifier_offset: 0x10,
        },
        Instruction::NullifierExists {
            addressing: Addressing::direct(),
            nullifier_offset: 0x10,
            exists_dst_offset: 0x12,
        },
        set_u32(0x13, 2),
        ret(0x11, 0x13),
    ]);
    let result = run(bytecode, vec![], Gas::new(1_000_000, 10_000));
    assert!(!result.reverted, "reason: {:?}", result.revert_reason);
    // RETURN lifts the two U1 flags to fields: before = 0, after = 1.
    assert_eq!(result.output, vec![Fr::zero(), Fr::one()]);
}

#[test]
fn duplicate_nullifier_is_exceptional() {
    let bytecode = assemble(&[
        set_ff(0x10, Fr::from_u64(5)),
        Instruction::EmitNullifier {
            addressing: Addressing::direct(),
            nullifier_offset: 0x10,
        },
        Instruction::EmitNullifier {
            addressing: Addressing::direct(),
            nullifier_offset: 0x10,
        },
    ]);
    let result = run(bytecode, vec![], Gas::new(1_000_000, 10_000));
    assert!(result.reverted);
    assert_eq!(result.gas_left, Gas::ZERO);
    assert!(result
        .revert_reason
        .as_deref()
        .is_some_and(|r| r.contains("already exists")));
}

#[test]
fn to_radix_be_bit_mode() {
    // Spec example value: 0b1011101010100 into 10 bit-limbs keeps the low
    // 10 bits, big-endian.
    let bytecode = assemble(&[
        set_ff(0x10, Fr::from_u64(0b1011101010100)),
        set_u32(0x11, 2),
        set_u32(0x12, 10),
        set_u1(0x13, 1),
        Instruction::ToRadixBE {
            addressing: Addressing::direct(),
            value_offset: 0x10,
            radix_offset: 0x11,
            num_limbs_offset: 0x12,
            output_bits_offset: 0x13,
            dst_offset: 0x20,
        },
        set_u32(0x14, 10),
        ret(0x20, 0x14),
    ]);
    let result = run(bytecode, vec![], Gas::new(1_000_000, 1_000));
    assert!(!result.reverted, "reason: {:?}", result.revert_reason);
    let expected: Vec<Fr> = [1u64, 1, 0, 1, 0, 1, 0, 1, 0, 0]
        .iter()
        .map(|&b| Fr::from_u64(b))
        .collect();
    assert_eq!(result.output, expected);
}

#[test]
fn to_radix_rejects_bad_radix() {
    let bytecode = assemble(&[
        set_ff(0x10, Fr::from_u64(7)),
        set_u32(0x11, 1),
        set_u32(0x12, 4),
        set_u1(0x13, 0),
        Instruction::ToRadixBE {
            addressing: Addressing::direct(),
            value_offset: 0x10,
            radix_offset: 0x11,
            num_limbs_offset: 0x12,
            output_bits_offset: 0x13,
            dst_offset: 0x20,
        },
    ]);
    let result = run(bytecode, vec![], Gas::new(1_000_000, 1_000));
    assert!(result.reverted);
    assert!(result
        .revert_reason
        .as_deref()
        .is_some_and(|r| r.contains("TORADIXBE")));
}

#[test]
fn decode_cache_and_profiler_tally() {
    // A two-pass loop: JUMPI at pc 7 executes twice but decodes once.
    let instructions = [
        set_u1(5, 1), // pc 0, 7 bytes
        Instruction::JumpI {
            addressing: Addressing::direct(),
            cond_offset: 5,
            loc: 33,
        }, // pc 7, 9 bytes
        set_u32(10, 0), // pc 16, 10 bytes
        ret(0, 10), // pc 26, 7 bytes
        set_u1(5, 0), // pc 33, 7 bytes
        Instruction::Jump {
            addressing: Addressing::direct(),
            loc: 7,
        }, // pc 40, 7 bytes
    ];
    let bytecode = assemble(&instructions);
    assert_eq!(bytecode.len(), 47);

    let env = ExecutionEnvironment {
        address: Fr::from_u64(CONTRACT),
        ..Default::default()
    };
    let mut tally = OpcodeTally::default();
    let result = run_with(bytecode, env, Gas::new(1_000_000, 1_000), &mut tally);

    assert!(!result.reverted, "reason: {:?}", result.revert_reason);
    // 7 executed instructions over 6 distinct pcs.
    assert_eq!(result.instruction_count, 7);
    assert_eq!(tally.decodes, 6);
    assert_eq!(tally.executed[&Opcode::JumpI32], 2);
}

#[test]
fn missing_bytecode_is_revert_equivalent() {
    let env = ExecutionEnvironment {
        address: Fr::from_u64(0xDEAD),
        ..Default::default()
    };
    // Registry only knows CONTRACT; 0xDEAD resolves to nothing.
    let result = run_with(Vec::from([0u8]), env, Gas::new(1_000, 1_000), &mut NoopProfiler);
    assert!(result.reverted);
    assert_eq!(result.gas_left, Gas::ZERO);
    assert_eq!(result.instruction_count, 0);
    assert!(result
        .revert_reason
        .as_deref()
        .is_some_and(|r| r.contains("No bytecode")));
}

#[test]
fn empty_bytecode_is_a_precondition_error() {
    let mut source = MapBytecodeSource::new();
    source.register(Fr::from_u64(CONTRACT), Vec::new());
    let trees = EphemeralTreeContainer::fork(MemoryTreeStore::new(10)).unwrap();
    let mut world = WorldState::new(trees, source);
    let env = ExecutionEnvironment {
        address: Fr::from_u64(CONTRACT),
        ..Default::default()
    };
    let mut profiler = NoopProfiler;
    let mut sim = AvmSimulator::new(&mut world, VmConfig::default(), &mut profiler);
    assert!(matches!(
        sim.execute(env, Gas::new(1_000, 0)),
        Err(tavm_runtime::AvmError::EmptyBytecode)
    ));
}

#[test]
fn get_env_var_reads_environment() {
    let bytecode = assemble(&[
        Instruction::GetEnvVar {
            addressing: Addressing::direct(),
            var: tavm_spec::EnvVar::Address,
            dst_offset: 0x10,
        },
        set_u32(0x11, 1),
        ret(0x10, 0x11),
    ]);
    let result = run(bytecode, vec![], Gas::new(1_000_000, 1_000));
    assert!(!result.reverted);
    assert_eq!(result.output, vec![Fr::from_u64(CONTRACT)]);
}

#[test]
fn da_gas_left_saturates_at_u32_max() {
    // The da balance has no per-call clamp; a >u32 allocation must read
    // back as the U32 ceiling, not wrap.
    let bytecode = assemble(&[
        Instruction::GetEnvVar {
            addressing: Addressing::direct(),
            var: tavm_spec::EnvVar::DaGasLeft,
            dst_offset: 0x10,
        },
        set_u32(0x11, 1),
        ret(0x10, 0x11),
    ]);
    let result = run(bytecode, vec![], Gas::new(1_000_000, 10_000_000_000));
    assert!(!result.reverted, "reason: {:?}", result.revert_reason);
    assert_eq!(result.output, vec![Fr::from_u64(u32::MAX as u64)]);
}
