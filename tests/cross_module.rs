//! Nested-call semantics: fork discipline, static propagation, gas flow.

use tavm_runtime::{
    AvmSimulator, CallResult, ExecutionEnvironment, Gas, MapBytecodeSource, NoopProfiler,
    VmConfig, WorldState,
};
use tavm_spec::{Addressing, Fr, Instruction, OperandWidth, SetWidth, TypeTag};
use tavm_trees::{EphemeralTreeContainer, MemoryTreeStore};

const PARENT: u64 = 0xAA;
const CHILD: u64 = 0xBB;

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

fn set_ff(dst: u32, value: u64) -> Instruction {
    Instruction::Set {
        width: SetWidth::FF,
        addressing: Addressing::direct(),
        dst_offset: dst,
        tag: TypeTag::Field,
        value: Fr::from_u64(value),
    }
}

fn ret(offset: u32, size_cell: u32) -> Instruction {
    Instruction::Return {
        addressing: Addressing::direct(),
        ret_offset: offset,
        ret_size_offset: size_cell,
    }
}

fn call(is_static: bool) -> Instruction {
    Instruction::Call {
        addressing: Addressing::direct(),
        is_static,
        l2_gas_offset: 0x01,
        da_gas_offset: 0x02,
        addr_offset: 0x03,
        args_offset: 0x30,
        args_size_offset: 0x04,
        success_dst_offset: 0x05,
    }
}

/// Parent prologue: gas cells, callee address, empty args.
fn call_prologue() -> Vec<Instruction> {
    vec![
        set_u32(0x01, 200_000),
        set_u32(0x02, 5_000),
        set_ff(0x03, CHILD),
        set_u32(0x04, 0),
    ]
}

/// Parent epilogue after the call: copy one returndata word next to the
/// success flag and return both.
fn call_epilogue() -> Vec<Instruction> {
    vec![
        // Lift the U1 success flag into a field cell at 0x1F.
        Instruction::Cast {
            width: OperandWidth::U16,
            addressing: Addressing::direct(),
            a_offset: 0x05,
            dst_offset: 0x1F,
            dst_tag: TypeTag::Field,
        },
        set_u32(0x06, 0),
        set_u32(0x07, 1),
        Instruction::ReturndataCopy {
            addressing: Addressing::direct(),
            rd_start_offset: 0x06,
            copy_size_offset: 0x07,
            dst_offset: 0x20,
        },
        set_u32(0x08, 2),
        ret(0x1F, 0x08),
    ]
}

fn run_pair(
    parent: Vec<Instruction>,
    child: Vec<Instruction>,
) -> (CallResult, WorldState<MemoryTreeStore, MapBytecodeSource>) {
    let mut source = MapBytecodeSource::new();
    source.register(Fr::from_u64(PARENT), assemble(&parent));
    source.register(Fr::from_u64(CHILD), assemble(&child));
    let trees = EphemeralTreeContainer::fork(MemoryTreeStore::new(10)).unwrap();
    let mut world = WorldState::new(trees, source);
    let env = ExecutionEnvironment {
        address: Fr::from_u64(PARENT),
        ..Default::default()
    };
    let mut profiler = NoopProfiler;
    let result = {
        let mut sim = AvmSimulator::new(&mut world, VmConfig::default(), &mut profiler);
        sim.execute(env, Gas::new(1_000_000, 20_000)).unwrap()
    };
    (result, world)
}

fn sstore(src: u32, slot: u32) -> Instruction {
    Instruction::SStore {
        addressing: Addressing::direct(),
        src_offset: src,
        slot_offset: slot,
    }
}

#[test]
fn successful_child_write_persists_and_returndata_flows_back() {
    // Child writes slot 5 := 7 and returns [99].
    let child = vec![
        set_ff(0x10, 7),
        set_ff(0x11, 5),
        sstore(0x10, 0x11),
        set_ff(0x20, 99),
        set_u32(0x21, 1),
        ret(0x20, 0x21),
    ];
    let mut parent = call_prologue();
    parent.push(call(false));
    parent.extend(call_epilogue());

    let (result, world) = run_pair(parent, child);
    assert!(!result.reverted, "reason: {:?}", result.revert_reason);
    // [success flag, first returndata word]
    assert_eq!(result.output, vec![Fr::one(), Fr::from_u64(99)]);
    // The child's write survives in the child's own siloed storage.
    assert_eq!(
        world
            .storage_read(&Fr::from_u64(CHILD), &Fr::from_u64(5))
            .unwrap(),
        Fr::from_u64(7)
    );
}

#[test]
fn reverting_child_rolls_back_and_parent_continues() {
    // Child writes slot 5 := 7 then reverts with empty output.
    let child = vec![
        set_ff(0x10, 7),
        set_ff(0x11, 5),
        sstore(0x10, 0x11),
        set_u32(0x12, 0),
        Instruction::Revert {
            width: OperandWidth::U16,
            addressing: Addressing::direct(),
            ret_offset: 0,
            ret_size_offset: 0x12,
        },
    ];
    let mut parent = call_prologue();
    parent.push(call(false));
    parent.extend(vec![
        Instruction::Cast {
            width: OperandWidth::U16,
            addressing: Addressing::direct(),
            a_offset: 0x05,
            dst_offset: 0x1F,
            dst_tag: TypeTag::Field,
        },
        set_u32(0x08, 1),
        ret(0x1F, 0x08),
    ]);

    let (result, world) = run_pair(parent, child);
    // The parent completes normally with the failure flag.
    assert!(!result.reverted, "reason: {:?}", result.revert_reason);
    assert_eq!(result.output, vec![Fr::zero()]);
    // The child's storage write was rolled back.
    assert_eq!(
        world
            .storage_read(&Fr::from_u64(CHILD), &Fr::from_u64(5))
            .unwrap(),
        Fr::zero()
    );
}

#[test]
fn static_call_blocks_child_state_writes() {
    // Same writing child, but invoked statically: the SSTORE is an
    // exceptional halt inside the child only.
    let child = vec![set_ff(0x10, 7), set_ff(0x11, 5), sstore(0x10, 0x11)];
    let mut parent = call_prologue();
    parent.push(call(true));
    parent.extend(vec![
        Instruction::Cast {
            width: OperandWidth::U16,
            addressing: Addressing::direct(),
            a_offset: 0x05,
            dst_offset: 0x1F,
            dst_tag: TypeTag::Field,
        },
        set_u32(0x08, 1),
        ret(0x1F, 0x08),
    ]);

    let (result, world) = run_pair(parent, child);
    assert!(!result.reverted, "reason: {:?}", result.revert_reason);
    assert_eq!(result.output, vec![Fr::zero()]);
    assert_eq!(
        world
            .storage_read(&Fr::from_u64(CHILD), &Fr::from_u64(5))
            .unwrap(),
        Fr::zero()
    );
}

#[test]
fn child_gas_is_charged_and_unspent_gas_refunded() {
    // Child: one SET (25) + RETURN (20) = 45 l2 of its 200k allocation.
    let child = vec![set_u32(0x21, 0), ret(0, 0x21)];
    let mut parent = call_prologue();
    parent.push(call(false));
    parent.extend(vec![set_u32(0x08, 0), ret(0, 0x08)]);

    let (result, _) = run_pair(parent, child);
    assert!(!result.reverted, "reason: {:?}", result.revert_reason);
    // If the full 200k allocation had been kept, less than 800k would
    // remain; a refund leaves the total down by only what was consumed.
    assert!(
        result.gas_left.l2 > 990_000,
        "unspent child gas not refunded: {:?}",
        result.gas_left
    );
    assert!(result.gas_left.l2 < 1_000_000);
}

#[test]
fn call_depth_limit_halts_the_caller() {
    // Self-recursive contract with no base case; the depth clamp stops it.
    let recurse = vec![
        set_u32(0x01, 100_000),
        set_u32(0x02, 1_000),
        set_ff(0x03, PARENT),
        set_u32(0x04, 0),
        Instruction::Call {
            addressing: Addressing::direct(),
            is_static: false,
            l2_gas_offset: 0x01,
            da_gas_offset: 0x02,
            addr_offset: 0x03,
            args_offset: 0x30,
            args_size_offset: 0x04,
            success_dst_offset: 0x05,
        },
        set_u32(0x08, 0),
        ret(0, 0x08),
    ];
    let mut source = MapBytecodeSource::new();
    source.register(Fr::from_u64(PARENT), assemble(&recurse));
    let trees = EphemeralTreeContainer::fork(MemoryTreeStore::new(10)).unwrap();
    let mut world = WorldState::new(trees, source);
    let env = ExecutionEnvironment {
        address: Fr::from_u64(PARENT),
        ..Default::default()
    };
    let config = VmConfig {
        max_nested_call_depth: 3,
        ..Default::default()
    };
    let mut profiler = NoopProfiler;
    let mut sim = AvmSimulator::new(&mut world, config, &mut profiler);
    let result = sim.execute(env, Gas::new(10_000_000, 100_000)).unwrap();
    // The frame at the limit halts exceptionally; every ancestor sees a
    // failed call, and the top-level frame still returns.
    assert!(!result.reverted, "reason: {:?}", result.revert_reason);
}

#[test]
fn calling_unknown_contract_sets_failure_flag() {
    // Address cell 0x03 points at nothing in the registry.
    let mut parent = vec![
        set_u32(0x01, 100_000),
        set_u32(0x02, 1_000),
        set_ff(0x03, 0xDEAD),
        set_u32(0x04, 0),
        call(false),
    ];
    parent.extend(vec![
        Instruction::Cast {
            width: OperandWidth::U16,
            addressing: Addressing::direct(),
            a_offset: 0x05,
            dst_offset: 0x1F,
            dst_tag: TypeTag::Field,
        },
        set_u32(0x08, 1),
        ret(0x1F, 0x08),
    ]);

    let (result, _) = run_pair(parent, vec![ret(0, 0)]);
    assert!(!result.reverted, "reason: {:?}", result.revert_reason);
    assert_eq!(result.output, vec![Fr::zero()]);
}

#[test]
fn nested_sender_is_the_caller() {
    use tavm_spec::EnvVar;
    // Child returns its SENDER env var; must equal the parent address.
    let child = vec![
        Instruction::GetEnvVar {
            addressing: Addressing::direct(),
            var: EnvVar::Sender,
            dst_offset: 0x20,
        },
        set_u32(0x21, 1),
        ret(0x20, 0x21),
    ];
    let mut parent = call_prologue();
    parent.push(call(false));
    parent.extend(call_epilogue());

    let (result, _) = run_pair(parent, child);
    assert!(!result.reverted, "reason: {:?}", result.revert_reason);
    assert_eq!(result.output, vec![Fr::one(), Fr::from_u64(PARENT)]);
}
