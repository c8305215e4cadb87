//! Machine state and call results.

use crate::gas::{Gas, GasMeter};
use tavm_spec::Fr;

/// What an executed instruction tells the loop to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Continue,
    /// Normal halt with output fields.
    Return(Vec<Fr>),
    /// Reverting halt with the failure payload.
    Revert(Vec<Fr>),
    /// A nested call, operands already resolved; the simulator recurses.
    NestedCall(NestedCallRequest),
}

/// Resolved CALL / STATICCALL operands, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedCallRequest {
    pub callee: Fr,
    pub allocation: Gas,
    pub calldata: Vec<Fr>,
    pub success_dst: u32,
    pub is_static: bool,
}

/// Mutable per-call machine state: program counter, gas, nested-call
/// returndata.
#[derive(Debug)]
pub struct MachineState {
    pub pc: u32,
    /// Where the loop goes after this instruction; jumps overwrite it.
    pub next_pc: u32,
    pub gas: GasMeter,
    pub instruction_count: u64,
    /// Output of the most recent nested call, served by RETURNDATASIZE and
    /// RETURNDATACOPY.
    pub returndata: Vec<Fr>,
}

impl MachineState {
    pub fn new(allocated: Gas) -> Self {
        MachineState {
            pc: 0,
            next_pc: 0,
            gas: GasMeter::new(allocated),
            instruction_count: 0,
            returndata: Vec::new(),
        }
    }
}

/// Result of one call (top-level or nested), returned once halted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    pub reverted: bool,
    pub output: Vec<Fr>,
    pub gas_left: Gas,
    /// Human-readable halt reason; `None` on success. Exceptional halts name
    /// the failing instruction; bytecode reverts name the failing function.
    /// Both carry the contract address and call stack.
    pub revert_reason: Option<String>,
    pub instruction_count: u64,
}

impl CallResult {
    pub fn success(output: Vec<Fr>, gas_left: Gas, instruction_count: u64) -> Self {
        CallResult {
            reverted: false,
            output,
            gas_left,
            revert_reason: None,
            instruction_count,
        }
    }

    pub fn reverted(
        output: Vec<Fr>,
        gas_left: Gas,
        reason: Option<String>,
        instruction_count: u64,
    ) -> Self {
        CallResult {
            reverted: true,
            output,
            gas_left,
            revert_reason: reason,
            instruction_count,
        }
    }

    /// Exceptional halt: all gas consumed, no output.
    pub fn exceptional(reason: String, instruction_count: u64) -> Self {
        CallResult {
            reverted: true,
            output: Vec::new(),
            gas_left: Gas::ZERO,
            revert_reason: Some(reason),
            instruction_count,
        }
    }
}
