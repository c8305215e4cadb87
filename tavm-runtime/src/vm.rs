//! The simulator: fetch, charge, execute, repeat.
//!
//! One `AvmSimulator` drives one top-level public call against a forked
//! world state. Nested calls re-enter `execute_call` directly with an
//! explicit depth counter; a child runs to completion before the parent
//! resumes, and the parent's gas drops by exactly what the child consumed
//! regardless of how the child halted.

use crate::decode::DecodeCache;
use crate::env::ExecutionEnvironment;
use crate::error::AvmError;
use crate::execute::execute;
use crate::gas::{Gas, ADDRESSING_GAS_L2, MAX_L2_GAS_PER_TX_PUBLIC_PORTION};
use crate::memory::TaggedMemory;
use crate::profiler::Profiler;
use crate::state::{CallResult, MachineState, NestedCallRequest, StepResult};
use crate::world::{BytecodeSource, WorldState};
use tavm_spec::{Fr, MemoryValue};
use tavm_trees::TreeStore;
use tracing::{debug, trace};

/// Simulation limits. Callers construct this directly; there is no file or
/// environment configuration.
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Clamp on the compute gas any single call may be allocated.
    pub max_l2_gas_per_call: u64,
    /// Nested calls beyond this depth exceptional-halt the parent.
    pub max_nested_call_depth: u32,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_l2_gas_per_call: MAX_L2_GAS_PER_TX_PUBLIC_PORTION,
            max_nested_call_depth: 64,
        }
    }
}

pub struct AvmSimulator<'a, S: TreeStore, B: BytecodeSource> {
    world: &'a mut WorldState<S, B>,
    config: VmConfig,
    profiler: &'a mut dyn Profiler,
    /// Contract addresses of the active call chain, for halt reasons.
    call_stack: Vec<Fr>,
}

impl<'a, S: TreeStore, B: BytecodeSource> AvmSimulator<'a, S, B> {
    pub fn new(
        world: &'a mut WorldState<S, B>,
        config: VmConfig,
        profiler: &'a mut dyn Profiler,
    ) -> Self {
        AvmSimulator {
            world,
            config,
            profiler,
            call_stack: Vec::new(),
        }
    }

    /// Run a top-level public call to completion.
    pub fn execute(
        &mut self,
        env: ExecutionEnvironment,
        allocated: Gas,
    ) -> Result<CallResult, AvmError> {
        self.execute_call(env, allocated, 0)
    }

    /// Run one call (top-level or nested) to completion.
    ///
    /// Halts surface as a `CallResult`, never as `Err`; the only error is
    /// the empty-bytecode precondition.
    pub fn execute_call(
        &mut self,
        env: ExecutionEnvironment,
        allocated: Gas,
        depth: u32,
    ) -> Result<CallResult, AvmError> {
        let allocated = Gas {
            l2: allocated.l2.min(self.config.max_l2_gas_per_call),
            da: allocated.da,
        };

        let Some(bytecode) = self.world.get_bytecode(&env.address) else {
            // Revert-equivalent: all allocated gas consumed, nothing ran.
            debug!(address = %env.address, "missing bytecode");
            return Ok(CallResult::exceptional(
                AvmError::BytecodeNotFound(env.address.clone()).to_string(),
                0,
            ));
        };
        if bytecode.is_empty() {
            return Err(AvmError::EmptyBytecode);
        }

        self.call_stack.push(env.address.clone());
        let result = self.run_loop(&env, bytecode, allocated, depth);
        self.call_stack.pop();
        Ok(result)
    }

    fn run_loop(
        &mut self,
        env: &ExecutionEnvironment,
        bytecode: Vec<u8>,
        allocated: Gas,
        depth: u32,
    ) -> CallResult {
        let mut cache = DecodeCache::new(bytecode);
        let mut memory = TaggedMemory::new();
        let mut machine = MachineState::new(allocated);
        debug!(address = %env.address, depth, "call started");

        loop {
            let step = self.step(env, &mut cache, &mut memory, &mut machine, depth);
            match step {
                // step() resolves nested calls in place, so both variants
                // just advance.
                Ok(StepResult::Continue | StepResult::NestedCall(_)) => {
                    machine.pc = machine.next_pc;
                }
                Ok(StepResult::Return(output)) => {
                    debug!(address = %env.address, words = output.len(), "returned");
                    return CallResult::success(
                        output,
                        machine.gas.left(),
                        machine.instruction_count,
                    );
                }
                Ok(StepResult::Revert(output)) => {
                    debug!(address = %env.address, "reverted");
                    let reason = self.revert_reason(env, machine.pc);
                    return CallResult::reverted(
                        output,
                        machine.gas.left(),
                        Some(reason),
                        machine.instruction_count,
                    );
                }
                Err(err) => {
                    machine.gas.consume_all();
                    let reason = self.halt_reason(env, machine.pc, &err);
                    debug!(address = %env.address, %err, "exceptional halt");
                    return CallResult::exceptional(reason, machine.instruction_count);
                }
            }
        }
    }

    /// Fetch, charge, and execute one instruction. Nested calls recurse here.
    fn step(
        &mut self,
        env: &ExecutionEnvironment,
        cache: &mut DecodeCache,
        memory: &mut TaggedMemory,
        machine: &mut MachineState,
        depth: u32,
    ) -> Result<StepResult, AvmError> {
        let fetched = cache.fetch(machine.pc)?;
        let instruction = fetched.instruction;
        let opcode = instruction.opcode();
        if fetched.decoded {
            self.profiler.instruction_decoded(opcode);
        }
        trace!(pc = machine.pc, %opcode, "executing");

        // Base cost plus per-operand addressing overhead. Dynamic parts are
        // charged inside execute once operand sizes are known.
        let overhead = instruction
            .addressing()
            .overhead_reads(instruction.operand_count()) as u64;
        let cost = crate::gas::base_cost(opcode).add(Gas::new(overhead * ADDRESSING_GAS_L2, 0));
        machine.gas.charge(machine.pc, cost)?;

        machine.next_pc = machine.pc + fetched.size;
        let mut result = execute(&instruction, memory, machine, env, self.world)?;

        if let StepResult::NestedCall(request) = result {
            self.run_nested_call(env, memory, machine, depth, request)?;
            result = StepResult::Continue;
        }

        machine.instruction_count += 1;
        self.profiler.instruction_executed(opcode);
        Ok(result)
    }

    fn run_nested_call(
        &mut self,
        env: &ExecutionEnvironment,
        memory: &mut TaggedMemory,
        machine: &mut MachineState,
        depth: u32,
        request: NestedCallRequest,
    ) -> Result<(), AvmError> {
        if depth + 1 > self.config.max_nested_call_depth {
            return Err(AvmError::MaxCallDepthExceeded {
                depth: depth + 1,
                max: self.config.max_nested_call_depth,
            });
        }

        // The child may not be promised more than the parent has, nor more
        // compute than the per-call clamp.
        let requested = Gas {
            l2: request.allocation.l2.min(self.config.max_l2_gas_per_call),
            da: request.allocation.da,
        };
        let allocation = requested.min(machine.gas.left());
        machine.gas.charge(machine.pc, allocation)?;

        let child_env = env.nested(request.callee, request.calldata, request.is_static);
        self.profiler.call_started(depth + 1);
        let snapshot = self.world.snapshot();
        let child = self.execute_call(child_env, allocation, depth + 1)?;

        if child.reverted {
            self.world.rollback(snapshot);
        }
        // Refund what the child did not spend.
        let unspent = child.gas_left.min(allocation);
        machine.gas.refund(unspent);

        memory.set(request.success_dst, MemoryValue::U1(!child.reverted as u8));
        machine.returndata = child.output;
        Ok(())
    }

    fn halt_reason(&self, env: &ExecutionEnvironment, pc: u32, err: &AvmError) -> String {
        format!(
            "{} (contract {}, pc {}, call stack [{}])",
            err,
            env.address,
            pc,
            self.stacktrace()
        )
    }

    /// Diagnostics for a bytecode REVERT: the failing function (when the
    /// source has symbol information), its address, and the call stack.
    fn revert_reason(&self, env: &ExecutionEnvironment, pc: u32) -> String {
        let name = self
            .world
            .debug_function_name(env)
            .unwrap_or_else(|| env.address.to_string());
        format!(
            "Reverted in {} (contract {}, pc {}, call stack [{}])",
            name,
            env.address,
            pc,
            self.stacktrace()
        )
    }

    fn stacktrace(&self) -> String {
        let stack: Vec<String> = self.call_stack.iter().map(|a| a.to_string()).collect();
        stack.join(" -> ")
    }
}
