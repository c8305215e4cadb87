//! Profiling hooks for simulation diagnostics.

use std::collections::HashMap;
use tavm_spec::Opcode;

/// Injected into the simulator; every hook has a no-op default so
/// implementations opt into what they track.
pub trait Profiler {
    /// An instruction finished executing.
    fn instruction_executed(&mut self, _opcode: Opcode) {}
    /// A pc was decoded fresh (cache miss).
    fn instruction_decoded(&mut self, _opcode: Opcode) {}
    /// A nested call is about to run at `depth`.
    fn call_started(&mut self, _depth: u32) {}
}

/// The default profiler: tracks nothing.
#[derive(Debug, Default)]
pub struct NoopProfiler;

impl Profiler for NoopProfiler {}

/// Per-opcode execution and decode tallies.
#[derive(Debug, Default)]
pub struct OpcodeTally {
    pub executed: HashMap<Opcode, u64>,
    pub decodes: u64,
    pub calls: u64,
}

impl Profiler for OpcodeTally {
    fn instruction_executed(&mut self, opcode: Opcode) {
        *self.executed.entry(opcode).or_insert(0) += 1;
    }

    fn instruction_decoded(&mut self, _opcode: Opcode) {
        self.decodes += 1;
    }

    fn call_started(&mut self, _depth: u32) {
        self.calls += 1;
    }
}
