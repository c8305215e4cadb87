//! TAVM runtime: tagged memory, gas metering, and the execution loop.
//!
//! The entry point is [`vm::AvmSimulator`]: construct a
//! [`world::WorldState`] (forked trees plus a bytecode source), an
//! [`env::ExecutionEnvironment`], and a gas allocation, then run a call to
//! completion. All halts, successful or not, surface as a
//! [`state::CallResult`].

pub mod decode;
pub mod env;
pub mod error;
pub mod execute;
pub mod gas;
pub mod memory;
pub mod profiler;
pub mod state;
pub mod vm;
pub mod world;

pub use env::{ExecutionEnvironment, GlobalVariables};
pub use error::AvmError;
pub use gas::{Gas, GasMeter, MAX_L2_GAS_PER_TX_PUBLIC_PORTION};
pub use memory::TaggedMemory;
pub use profiler::{NoopProfiler, OpcodeTally, Profiler};
pub use state::{CallResult, MachineState, StepResult};
pub use vm::{AvmSimulator, VmConfig};
pub use world::{BytecodeSource, ContractInstance, MapBytecodeSource, WorldState};
