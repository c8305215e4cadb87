//! Execution environment: the per-call inputs a transaction-processing
//! collaborator constructs before handing control to the simulator.

use tavm_spec::Fr;

/// Block-level context shared by every call in a simulation.
#[derive(Debug, Clone, Default)]
pub struct GlobalVariables {
    pub chain_id: Fr,
    pub version: Fr,
    pub block_number: u32,
    pub timestamp: u64,
    pub base_fee_per_l2_gas: Fr,
    pub base_fee_per_da_gas: Fr,
}

/// Per-call context: who is executing, on whose behalf, with what data.
#[derive(Debug, Clone, Default)]
pub struct ExecutionEnvironment {
    /// Contract being executed.
    pub address: Fr,
    /// Caller address (the parent contract for nested calls).
    pub sender: Fr,
    /// Fee already charged for the enclosing transaction.
    pub transaction_fee: Fr,
    /// Static contexts reject state mutation.
    pub is_static: bool,
    pub calldata: Vec<Fr>,
    pub globals: GlobalVariables,
}

impl ExecutionEnvironment {
    /// Derive a nested-call environment: callee address, this contract as
    /// sender, fresh calldata, staticness inherited (or forced for
    /// STATICCALL).
    pub fn nested(&self, callee: Fr, calldata: Vec<Fr>, force_static: bool) -> Self {
        ExecutionEnvironment {
            sender: self.address.clone(),
            address: callee,
            transaction_fee: self.transaction_fee.clone(),
            is_static: self.is_static || force_static,
            calldata,
            globals: self.globals.clone(),
        }
    }
}
