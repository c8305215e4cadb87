//! State-access facade: siloing, storage, nullifiers, contract lookup.
//!
//! The VM never touches trees directly; every key is siloed with the
//! executing contract's address first, so two contracts can use the same
//! storage slot or nullifier without colliding. Fork discipline also lives
//! here: nested calls snapshot the ephemeral layer and roll back on revert.

use crate::env::ExecutionEnvironment;
use crate::error::Result;
use std::collections::HashMap;
use tavm_spec::Fr;
use tavm_trees::{hash_pair, ContainerSnapshot, EphemeralTreeContainer, TreeStore};
use tracing::debug;

/// Deployment metadata served by GETCONTRACTINSTANCE.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractInstance {
    pub deployer: Fr,
    pub class_id: Fr,
    pub init_hash: Fr,
}

/// External collaborator resolving contract addresses to code and metadata.
pub trait BytecodeSource {
    fn get_bytecode(&self, address: &Fr) -> Option<Vec<u8>>;
    fn get_contract_instance(&self, address: &Fr) -> Option<ContractInstance>;
    /// Human-readable name of the function being executed, for revert
    /// diagnostics. Sources without symbol information return `None`.
    fn debug_function_name(&self, _env: &ExecutionEnvironment) -> Option<String> {
        None
    }
}

/// In-memory contract registry for tests and local simulation.
#[derive(Debug, Default)]
pub struct MapBytecodeSource {
    contracts: HashMap<Fr, (Vec<u8>, ContractInstance)>,
    debug_names: HashMap<Fr, String>,
}

impl MapBytecodeSource {
    pub fn new() -> Self {
        MapBytecodeSource::default()
    }

    pub fn register(&mut self, address: Fr, bytecode: Vec<u8>) {
        self.register_with_instance(address, bytecode, ContractInstance::default());
    }

    pub fn register_with_instance(
        &mut self,
        address: Fr,
        bytecode: Vec<u8>,
        instance: ContractInstance,
    ) {
        self.contracts.insert(address, (bytecode, instance));
    }

    pub fn register_debug_name(&mut self, address: Fr, name: impl Into<String>) {
        self.debug_names.insert(address, name.into());
    }
}

impl BytecodeSource for MapBytecodeSource {
    fn get_bytecode(&self, address: &Fr) -> Option<Vec<u8>> {
        self.contracts.get(address).map(|(code, _)| code.clone())
    }

    fn get_contract_instance(&self, address: &Fr) -> Option<ContractInstance> {
        self.contracts
            .get(address)
            .map(|(_, instance)| instance.clone())
    }

    fn debug_function_name(&self, env: &ExecutionEnvironment) -> Option<String> {
        self.debug_names.get(&env.address).cloned()
    }
}

/// Silo a raw key under a contract address.
pub fn silo_key(contract_address: &Fr, raw_key: &Fr) -> Fr {
    hash_pair(contract_address, raw_key)
}

/// World state for one top-level simulation: the ephemeral tree container
/// plus the bytecode collaborator.
pub struct WorldState<S: TreeStore, B: BytecodeSource> {
    trees: EphemeralTreeContainer<S>,
    bytecode: B,
}

impl<S: TreeStore, B: BytecodeSource> WorldState<S, B> {
    pub fn new(trees: EphemeralTreeContainer<S>, bytecode: B) -> Self {
        WorldState { trees, bytecode }
    }

    pub fn trees(&self) -> &EphemeralTreeContainer<S> {
        &self.trees
    }

    pub fn get_bytecode(&self, address: &Fr) -> Option<Vec<u8>> {
        self.bytecode.get_bytecode(address)
    }

    pub fn get_contract_instance(&self, address: &Fr) -> Option<ContractInstance> {
        self.bytecode.get_contract_instance(address)
    }

    pub fn debug_function_name(&self, env: &ExecutionEnvironment) -> Option<String> {
        self.bytecode.debug_function_name(env)
    }

    /// Read a storage slot for `contract`. Never-written slots read as zero.
    pub fn storage_read(&self, contract: &Fr, slot: &Fr) -> Result<Fr> {
        let siloed = silo_key(contract, slot);
        let value = self.trees.read_public_storage(&siloed)?;
        Ok(value.unwrap_or_else(Fr::zero))
    }

    pub fn storage_write(&mut self, contract: &Fr, slot: &Fr, value: &Fr) -> Result<()> {
        let siloed = silo_key(contract, slot);
        debug!(%contract, %slot, "storage write");
        self.trees.write_public_storage(&siloed, value)?;
        Ok(())
    }

    pub fn nullifier_exists(&self, contract: &Fr, nullifier: &Fr) -> Result<bool> {
        let siloed = silo_key(contract, nullifier);
        Ok(self.trees.nullifier_exists(&siloed)?)
    }

    pub fn emit_nullifier(&mut self, contract: &Fr, nullifier: &Fr) -> Result<()> {
        let siloed = silo_key(contract, nullifier);
        debug!(%contract, %nullifier, "emit nullifier");
        self.trees.append_nullifier(&siloed)?;
        Ok(())
    }

    /// Snapshot the ephemeral layer before a nested call.
    pub fn snapshot(&self) -> ContainerSnapshot {
        self.trees.snapshot()
    }

    /// Discard everything written since `snapshot` (child reverted).
    pub fn rollback(&mut self, snapshot: ContainerSnapshot) {
        self.trees.restore(snapshot);
    }
}
