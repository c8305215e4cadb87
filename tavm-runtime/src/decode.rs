//! Per-context instruction decode cache.
//!
//! Bytecode is immutable for the lifetime of a call, so each `pc` decodes to
//! the same instruction every time. Loop bodies hit the cache instead of
//! re-parsing.

use crate::error::AvmError;
use std::collections::HashMap;
use tavm_spec::Instruction;

pub struct DecodeCache {
    bytecode: Vec<u8>,
    entries: HashMap<u32, (Instruction, u32)>,
}

/// A fetched instruction: the decoded form, its byte length, and whether
/// this fetch decoded it fresh (for profiling).
pub struct Fetched {
    pub instruction: Instruction,
    pub size: u32,
    pub decoded: bool,
}

impl DecodeCache {
    pub fn new(bytecode: Vec<u8>) -> Self {
        DecodeCache {
            bytecode,
            entries: HashMap::new(),
        }
    }

    pub fn bytecode_len(&self) -> usize {
        self.bytecode.len()
    }

    /// Decode (or recall) the instruction at `pc`.
    pub fn fetch(&mut self, pc: u32) -> Result<Fetched, AvmError> {
        if pc as usize >= self.bytecode.len() {
            return Err(AvmError::InvalidProgramCounter {
                pc,
                bytecode_size: self.bytecode.len(),
            });
        }
        if let Some((instruction, size)) = self.entries.get(&pc) {
            return Ok(Fetched {
                instruction: instruction.clone(),
                size: *size,
                decoded: false,
            });
        }
        let (instruction, size) = Instruction::deserialize(&self.bytecode, pc as usize)?;
        let size = size as u32;
        self.entries.insert(pc, (instruction.clone(), size));
        Ok(Fetched {
            instruction,
            size,
            decoded: true,
        })
    }
}
