//! Tagged memory: the per-call word-addressed cell store.
//!
//! Cells are sparse; reading an unset offset yields `Field(0)` and logs a
//! warning rather than failing. The tag travels with the value: a write
//! replaces both, and tag checks compare the stored tag against what the
//! instruction requires.

use crate::error::AvmError;
use std::collections::HashMap;
use tavm_spec::{Fr, IsaError, MemoryValue, OperandMode, TypeTag, MEMORY_SIZE};
use tracing::warn;

#[derive(Debug, Default)]
pub struct TaggedMemory {
    cells: HashMap<u32, MemoryValue>,
}

impl TaggedMemory {
    pub fn new() -> Self {
        TaggedMemory::default()
    }

    /// Read a cell. Unset cells read as `Field(0)`; this permissiveness is
    /// load-bearing, bytecode relies on it.
    pub fn get(&self, offset: u32) -> MemoryValue {
        match self.cells.get(&offset) {
            Some(value) => value.clone(),
            None => {
                warn!(offset, "read of unset memory cell, returning Field(0)");
                MemoryValue::Field(Fr::zero())
            }
        }
    }

    pub fn set(&mut self, offset: u32, value: MemoryValue) {
        self.cells.insert(offset, value);
    }

    /// Tag of a cell (`Field` for unset cells).
    pub fn tag(&self, offset: u32) -> TypeTag {
        self.cells
            .get(&offset)
            .map(|v| v.tag())
            .unwrap_or(TypeTag::Field)
    }

    /// Require a cell to carry `expected`.
    pub fn check_tag(&self, offset: u32, expected: TypeTag) -> Result<(), AvmError> {
        let actual = self.tag(offset);
        if actual == expected {
            Ok(())
        } else {
            Err(IsaError::TagMismatch { expected, actual }.into())
        }
    }

    /// Read a `U32`-tagged cell as a native `u32`.
    pub fn get_u32(&self, offset: u32) -> Result<u32, AvmError> {
        self.check_tag(offset, TypeTag::U32)?;
        // Tag checked: as_u32 cannot miss.
        Ok(self.get(offset).as_u32().unwrap_or(0))
    }

    /// Read `size` consecutive cells starting at `offset`.
    pub fn get_slice(&self, offset: u32, size: u32) -> Result<Vec<MemoryValue>, AvmError> {
        check_slice(offset, size)?;
        Ok((0..size).map(|i| self.get(offset + i)).collect())
    }

    /// Write consecutive cells starting at `offset`.
    pub fn set_slice(&mut self, offset: u32, values: &[MemoryValue]) -> Result<(), AvmError> {
        check_slice(offset, values.len() as u32)?;
        for (i, value) in values.iter().enumerate() {
            self.cells.insert(offset + i as u32, value.clone());
        }
        Ok(())
    }

    /// Apply an operand's addressing mode: relative adds the base stored at
    /// offset 0 (tag `U32`), indirect dereferences through a `U32` cell.
    pub fn resolve(&self, offset: u32, mode: OperandMode) -> Result<u32, AvmError> {
        let mut address = offset;
        if mode.relative {
            let base = self.get_u32(0)?;
            address = base
                .checked_add(offset)
                .ok_or(AvmError::RelativeAddressOverflow { base, offset })?;
        }
        if mode.indirect {
            address = self.get_u32(address)?;
        }
        Ok(address)
    }
}

fn check_slice(offset: u32, size: u32) -> Result<(), AvmError> {
    if offset as u64 + size as u64 > MEMORY_SIZE {
        return Err(AvmError::MemorySliceOutOfRange {
            offset: offset as u64,
            size: size as u64,
        });
    }
    Ok(())
}
