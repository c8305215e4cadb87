//! Two-dimension gas model.
//!
//! Every instruction charges `l2` (compute) and `da` (data availability)
//! gas: a per-opcode base cost, a fixed overhead per indirect or relative
//! operand, and dynamic costs for size-dependent work. Out-of-gas in either
//! dimension is an exceptional halt that consumes all remaining gas in both.

use crate::error::AvmError;
use serde::{Deserialize, Serialize};
use tavm_spec::Opcode;

/// Compute cost per indirect or relative operand resolution.
pub const ADDRESSING_GAS_L2: u64 = 10;
/// Compute cost per word copied by CALLDATACOPY / RETURNDATACOPY and per
/// word returned or reverted.
pub const COPY_WORD_GAS_L2: u64 = 5;
/// Compute cost per decomposed limb in TORADIXBE.
pub const RADIX_LIMB_GAS_L2: u64 = 20;
/// DA cost per written field (32 bytes): SSTORE, EMITNULLIFIER.
pub const STATE_WRITE_GAS_DA: u64 = 512;
/// Upper bound on the compute gas a nested call may be allocated.
pub const MAX_L2_GAS_PER_TX_PUBLIC_PORTION: u64 = 12_000_000;

/// A gas amount or balance in both dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Gas {
    pub l2: u64,
    pub da: u64,
}

impl Gas {
    pub const ZERO: Gas = Gas { l2: 0, da: 0 };

    pub const fn new(l2: u64, da: u64) -> Self {
        Gas { l2, da }
    }

    pub fn add(self, rhs: Gas) -> Gas {
        Gas {
            l2: self.l2.saturating_add(rhs.l2),
            da: self.da.saturating_add(rhs.da),
        }
    }

    /// Subtract in both dimensions; `None` when either underflows.
    pub fn checked_sub(self, rhs: Gas) -> Option<Gas> {
        Some(Gas {
            l2: self.l2.checked_sub(rhs.l2)?,
            da: self.da.checked_sub(rhs.da)?,
        })
    }

    /// Component-wise minimum, for clamping child call allocations.
    pub fn min(self, rhs: Gas) -> Gas {
        Gas {
            l2: self.l2.min(rhs.l2),
            da: self.da.min(rhs.da),
        }
    }
}

/// Base cost of an opcode, before addressing overhead and dynamic parts.
pub fn base_cost(opcode: Opcode) -> Gas {
    use Opcode::*;
    let l2 = match opcode {
        Add8 | Add16 | Sub8 | Sub16 | Mul8 | Mul16 => 20,
        Div8 | Div16 | FDiv8 | FDiv16 => 40,
        Eq8 | Eq16 | Lt8 | Lt16 => 20,
        And8 | And16 | Or8 | Or16 | Xor8 | Xor16 | Not8 | Not16 => 25,
        Shl8 | Shl16 | Shr8 | Shr16 => 25,
        Jump32 | JumpI32 => 12,
        Return | Revert8 | Revert16 => 20,
        Set8 | Set16 | Set32 | Set64 | Set128 | SetFF => 25,
        Mov8 | Mov16 => 23,
        Cast8 | Cast16 => 30,
        CalldataCopy | ReturndataCopy => 30,
        ReturndataSize => 20,
        ToRadixBE => 45,
        GetEnvVar16 => 20,
        SLoad => 180,
        SStore => 180,
        NullifierExists => 260,
        EmitNullifier => 260,
        GetContractInstance => 300,
        Call | StaticCall => 450,
    };
    Gas { l2, da: 0 }
}

/// Gas bookkeeping for one execution context.
#[derive(Debug, Clone, Copy)]
pub struct GasMeter {
    left: Gas,
}

impl GasMeter {
    pub fn new(allocated: Gas) -> Self {
        GasMeter { left: allocated }
    }

    pub fn left(&self) -> Gas {
        self.left
    }

    /// Charge `amount`; on exhaustion in either dimension, zero the balance
    /// and report the out-of-gas halt.
    pub fn charge(&mut self, pc: u32, amount: Gas) -> Result<(), AvmError> {
        match self.left.checked_sub(amount) {
            Some(rest) => {
                self.left = rest;
                Ok(())
            }
            None => {
                let err = AvmError::OutOfGas {
                    pc,
                    l2_needed: amount.l2,
                    da_needed: amount.da,
                    l2_left: self.left.l2,
                    da_left: self.left.da,
                };
                self.left = Gas::ZERO;
                Err(err)
            }
        }
    }

    /// Return unspent gas to the balance (child call refund).
    pub fn refund(&mut self, amount: Gas) {
        self.left = self.left.add(amount);
    }

    /// Consume everything (exceptional halt).
    pub fn consume_all(&mut self) {
        self.left = Gas::ZERO;
    }
}
