//! Operand addressing modes.
//!
//! Every instruction carries a 16-bit addressing field after the opcode byte:
//! two bits per operand (up to eight operands), big-endian on the wire.
//! Bit 0 of a pair marks the operand indirect, bit 1 marks it relative.
//! Resolution itself happens in the runtime against tagged memory; this type
//! only owns the bitset.

use serde::{Deserialize, Serialize};

/// Addressing mode of a single operand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperandMode {
    /// The value stored at the offset is itself a U32 address to follow.
    pub indirect: bool,
    /// The offset is added to the base address stored at memory slot 0.
    pub relative: bool,
}

impl OperandMode {
    pub const DIRECT: OperandMode = OperandMode {
        indirect: false,
        relative: false,
    };
    pub const INDIRECT: OperandMode = OperandMode {
        indirect: true,
        relative: false,
    };
    pub const RELATIVE: OperandMode = OperandMode {
        indirect: false,
        relative: true,
    };
    pub const INDIRECT_RELATIVE: OperandMode = OperandMode {
        indirect: true,
        relative: true,
    };

    #[inline]
    pub fn is_direct(self) -> bool {
        !self.indirect && !self.relative
    }
}

/// Per-instruction addressing bitset, one `OperandMode` per operand slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Addressing(u16);

impl Addressing {
    /// All operands direct.
    pub const fn direct() -> Self {
        Addressing(0)
    }

    pub const fn from_wire(bits: u16) -> Self {
        Addressing(bits)
    }

    pub const fn to_wire(self) -> u16 {
        self.0
    }

    /// Build from an explicit mode list (operand order).
    pub fn from_modes(modes: &[OperandMode]) -> Self {
        debug_assert!(modes.len() <= 8);
        let mut bits = 0u16;
        for (i, mode) in modes.iter().enumerate() {
            if mode.indirect {
                bits |= 1 << (2 * i);
            }
            if mode.relative {
                bits |= 1 << (2 * i + 1);
            }
        }
        Addressing(bits)
    }

    /// Mode of the `operand`-th operand.
    #[inline]
    pub fn mode(self, operand: usize) -> OperandMode {
        debug_assert!(operand < 8);
        OperandMode {
            indirect: self.0 & (1 << (2 * operand)) != 0,
            relative: self.0 & (1 << (2 * operand + 1)) != 0,
        }
    }

    /// Number of operand slots whose mode requires an extra memory read
    /// (indirect and relative each count one). Drives addressing gas.
    pub fn overhead_reads(self, num_operands: usize) -> u32 {
        let mut count = 0;
        for i in 0..num_operands.min(8) {
            let mode = self.mode(i);
            count += mode.indirect as u32 + mode.relative as u32;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_round_trip() {
        let a = Addressing::from_modes(&[
            OperandMode::INDIRECT,
            OperandMode::DIRECT,
            OperandMode::RELATIVE,
            OperandMode::INDIRECT_RELATIVE,
        ]);
        let b = Addressing::from_wire(a.to_wire());
        assert_eq!(a, b);
        assert_eq!(b.mode(0), OperandMode::INDIRECT);
        assert_eq!(b.mode(1), OperandMode::DIRECT);
        assert_eq!(b.mode(2), OperandMode::RELATIVE);
        assert_eq!(b.mode(3), OperandMode::INDIRECT_RELATIVE);
        assert_eq!(b.mode(4), OperandMode::DIRECT);
    }

    #[test]
    fn test_overhead_reads() {
        let a = Addressing::from_modes(&[
            OperandMode::INDIRECT,
            OperandMode::INDIRECT_RELATIVE,
            OperandMode::DIRECT,
        ]);
        // 1 + 2 + 0
        assert_eq!(a.overhead_reads(3), 3);
        assert_eq!(Addressing::direct().overhead_reads(8), 0);
    }
}
