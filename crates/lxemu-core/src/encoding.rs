/// Primary opcodes carried in bits 3..0 of a fetched word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Opcode {
    Load = 0x0,
    Store = 0x1,
    Add = 0x2,
    Jump = 0x3,
    Nop = 0x4,
    Sub = 0x5,
    Mov = 0x6,
    BranchEq = 0x7,
}

/// Assigned opcode table with assembler mnemonics. Any nibble not listed is
/// illegal.
pub const OPCODE_TABLE: &[(u8, Opcode, &str)] = &[
    (0x0, Opcode::Load, "l32i"),
    (0x1, Opcode::Store, "s32i"),
    (0x2, Opcode::Add, "add"),
    (0x3, Opcode::Jump, "jx"),
    (0x4, Opcode::Nop, "nop"),
    (0x5, Opcode::Sub, "sub"),
    (0x6, Opcode::Mov, "mov"),
    (0x7, Opcode::BranchEq, "beq"),
];

/// Bytes the program counter advances past a retired instruction.
pub const INSTRUCTION_STRIDE: u32 = 2;

impl Opcode {
    /// Looks up an opcode value (`0..=7`).
    #[must_use]
    pub fn from_u4(op: u8) -> Option<Self> {
        OPCODE_TABLE
            .iter()
            .find(|(value, _, _)| *value == op)
            .map(|(_, opcode, _)| *opcode)
    }

    /// Assembler mnemonic.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        OPCODE_TABLE
            .iter()
            .find(|(_, opcode, _)| *opcode == self)
            .map_or("?", |(_, _, mnemonic)| mnemonic)
    }
}

/// Opcode nibble of a fetched word.
#[must_use]
pub const fn opcode_field(word: u32) -> u8 {
    (word & 0xF) as u8
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{opcode_field, Opcode, OPCODE_TABLE};

    #[test]
    fn table_values_are_unique_and_match_discriminants() {
        let mut seen = HashSet::new();
        for (value, opcode, _) in OPCODE_TABLE {
            assert!(seen.insert(*value), "duplicate opcode {value}");
            assert_eq!(*opcode as u8, *value);
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn values_above_seven_are_unassigned() {
        for op in 8..=0xF {
            assert_eq!(Opcode::from_u4(op), None);
        }
    }

    #[test]
    fn every_table_entry_resolves_and_names_itself() {
        for (value, opcode, mnemonic) in OPCODE_TABLE {
            assert_eq!(Opcode::from_u4(*value), Some(*opcode));
            assert_eq!(opcode.mnemonic(), *mnemonic);
        }
    }

    #[test]
    fn opcode_field_is_low_nibble() {
        assert_eq!(opcode_field(0x1234_5677), 7);
        assert_eq!(opcode_field(0xFFFF_FFF8), 8);
    }
}
