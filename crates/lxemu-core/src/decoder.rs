//! Narrow-instruction decoder.
//!
//! Every operand is a fixed 4-bit window of the fetched word, so decoded
//! register fields can never be out of range. LOAD/STORE and BRANCH_EQ carry
//! an 8-bit immediate in bits 11..4 that shares its high nibble with the
//! register field in bits 11..8; both views are kept.

use std::fmt;

use crate::encoding::{opcode_field, Opcode};
use crate::state::GeneralRegister;
use crate::Fault;

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Instruction {
    /// `dst <- mem32[base + offset]`.
    Load {
        /// Destination, bits 11..8.
        dst: GeneralRegister,
        /// Address base, bits 15..12.
        base: GeneralRegister,
        /// Unsigned byte offset, bits 11..4.
        offset: u8,
    },
    /// `mem32[base + offset] <- src`.
    Store {
        /// Value source, bits 11..8.
        src: GeneralRegister,
        /// Address base, bits 15..12.
        base: GeneralRegister,
        /// Unsigned byte offset, bits 11..4.
        offset: u8,
    },
    /// `dst <- lhs + rhs` (wrapping).
    Add {
        /// Destination, bits 11..8.
        dst: GeneralRegister,
        /// First operand, bits 15..12.
        lhs: GeneralRegister,
        /// Second operand, bits 7..4.
        rhs: GeneralRegister,
    },
    /// `dst <- lhs - rhs` (wrapping).
    Sub {
        /// Destination, bits 11..8.
        dst: GeneralRegister,
        /// Minuend, bits 15..12.
        lhs: GeneralRegister,
        /// Subtrahend, bits 7..4.
        rhs: GeneralRegister,
    },
    /// `dst <- src`.
    Mov {
        /// Destination, bits 11..8.
        dst: GeneralRegister,
        /// Source, bits 15..12.
        src: GeneralRegister,
    },
    /// `pc <- target`, with no trailing advance.
    Jump {
        /// Register holding the absolute target, bits 11..8.
        target: GeneralRegister,
    },
    /// `if lhs == rhs { pc += offset * 2 }`, then `pc += 2` unconditionally.
    BranchEq {
        /// First operand, bits 11..8.
        lhs: GeneralRegister,
        /// Second operand, bits 15..12.
        rhs: GeneralRegister,
        /// Signed displacement in 2-byte units, bits 11..4.
        offset: i8,
    },
    /// No operation.
    Nop,
}

impl Instruction {
    /// Opcode this instruction was decoded from.
    #[must_use]
    pub const fn opcode(self) -> Opcode {
        match self {
            Self::Load { .. } => Opcode::Load,
            Self::Store { .. } => Opcode::Store,
            Self::Add { .. } => Opcode::Add,
            Self::Sub { .. } => Opcode::Sub,
            Self::Mov { .. } => Opcode::Mov,
            Self::Jump { .. } => Opcode::Jump,
            Self::BranchEq { .. } => Opcode::BranchEq,
            Self::Nop => Opcode::Nop,
        }
    }

    /// Packs the instruction into a word.
    ///
    /// Fields that share bits are OR-ed together, so the word decodes back to
    /// `self` only when the register in bits 11..8 equals the high nibble of
    /// the immediate.
    #[must_use]
    pub fn encode(self) -> u32 {
        let op = u32::from(self.opcode() as u8);
        let reg = |r: GeneralRegister, shift: u32| u32::from(r as u8) << shift;
        match self {
            Self::Load { dst, base, offset } => {
                op | (u32::from(offset) << 4) | reg(dst, 8) | reg(base, 12)
            }
            Self::Store { src, base, offset } => {
                op | (u32::from(offset) << 4) | reg(src, 8) | reg(base, 12)
            }
            Self::Add { dst, lhs, rhs } | Self::Sub { dst, lhs, rhs } => {
                op | reg(rhs, 4) | reg(dst, 8) | reg(lhs, 12)
            }
            Self::Mov { dst, src } => op | reg(dst, 8) | reg(src, 12),
            Self::Jump { target } => op | reg(target, 8),
            Self::BranchEq { lhs, rhs, offset } => {
                op | (u32::from(offset.to_le_bytes()[0]) << 4) | reg(lhs, 8) | reg(rhs, 12)
            }
            Self::Nop => op,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.opcode().mnemonic();
        match *self {
            Self::Load { dst, base, offset } => write!(f, "{mnemonic} {dst}, {base}, {offset}"),
            Self::Store { src, base, offset } => write!(f, "{mnemonic} {src}, {base}, {offset}"),
            Self::Add { dst, lhs, rhs } | Self::Sub { dst, lhs, rhs } => {
                write!(f, "{mnemonic} {dst}, {lhs}, {rhs}")
            }
            Self::Mov { dst, src } => write!(f, "{mnemonic} {dst}, {src}"),
            Self::Jump { target } => write!(f, "{mnemonic} {target}"),
            Self::BranchEq { lhs, rhs, offset } => write!(f, "{mnemonic} {lhs}, {rhs}, {offset}"),
            Self::Nop => f.write_str(mnemonic),
        }
    }
}

/// Stateless instruction decoder.
pub struct Decoder;

impl Decoder {
    /// Decodes a fetched word. Bits above 15 are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnknownOpcode`] when the opcode nibble is above 7.
    #[allow(clippy::similar_names)]
    pub fn decode(word: u32) -> Result<Instruction, Fault> {
        let op = opcode_field(word);
        let Some(opcode) = Opcode::from_u4(op) else {
            return Err(Fault::UnknownOpcode { opcode: op, word });
        };

        let r4 = GeneralRegister::from_nibble(word >> 4);
        let r8 = GeneralRegister::from_nibble(word >> 8);
        let r12 = GeneralRegister::from_nibble(word >> 12);
        let imm8 = ((word >> 4) & 0xFF) as u8;

        Ok(match opcode {
            Opcode::Load => Instruction::Load {
                dst: r8,
                base: r12,
                offset: imm8,
            },
            Opcode::Store => Instruction::Store {
                src: r8,
                base: r12,
                offset: imm8,
            },
            Opcode::Add => Instruction::Add {
                dst: r8,
                lhs: r12,
                rhs: r4,
            },
            Opcode::Sub => Instruction::Sub {
                dst: r8,
                lhs: r12,
                rhs: r4,
            },
            Opcode::Mov => Instruction::Mov { dst: r8, src: r12 },
            Opcode::Jump => Instruction::Jump { target: r8 },
            Opcode::BranchEq => Instruction::BranchEq {
                lhs: r8,
                rhs: r12,
                offset: i8::from_le_bytes([imm8]),
            },
            Opcode::Nop => Instruction::Nop,
        })
    }
}
