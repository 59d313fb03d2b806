//! Instruction execution engine.
//!
//! One [`Cpu::execute`] call is one fetch/decode/execute/retire transition.
//! Side effects are staged in a [`Commit`] and applied only after every
//! memory access succeeded, so a faulting instruction leaves the register
//! file and pc untouched.

use std::fmt;

use crate::api::DevicePort;
use crate::decoder::{Decoder, Instruction};
use crate::encoding::INSTRUCTION_STRIDE;
use crate::memory::Router;
use crate::state::{GeneralRegister, RegisterFile};
use crate::Fault;

/// Staged architectural effects of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    /// Register write, if the instruction produces one.
    pub register_write: Option<(GeneralRegister, u32)>,
    /// Program counter after retirement.
    pub next_pc: u32,
}

/// CPU core: sixteen general registers and a program counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cpu {
    registers: RegisterFile,
}

impl Cpu {
    /// Creates a core with every register and the pc at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes every register and the pc.
    pub fn reset(&mut self) {
        self.registers = RegisterFile::default();
    }

    /// Executes the instruction at pc.
    ///
    /// Returns the fetch address and the retired instruction.
    ///
    /// # Errors
    ///
    /// Any [`Fault`] raised by the fetch, decode, or a LOAD/STORE access. The
    /// register file and pc are unchanged on error.
    pub fn execute<P: DevicePort>(
        &mut self,
        router: &mut Router<P>,
    ) -> Result<(u32, Instruction), Fault> {
        let pc = self.registers.pc();
        let word = router.read32(pc)?;
        let instruction = Decoder::decode(word)?;
        let commit = execute_instruction(instruction, &self.registers, pc, router)?;
        self.commit(commit);
        Ok((pc, instruction))
    }

    fn commit(&mut self, commit: Commit) {
        if let Some((reg, value)) = commit.register_write {
            self.registers.set(reg, value);
        }
        self.registers.set_pc(commit.next_pc);
    }

    /// Reads a register by raw index.
    ///
    /// # Errors
    ///
    /// [`Fault::RegisterOutOfRange`] for `index >= 16`.
    pub fn register(&self, index: u8) -> Result<u32, Fault> {
        GeneralRegister::try_from(index).map(|reg| self.registers.get(reg))
    }

    /// Writes a register by raw index.
    ///
    /// # Errors
    ///
    /// [`Fault::RegisterOutOfRange`] for `index >= 16`.
    pub fn set_register(&mut self, index: u8, value: u32) -> Result<(), Fault> {
        let reg = GeneralRegister::try_from(index)?;
        self.registers.set(reg, value);
        Ok(())
    }

    /// Reads a register.
    #[must_use]
    pub const fn reg(&self, reg: GeneralRegister) -> u32 {
        self.registers.get(reg)
    }

    /// Writes a register.
    pub const fn set_reg(&mut self, reg: GeneralRegister, value: u32) {
        self.registers.set(reg, value);
    }

    /// Current program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.registers.pc()
    }

    /// Redirects the program counter.
    pub const fn set_pc(&mut self, value: u32) {
        self.registers.set_pc(value);
    }

    /// Full register file.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// 32-bit read through the router.
    ///
    /// # Errors
    ///
    /// Range and alignment faults from the router.
    pub fn read_memory<P: DevicePort>(&self, router: &Router<P>, address: u32) -> Result<u32, Fault> {
        router.read32(address)
    }

    /// 32-bit write through the router.
    ///
    /// # Errors
    ///
    /// Range and alignment faults from the router.
    pub fn write_memory<P: DevicePort>(
        &self,
        router: &mut Router<P>,
        address: u32,
        value: u32,
    ) -> Result<(), Fault> {
        router.write32(address, value)
    }

    /// Snapshot of the pc and every register.
    #[must_use]
    pub fn dump_registers(&self) -> RegisterDump {
        RegisterDump {
            pc: self.registers.pc(),
            general: *self.registers.general(),
        }
    }
}

/// Computes the effects of `instruction` fetched at `pc`.
///
/// STORE performs its memory write here; every other memory effect is a read.
///
/// # Errors
///
/// Range and alignment faults from LOAD/STORE accesses.
pub fn execute_instruction<P: DevicePort>(
    instruction: Instruction,
    registers: &RegisterFile,
    pc: u32,
    router: &mut Router<P>,
) -> Result<Commit, Fault> {
    let fallthrough = pc.wrapping_add(INSTRUCTION_STRIDE);
    let write = |reg, value| Commit {
        register_write: Some((reg, value)),
        next_pc: fallthrough,
    };

    let commit = match instruction {
        Instruction::Load { dst, base, offset } => {
            let address = registers.get(base).wrapping_add(u32::from(offset));
            write(dst, router.read32(address)?)
        }
        Instruction::Store { src, base, offset } => {
            let address = registers.get(base).wrapping_add(u32::from(offset));
            router.write32(address, registers.get(src))?;
            Commit {
                register_write: None,
                next_pc: fallthrough,
            }
        }
        Instruction::Add { dst, lhs, rhs } => {
            write(dst, registers.get(lhs).wrapping_add(registers.get(rhs)))
        }
        Instruction::Sub { dst, lhs, rhs } => {
            write(dst, registers.get(lhs).wrapping_sub(registers.get(rhs)))
        }
        Instruction::Mov { dst, src } => write(dst, registers.get(src)),
        Instruction::Jump { target } => Commit {
            register_write: None,
            next_pc: registers.get(target),
        },
        Instruction::BranchEq { lhs, rhs, offset } => {
            let displacement = if registers.get(lhs) == registers.get(rhs) {
                i32::from(offset) * 2
            } else {
                0
            };
            Commit {
                register_write: None,
                next_pc: pc
                    .wrapping_add_signed(displacement)
                    .wrapping_add(INSTRUCTION_STRIDE),
            }
        }
        Instruction::Nop => Commit {
            register_write: None,
            next_pc: fallthrough,
        },
    };
    Ok(commit)
}

/// Register snapshot for debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDump {
    /// Program counter.
    pub pc: u32,
    /// `a0..a15` in index order.
    pub general: [u32; crate::state::GENERAL_REGISTER_COUNT],
}

impl fmt::Display for RegisterDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "pc: {:#010x}", self.pc)?;
        for (row, values) in self.general.chunks(4).enumerate() {
            for (column, value) in values.iter().enumerate() {
                if column > 0 {
                    f.write_str("  ")?;
                }
                write!(f, "a{:<2} = {value:#010x}", row * 4 + column)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
