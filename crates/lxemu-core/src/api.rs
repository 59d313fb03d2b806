//! Host-facing configuration, outcome types, and the device-port contract.

use crate::decoder::Instruction;
use crate::memory::map::{MemoryMap, RAM_BASE};
use crate::Fault;

/// Top-level configuration for an emulator instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EmulatorConfig {
    /// Layout of RAM and device space.
    pub memory_map: MemoryMap,
    /// Address firmware is copied to; also the entry point.
    pub load_address: u32,
    /// Stops the run loop cleanly after this many cycles.
    pub max_cycles: Option<u64>,
    /// Emits a `trace` record for every retired instruction.
    pub trace_instructions: bool,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            memory_map: MemoryMap::default(),
            load_address: RAM_BASE,
            max_cycles: None,
            trace_instructions: false,
        }
    }
}

/// Width-specific hooks the router forwards device-space accesses to.
///
/// Addresses are absolute; the implementor decides which device (if any)
/// owns them. Unclaimed reads return zero and unclaimed writes are dropped.
pub trait DevicePort {
    /// Reads a byte from device space.
    fn read8(&self, address: u32) -> u8;
    /// Reads a half-word from device space.
    fn read16(&self, address: u32) -> u16;
    /// Reads a word from device space.
    fn read32(&self, address: u32) -> u32;
    /// Writes a byte to device space.
    fn write8(&mut self, address: u32, value: u8);
    /// Writes a half-word to device space.
    fn write16(&mut self, address: u32, value: u16);
    /// Writes a word to device space.
    fn write32(&mut self, address: u32, value: u32);
}

/// Result of one run-loop step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The loop was not running; nothing happened.
    Idle,
    /// One instruction retired and every device was updated.
    Retired {
        /// Address the instruction was fetched from.
        pc: u32,
        /// Decoded instruction.
        instruction: Instruction,
    },
    /// The step faulted and the loop stopped.
    Faulted {
        /// Fault raised during fetch, decode, or execute.
        cause: Fault,
        /// Cycle count at the time of the fault (not incremented).
        cycle: u64,
    },
}

/// Aggregated result of [`crate::Emulator::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Total completed cycles when the loop stopped.
    pub cycles: u64,
    /// Fault that ended the run, when it did not stop cleanly.
    pub fault: Option<Fault>,
}

#[cfg(test)]
mod tests {
    use super::EmulatorConfig;
    use crate::memory::map::{MemoryMap, RAM_BASE};

    #[test]
    fn default_config_loads_at_ram_base_without_cap() {
        let config = EmulatorConfig::default();

        assert_eq!(config.memory_map, MemoryMap::default());
        assert_eq!(config.load_address, RAM_BASE);
        assert_eq!(config.max_cycles, None);
        assert!(!config.trace_instructions);
    }
}
