//! Core emulator crate for lxemu: a small 32-bit microcontroller with a
//! unified RAM/device address space.

/// Fault taxonomy shared by every component.
pub mod fault;
pub use fault::{Fault, FaultClass};

/// Memory map, alignment policy, and the address-space router.
pub mod memory;
pub use memory::{
    validate_alignment, AccessWidth, MemoryMap, MemoryMapError, MemoryRegion, Router, DEVICE_BASE,
    RAM_BASE, RAM_END,
};

/// Host-facing configuration, outcome types, and the device-port contract.
pub mod api;
pub use api::{DevicePort, EmulatorConfig, RunOutcome, StepOutcome};

/// Device capability contract and concrete devices.
pub mod peripherals;
pub use peripherals::{
    Device, DeviceDump, NetworkDevice, Uart, NET_BASE, NET_SIZE, UART_BASE, UART_SIZE,
};

/// Ordered device registry.
pub mod bus;
pub use bus::PeripheralBus;

/// Register file and run-loop state.
pub mod state;
pub use state::{GeneralRegister, RegisterFile, RunState, GENERAL_REGISTER_COUNT};

/// Opcode table.
pub mod encoding;
pub use encoding::{Opcode, INSTRUCTION_STRIDE, OPCODE_TABLE};

/// Instruction decoder.
pub mod decoder;
pub use decoder::{Decoder, Instruction};

/// Instruction execution engine.
pub mod execute;
pub use execute::{execute_instruction, Commit, Cpu, RegisterDump};

/// Run loop.
pub mod emulator;
pub use emulator::Emulator;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
