//! Device capability contract and concrete memory-mapped devices.
//!
//! Every device exposes a small bank of 4-byte register slots. Byte offset
//! `o` addresses lane `o % 4` (little-endian) of slot `o / 4`, and the
//! default multi-byte accessors are built from byte accesses so a word access
//! is always observably equal to four ordered byte accesses.

use std::fmt;

/// Network-control device.
pub mod network;
/// Serial console device.
pub mod uart;

pub use network::{NetworkDevice, NET_BASE, NET_SIZE};
pub use uart::{Uart, UART_BASE, UART_SIZE};

/// Capability set every peripheral implements to sit on the bus.
///
/// Offsets passed to the accessors are relative to [`Device::base_address`].
pub trait Device: fmt::Debug {
    /// Short human-readable device name.
    fn name(&self) -> &'static str;

    /// First absolute address claimed by this device.
    fn base_address(&self) -> u32;

    /// Number of bytes claimed starting at the base address.
    fn size(&self) -> u32;

    /// Reads one byte at a device-relative offset.
    fn read8(&self, offset: u32) -> u8;

    /// Writes one byte at a device-relative offset.
    fn write8(&mut self, offset: u32, value: u8);

    /// Reads a half-word as two ordered byte reads. Odd offsets read zero.
    fn read16(&self, offset: u32) -> u16 {
        if offset % 2 != 0 {
            return 0;
        }
        u16::from_le_bytes([self.read8(offset), self.read8(offset.wrapping_add(1))])
    }

    /// Reads a word as four ordered byte reads. Offsets that are not a
    /// multiple of four read zero.
    fn read32(&self, offset: u32) -> u32 {
        if offset % 4 != 0 {
            return 0;
        }
        u32::from_le_bytes([
            self.read8(offset),
            self.read8(offset.wrapping_add(1)),
            self.read8(offset.wrapping_add(2)),
            self.read8(offset.wrapping_add(3)),
        ])
    }

    /// Writes a half-word as two ordered byte writes. Odd offsets are dropped.
    fn write16(&mut self, offset: u32, value: u16) {
        if offset % 2 != 0 {
            return;
        }
        for (lane, byte) in (0u32..).zip(value.to_le_bytes()) {
            self.write8(offset.wrapping_add(lane), byte);
        }
    }

    /// Writes a word as four ordered byte writes. Offsets that are not a
    /// multiple of four are dropped.
    fn write32(&mut self, offset: u32, value: u32) {
        if offset % 4 != 0 {
            return;
        }
        for (lane, byte) in (0u32..).zip(value.to_le_bytes()) {
            self.write8(offset.wrapping_add(lane), byte);
        }
    }

    /// Restores registers and internal queues to their post-construction
    /// state.
    fn reset(&mut self);

    /// Called once per emulation cycle whether or not the device was touched.
    fn update(&mut self);

    /// `base <= address < base + size`.
    fn is_in_range(&self, address: u32) -> bool {
        address
            .checked_sub(self.base_address())
            .is_some_and(|offset| offset < self.size())
    }

    /// Side-effect-free snapshot of the register set.
    fn dump_registers(&self) -> DeviceDump;
}

/// Snapshot of one device's registers for debug output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDump {
    /// Device name.
    pub name: &'static str,
    /// Device base address.
    pub base_address: u32,
    /// Register name/value pairs in register-map order.
    pub registers: Vec<(&'static str, u32)>,
}

impl fmt::Display for DeviceDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} registers @ {:#010x}:", self.name, self.base_address)?;
        for (name, value) in &self.registers {
            writeln!(f, "  {name:<10} 0x{value:08x}")?;
        }
        Ok(())
    }
}

/// Byte `offset % 4` of a register slot.
pub(crate) const fn register_lane(register: u32, offset: u32) -> u8 {
    (register >> ((offset % 4) * 8)) as u8
}

/// Replaces byte `offset % 4` of a register slot.
pub(crate) const fn replace_lane(register: u32, offset: u32, byte: u8) -> u32 {
    let shift = (offset % 4) * 8;
    (register & !(0xFF << shift)) | ((byte as u32) << shift)
}
