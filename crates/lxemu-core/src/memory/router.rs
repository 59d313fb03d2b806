//! Unified RAM/device address-space router.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::api::DevicePort;
use crate::memory::access::{validate_alignment, AccessWidth};
use crate::memory::map::{MemoryMap, MemoryRegion};
use crate::{Fault, PeripheralBus};

/// Owns RAM and decides, on every access, whether RAM or the device port
/// handles it.
///
/// Multi-byte RAM accesses are little-endian. Device-space accesses are
/// forwarded at their original width to the attached [`DevicePort`]; with no
/// port attached reads yield zero and writes are dropped.
#[derive(Debug)]
pub struct Router<P = PeripheralBus> {
    map: MemoryMap,
    ram: Box<[u8]>,
    port: Option<P>,
    peripheral_ids: BTreeMap<u32, u32>,
}

impl<P: DevicePort> Router<P> {
    /// Creates a router with zeroed RAM and no device port.
    #[must_use]
    pub fn new(map: MemoryMap) -> Self {
        Self {
            map,
            ram: vec![0; map.ram_size()].into_boxed_slice(),
            port: None,
            peripheral_ids: BTreeMap::new(),
        }
    }

    /// Creates a router whose device space is served by `port`.
    #[must_use]
    pub fn with_port(map: MemoryMap, port: P) -> Self {
        let mut router = Self::new(map);
        router.port = Some(port);
        router
    }

    /// Attaches a device port, returning the one it replaces.
    pub fn attach_port(&mut self, port: P) -> Option<P> {
        self.port.replace(port)
    }

    /// Returns the attached device port, if any.
    #[must_use]
    pub const fn port(&self) -> Option<&P> {
        self.port.as_ref()
    }

    /// Returns the attached device port mutably, if any.
    #[must_use]
    pub fn port_mut(&mut self) -> Option<&mut P> {
        self.port.as_mut()
    }

    /// Returns the address-space layout.
    #[must_use]
    pub const fn memory_map(&self) -> &MemoryMap {
        &self.map
    }

    /// Inclusive RAM start.
    #[must_use]
    pub const fn ram_base(&self) -> u32 {
        self.map.ram_base()
    }

    /// Inclusive RAM end.
    #[must_use]
    pub const fn ram_end(&self) -> u32 {
        self.map.ram_end()
    }

    /// RAM size in bytes.
    #[must_use]
    pub const fn ram_size(&self) -> usize {
        self.ram.len()
    }

    /// `true` when `address` is backed by RAM.
    #[must_use]
    pub const fn is_ram_address(&self, address: u32) -> bool {
        self.map.is_ram_address(address)
    }

    /// `true` when `address` lies in device space.
    #[must_use]
    pub const fn is_peripheral_address(&self, address: u32) -> bool {
        self.map.is_device_address(address)
    }

    /// `true` when `address` lies in RAM or device space.
    #[must_use]
    pub const fn is_valid_address(&self, address: u32) -> bool {
        self.map.is_valid_address(address)
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::OutOfRange`] when `address` is unmapped.
    pub fn read8(&self, address: u32) -> Result<u8, Fault> {
        match self.region_for(address, AccessWidth::Byte)? {
            MemoryRegion::Ram => Ok(self.ram[self.offset(address)]),
            _ => Ok(self.port.as_ref().map_or(0, |port| port.read8(address))),
        }
    }

    /// Reads a little-endian half-word.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Alignment`] for an odd address and
    /// [`Fault::OutOfRange`] when the access leaves its region.
    pub fn read16(&self, address: u32) -> Result<u16, Fault> {
        match self.region_for(address, AccessWidth::Half)? {
            MemoryRegion::Ram => {
                let at = self.offset(address);
                Ok(u16::from_le_bytes([self.ram[at], self.ram[at + 1]]))
            }
            _ => Ok(self.port.as_ref().map_or(0, |port| port.read16(address))),
        }
    }

    /// Reads a little-endian word.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Alignment`] when `address` is not a multiple of four
    /// and [`Fault::OutOfRange`] when the access leaves its region.
    pub fn read32(&self, address: u32) -> Result<u32, Fault> {
        match self.region_for(address, AccessWidth::Word)? {
            MemoryRegion::Ram => {
                let at = self.offset(address);
                Ok(u32::from_le_bytes([
                    self.ram[at],
                    self.ram[at + 1],
                    self.ram[at + 2],
                    self.ram[at + 3],
                ]))
            }
            _ => Ok(self.port.as_ref().map_or(0, |port| port.read32(address))),
        }
    }

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::OutOfRange`] when `address` is unmapped.
    pub fn write8(&mut self, address: u32, value: u8) -> Result<(), Fault> {
        match self.region_for(address, AccessWidth::Byte)? {
            MemoryRegion::Ram => {
                let at = self.offset(address);
                self.ram[at] = value;
            }
            _ => {
                if let Some(port) = self.port.as_mut() {
                    port.write8(address, value);
                }
            }
        }
        Ok(())
    }

    /// Writes a little-endian half-word.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Alignment`] for an odd address and
    /// [`Fault::OutOfRange`] when the access leaves its region.
    pub fn write16(&mut self, address: u32, value: u16) -> Result<(), Fault> {
        match self.region_for(address, AccessWidth::Half)? {
            MemoryRegion::Ram => {
                let at = self.offset(address);
                self.ram[at..at + 2].copy_from_slice(&value.to_le_bytes());
            }
            _ => {
                if let Some(port) = self.port.as_mut() {
                    port.write16(address, value);
                }
            }
        }
        Ok(())
    }

    /// Writes a little-endian word.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Alignment`] when `address` is not a multiple of four
    /// and [`Fault::OutOfRange`] when the access leaves its region.
    pub fn write32(&mut self, address: u32, value: u32) -> Result<(), Fault> {
        match self.region_for(address, AccessWidth::Word)? {
            MemoryRegion::Ram => {
                let at = self.offset(address);
                self.ram[at..at + 4].copy_from_slice(&value.to_le_bytes());
            }
            _ => {
                if let Some(port) = self.port.as_mut() {
                    port.write32(address, value);
                }
            }
        }
        Ok(())
    }

    /// Copies `data` into RAM starting at `address`.
    ///
    /// Bulk transfers are RAM-only; device space is never touched.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::BulkOutOfRange`] when the first or last byte of the
    /// range is not RAM.
    pub fn write_bytes(&mut self, address: u32, data: &[u8]) -> Result<(), Fault> {
        let at = self.bulk_offset(address, data.len())?;
        self.ram[at..at + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Copies `length` bytes of RAM starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::BulkOutOfRange`] when the first or last byte of the
    /// range is not RAM.
    pub fn read_bytes(&self, address: u32, length: usize) -> Result<Vec<u8>, Fault> {
        let at = self.bulk_offset(address, length)?;
        Ok(self.ram[at..at + length].to_vec())
    }

    /// Records a diagnostic address-to-device-id mapping.
    ///
    /// The table is informational only; dispatch never consults it.
    pub fn map_peripheral(&mut self, address: u32, peripheral_id: u32) {
        self.peripheral_ids.insert(address, peripheral_id);
    }

    /// Removes a diagnostic mapping.
    pub fn unmap_peripheral(&mut self, address: u32) {
        self.peripheral_ids.remove(&address);
    }

    /// Looks up a diagnostic mapping.
    #[must_use]
    pub fn peripheral_id(&self, address: u32) -> Option<u32> {
        self.peripheral_ids.get(&address).copied()
    }

    /// Formats `length` bytes starting at `address` as a hex dump, sixteen
    /// bytes per line.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::OutOfRange`] as soon as an unmapped byte is reached.
    pub fn hex_dump(&self, address: u32, length: usize) -> Result<String, Fault> {
        let mut out = String::new();
        for line_start in (0..length).step_by(16) {
            let line_address = offset_address(address, line_start)?;
            let _ = write!(out, "{line_address:08x}:");
            for index in line_start..length.min(line_start + 16) {
                let byte = self.read8(offset_address(address, index)?)?;
                let _ = write!(out, " {byte:02x}");
            }
            out.push('\n');
        }
        Ok(out)
    }

    fn region_for(&self, address: u32, width: AccessWidth) -> Result<MemoryRegion, Fault> {
        validate_alignment(address, width)?;
        let region = self.map.classify(address);
        if region == MemoryRegion::Unmapped {
            return Err(Fault::OutOfRange { address });
        }
        let last = address
            .checked_add(u32::from(width.bytes()) - 1)
            .ok_or(Fault::OutOfRange { address })?;
        if self.map.classify(last) != region {
            return Err(Fault::OutOfRange { address: last });
        }
        Ok(region)
    }

    fn bulk_offset(&self, start: u32, len: usize) -> Result<usize, Fault> {
        let out_of_range = Fault::BulkOutOfRange { start, len };
        let last = offset_address(start, len.saturating_sub(1)).map_err(|_| out_of_range)?;
        if !self.map.is_ram_address(start) || !self.map.is_ram_address(last) {
            return Err(out_of_range);
        }
        Ok(self.offset(start))
    }

    const fn offset(&self, address: u32) -> usize {
        (address - self.map.ram_base()) as usize
    }
}

fn offset_address(base: u32, offset: usize) -> Result<u32, Fault> {
    u32::try_from(offset)
        .ok()
        .and_then(|offset| base.checked_add(offset))
        .ok_or(Fault::OutOfRange { address: base })
}
