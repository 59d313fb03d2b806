//! Address-space layout and classification helpers.

/// Default inclusive start of device (memory-mapped register) space.
pub const DEVICE_BASE: u32 = 0x3FF0_0000;
/// Default inclusive start of RAM; also the exclusive end of device space.
pub const RAM_BASE: u32 = 0x3FF8_0000;
/// Default inclusive end of RAM.
pub const RAM_END: u32 = 0x3FFF_FFFF;

/// Region classification for a 32-bit address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryRegion {
    /// Backed by the router's RAM store.
    Ram,
    /// Forwarded to the device port.
    Device,
    /// Neither RAM nor device space.
    Unmapped,
}

/// Layout of the two address zones.
///
/// Device space is `device_base..ram_base` and RAM is `ram_base..=ram_end`,
/// so the zones never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryMap {
    device_base: u32,
    ram_base: u32,
    ram_end: u32,
}

/// Rejected memory map layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum MemoryMapError {
    /// Device space would be empty or lie above RAM.
    #[error("device base {device_base:#010x} must be below ram base {ram_base:#010x}")]
    DeviceAboveRam {
        /// Requested device base.
        device_base: u32,
        /// Requested RAM base.
        ram_base: u32,
    },
    /// RAM end precedes RAM base.
    #[error("ram end {ram_end:#010x} precedes ram base {ram_base:#010x}")]
    EmptyRam {
        /// Requested RAM base.
        ram_base: u32,
        /// Requested RAM end.
        ram_end: u32,
    },
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self {
            device_base: DEVICE_BASE,
            ram_base: RAM_BASE,
            ram_end: RAM_END,
        }
    }
}

impl MemoryMap {
    /// Builds a map from explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryMapError`] when device space would not sit strictly
    /// below RAM or when RAM would be empty.
    pub const fn new(device_base: u32, ram_base: u32, ram_end: u32) -> Result<Self, MemoryMapError> {
        if device_base >= ram_base {
            return Err(MemoryMapError::DeviceAboveRam {
                device_base,
                ram_base,
            });
        }
        if ram_end < ram_base {
            return Err(MemoryMapError::EmptyRam { ram_base, ram_end });
        }
        Ok(Self {
            device_base,
            ram_base,
            ram_end,
        })
    }

    /// Inclusive start of device space.
    #[must_use]
    pub const fn device_base(&self) -> u32 {
        self.device_base
    }

    /// Inclusive start of RAM.
    #[must_use]
    pub const fn ram_base(&self) -> u32 {
        self.ram_base
    }

    /// Inclusive end of RAM.
    #[must_use]
    pub const fn ram_end(&self) -> u32 {
        self.ram_end
    }

    /// Number of bytes backed by RAM.
    #[must_use]
    pub const fn ram_size(&self) -> usize {
        (self.ram_end - self.ram_base) as usize + 1
    }

    /// `ram_base <= address <= ram_end`.
    #[must_use]
    pub const fn is_ram_address(&self, address: u32) -> bool {
        address >= self.ram_base && address <= self.ram_end
    }

    /// `device_base <= address < ram_base`.
    #[must_use]
    pub const fn is_device_address(&self, address: u32) -> bool {
        address >= self.device_base && address < self.ram_base
    }

    /// Union of RAM and device space.
    #[must_use]
    pub const fn is_valid_address(&self, address: u32) -> bool {
        self.is_ram_address(address) || self.is_device_address(address)
    }

    /// Classifies `address` into its region.
    #[must_use]
    pub const fn classify(&self, address: u32) -> MemoryRegion {
        if self.is_ram_address(address) {
            MemoryRegion::Ram
        } else if self.is_device_address(address) {
            MemoryRegion::Device
        } else {
            MemoryRegion::Unmapped
        }
    }

    /// Offset of a RAM address into the backing store.
    #[must_use]
    pub const fn ram_offset(&self, address: u32) -> Option<usize> {
        if self.is_ram_address(address) {
            Some((address - self.ram_base) as usize)
        } else {
            None
        }
    }
}

const _: () = assert_default_layout();

const fn assert_default_layout() {
    assert!(DEVICE_BASE < RAM_BASE, "device space must sit below ram");
    assert!(RAM_BASE <= RAM_END, "ram must not be empty");
    assert!(
        RAM_BASE.is_multiple_of(4) && (RAM_END - 3).is_multiple_of(4),
        "ram bounds must be word aligned"
    );
}
