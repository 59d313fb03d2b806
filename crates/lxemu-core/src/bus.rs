//! Ordered device registry that resolves device-space addresses.

use tracing::{debug, warn};

use crate::api::DevicePort;
use crate::peripherals::{Device, DeviceDump};

/// Registered devices in insertion order. Resolution is first-match.
#[derive(Debug, Default)]
pub struct PeripheralBus {
    devices: Vec<Box<dyn Device>>,
}

impl PeripheralBus {
    /// Creates an empty bus.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    /// Appends a device. Overlapping ranges are accepted; the earlier device
    /// keeps winning for shared addresses.
    pub fn add(&mut self, device: Box<dyn Device>) {
        let base = device.base_address();
        let size = device.size();
        if self.overlaps(base, size) {
            warn!(
                device = device.name(),
                base,
                size,
                "device range overlaps an existing registration"
            );
        }
        debug!(device = device.name(), base, size, "device registered");
        self.devices.push(device);
    }

    /// `true` when `[base, base + size)` intersects any registered device.
    #[must_use]
    pub fn overlaps(&self, base: u32, size: u32) -> bool {
        let end = u64::from(base) + u64::from(size);
        self.devices.iter().any(|device| {
            let other_base = u64::from(device.base_address());
            let other_end = other_base + u64::from(device.size());
            u64::from(base) < other_end && other_base < end
        })
    }

    /// First device whose range contains `address`.
    #[must_use]
    pub fn resolve(&self, address: u32) -> Option<&dyn Device> {
        self.devices
            .iter()
            .find(|device| device.is_in_range(address))
            .map(AsRef::as_ref)
    }

    /// Mutable form of [`PeripheralBus::resolve`].
    pub fn resolve_mut(&mut self, address: u32) -> Option<&mut (dyn Device + 'static)> {
        self.devices
            .iter_mut()
            .find(|device| device.is_in_range(address))
            .map(AsMut::as_mut)
    }

    /// Devices in registration order.
    pub fn devices(&self) -> impl Iterator<Item = &dyn Device> {
        self.devices.iter().map(AsRef::as_ref)
    }

    /// Number of registered devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// `true` when no device is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Advances every device by one cycle, in registration order.
    pub fn update_all(&mut self) {
        for device in &mut self.devices {
            device.update();
        }
    }

    /// Resets every device, in registration order.
    pub fn reset_all(&mut self) {
        for device in &mut self.devices {
            device.reset();
        }
    }

    /// Register snapshots of every device, in registration order.
    #[must_use]
    pub fn dump_all(&self) -> Vec<DeviceDump> {
        self.devices.iter().map(|device| device.dump_registers()).collect()
    }

    fn with_device<T>(&self, address: u32, access: impl FnOnce(&dyn Device, u32) -> T) -> Option<T> {
        self.resolve(address)
            .map(|device| access(device, address - device.base_address()))
    }

    fn with_device_mut(&mut self, address: u32, access: impl FnOnce(&mut dyn Device, u32)) {
        if let Some(device) = self.resolve_mut(address) {
            let offset = address - device.base_address();
            access(device, offset);
        }
    }
}

impl DevicePort for PeripheralBus {
    fn read8(&self, address: u32) -> u8 {
        self.with_device(address, |device, offset| device.read8(offset))
            .unwrap_or(0)
    }

    fn read16(&self, address: u32) -> u16 {
        self.with_device(address, |device, offset| device.read16(offset))
            .unwrap_or(0)
    }

    fn read32(&self, address: u32) -> u32 {
        self.with_device(address, |device, offset| device.read32(offset))
            .unwrap_or(0)
    }

    fn write8(&mut self, address: u32, value: u8) {
        self.with_device_mut(address, |device, offset| device.write8(offset, value));
    }

    fn write16(&mut self, address: u32, value: u16) {
        self.with_device_mut(address, |device, offset| device.write16(offset, value));
    }

    fn write32(&mut self, address: u32, value: u32) {
        self.with_device_mut(address, |device, offset| device.write32(offset, value));
    }
}

#[cfg(test)]
mod tests {
    use super::PeripheralBus;
    use crate::api::DevicePort;
    use crate::peripherals::uart::{
        TxSink, UART_BAUD_OFFSET, UART_DEFAULT_BAUD, UART_STATUS_TX_READY,
    };
    use crate::peripherals::{Device, NetworkDevice, Uart, NET_BASE, UART_BASE};

    fn bus_with_defaults() -> PeripheralBus {
        let mut bus = PeripheralBus::new();
        bus.add(Box::new(Uart::capturing()));
        bus.add(Box::new(NetworkDevice::new()));
        bus
    }

    #[test]
    fn empty_bus_reads_zero_and_drops_writes() {
        let mut bus = PeripheralBus::new();
        assert!(bus.is_empty());
        bus.write32(UART_BASE, 0x41);
        assert_eq!(bus.read32(UART_BASE), 0);
        assert!(bus.resolve(UART_BASE).is_none());
    }

    #[test]
    fn resolves_by_half_open_range() {
        let bus = bus_with_defaults();
        assert_eq!(bus.len(), 2);
        assert_eq!(bus.resolve(UART_BASE).map(Device::name), Some("uart"));
        assert_eq!(bus.resolve(UART_BASE + 0xFF).map(Device::name), Some("uart"));
        assert!(bus.resolve(UART_BASE + 0x100).is_none());
        assert_eq!(bus.resolve(NET_BASE + 0x10).map(Device::name), Some("network"));
    }

    #[test]
    fn accesses_are_forwarded_with_device_relative_offsets() {
        let mut bus = bus_with_defaults();
        bus.write32(UART_BASE + UART_BAUD_OFFSET, 9_600);
        assert_eq!(bus.read32(UART_BASE + UART_BAUD_OFFSET), 9_600);
        assert_eq!(bus.read16(UART_BASE + UART_BAUD_OFFSET), 9_600);

        bus.write8(NET_BASE, 1);
        assert_eq!(bus.read8(NET_BASE), 1);
    }

    #[test]
    fn first_registered_device_wins_on_overlap() {
        let mut bus = PeripheralBus::new();
        bus.add(Box::new(Uart::capturing()));
        assert!(bus.overlaps(UART_BASE + 0x80, 0x100));
        bus.add(Box::new(Uart::with_sink(
            UART_BASE + 0x80,
            TxSink::Capture(Vec::new()),
        )));
        assert_eq!(bus.len(), 2);

        // Lands on the first UART at an unmapped offset and is dropped.
        bus.write32(UART_BASE + 0x80 + UART_BAUD_OFFSET, 9_600);
        let second = bus
            .devices()
            .nth(1)
            .map(|device| device.read32(UART_BAUD_OFFSET));
        assert_eq!(second, Some(UART_DEFAULT_BAUD));
        assert_eq!(bus.read32(UART_BASE + 0x80 + UART_BAUD_OFFSET), 0);
    }

    #[test]
    fn overlap_check_treats_ranges_as_half_open() {
        let bus = bus_with_defaults();
        assert!(!bus.overlaps(UART_BASE + 0x100, 0x100));
        assert!(!bus.overlaps(UART_BASE - 0x100, 0x100));
        assert!(bus.overlaps(UART_BASE - 0x100, 0x101));
        assert!(!bus.overlaps(UART_BASE, 0));
    }

    #[test]
    fn update_and_reset_reach_every_device() {
        let mut bus = bus_with_defaults();
        bus.write8(NET_BASE, 1);
        bus.update_all();
        assert_eq!(bus.read32(UART_BASE + 4), UART_STATUS_TX_READY);
        assert_eq!(bus.read32(NET_BASE + 4), 1);

        bus.reset_all();
        assert_eq!(bus.read32(UART_BASE + 4), 0);
        assert_eq!(bus.read32(NET_BASE), 0);
    }

    #[test]
    fn dump_all_preserves_registration_order() {
        let bus = bus_with_defaults();
        let names: Vec<_> = bus.dump_all().iter().map(|dump| dump.name).collect();
        assert_eq!(names, ["uart", "network"]);
    }
}
