//! Network-control peripheral with a canned HTTP responder.

use std::collections::VecDeque;

use tracing::debug;

use super::{register_lane, replace_lane, Device, DeviceDump};

/// Default network device base address.
pub const NET_BASE: u32 = 0x3FF5_0000;
/// Bytes claimed by the network device.
pub const NET_SIZE: u32 = 0x100;

/// CONTROL register offset.
pub const NET_CONTROL_OFFSET: u32 = 0x00;
/// STATUS register offset.
pub const NET_STATUS_OFFSET: u32 = 0x04;
/// DATA register offset.
pub const NET_DATA_OFFSET: u32 = 0x08;
/// ADDRESS register offset.
pub const NET_ADDRESS_OFFSET: u32 = 0x0C;
/// RESPONSE register offset.
pub const NET_RESPONSE_OFFSET: u32 = 0x10;

/// CONTROL bit: bring the link up.
pub const NET_CONTROL_CONNECT: u8 = 1 << 0;
/// CONTROL bit: drop the link.
pub const NET_CONTROL_DISCONNECT: u8 = 1 << 1;
/// CONTROL bit: request trigger.
pub const NET_CONTROL_REQUEST: u8 = 1 << 2;

/// STATUS bit: link is up.
pub const NET_STATUS_CONNECTED: u32 = 1 << 0;
/// STATUS bit: a request is in flight.
pub const NET_STATUS_PENDING: u32 = 1 << 1;
/// STATUS bit: response bytes are waiting.
pub const NET_STATUS_RESPONSE: u32 = 1 << 2;

/// Body queued for every accepted request.
pub const CANNED_RESPONSE: &str = "HTTP/1.1 200 OK\r\nContent-Length: 13\r\n\r\nHello, World!";

/// Simulated network interface.
#[derive(Debug)]
pub struct NetworkDevice {
    base: u32,
    control: u32,
    status: u32,
    data: u32,
    address: u32,
    response: u32,
    connected: bool,
    request_pending: bool,
    current_url: String,
    response_buffer: VecDeque<u8>,
}

impl Default for NetworkDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkDevice {
    /// Creates a disconnected device at [`NET_BASE`].
    #[must_use]
    pub const fn new() -> Self {
        Self::with_base_address(NET_BASE)
    }

    /// Creates a disconnected device at `base`.
    #[must_use]
    pub const fn with_base_address(base: u32) -> Self {
        Self {
            base,
            control: 0,
            status: 0,
            data: 0,
            address: 0,
            response: 0,
            connected: false,
            request_pending: false,
            current_url: String::new(),
            response_buffer: VecDeque::new(),
        }
    }

    /// Brings the link up.
    pub fn connect(&mut self) {
        self.connected = true;
        debug!(base = self.base, "network connected");
    }

    /// Drops the link.
    pub fn disconnect(&mut self) {
        self.connected = false;
        debug!(base = self.base, "network disconnected");
    }

    /// `true` while the link is up.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Queues [`CANNED_RESPONSE`] for `url`. Returns `false` and queues
    /// nothing when the link is down.
    pub fn send_request(&mut self, url: &str) -> bool {
        if !self.connected {
            debug!(url, "network request refused: not connected");
            return false;
        }

        self.current_url.clear();
        self.current_url.push_str(url);
        self.request_pending = true;
        debug!(url, "network request");

        self.response_buffer.extend(CANNED_RESPONSE.bytes());
        self.request_pending = false;
        true
    }

    /// Drains every queued response byte.
    pub fn take_response(&mut self) -> String {
        let bytes: Vec<u8> = self.response_buffer.drain(..).collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// URL of the most recent accepted request.
    #[must_use]
    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    /// Current STATUS register.
    #[must_use]
    pub const fn status(&self) -> u32 {
        self.status
    }

    const fn slot(&self, offset: u32) -> Option<u32> {
        match offset & !3 {
            NET_CONTROL_OFFSET => Some(self.control),
            NET_STATUS_OFFSET => Some(self.status),
            NET_DATA_OFFSET => Some(self.data),
            NET_ADDRESS_OFFSET => Some(self.address),
            NET_RESPONSE_OFFSET => Some(self.response),
            _ => None,
        }
    }

    fn apply_control(&mut self, bits: u8) {
        if bits & NET_CONTROL_CONNECT != 0 {
            self.connect();
        }
        if bits & NET_CONTROL_DISCONNECT != 0 {
            self.disconnect();
        }
        if bits & NET_CONTROL_REQUEST != 0 {
            debug!(address = self.address, "network request triggered");
        }
    }
}

impl Device for NetworkDevice {
    fn name(&self) -> &'static str {
        "network"
    }

    fn base_address(&self) -> u32 {
        self.base
    }

    fn size(&self) -> u32 {
        NET_SIZE
    }

    fn read8(&self, offset: u32) -> u8 {
        self.slot(offset)
            .map_or(0, |register| register_lane(register, offset))
    }

    fn write8(&mut self, offset: u32, value: u8) {
        match offset & !3 {
            NET_CONTROL_OFFSET => {
                self.control = replace_lane(self.control, offset, value);
                if offset == NET_CONTROL_OFFSET {
                    self.apply_control(value);
                }
            }
            NET_STATUS_OFFSET => self.status = replace_lane(self.status, offset, value),
            NET_DATA_OFFSET => self.data = replace_lane(self.data, offset, value),
            NET_ADDRESS_OFFSET => self.address = replace_lane(self.address, offset, value),
            NET_RESPONSE_OFFSET => self.response = replace_lane(self.response, offset, value),
            _ => {}
        }
    }

    fn reset(&mut self) {
        *self = Self::with_base_address(self.base);
    }

    fn update(&mut self) {
        let flags = [
            (self.connected, NET_STATUS_CONNECTED),
            (self.request_pending, NET_STATUS_PENDING),
            (!self.response_buffer.is_empty(), NET_STATUS_RESPONSE),
        ];
        for (set, bit) in flags {
            if set {
                self.status |= bit;
            } else {
                self.status &= !bit;
            }
        }
    }

    fn dump_registers(&self) -> DeviceDump {
        DeviceDump {
            name: "network",
            base_address: self.base,
            registers: vec![
                ("control", self.control),
                ("status", self.status),
                ("data", self.data),
                ("address", self.address),
                ("response", self.response),
                ("connected", u32::from(self.connected)),
            ],
        }
    }
}
