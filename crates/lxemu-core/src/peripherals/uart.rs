//! Serial console peripheral.

use std::collections::VecDeque;
use std::io::Write as _;

use super::{register_lane, replace_lane, Device, DeviceDump};

/// Default UART base address.
pub const UART_BASE: u32 = 0x3FF4_0000;
/// Bytes claimed by the UART.
pub const UART_SIZE: u32 = 0x100;

/// DATA register offset; writing lane 0 transmits a byte.
pub const UART_DATA_OFFSET: u32 = 0x00;
/// STATUS register offset.
pub const UART_STATUS_OFFSET: u32 = 0x04;
/// CONTROL register offset.
pub const UART_CONTROL_OFFSET: u32 = 0x08;
/// BAUD register offset.
pub const UART_BAUD_OFFSET: u32 = 0x0C;

/// Baud rate after construction and reset.
pub const UART_DEFAULT_BAUD: u32 = 115_200;

/// STATUS bit: transmitter ready.
pub const UART_STATUS_TX_READY: u32 = 1 << 0;
/// STATUS bit: received data waiting.
pub const UART_STATUS_RX_READY: u32 = 1 << 1;

/// Where transmitted bytes go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxSink {
    /// Written and flushed to the process's standard output.
    Stdout,
    /// Collected in memory for the host to inspect.
    Capture(Vec<u8>),
}

/// Serial console with data/status/control/baud registers.
#[derive(Debug)]
pub struct Uart {
    base: u32,
    data: u32,
    status: u32,
    control: u32,
    baud: u32,
    tx_ready: bool,
    rx: VecDeque<u8>,
    sink: TxSink,
}

impl Default for Uart {
    fn default() -> Self {
        Self::new()
    }
}

impl Uart {
    /// Creates a UART at [`UART_BASE`] transmitting to stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink(UART_BASE, TxSink::Stdout)
    }

    /// Creates a UART at [`UART_BASE`] that captures transmitted bytes.
    #[must_use]
    pub fn capturing() -> Self {
        Self::with_sink(UART_BASE, TxSink::Capture(Vec::new()))
    }

    /// Creates a UART at `base` with an explicit sink.
    #[must_use]
    pub const fn with_sink(base: u32, sink: TxSink) -> Self {
        Self {
            base,
            data: 0,
            status: 0,
            control: 0,
            baud: UART_DEFAULT_BAUD,
            tx_ready: true,
            rx: VecDeque::new(),
            sink,
        }
    }

    /// Emits one byte to the sink.
    pub fn send_byte(&mut self, byte: u8) {
        match &mut self.sink {
            TxSink::Stdout => {
                let mut stdout = std::io::stdout().lock();
                let _ = stdout.write_all(&[byte]);
                let _ = stdout.flush();
            }
            TxSink::Capture(buffer) => buffer.push(byte),
        }
    }

    /// Emits every byte of `message`.
    pub fn print(&mut self, message: &str) {
        for byte in message.bytes() {
            self.send_byte(byte);
        }
    }

    /// Queues a byte as if it arrived on the line.
    pub fn push_rx(&mut self, byte: u8) {
        self.rx.push_back(byte);
    }

    /// Pops the oldest received byte, or 0 when nothing is waiting.
    pub fn receive_byte(&mut self) -> u8 {
        self.rx.pop_front().unwrap_or(0)
    }

    /// `true` when received bytes are waiting.
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Bytes collected by a capturing sink; empty for stdout.
    #[must_use]
    pub fn captured_output(&self) -> &[u8] {
        match &self.sink {
            TxSink::Stdout => &[],
            TxSink::Capture(buffer) => buffer,
        }
    }

    /// Current STATUS register.
    #[must_use]
    pub const fn status(&self) -> u32 {
        self.status
    }

    /// Current BAUD register.
    #[must_use]
    pub const fn baud(&self) -> u32 {
        self.baud
    }

    const fn slot(&self, offset: u32) -> Option<u32> {
        match offset & !3 {
            UART_DATA_OFFSET => Some(self.data),
            UART_STATUS_OFFSET => Some(self.status),
            UART_CONTROL_OFFSET => Some(self.control),
            UART_BAUD_OFFSET => Some(self.baud),
            _ => None,
        }
    }
}

impl Device for Uart {
    fn name(&self) -> &'static str {
        "uart"
    }

    fn base_address(&self) -> u32 {
        self.base
    }

    fn size(&self) -> u32 {
        UART_SIZE
    }

    fn read8(&self, offset: u32) -> u8 {
        self.slot(offset)
            .map_or(0, |register| register_lane(register, offset))
    }

    fn write8(&mut self, offset: u32, value: u8) {
        match offset & !3 {
            UART_DATA_OFFSET => {
                self.data = replace_lane(self.data, offset, value);
                if offset == UART_DATA_OFFSET {
                    self.send_byte(value);
                }
            }
            UART_STATUS_OFFSET => self.status = replace_lane(self.status, offset, value),
            UART_CONTROL_OFFSET => self.control = replace_lane(self.control, offset, value),
            UART_BAUD_OFFSET => self.baud = replace_lane(self.baud, offset, value),
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.data = 0;
        self.status = 0;
        self.control = 0;
        self.baud = UART_DEFAULT_BAUD;
        self.tx_ready = true;
        self.rx.clear();
    }

    fn update(&mut self) {
        if self.tx_ready {
            self.status |= UART_STATUS_TX_READY;
        } else {
            self.status &= !UART_STATUS_TX_READY;
        }

        if self.rx.is_empty() {
            self.status &= !UART_STATUS_RX_READY;
        } else {
            self.status |= UART_STATUS_RX_READY;
        }
    }

    fn dump_registers(&self) -> DeviceDump {
        DeviceDump {
            name: "uart",
            base_address: self.base,
            registers: vec![
                ("data", self.data),
                ("status", self.status),
                ("control", self.control),
                ("baud", self.baud),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uart_constants() {
        assert_eq!(UART_BASE, 0x3FF4_0000);
        assert_eq!(UART_SIZE, 0x100);
        assert_eq!(UART_DEFAULT_BAUD, 115_200);
    }

    #[test]
    fn uart_default_state() {
        let uart = Uart::capturing();
        assert_eq!(uart.read32(UART_DATA_OFFSET), 0);
        assert_eq!(uart.read32(UART_STATUS_OFFSET), 0);
        assert_eq!(uart.read32(UART_BAUD_OFFSET), UART_DEFAULT_BAUD);
        assert!(!uart.has_data());
        assert!(uart.captured_output().is_empty());
    }

    #[test]
    fn word_store_to_data_transmits_one_byte() {
        let mut uart = Uart::capturing();
        uart.write32(UART_DATA_OFFSET, u32::from(b'H'));
        uart.write32(UART_DATA_OFFSET, u32::from(b'i'));

        assert_eq!(uart.captured_output(), b"Hi");
        assert_eq!(uart.read32(UART_DATA_OFFSET), u32::from(b'i'));
    }

    #[test]
    fn byte_store_to_upper_data_lane_is_silent() {
        let mut uart = Uart::capturing();
        uart.write8(UART_DATA_OFFSET + 1, b'x');
        assert!(uart.captured_output().is_empty());
        assert_eq!(uart.read32(UART_DATA_OFFSET), u32::from(b'x') << 8);
    }

    #[test]
    fn baud_register_is_written_by_lanes() {
        let mut uart = Uart::capturing();
        uart.write8(UART_BAUD_OFFSET, 0x80);
        assert_eq!(uart.baud(), (UART_DEFAULT_BAUD & !0xFF) | 0x80);

        uart.write32(UART_BAUD_OFFSET, 9_600);
        assert_eq!(uart.read32(UART_BAUD_OFFSET), 9_600);
        assert_eq!(uart.read16(UART_BAUD_OFFSET), 9_600);
    }

    #[test]
    fn update_sets_tx_ready_and_tracks_rx_queue() {
        let mut uart = Uart::capturing();
        uart.update();
        assert_eq!(uart.status(), UART_STATUS_TX_READY);

        uart.push_rx(b'a');
        uart.update();
        assert_eq!(uart.status(), UART_STATUS_TX_READY | UART_STATUS_RX_READY);
        assert_eq!(uart.read8(UART_STATUS_OFFSET), 0x03);

        assert_eq!(uart.receive_byte(), b'a');
        assert_eq!(uart.receive_byte(), 0);
        uart.update();
        assert_eq!(uart.status(), UART_STATUS_TX_READY);
    }

    #[test]
    fn unknown_offsets_read_zero_and_ignore_writes() {
        let mut uart = Uart::capturing();
        uart.write32(0x40, 0xFFFF_FFFF);
        assert_eq!(uart.read32(0x40), 0);
        assert_eq!(uart.read8(0xFF), 0);
    }

    #[test]
    fn reset_restores_construction_state() {
        let mut uart = Uart::capturing();
        uart.write32(UART_CONTROL_OFFSET, 0x55);
        uart.write32(UART_BAUD_OFFSET, 9_600);
        uart.push_rx(1);
        uart.update();

        uart.reset();

        assert_eq!(uart.read32(UART_CONTROL_OFFSET), 0);
        assert_eq!(uart.read32(UART_STATUS_OFFSET), 0);
        assert_eq!(uart.baud(), UART_DEFAULT_BAUD);
        assert!(!uart.has_data());
    }

    #[test]
    fn print_emits_every_byte() {
        let mut uart = Uart::capturing();
        uart.print("ok\n");
        assert_eq!(uart.captured_output(), b"ok\n");
    }

    #[test]
    fn dump_reports_all_four_registers() {
        let uart = Uart::capturing();
        let dump = uart.dump_registers();
        assert_eq!(dump.base_address, UART_BASE);
        let names: Vec<_> = dump.registers.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["data", "status", "control", "baud"]);
    }
}
