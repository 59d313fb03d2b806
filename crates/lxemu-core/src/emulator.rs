//! Run loop: composition root that owns the CPU, the router, and the devices.

use tracing::{error, info, trace};

use crate::api::{EmulatorConfig, RunOutcome, StepOutcome};
use crate::bus::PeripheralBus;
use crate::execute::Cpu;
use crate::memory::Router;
use crate::peripherals::{Device, NetworkDevice, Uart, NET_BASE, UART_BASE};
use crate::state::RunState;
use crate::Fault;

/// Diagnostic id recorded for the UART in the router's peripheral table.
pub const UART_PERIPHERAL_ID: u32 = 0;
/// Diagnostic id recorded for the network device in the router's peripheral
/// table.
pub const NET_PERIPHERAL_ID: u32 = 1;

/// A complete emulated system.
#[derive(Debug)]
pub struct Emulator {
    config: EmulatorConfig,
    cpu: Cpu,
    router: Router<PeripheralBus>,
    state: RunState,
    cycles: u64,
}

impl Emulator {
    /// Builds a system with a stdout UART and a network device on the bus.
    #[must_use]
    pub fn new(config: EmulatorConfig) -> Self {
        let mut bus = PeripheralBus::new();
        bus.add(Box::new(Uart::new()));
        bus.add(Box::new(NetworkDevice::new()));

        let mut emulator = Self::with_bus(config, bus);
        emulator.router.map_peripheral(UART_BASE, UART_PERIPHERAL_ID);
        emulator.router.map_peripheral(NET_BASE, NET_PERIPHERAL_ID);
        emulator
    }

    /// Builds a system around a caller-populated bus.
    #[must_use]
    pub fn with_bus(config: EmulatorConfig, bus: PeripheralBus) -> Self {
        let devices = bus.len();
        let router = Router::with_port(config.memory_map, bus);
        info!(
            ram_base = router.ram_base(),
            ram_size = router.ram_size(),
            devices,
            "emulator initialised"
        );
        Self {
            config,
            cpu: Cpu::new(),
            router,
            state: RunState::Stopped,
            cycles: 0,
        }
    }

    /// Builds a system with an empty bus.
    #[must_use]
    pub fn bare(config: EmulatorConfig) -> Self {
        Self::with_bus(config, PeripheralBus::new())
    }

    /// Copies `image` to the load address and points pc at it.
    ///
    /// # Errors
    ///
    /// [`Fault::EmptyInput`] for an empty image, or
    /// [`Fault::BulkOutOfRange`] when the image does not fit in RAM.
    pub fn load_firmware(&mut self, image: &[u8]) -> Result<(), Fault> {
        if image.is_empty() {
            return Err(Fault::EmptyInput);
        }
        let address = self.config.load_address;
        self.router.write_bytes(address, image)?;
        self.cpu.set_pc(address);
        info!(address, size = image.len(), "firmware loaded");
        Ok(())
    }

    /// Enters `Running`, clearing any previous fault.
    pub fn start(&mut self) {
        self.state = RunState::Running;
        info!(cycle = self.cycles, pc = self.cpu.pc(), "emulation started");
    }

    /// Executes one cycle: fetch/decode/execute, then one `update()` per
    /// device in bus order.
    ///
    /// Faults are absorbed here: the loop moves to [`RunState::Faulted`] and
    /// the cycle counter is not advanced.
    pub fn step(&mut self) -> StepOutcome {
        if !self.state.is_running() {
            return StepOutcome::Idle;
        }
        if self.cap_reached() {
            self.stop();
            return StepOutcome::Idle;
        }

        match self.cpu.execute(&mut self.router) {
            Ok((pc, instruction)) => {
                self.cycles += 1;
                if let Some(bus) = self.router.port_mut() {
                    bus.update_all();
                }
                if self.config.trace_instructions {
                    trace!(cycle = self.cycles, pc, %instruction, "retired");
                }
                if self.cap_reached() {
                    self.stop();
                }
                StepOutcome::Retired { pc, instruction }
            }
            Err(cause) => {
                error!(
                    cycle = self.cycles,
                    pc = self.cpu.pc(),
                    class = ?cause.class(),
                    %cause,
                    "emulation fault"
                );
                self.state = RunState::Faulted(cause);
                info!(cycles = self.cycles, "emulation stopped");
                StepOutcome::Faulted {
                    cause,
                    cycle: self.cycles,
                }
            }
        }
    }

    /// Starts and steps until the loop leaves `Running`.
    pub fn run(&mut self) -> RunOutcome {
        self.start();
        while self.state.is_running() {
            self.step();
        }
        RunOutcome {
            cycles: self.cycles,
            fault: self.state.fault(),
        }
    }

    /// Leaves `Running`. A no-op on an already stopped or faulted loop apart
    /// from the log record.
    pub fn stop(&mut self) {
        if self.state.is_running() {
            self.state = RunState::Stopped;
        }
        info!(cycles = self.cycles, "emulation stopped");
    }

    /// Resets the CPU, every device, and the cycle counter. RAM is kept.
    pub fn reset(&mut self) {
        self.cpu.reset();
        if let Some(bus) = self.router.port_mut() {
            bus.reset_all();
        }
        self.cycles = 0;
        self.state = RunState::Stopped;
    }

    fn cap_reached(&self) -> bool {
        self.config.max_cycles.is_some_and(|max| self.cycles >= max)
    }

    /// Completed cycles.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// `true` while in `Running`.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.state
    }

    /// First device on the bus whose range contains `address`.
    #[must_use]
    pub fn peripheral(&self, address: u32) -> Option<&dyn Device> {
        self.router.port().and_then(|bus| bus.resolve(address))
    }

    /// Device bus.
    #[must_use]
    pub const fn peripheral_bus(&self) -> Option<&PeripheralBus> {
        self.router.port()
    }

    /// Device bus, mutably.
    pub fn peripheral_bus_mut(&mut self) -> Option<&mut PeripheralBus> {
        self.router.port_mut()
    }

    /// CPU core.
    #[must_use]
    pub const fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// CPU core, mutably.
    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// Address-space router.
    #[must_use]
    pub const fn router(&self) -> &Router<PeripheralBus> {
        &self.router
    }

    /// Address-space router, mutably.
    pub fn router_mut(&mut self) -> &mut Router<PeripheralBus> {
        &mut self.router
    }

    /// Configuration this system was built with.
    #[must_use]
    pub const fn config(&self) -> &EmulatorConfig {
        &self.config
    }
}
