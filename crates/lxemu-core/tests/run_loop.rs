//! Whole-system runs: firmware load, device interaction through the CPU, and
//! run-loop stop conditions.

#![allow(clippy::pedantic, clippy::nursery)]

use lxemu_core::peripherals::network::{CANNED_RESPONSE, NET_STATUS_CONNECTED};
use lxemu_core::peripherals::uart::TxSink;
use lxemu_core::{
    Device, DeviceDump, Emulator, EmulatorConfig, Fault, FaultClass, GeneralRegister,
    Instruction, NetworkDevice, PeripheralBus, RunOutcome, RunState, StepOutcome, Uart, NET_BASE,
    RAM_BASE, UART_BASE,
};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;
use tracing_test as _;

fn image(program: &[Instruction]) -> Vec<u8> {
    program
        .iter()
        .flat_map(|instruction| instruction.encode().to_le_bytes())
        .collect()
}

fn system(config: EmulatorConfig) -> Emulator {
    let mut bus = PeripheralBus::new();
    bus.add(Box::new(Uart::with_sink(
        UART_BASE,
        TxSink::Capture(Vec::new()),
    )));
    bus.add(Box::new(NetworkDevice::new()));
    Emulator::with_bus(config, bus)
}

const COUNTER_BASE: u32 = 0x3FF6_0000;

/// Device whose only register counts `update()` calls.
#[derive(Debug, Default)]
struct UpdateCounter {
    updates: u32,
}

impl Device for UpdateCounter {
    fn name(&self) -> &'static str {
        "counter"
    }

    fn base_address(&self) -> u32 {
        COUNTER_BASE
    }

    fn size(&self) -> u32 {
        4
    }

    fn read8(&self, offset: u32) -> u8 {
        self.updates.to_le_bytes()[(offset % 4) as usize]
    }

    fn write8(&mut self, _offset: u32, _value: u8) {}

    fn reset(&mut self) {
        self.updates = 0;
    }

    fn update(&mut self) {
        self.updates += 1;
    }

    fn dump_registers(&self) -> DeviceDump {
        DeviceDump {
            name: self.name(),
            base_address: COUNTER_BASE,
            registers: vec![("updates", self.updates)],
        }
    }
}

fn counted_system(config: EmulatorConfig, program: &[Instruction]) -> Emulator {
    let mut bus = PeripheralBus::new();
    bus.add(Box::new(Uart::capturing()));
    bus.add(Box::new(UpdateCounter::default()));
    let mut emulator = Emulator::with_bus(config, bus);
    emulator.load_firmware(&image(program)).expect("fits");
    emulator
}

#[test]
fn every_device_updates_once_per_completed_step() {
    let config = EmulatorConfig {
        max_cycles: Some(7),
        ..EmulatorConfig::default()
    };
    let jump = Instruction::Jump {
        target: GeneralRegister::A9,
    };
    let mut emulator = counted_system(config, &[jump]);
    emulator.cpu_mut().set_reg(GeneralRegister::A9, RAM_BASE);

    assert_eq!(emulator.run().cycles, 7);
    assert_eq!(emulator.router().read32(COUNTER_BASE), Ok(7));
}

#[test]
fn faulting_step_updates_no_device() {
    let mut emulator = counted_system(EmulatorConfig::default(), &[Instruction::Nop]);

    let outcome = emulator.run();

    assert_eq!(outcome.cycles, 1);
    assert!(outcome.fault.is_some());
    assert_eq!(emulator.router().read32(COUNTER_BASE), Ok(1));
}

#[test]
fn empty_firmware_is_a_load_fault_not_a_step_fault() {
    let mut emulator = system(EmulatorConfig::default());
    let fault = emulator.load_firmware(&[]).unwrap_err();
    assert_eq!(fault, Fault::EmptyInput);
    assert_eq!(fault.class(), FaultClass::Load);
    assert!(!fault.is_step_fault());
    assert_eq!(emulator.cycles(), 0);
}

#[test]
fn jump_loop_counts_cycles_until_cap() {
    let config = EmulatorConfig {
        max_cycles: Some(100),
        ..EmulatorConfig::default()
    };
    let mut emulator = system(config);
    emulator
        .load_firmware(&image(&[Instruction::Jump {
            target: GeneralRegister::A7,
        }]))
        .expect("fits in RAM");
    emulator.cpu_mut().set_reg(GeneralRegister::A7, RAM_BASE);

    assert_eq!(
        emulator.run(),
        RunOutcome {
            cycles: 100,
            fault: None,
        }
    );
    assert!(!emulator.is_running());
}

#[test]
fn firmware_connects_network_device_via_store() {
    let mut emulator = system(EmulatorConfig::default());
    // s32i a1, a2, 0x10 with a2 = NET_BASE - 0x10 and a1 = 1 (connect bit).
    let program = [
        Instruction::Store {
            src: GeneralRegister::A1,
            base: GeneralRegister::A2,
            offset: 0x10,
        },
        Instruction::Jump {
            target: GeneralRegister::A3,
        },
    ];
    emulator.load_firmware(&image(&program)).expect("fits");
    emulator.cpu_mut().set_reg(GeneralRegister::A1, 1);
    emulator.cpu_mut().set_reg(GeneralRegister::A2, NET_BASE - 0x10);
    emulator.cpu_mut().set_reg(GeneralRegister::A3, RAM_BASE + 4);
    emulator.start();

    assert!(matches!(emulator.step(), StepOutcome::Retired { .. }));
    let status = emulator.router().read32(NET_BASE + 4);
    assert_eq!(status, Ok(NET_STATUS_CONNECTED));
    assert_eq!(
        emulator.peripheral(NET_BASE).map(Device::name),
        Some("network")
    );
}

#[test]
fn fault_leaves_state_inspectable() {
    let mut emulator = system(EmulatorConfig::default());
    let program = [
        Instruction::Mov {
            dst: GeneralRegister::A4,
            src: GeneralRegister::A5,
        },
        Instruction::Nop,
    ];
    emulator.load_firmware(&image(&program)).expect("fits");
    emulator.cpu_mut().set_reg(GeneralRegister::A5, 42);

    let outcome = emulator.run();

    let cause = Fault::Alignment {
        address: RAM_BASE + 2,
        width: 4,
    };
    assert_eq!(outcome.fault, Some(cause));
    assert_eq!(outcome.cycles, 1);
    assert_eq!(emulator.run_state(), RunState::Faulted(cause));
    assert_eq!(emulator.cpu().reg(GeneralRegister::A4), 42);
    assert_eq!(emulator.cpu().pc(), RAM_BASE + 2);
    assert_eq!(emulator.step(), StepOutcome::Idle);
}

#[test]
fn restart_after_fault_resumes_from_current_pc() {
    let mut emulator = system(EmulatorConfig::default());
    emulator
        .load_firmware(&image(&[Instruction::Nop]))
        .expect("fits");
    emulator.run();
    assert_eq!(emulator.cycles(), 1);

    emulator.cpu_mut().set_pc(RAM_BASE);
    emulator.start();
    assert!(emulator.is_running());
    assert!(matches!(emulator.step(), StepOutcome::Retired { .. }));
    assert_eq!(emulator.cycles(), 2);
}

#[test]
fn host_side_network_api_queues_canned_response() {
    let mut device = NetworkDevice::new();
    device.connect();
    assert!(device.send_request("http://device.local/"));
    assert_eq!(device.take_response(), CANNED_RESPONSE);
}

#[test]
fn hex_dump_shows_loaded_firmware() {
    let mut emulator = system(EmulatorConfig::default());
    emulator
        .load_firmware(&[0x04, 0x00, 0x00, 0x00, 0xAB])
        .expect("fits");
    let dump = emulator.router().hex_dump(RAM_BASE, 5).expect("ram");
    assert_eq!(dump.trim_end(), "3ff80000: 04 00 00 00 ab");
}

#[test]
fn dumps_cover_cpu_and_every_device() {
    let emulator = system(EmulatorConfig::default());
    let registers = emulator.cpu().dump_registers().to_string();
    assert!(registers.starts_with("pc: 0x00000000"));

    let devices: Vec<String> = emulator
        .peripheral_bus()
        .map(|bus| bus.dump_all().iter().map(ToString::to_string).collect())
        .unwrap_or_default();
    assert_eq!(devices.len(), 2);
    assert!(devices[0].starts_with("uart registers @ 0x3ff40000:"));
    assert!(devices[1].starts_with("network registers @ 0x3ff50000:"));
}
