#![no_main]

use libfuzzer_sys::fuzz_target;
use lxemu_core::{
    validate_alignment, AccessWidth, Decoder, Emulator, EmulatorConfig, PeripheralBus, Router,
    MemoryMap, NetworkDevice, Uart, DEVICE_BASE, RAM_BASE, UART_BASE,
};
use lxemu_core::peripherals::uart::TxSink;

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let word = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let addr = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);

    let _ = Decoder::decode(word);
    let _ = validate_alignment(addr, AccessWidth::Half);
    let _ = validate_alignment(addr, AccessWidth::Word);

    let mut router: Router = Router::new(MemoryMap::default());
    let _ = router.write32(addr, word);
    let _ = router.read16(addr);
    let _ = router.read8(DEVICE_BASE.wrapping_add(addr & 0xFFFF));

    let mut bus = PeripheralBus::new();
    bus.add(Box::new(Uart::with_sink(UART_BASE, TxSink::Capture(Vec::new()))));
    bus.add(Box::new(NetworkDevice::new()));
    let config = EmulatorConfig {
        max_cycles: Some(64),
        ..EmulatorConfig::default()
    };
    let mut emulator = Emulator::with_bus(config, bus);
    if emulator.load_firmware(&data[8..]).is_ok() {
        for (index, byte) in data.iter().take(16).enumerate() {
            let _ = emulator
                .cpu_mut()
                .set_register(index as u8, RAM_BASE | u32::from(*byte));
        }
        let _ = emulator.run();
    }
});
