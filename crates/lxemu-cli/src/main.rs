//! CLI entry point: loads a firmware image and runs it on the lxemu core.

use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;
use lxemu_core::{Emulator, EmulatorConfig};
#[cfg(test)]
use tempfile as _;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Runs a flat firmware image on the emulated microcontroller.
///
/// UART output goes to stdout; log records go to stderr and honour `RUST_LOG`.
#[derive(Parser, Debug, PartialEq, Eq)]
#[command(name = "lxemu", version)]
#[command(about = "Loads and executes a firmware binary", long_about = None)]
struct Args {
    /// Path to the firmware binary
    firmware: PathBuf,

    /// Stop cleanly after this many cycles
    #[arg(long, value_name = "N")]
    max_cycles: Option<u64>,

    /// Load address and entry point, in hex (defaults to the start of RAM)
    #[arg(long, value_name = "HEX", value_parser = parse_hex_address)]
    load_address: Option<u32>,

    /// Log every retired instruction at trace level
    #[arg(long)]
    trace: bool,

    /// Print CPU and device registers after the run
    #[arg(long)]
    dump: bool,

    /// Raise the default log level to debug
    #[arg(short, long)]
    verbose: bool,
}

fn parse_hex_address(value: &str) -> Result<u32, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u32::from_str_radix(&digits.replace('_', ""), 16)
        .map_err(|e| format!("invalid hex address `{value}`: {e}"))
}

impl Args {
    fn config(&self) -> EmulatorConfig {
        let defaults = EmulatorConfig::default();
        EmulatorConfig {
            load_address: self.load_address.unwrap_or(defaults.load_address),
            max_cycles: self.max_cycles,
            trace_instructions: self.trace,
            ..defaults
        }
    }

    const fn default_log_level(&self) -> &'static str {
        if self.trace {
            "trace"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn run(args: &Args) -> i32 {
    let firmware = match fs::read(&args.firmware) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!(
                "error: could not open firmware file {}: {e}",
                args.firmware.display()
            );
            return 1;
        }
    };
    info!(
        path = %args.firmware.display(),
        size = firmware.len(),
        "firmware file read"
    );

    let mut emulator = Emulator::new(args.config());
    if let Err(fault) = emulator.load_firmware(&firmware) {
        error!(%fault, "firmware load failed");
        eprintln!("error: {fault}");
        return 1;
    }

    let outcome = emulator.run();
    info!(cycles = outcome.cycles, faulted = outcome.fault.is_some(), "run finished");

    if args.dump {
        print!("{}", emulator.cpu().dump_registers());
        if let Some(bus) = emulator.peripheral_bus() {
            for dump in bus.dump_all() {
                print!("{dump}");
            }
        }
    }
    0
}

fn main() {
    let exit_code = match Args::try_parse() {
        Ok(args) => {
            init_logging(args.default_log_level());
            run(&args)
        }
        Err(e) => {
            let _ = e.print();
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            }
        }
    };
    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("lxemu").chain(args.iter().copied()))
    }

    #[test]
    fn single_positional_is_required() {
        assert_eq!(
            parse(&[]).map_err(|e| e.kind()).err(),
            Some(ErrorKind::MissingRequiredArgument)
        );
        assert!(parse(&["a.bin", "b.bin"]).is_err());
    }

    #[test]
    fn defaults_match_core_config() {
        let args = parse(&["fw.bin"]).expect("valid args");
        assert_eq!(args.firmware, PathBuf::from("fw.bin"));
        assert_eq!(args.config(), EmulatorConfig::default());
        assert_eq!(args.default_log_level(), "info");
    }

    #[test]
    fn options_flow_into_config() {
        let args = parse(&[
            "--max-cycles",
            "500",
            "--load-address",
            "0x3FF8_0100",
            "--trace",
            "fw.bin",
        ])
        .expect("valid args");
        let config = args.config();
        assert_eq!(config.max_cycles, Some(500));
        assert_eq!(config.load_address, 0x3FF8_0100);
        assert!(config.trace_instructions);
        assert_eq!(args.default_log_level(), "trace");
    }

    #[test]
    fn verbose_raises_log_level() {
        let args = parse(&["-v", "fw.bin"]).expect("valid args");
        assert_eq!(args.default_log_level(), "debug");
    }

    #[test]
    fn hex_parser_accepts_prefix_and_rejects_garbage() {
        assert_eq!(parse_hex_address("3ff80000"), Ok(0x3FF8_0000));
        assert_eq!(parse_hex_address("0X10"), Ok(0x10));
        assert!(parse_hex_address("0xZZ").is_err());
        assert!(parse(&["--load-address", "nope", "fw.bin"]).is_err());
    }

    #[test]
    fn help_and_version_are_display_requests() {
        assert_eq!(
            parse(&["--help"]).map_err(|e| e.kind()).err(),
            Some(ErrorKind::DisplayHelp)
        );
        assert_eq!(
            parse(&["--version"]).map_err(|e| e.kind()).err(),
            Some(ErrorKind::DisplayVersion)
        );
    }
}
