// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for the knight-vm runner.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use knightforge::vm::{RegisterWidth, Vm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "knight-vm",
    version,
    about = "Runs Knight ROM images until HALT or a fatal fault"
)]
struct Cli {
    /// Paper tape of the program being run.
    rom: PathBuf,
    #[arg(
        long = "rom-hex",
        long_help = "Treat the ROM as hex0-format text instead of raw bytes."
    )]
    rom_hex: bool,
    #[arg(
        long = "width",
        default_value_t = 32,
        long_help = "Register width in bits. One of 16, 32, 64."
    )]
    width: u32,
    #[arg(
        long = "memory",
        default_value_t = 1 << 21,
        long_help = "Bytes of memory to allocate beyond the ROM image."
    )]
    memory: usize,
    #[arg(long = "tape1", value_name = "FILE", default_value = "tape_01")]
    tape1: PathBuf,
    #[arg(long = "tape2", value_name = "FILE", default_value = "tape_02")]
    tape2: PathBuf,
    #[arg(
        long = "protect",
        long_help = "Fault on writes below the end of the loaded ROM, catching self-modifying programs."
    )]
    protect: bool,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

fn run(cli: &Cli) -> Result<Vm, String> {
    let width = RegisterWidth::from_bits(cli.width)
        .ok_or_else(|| format!("unsupported register width {}", cli.width))?;
    let mut vm = Vm::new(width, 0);
    let rom_len;
    if cli.rom_hex {
        let text = fs::read_to_string(&cli.rom)
            .map_err(|err| format!("{}: {err}", cli.rom.display()))?;
        vm.load_hex_rom(&text);
        rom_len = vm.memory.len();
    } else {
        let rom =
            fs::read(&cli.rom).map_err(|err| format!("{}: {err}", cli.rom.display()))?;
        rom_len = rom.len();
        vm.load_rom(&rom);
    }
    vm.grow_memory(cli.memory);
    if cli.protect {
        vm.protect_below(rom_len as u64);
    }
    vm.tapes
        .set_tape_paths(Some(cli.tape1.clone()), Some(cli.tape2.clone()));
    vm.run().map_err(|err| err.to_string())?;
    Ok(vm)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(vm) => {
            if cli.format == OutputFormat::Json {
                println!(
                    "{}",
                    json!({
                        "instructions": vm.performance_counter,
                        "ip": vm.ip,
                        "halted": vm.halted,
                    })
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
