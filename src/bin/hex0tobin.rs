// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// hex0 text to raw bytes.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use knightforge::codec::bytes_from_hex0;

#[derive(Parser, Debug)]
#[command(name = "hex0tobin", version, about = "Packs hex0 tape text into bytes")]
struct Cli {
    input: PathBuf,
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,
}

fn run(cli: &Cli) -> Result<(), String> {
    let text = fs::read_to_string(&cli.input)
        .map_err(|err| format!("{}: {err}", cli.input.display()))?;
    let bytes = bytes_from_hex0(&text);
    match &cli.output {
        Some(path) => fs::write(path, &bytes).map_err(|err| format!("{}: {err}", path.display())),
        None => io::stdout()
            .write_all(&bytes)
            .map_err(|err| err.to_string()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
