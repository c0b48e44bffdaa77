// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// M1 macro source straight to bytes. Three passes: macro table,
// substitution, hex2 label resolution.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use knightforge::m1::{m1_to_bytes, SigilSet};

#[derive(Parser, Debug)]
#[command(
    name = "m1tobin",
    version,
    about = "Assembles M1 macro source to a binary image"
)]
struct Cli {
    /// Input files, processed in order against one shared macro table.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,
}

fn run(cli: &Cli) -> Result<Vec<u8>, String> {
    let inputs = cli
        .inputs
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path)
                .map_err(|err| format!("{}: {err}", path.display()))?;
            Ok((path.display().to_string(), text))
        })
        .collect::<Result<Vec<_>, String>>()?;
    m1_to_bytes(&inputs, &SigilSet::hex2()).map_err(|err| err.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(bytes) => {
            let result = match &cli.output {
                Some(path) => {
                    fs::write(path, &bytes).map_err(|err| format!("{}: {err}", path.display()))
                }
                None => io::stdout()
                    .write_all(&bytes)
                    .map_err(|err| err.to_string()),
            };
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("{err}");
                    ExitCode::FAILURE
                }
            }
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
