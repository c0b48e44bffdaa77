// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// M1 macro source to hex2 text.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use knightforge::m1::{defs_used, m1_to_hex2, tokenize_m1, MacroTable, SigilSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SigilChoice {
    Hex2,
    Extended,
}

#[derive(Parser, Debug)]
#[command(
    name = "m1",
    version,
    about = "Expands M1 macro definitions into hex2 tape text"
)]
struct Cli {
    /// Input files, processed in order against one shared macro table.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,
    #[arg(
        long = "dump-defs-used",
        long_help = "Instead of emitting hex2 text, list the macro names the inputs reference, sorted, one per line."
    )]
    dump_defs_used: bool,
    #[arg(long = "sigils", value_enum, default_value_t = SigilChoice::Hex2)]
    sigils: SigilChoice,
    #[arg(
        long = "sigil-chars",
        value_name = "CHARS",
        conflicts_with = "sigils",
        long_help = "Exact set of leading characters that pass through un-decoded, overriding --sigils."
    )]
    sigil_chars: Option<String>,
}

fn read_inputs(cli: &Cli) -> Result<Vec<(String, String)>, String> {
    cli.inputs
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path)
                .map_err(|err| format!("{}: {err}", path.display()))?;
            Ok((path.display().to_string(), text))
        })
        .collect()
}

fn run(cli: &Cli) -> Result<String, String> {
    let inputs = read_inputs(cli)?;
    let sigils = match (&cli.sigil_chars, cli.sigils) {
        (Some(chars), _) => SigilSet::from_chars(chars),
        (None, SigilChoice::Hex2) => SigilSet::hex2(),
        (None, SigilChoice::Extended) => SigilSet::extended(),
    };
    if cli.dump_defs_used {
        let mut files = Vec::with_capacity(inputs.len());
        let mut table = MacroTable::new();
        for (file, text) in &inputs {
            let tokens = tokenize_m1(text, file).map_err(|err| err.to_string())?;
            table.collect(&tokens, file).map_err(|err| err.to_string())?;
            files.push((file.clone(), tokens));
        }
        let mut listing = String::new();
        for name in defs_used(&files, &table) {
            listing.push_str(&name);
            listing.push('\n');
        }
        Ok(listing)
    } else {
        m1_to_hex2(&inputs, &sigils).map_err(|err| err.to_string())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(text) => {
            let result = match &cli.output {
                Some(path) => {
                    fs::write(path, text.as_bytes()).map_err(|err| format!("{}: {err}", path.display()))
                }
                None => io::stdout()
                    .write_all(text.as_bytes())
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
