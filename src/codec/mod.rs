// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Byte-stream codecs for the hex0/hex1/hex2 tape formats.
//!
//! Each codec turns an ASCII tape into raw bytes. hex0 is pure strip-and-pack;
//! hex1 adds labels and relative references; hex2 adds absolute pointer and
//! absolute address references. hex1 and hex2 resolve references in two
//! passes over the token stream so forward references work.

pub mod hex0;
pub mod hex1;
pub mod hex2;

pub use hex0::bytes_from_hex0;
pub use hex1::bytes_from_hex1;
pub use hex2::bytes_from_hex2;

use crate::core::error::{CodecError, CodecErrorKind};
use crate::core::labels::LabelTable;
use crate::core::tokens::{TapeDialect, TapeToken, TapeTokenizer};

/// Two-pass label resolution shared by hex1 and hex2.
///
/// Pass 1 walks the token stream accumulating the output byte position (a
/// completed hex pair advances it by 1, a 2-byte reference by 2, a 4-byte
/// reference by 4) and records each `:label` at the position it will
/// occupy. Pass 2 re-walks the stream emitting packed bytes and resolved
/// references. The passes must not interleave: a reference may appear before
/// its label is declared.
fn assemble_tape(text: &str, file: &str, dialect: TapeDialect) -> Result<Vec<u8>, CodecError> {
    let labels = collect_labels(text, file, dialect)?;

    let mut tokenizer = TapeTokenizer::new(text, dialect);
    let mut out = Vec::new();
    let mut ip: u32 = 0;
    let mut high_nibble: Option<u8> = None;
    loop {
        let token = match tokenizer.next_token() {
            Ok(Some(token)) => token,
            Ok(None) => break,
            Err(err) => return Err(err.with_file(file)),
        };
        match token {
            TapeToken::Nibble(nibble) => match high_nibble.take() {
                None => high_nibble = Some(nibble),
                Some(high) => {
                    out.push((high << 4) | nibble);
                    ip += 1;
                }
            },
            TapeToken::Label(_) => {}
            TapeToken::Rel(name) => {
                // Offset is measured from the position after the two
                // reference bytes themselves.
                ip += 2;
                let target = lookup(&labels, &name, file, tokenizer.line())?;
                let rel = (target as i64 - ip as i64) as u16;
                out.extend_from_slice(&rel.to_be_bytes());
            }
            TapeToken::AbsPointer(name) => {
                ip += 2;
                let target = lookup(&labels, &name, file, tokenizer.line())?;
                out.extend_from_slice(&(target as u16).to_be_bytes());
            }
            TapeToken::AbsAddress(name) => {
                ip += 4;
                let target = lookup(&labels, &name, file, tokenizer.line())?;
                out.extend_from_slice(&target.to_be_bytes());
            }
        }
    }
    Ok(out)
}

fn collect_labels(text: &str, file: &str, dialect: TapeDialect) -> Result<LabelTable, CodecError> {
    let mut tokenizer = TapeTokenizer::new(text, dialect);
    let mut labels = LabelTable::new();
    let mut ip: u32 = 0;
    let mut pending_nibble = false;
    loop {
        let token = match tokenizer.next_token() {
            Ok(Some(token)) => token,
            Ok(None) => break,
            Err(err) => return Err(err.with_file(file)),
        };
        match token {
            TapeToken::Nibble(_) => {
                if pending_nibble {
                    ip += 1;
                }
                pending_nibble = !pending_nibble;
            }
            TapeToken::Label(name) => {
                labels
                    .define(&name, ip, tokenizer.line())
                    .map_err(|err| err.with_file(file))?;
            }
            TapeToken::Rel(_) | TapeToken::AbsPointer(_) => ip += 2,
            TapeToken::AbsAddress(_) => ip += 4,
        }
    }
    Ok(labels)
}

fn lookup(labels: &LabelTable, name: &str, file: &str, line: u32) -> Result<u32, CodecError> {
    labels.lookup(name).ok_or_else(|| {
        CodecError::new(CodecErrorKind::Symbol, "Unknown label", Some(name))
            .with_file(file)
            .with_line(line)
    })
}
